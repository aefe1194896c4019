use serde::{Deserialize, Serialize};

/// Digital product passport data from the simulated CIRPASS registry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CirpassProduct {
    /// Registry identifier.
    pub id: String,
    /// Product name.
    pub name: String,
    /// Manufacturer name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manufacturer: Option<String>,
    /// Material composition.
    #[serde(default)]
    pub materials: Vec<Material>,
    /// Carbon footprint breakdown.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub carbon_footprint: Option<CarbonFootprint>,
    /// Repairability score, 0 to 10.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repairability_score: Option<f64>,
    /// End-of-life instructions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recycling_instructions: Option<String>,
}

impl CirpassProduct {
    /// Share of recycled material by weight, in percent.
    #[must_use]
    pub fn recycled_share(&self) -> f64 {
        self.materials
            .iter()
            .filter(|m| m.recycled)
            .map(|m| m.percentage)
            .sum()
    }
}

/// One material in a composition.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Material {
    /// Material name.
    pub name: String,
    /// Share by weight, in percent.
    pub percentage: f64,
    /// Whether the material is recycled.
    #[serde(default)]
    pub recycled: bool,
    /// Country of origin.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
}

/// Carbon footprint in kg CO2-equivalent.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CarbonFootprint {
    /// Total footprint.
    pub total_kg_co2e: f64,
    /// Manufacturing share.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manufacturing_kg_co2e: Option<f64>,
    /// Transport share.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transport_kg_co2e: Option<f64>,
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A tracked product.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    /// Backend identifier.
    pub id: String,
    /// 14-digit GTIN.
    pub gtin: String,
    /// Item-level serial number.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serial_number: Option<String>,
    /// Display name.
    pub name: String,
    /// Free-form description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Manufacturer name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manufacturer: Option<String>,
    /// Batch or lot number.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batch_number: Option<String>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last modification time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Payload for registering a product.
///
/// # Example
///
/// ```rust
/// use tracechain::models::NewProduct;
///
/// let product = NewProduct::new("09506000134352", "Merino Jacket")
///     .with_serial_number("SN-0001");
/// assert_eq!(product.serial_number.as_deref(), Some("SN-0001"));
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProduct {
    /// 14-digit GTIN.
    pub gtin: String,
    /// Display name.
    pub name: String,
    /// Item-level serial number.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serial_number: Option<String>,
    /// Free-form description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Manufacturer name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manufacturer: Option<String>,
    /// Batch or lot number.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batch_number: Option<String>,
}

impl NewProduct {
    /// Creates a payload with the required fields.
    #[must_use]
    pub fn new(gtin: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            gtin: gtin.into(),
            name: name.into(),
            serial_number: None,
            description: None,
            manufacturer: None,
            batch_number: None,
        }
    }

    /// Sets the serial number.
    #[must_use]
    pub fn with_serial_number(mut self, serial: impl Into<String>) -> Self {
        self.serial_number = Some(serial.into());
        self
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets the manufacturer.
    #[must_use]
    pub fn with_manufacturer(mut self, manufacturer: impl Into<String>) -> Self {
        self.manufacturer = Some(manufacturer.into());
        self
    }

    /// Sets the batch number.
    #[must_use]
    pub fn with_batch_number(mut self, batch: impl Into<String>) -> Self {
        self.batch_number = Some(batch.into());
        self
    }
}

/// One page of products.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductPage {
    /// Products on this page.
    pub items: Vec<Product>,
    /// Cursor for the next page; `None` on the last page.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
}

impl ProductPage {
    /// Returns `true` if another page is available.
    #[must_use]
    pub const fn has_next_page(&self) -> bool {
        self.next_cursor.is_some()
    }
}

/// Parameters for listing products.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProductListParams {
    /// Page size.
    pub limit: Option<u32>,
    /// Cursor from a previous [`ProductPage`].
    pub cursor: Option<String>,
}

impl ProductListParams {
    /// Parameters for the page after `page`, if there is one.
    #[must_use]
    pub fn next(&self, page: &ProductPage) -> Option<Self> {
        page.next_cursor.as_ref().map(|cursor| Self {
            limit: self.limit,
            cursor: Some(cursor.clone()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_product_decodes_camel_case() {
        let product: Product = serde_json::from_value(json!({
            "id": "p-1",
            "gtin": "09506000134352",
            "serialNumber": "SN-1",
            "name": "Jacket",
            "createdAt": "2025-03-01T10:00:00Z"
        }))
        .unwrap();

        assert_eq!(product.serial_number.as_deref(), Some("SN-1"));
        assert!(product.manufacturer.is_none());
        assert!(product.updated_at.is_none());
    }

    #[test]
    fn test_new_product_omits_unset_fields() {
        let value = serde_json::to_value(NewProduct::new("09506000134352", "Jacket")).unwrap();
        assert_eq!(value, json!({"gtin": "09506000134352", "name": "Jacket"}));
    }

    #[test]
    fn test_list_params_next_follows_cursor() {
        let params = ProductListParams {
            limit: Some(25),
            cursor: None,
        };
        let last = ProductPage {
            items: vec![],
            next_cursor: None,
        };
        assert!(params.next(&last).is_none());

        let more = ProductPage {
            items: vec![],
            next_cursor: Some("c2".to_string()),
        };
        let next = params.next(&more).unwrap();
        assert_eq!(next.limit, Some(25));
        assert_eq!(next.cursor.as_deref(), Some("c2"));
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::usage::{Tier, UsageCounters, UsageSnapshot};

/// Account and subscription details returned by `GET auth/me`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionInfo {
    /// Account identifier.
    pub account_id: String,
    /// Subscription tier.
    pub tier: Tier,
    /// Limits for the current window.
    pub limits: UsageCounters,
    /// Consumption in the current window.
    pub usage: UsageCounters,
    /// When the current window resets.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resets_at: Option<DateTime<Utc>>,
}

impl SubscriptionInfo {
    /// Converts to the snapshot held by the usage gate.
    #[must_use]
    pub const fn to_snapshot(&self, fetched_at: DateTime<Utc>) -> UsageSnapshot {
        UsageSnapshot {
            tier: self.tier,
            limits: self.limits,
            used: self.usage,
            fetched_at,
            resets_at: self.resets_at,
        }
    }
}

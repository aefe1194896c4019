//! Local usage gate.
//!
//! The gate holds the most recent [`UsageSnapshot`] fetched from the
//! backend and rejects calls a free-tier account has no quota left for,
//! before any network traffic. It is an optimization only: paid tiers and
//! callers without a snapshot always pass, and the backend stays the
//! source of truth.
//!
//! The snapshot is immutable and shared behind an [`Arc`]. A refresh
//! swaps the whole `Arc`; an in-flight admission check keeps reading the
//! snapshot it already cloned.

mod store;

pub use store::{FileSnapshotStore, MemorySnapshotStore, SnapshotStore, StoreError};

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::clients::{ClassifiedError, ErrorKind};

/// Error code attached to local quota rejections.
pub const LOCAL_QUOTA_EXCEEDED: &str = "LOCAL_QUOTA_EXCEEDED";

/// Subscription tier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    /// Free tier; the only tier gated locally.
    Free,
    /// Paid tier.
    Premium,
    /// Paid tier with negotiated limits.
    Enterprise,
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Free => "free",
            Self::Premium => "premium",
            Self::Enterprise => "enterprise",
        })
    }
}

/// Per-window counters, used both for limits and for consumption.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageCounters {
    /// API calls.
    pub calls: u64,
    /// Registered products.
    pub products: u64,
    /// Submitted lifecycle events.
    pub events: u64,
}

/// Cached view of the account's subscription and usage.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageSnapshot {
    /// Subscription tier.
    pub tier: Tier,
    /// Limits for the current window.
    pub limits: UsageCounters,
    /// Consumption in the current window.
    pub used: UsageCounters,
    /// When the snapshot was fetched.
    pub fetched_at: DateTime<Utc>,
    /// When the current window resets, if the backend reported it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resets_at: Option<DateTime<Utc>>,
}

/// The kind of quota an operation draws from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Admission {
    /// Any API call.
    Call,
    /// A call that registers a product.
    RegisterProduct,
    /// A call that submits a lifecycle event.
    SubmitEvent,
    /// A call that draws from no quota, such as the subscription refresh
    /// that brings the snapshot up to date.
    Unmetered,
}

impl Admission {
    const fn label(self) -> &'static str {
        match self {
            Self::Call => "calls",
            Self::RegisterProduct => "products",
            Self::SubmitEvent => "events",
            Self::Unmetered => "unmetered",
        }
    }
}

/// Checks `admission` against `snapshot`.
///
/// Passes when there is no snapshot or the tier is not [`Tier::Free`].
/// Every admission draws from the call quota; product registration and
/// event submission also draw from their own quota.
///
/// # Errors
///
/// Returns a `RateLimited` [`ClassifiedError`] with code
/// [`LOCAL_QUOTA_EXCEEDED`] when a relevant quota is exhausted.
pub fn check_admission(
    snapshot: Option<&UsageSnapshot>,
    admission: Admission,
) -> Result<(), ClassifiedError> {
    let Some(snapshot) = snapshot else {
        return Ok(());
    };
    if snapshot.tier != Tier::Free || admission == Admission::Unmetered {
        return Ok(());
    }

    let exhausted = |used: u64, limit: u64| used >= limit;

    let blocked = if exhausted(snapshot.used.calls, snapshot.limits.calls) {
        Some(Admission::Call)
    } else {
        match admission {
            Admission::RegisterProduct
                if exhausted(snapshot.used.products, snapshot.limits.products) =>
            {
                Some(admission)
            }
            Admission::SubmitEvent if exhausted(snapshot.used.events, snapshot.limits.events) => {
                Some(admission)
            }
            _ => None,
        }
    };

    let Some(quota) = blocked else {
        return Ok(());
    };

    let retry_after = snapshot.resets_at.map(|at| {
        let secs = (at - Utc::now()).num_seconds();
        u64::try_from(secs).unwrap_or(0)
    });

    Err(ClassifiedError::new(
        ErrorKind::RateLimited { retry_after },
        format!("free tier {} quota exhausted for this window", quota.label()),
    )
    .with_code(LOCAL_QUOTA_EXCEEDED))
}

/// Shared holder of the current [`UsageSnapshot`].
#[derive(Debug, Default)]
pub struct UsageGate {
    snapshot: RwLock<Option<Arc<UsageSnapshot>>>,
}

impl UsageGate {
    /// Creates a gate, optionally seeded with a snapshot.
    #[must_use]
    pub fn new(snapshot: Option<UsageSnapshot>) -> Self {
        Self {
            snapshot: RwLock::new(snapshot.map(Arc::new)),
        }
    }

    /// Returns the current snapshot.
    #[must_use]
    pub fn current(&self) -> Option<Arc<UsageSnapshot>> {
        self.snapshot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replaces the snapshot wholesale.
    pub fn replace(&self, snapshot: UsageSnapshot) {
        *self
            .snapshot
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(Arc::new(snapshot));
    }

    /// Drops the snapshot; admission passes until the next refresh.
    pub fn clear(&self) {
        *self
            .snapshot
            .write()
            .unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// Checks `admission` against the current snapshot.
    ///
    /// # Errors
    ///
    /// See [`check_admission`].
    pub fn check_admission(&self, admission: Admission) -> Result<(), ClassifiedError> {
        let snapshot = self.current();
        let result = check_admission(snapshot.as_deref(), admission);
        if let Err(e) = &result {
            tracing::warn!(?admission, "local usage gate rejected call: {}", e.message);
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn snapshot(tier: Tier, used: UsageCounters) -> UsageSnapshot {
        UsageSnapshot {
            tier,
            limits: UsageCounters {
                calls: 100,
                products: 10,
                events: 50,
            },
            used,
            fetched_at: Utc::now(),
            resets_at: None,
        }
    }

    #[test]
    fn test_no_snapshot_always_passes() {
        assert!(check_admission(None, Admission::Call).is_ok());
        assert!(UsageGate::default()
            .check_admission(Admission::RegisterProduct)
            .is_ok());
    }

    #[test]
    fn test_free_tier_with_quota_left_passes() {
        let snap = snapshot(
            Tier::Free,
            UsageCounters {
                calls: 99,
                products: 9,
                events: 49,
            },
        );
        assert!(check_admission(Some(&snap), Admission::Call).is_ok());
        assert!(check_admission(Some(&snap), Admission::RegisterProduct).is_ok());
        assert!(check_admission(Some(&snap), Admission::SubmitEvent).is_ok());
    }

    #[test]
    fn test_free_tier_calls_exhausted_rejects_everything() {
        let snap = snapshot(
            Tier::Free,
            UsageCounters {
                calls: 100,
                products: 0,
                events: 0,
            },
        );
        for admission in [
            Admission::Call,
            Admission::RegisterProduct,
            Admission::SubmitEvent,
        ] {
            let err = check_admission(Some(&snap), admission).unwrap_err();
            assert_eq!(err.kind, ErrorKind::RateLimited { retry_after: None });
            assert_eq!(err.code.as_deref(), Some(LOCAL_QUOTA_EXCEEDED));
        }
        assert!(check_admission(Some(&snap), Admission::Unmetered).is_ok());
    }

    #[test]
    fn test_product_quota_only_blocks_registration() {
        let snap = snapshot(
            Tier::Free,
            UsageCounters {
                calls: 1,
                products: 10,
                events: 0,
            },
        );
        assert!(check_admission(Some(&snap), Admission::Call).is_ok());
        assert!(check_admission(Some(&snap), Admission::SubmitEvent).is_ok());
        let err = check_admission(Some(&snap), Admission::RegisterProduct).unwrap_err();
        assert!(err.message.contains("products"));
    }

    #[test]
    fn test_paid_tiers_always_pass() {
        let exhausted = UsageCounters {
            calls: 1_000,
            products: 1_000,
            events: 1_000,
        };
        for tier in [Tier::Premium, Tier::Enterprise] {
            let snap = snapshot(tier, exhausted);
            assert!(check_admission(Some(&snap), Admission::RegisterProduct).is_ok());
        }
    }

    #[test]
    fn test_retry_after_derived_from_reset_time() {
        let mut snap = snapshot(
            Tier::Free,
            UsageCounters {
                calls: 100,
                products: 0,
                events: 0,
            },
        );
        snap.resets_at = Some(Utc::now() + Duration::minutes(10));

        let err = check_admission(Some(&snap), Admission::Call).unwrap_err();
        let secs = err.retry_after().unwrap();
        assert!((590..=600).contains(&secs));
    }

    #[test]
    fn test_gate_replace_and_clear() {
        let gate = UsageGate::new(None);
        gate.replace(snapshot(
            Tier::Free,
            UsageCounters {
                calls: 100,
                products: 0,
                events: 0,
            },
        ));
        assert!(gate.check_admission(Admission::Call).is_err());

        let held = gate.current().unwrap();
        gate.replace(snapshot(Tier::Premium, UsageCounters::default()));
        assert_eq!(held.tier, Tier::Free);
        assert!(gate.check_admission(Admission::Call).is_ok());

        gate.clear();
        assert!(gate.current().is_none());
    }

    #[test]
    fn test_snapshot_serde_uses_camel_case() {
        let snap = snapshot(Tier::Free, UsageCounters::default());
        let value = serde_json::to_value(&snap).unwrap();
        assert_eq!(value["tier"], "free");
        assert!(value.get("fetchedAt").is_some());
        assert!(value.get("resetsAt").is_none());
    }
}

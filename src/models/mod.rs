//! Wire models for the Tracechain API.
//!
//! Plain serde records. Field names are camelCase on the wire and
//! timestamps are RFC 3339 strings decoded into [`chrono::DateTime<Utc>`].
//!
//! [`chrono::DateTime<Utc>`]: chrono::DateTime

mod cirpass;
mod event;
mod product;
mod subscription;

pub use cirpass::{CarbonFootprint, CirpassProduct, Material};
pub use event::{DetailValue, EventType, LifecycleEvent, NewLifecycleEvent};
pub use product::{NewProduct, Product, ProductListParams, ProductPage};
pub use subscription::SubscriptionInfo;

//! # Tracechain SDK
//!
//! A Rust SDK for the Tracechain supply-chain tracking API: product
//! registration, lifecycle events, GS1 Digital Link resolution and
//! circular-passport (CIRPASS) lookups.
//!
//! ## Overview
//!
//! This SDK provides:
//! - Type-safe configuration via [`SdkConfig`] and [`SdkConfigBuilder`]
//! - Validated newtypes for credentials and endpoints
//! - API key and bearer-token authentication via [`auth`]
//! - A resilient request pipeline with retries, backoff, rate-limit
//!   handling, idempotency keys and cancellation via [`clients`]
//! - A local free-tier usage gate with optional persistence via [`usage`]
//! - GS1 Digital Link parsing via [`gs1`]
//! - Typed API operations via [`TraceClient`]
//!
//! ## Quick Start
//!
//! ```rust
//! use tracechain::{ApiKey, ApiVersion, BaseUrl, SdkConfig};
//!
//! let config = SdkConfig::builder()
//!     .base_url(BaseUrl::new("https://api.example.com/v1").unwrap())
//!     .api_key(ApiKey::new("your-api-key").unwrap())
//!     .api_version(ApiVersion::latest())
//!     .build()
//!     .unwrap();
//! ```
//!
//! ## Making Calls
//!
//! ```rust,ignore
//! use tracechain::TraceClient;
//! use tracechain::models::{EventType, NewLifecycleEvent, NewProduct};
//!
//! let client = TraceClient::new(config)?;
//!
//! let product = client
//!     .register_product(&NewProduct::new("09506000134352", "Merino Jacket"))
//!     .await?;
//!
//! let event = NewLifecycleEvent::new(EventType::Manufactured)
//!     .with_location("Porto, PT")
//!     .with_detail("line", 4_i64);
//! client.add_event(&product.id, &event).await?;
//! ```
//!
//! ## Resolving a Scanned Code
//!
//! ```rust
//! use tracechain::gs1::DigitalLink;
//!
//! let link = DigitalLink::parse("https://id.example.com/01/09506000134352/21/SN-42").unwrap();
//! assert_eq!(link.product_ref().as_deref(), Some("09506000134352:SN-42"));
//! ```
//!
//! ## Retries and Cancellation
//!
//! Transient failures (network, timeout, 5xx) are retried with exponential
//! backoff and jitter; 429 responses wait for `Retry-After`. Writes carry
//! an idempotency key that is reused across attempts. Every call can be
//! cancelled through the client's [`CancellationToken`]:
//!
//! ```rust,ignore
//! use tokio_util::sync::CancellationToken;
//!
//! let token = CancellationToken::new();
//! let client = TraceClient::new(config)?.with_cancellation(token.clone());
//! // elsewhere:
//! token.cancel();
//! ```
//!
//! [`CancellationToken`]: tokio_util::sync::CancellationToken
//!
//! ## Design Principles
//!
//! - **No global state**: Configuration is instance-based and passed explicitly
//! - **Fail-fast validation**: All newtypes validate on construction
//! - **Thread-safe**: All types are `Send + Sync`
//! - **Async-first**: Designed for use with Tokio async runtime
//! - **Advisory local gate**: The backend remains the source of truth for quotas

pub mod api;
pub mod auth;
pub mod clients;
pub mod config;
pub mod error;
pub mod gs1;
pub mod models;
pub mod usage;

// Re-export public types at crate root for convenience
pub use api::{ApiError, ErrorCategory, TraceClient};
pub use config::{ApiKey, ApiVersion, BaseUrl, SdkConfig, SdkConfigBuilder};
pub use error::ConfigError;

// Re-export pipeline types for convenience
pub use clients::{
    ClassifiedError, ErrorKind, HttpError, HttpMethod, HttpRequest, HttpResponse,
    IdempotencyKey, InvalidHttpRequestError, RetryPolicy,
};
pub use usage::{Tier, UsageSnapshot};

//! The resilient request pipeline.
//!
//! This module provides the layers every Tracechain API call passes
//! through, bottom-up:
//!
//! - [`HttpRequest`] / [`HttpResponse`]: the request descriptor and raw response
//! - [`Transport`] / [`ReqwestTransport`]: one network exchange, classified
//! - [`RetryController`] / [`RetryPolicy`]: the retry and backoff state machine
//! - [`HttpClient`]: credentials, usage gate, transport and retries composed
//!
//! # Retry Behavior
//!
//! - **429 (Rate Limited)**: waits `Retry-After` seconds (60 when absent);
//!   does not count against `max_retries`
//! - **5xx, network errors, timeouts**: exponential backoff with jitter,
//!   up to `max_retries` retries (default 3)
//! - **Other 4xx, decode failures**: returned immediately
//!
//! # Example
//!
//! ```rust,ignore
//! use tracechain::clients::{HttpMethod, HttpRequest};
//! use tracechain::usage::Admission;
//!
//! let request = HttpRequest::builder(HttpMethod::Post, "products")
//!     .body(serde_json::json!({"gtin": "09506000134352", "name": "Jacket"}))
//!     .idempotent()
//!     .build()?;
//!
//! let product: Product = client
//!     .request_json(&request, Admission::RegisterProduct, &cancel)
//!     .await?;
//! ```

mod errors;
mod http_client;
mod http_request;
mod http_response;
mod retry;
mod transport;

pub use errors::{ClassifiedError, ErrorKind, HttpError, InvalidHttpRequestError};
pub use http_client::HttpClient;
pub use http_request::{HttpMethod, HttpRequest, HttpRequestBuilder, IdempotencyKey};
pub use http_response::{
    ErrorBody, ErrorEnvelope, HttpResponse, CORRELATION_ID_HEADER, DEFAULT_RETRY_AFTER_SECS,
};
pub use retry::{
    RetryController, RetryDecision, RetryPolicy, DEFAULT_BASE_DELAY, DEFAULT_MAX_RETRIES,
    MIN_ATTEMPT_BUDGET,
};
pub use transport::{
    ReqwestTransport, Transport, API_VERSION_HEADER, IDEMPOTENCY_KEY_HEADER, SDK_VERSION,
};

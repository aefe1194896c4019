//! Typed operations over the Tracechain API.
//!
//! [`TraceClient`] is the entry point: one method per backend operation,
//! each returning a typed model or an [`ApiError`]. Validation, retries,
//! throttling and the local usage gate all happen underneath in
//! [`clients`](crate::clients).

mod client;
mod errors;

pub use client::TraceClient;
pub use errors::{ApiError, ErrorCategory};

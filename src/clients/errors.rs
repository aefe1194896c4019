//! Error types for the request pipeline.
//!
//! Every failed attempt is normalized into a [`ClassifiedError`] whose
//! [`ErrorKind`] drives the retry decision. Failures that never reach the
//! network (credential errors, invalid requests, cancellation) are carried
//! by [`HttpError`] alongside the classified variant.
//!
//! # Example
//!
//! ```rust,ignore
//! use tracechain::clients::{ErrorKind, HttpError};
//!
//! match client.request_json::<Product>(&request, Admission::Call, &cancel).await {
//!     Ok(product) => println!("{}", product.name),
//!     Err(HttpError::Classified(e)) => match e.kind {
//!         ErrorKind::RateLimited { retry_after } => println!("slow down: {retry_after:?}"),
//!         ErrorKind::ClientError { status } => println!("rejected ({status}): {}", e.message),
//!         _ => println!("failed: {e}"),
//!     },
//!     Err(HttpError::Authentication(e)) => println!("credentials: {e}"),
//!     Err(HttpError::InvalidRequest(e)) => println!("bad request: {e}"),
//!     Err(HttpError::Cancelled) => println!("cancelled"),
//! }
//! ```

use std::fmt;

use thiserror::Error;

use crate::auth::AuthError;

/// Normalized failure category of a single attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The connection could not be established or was dropped.
    Network,
    /// The attempt did not complete within its time budget.
    Timeout,
    /// The backend rejected the request (4xx other than 429).
    ClientError {
        /// HTTP status code.
        status: u16,
    },
    /// The caller is being throttled.
    RateLimited {
        /// Seconds to wait before retrying, when known.
        retry_after: Option<u64>,
    },
    /// The backend failed (5xx).
    ServerError {
        /// HTTP status code.
        status: u16,
    },
    /// A 2xx body did not match the expected shape.
    Decode,
    /// Anything else (unexpected status, request construction failure).
    Unknown,
}

impl ErrorKind {
    /// Returns the HTTP status carried by this kind, if any.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::ClientError { status } | Self::ServerError { status } => Some(*status),
            Self::RateLimited { .. } => Some(429),
            _ => None,
        }
    }

    /// Returns `true` for failures that may resolve on their own.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Network | Self::Timeout | Self::ServerError { .. })
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Network => f.write_str("network error"),
            Self::Timeout => f.write_str("timeout"),
            Self::ClientError { status } => write!(f, "client error ({status})"),
            Self::RateLimited {
                retry_after: Some(secs),
            } => write!(f, "rate limited (retry after {secs}s)"),
            Self::RateLimited { retry_after: None } => f.write_str("rate limited"),
            Self::ServerError { status } => write!(f, "server error ({status})"),
            Self::Decode => f.write_str("decode error"),
            Self::Unknown => f.write_str("unknown error"),
        }
    }
}

/// A failure normalized from a raw transport or HTTP outcome.
///
/// `code`, `message` and `correlation_id` are passed through from the
/// backend's error envelope when one could be parsed.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("{kind}: {message}")]
pub struct ClassifiedError {
    /// The failure category.
    pub kind: ErrorKind,
    /// Machine-readable error code from the backend, if any.
    pub code: Option<String>,
    /// Human-readable message.
    pub message: String,
    /// Backend correlation ID for support requests, if any.
    pub correlation_id: Option<String>,
}

impl ClassifiedError {
    /// Creates an error of the given kind with a message and no envelope data.
    #[must_use]
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            code: None,
            message: message.into(),
            correlation_id: None,
        }
    }

    /// Shorthand for a [`ErrorKind::Network`] error.
    #[must_use]
    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Network, message)
    }

    /// Shorthand for a [`ErrorKind::Timeout`] error.
    #[must_use]
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Timeout, message)
    }

    /// Shorthand for a [`ErrorKind::Decode`] error.
    #[must_use]
    pub fn decode(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Decode, message)
    }

    /// Sets the machine-readable code.
    #[must_use]
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    /// Sets the correlation ID.
    #[must_use]
    pub fn with_correlation_id(mut self, id: impl Into<String>) -> Self {
        self.correlation_id = Some(id.into());
        self
    }

    /// Returns the retry-after hint in seconds for rate-limited errors.
    #[must_use]
    pub const fn retry_after(&self) -> Option<u64> {
        match self.kind {
            ErrorKind::RateLimited { retry_after } => retry_after,
            _ => None,
        }
    }
}

/// Error returned when a request fails validation before it is sent.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InvalidHttpRequestError {
    /// The request path is empty.
    #[error("Request path cannot be empty.")]
    EmptyPath,

    /// The request path is absolute; paths are resolved against the base URL.
    #[error("Request path '{path}' must be relative to the configured base URL.")]
    AbsolutePath {
        /// The offending path.
        path: String,
    },

    /// A POST or PUT request was made without a body.
    #[error("Cannot use {method} without specifying data.")]
    MissingBody {
        /// The HTTP method that requires a body.
        method: String,
    },

    /// The request body could not be serialized to JSON.
    #[error("Request body could not be serialized: {reason}")]
    UnserializableBody {
        /// The serializer's message.
        reason: String,
    },
}

/// Unified error type for the request pipeline.
///
/// The retry controller returns the last [`ClassifiedError`] unchanged; the
/// other variants are terminal on first occurrence.
#[derive(Debug, Error)]
pub enum HttpError {
    /// A classified attempt failure (network, HTTP status, decode).
    #[error(transparent)]
    Classified(#[from] ClassifiedError),

    /// The credential provider could not produce usable headers.
    #[error(transparent)]
    Authentication(#[from] AuthError),

    /// Request validation failed.
    #[error(transparent)]
    InvalidRequest(#[from] InvalidHttpRequestError),

    /// The caller cancelled the logical call.
    #[error("Request cancelled by caller")]
    Cancelled,
}

impl HttpError {
    /// Returns the classified error, if this is one.
    #[must_use]
    pub const fn classified(&self) -> Option<&ClassifiedError> {
        match self {
            Self::Classified(e) => Some(e),
            _ => None,
        }
    }

    /// Returns the failure kind, if this is a classified error.
    #[must_use]
    pub fn kind(&self) -> Option<ErrorKind> {
        self.classified().map(|e| e.kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kind_display() {
        assert_eq!(ErrorKind::Network.to_string(), "network error");
        assert_eq!(
            ErrorKind::ClientError { status: 422 }.to_string(),
            "client error (422)"
        );
        assert_eq!(
            ErrorKind::RateLimited {
                retry_after: Some(5)
            }
            .to_string(),
            "rate limited (retry after 5s)"
        );
        assert_eq!(
            ErrorKind::ServerError { status: 503 }.to_string(),
            "server error (503)"
        );
    }

    #[test]
    fn test_error_kind_status() {
        assert_eq!(ErrorKind::ClientError { status: 404 }.status(), Some(404));
        assert_eq!(ErrorKind::RateLimited { retry_after: None }.status(), Some(429));
        assert_eq!(ErrorKind::Decode.status(), None);
    }

    #[test]
    fn test_transient_kinds() {
        assert!(ErrorKind::Network.is_transient());
        assert!(ErrorKind::Timeout.is_transient());
        assert!(ErrorKind::ServerError { status: 500 }.is_transient());
        assert!(!ErrorKind::ClientError { status: 400 }.is_transient());
        assert!(!ErrorKind::Decode.is_transient());
        assert!(!ErrorKind::RateLimited { retry_after: None }.is_transient());
    }

    #[test]
    fn test_classified_error_message_includes_kind() {
        let error = ClassifiedError::new(ErrorKind::ClientError { status: 422 }, "gtin invalid")
            .with_code("VALIDATION_FAILED")
            .with_correlation_id("corr-1");

        assert_eq!(error.to_string(), "client error (422): gtin invalid");
        assert_eq!(error.code.as_deref(), Some("VALIDATION_FAILED"));
        assert_eq!(error.correlation_id.as_deref(), Some("corr-1"));
    }

    #[test]
    fn test_retry_after_only_for_rate_limited() {
        let limited = ClassifiedError::new(
            ErrorKind::RateLimited {
                retry_after: Some(30),
            },
            "slow down",
        );
        assert_eq!(limited.retry_after(), Some(30));
        assert_eq!(ClassifiedError::network("boom").retry_after(), None);
    }

    #[test]
    fn test_http_error_exposes_kind() {
        let error: HttpError = ClassifiedError::decode("bad json").into();
        assert_eq!(error.kind(), Some(ErrorKind::Decode));
        assert!(HttpError::Cancelled.kind().is_none());
    }

    #[test]
    fn test_invalid_request_messages() {
        let error = InvalidHttpRequestError::MissingBody {
            method: "post".to_string(),
        };
        assert_eq!(error.to_string(), "Cannot use post without specifying data.");
    }
}

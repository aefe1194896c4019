//! Caller-facing error type for [`TraceClient`](crate::TraceClient).

use thiserror::Error;

use crate::clients::{ClassifiedError, ErrorKind, HttpError};
use crate::error::ConfigError;

/// Coarse failure category for caller-side handling.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// The SDK was misconfigured.
    Configuration,
    /// Credentials are missing, invalid, or were rejected (401/403).
    Authentication,
    /// The request was rejected as invalid, locally or by the backend.
    Validation,
    /// A quota or throttle was hit, locally or by the backend.
    RateLimited,
    /// Network failure, timeout, or 5xx that outlasted the retries.
    Transient,
    /// A success response did not match the expected shape.
    Decode,
    /// The caller cancelled the call.
    Cancelled,
    /// Anything else.
    Unknown,
}

/// Errors returned by [`TraceClient`](crate::TraceClient) operations.
///
/// Pipeline failures are wrapped in [`ApiError::Operation`] with the
/// operation name and target; the underlying classification is preserved.
///
/// # Example
///
/// ```rust,ignore
/// use tracechain::{ApiError, ErrorCategory};
///
/// match client.get_product("p-1").await {
///     Ok(product) => println!("{}", product.name),
///     Err(e) if e.category() == ErrorCategory::RateLimited => {
///         println!("throttled, retry after {:?}s", e.retry_after());
///     }
///     Err(e) => println!("{e}"),
/// }
/// ```
#[derive(Debug, Error)]
pub enum ApiError {
    /// Configuration was invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A `gtin:serial` product reference could not be split.
    #[error("Invalid product reference '{reference}'. Expected 'gtin:serial'.")]
    InvalidProductRef {
        /// The rejected reference.
        reference: String,
    },

    /// An identifier argument was empty.
    #[error("Identifier '{name}' cannot be empty.")]
    EmptyIdentifier {
        /// The argument name.
        name: &'static str,
    },

    /// A pipeline call failed.
    #[error("{operation} failed for '{target}': {source}")]
    Operation {
        /// The facade operation, such as `get_product`.
        operation: &'static str,
        /// The entity the operation targeted.
        target: String,
        /// The pipeline error.
        #[source]
        source: HttpError,
    },
}

impl ApiError {
    /// Returns the failure category.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Config(_) => ErrorCategory::Configuration,
            Self::InvalidProductRef { .. } | Self::EmptyIdentifier { .. } => {
                ErrorCategory::Validation
            }
            Self::Operation { source, .. } => categorize(source),
        }
    }

    /// Returns the classified pipeline error, if there is one.
    #[must_use]
    pub const fn classified(&self) -> Option<&ClassifiedError> {
        match self {
            Self::Operation {
                source: HttpError::Classified(e),
                ..
            } => Some(e),
            _ => None,
        }
    }

    /// Returns the retry-after hint in seconds for rate-limited failures.
    #[must_use]
    pub fn retry_after(&self) -> Option<u64> {
        self.classified().and_then(ClassifiedError::retry_after)
    }
}

fn categorize(error: &HttpError) -> ErrorCategory {
    match error {
        HttpError::Authentication(_) => ErrorCategory::Authentication,
        HttpError::InvalidRequest(_) => ErrorCategory::Validation,
        HttpError::Cancelled => ErrorCategory::Cancelled,
        HttpError::Classified(e) => match e.kind {
            ErrorKind::ClientError {
                status: 401 | 403,
            } => ErrorCategory::Authentication,
            ErrorKind::ClientError { .. } => ErrorCategory::Validation,
            ErrorKind::RateLimited { .. } => ErrorCategory::RateLimited,
            ErrorKind::Network | ErrorKind::Timeout | ErrorKind::ServerError { .. } => {
                ErrorCategory::Transient
            }
            ErrorKind::Decode => ErrorCategory::Decode,
            ErrorKind::Unknown => ErrorCategory::Unknown,
        },
    }
}

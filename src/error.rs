//! Error types for SDK configuration.
//!
//! This module contains the error type returned by configuration
//! constructors and builders. Configuration errors are always raised
//! synchronously, before any network call is attempted.
//!
//! # Example
//!
//! ```rust
//! use tracechain::{ApiKey, ConfigError};
//!
//! let result = ApiKey::new("");
//! assert!(matches!(result, Err(ConfigError::EmptyApiKey)));
//! ```

use thiserror::Error;

/// Errors that can occur during SDK configuration.
///
/// Each variant provides a clear, actionable error message.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// API key cannot be empty.
    #[error("API key cannot be empty. Please provide a valid Tracechain API key.")]
    EmptyApiKey,

    /// Base URL is invalid.
    #[error("Invalid base URL '{url}'. Please provide an http or https URL with a host (e.g., 'https://api.example.com/v1').")]
    InvalidBaseUrl {
        /// The invalid URL that was provided.
        url: String,
    },

    /// API version is invalid.
    #[error("Invalid API version '{version}'. Expected a non-empty version such as '1'.")]
    InvalidApiVersion {
        /// The invalid version string that was provided.
        version: String,
    },

    /// A required field is missing.
    #[error("Missing required field: '{field}'. This field must be set before building the configuration.")]
    MissingRequiredField {
        /// The name of the missing field.
        field: &'static str,
    },

    /// Neither an API key nor a bearer token source was configured.
    #[error("No credentials configured. Set an API key, a bearer token source, or both.")]
    MissingCredentials,

    /// A duration setting is out of range.
    #[error("Invalid value for '{field}': {reason}")]
    InvalidDuration {
        /// The name of the offending setting.
        field: &'static str,
        /// Why the value was rejected.
        reason: &'static str,
    },

    /// An environment variable holds an unusable value.
    #[error("Environment variable '{var}' has an invalid value '{value}'.")]
    InvalidEnvVar {
        /// The variable name.
        var: &'static str,
        /// The rejected value.
        value: String,
    },

    /// The underlying HTTP client could not be constructed.
    #[error("Failed to initialize HTTP client: {reason}")]
    HttpClientInit {
        /// The reason reported by the HTTP library.
        reason: String,
    },
}

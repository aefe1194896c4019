//! API version definitions.
//!
//! This module provides the [`ApiVersion`] enum sent on every request in
//! the `X-API-Version` header.

use crate::error::ConfigError;
use std::fmt;
use std::str::FromStr;

/// Tracechain API version.
///
/// The backend negotiates behavior on the `X-API-Version` header. Known
/// versions have dedicated variants; anything else can be sent through
/// [`ApiVersion::Custom`].
///
/// # Example
///
/// ```rust
/// use tracechain::ApiVersion;
///
/// let version = ApiVersion::latest();
/// assert_eq!(version.to_string(), "1");
///
/// let version: ApiVersion = "v1".parse().unwrap();
/// assert_eq!(version, ApiVersion::V1);
///
/// let custom: ApiVersion = "2-beta".parse().unwrap();
/// assert_eq!(custom, ApiVersion::Custom("2-beta".to_string()));
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ApiVersion {
    /// API version 1.
    V1,
    /// Custom version string for future or preview versions.
    Custom(String),
}

impl ApiVersion {
    /// Returns the latest stable API version.
    #[must_use]
    pub const fn latest() -> Self {
        Self::V1
    }

    /// Returns `true` if this is a known stable API version.
    #[must_use]
    pub const fn is_stable(&self) -> bool {
        !matches!(self, Self::Custom(_))
    }

    /// Returns the value sent in the `X-API-Version` header.
    #[must_use]
    pub fn header_value(&self) -> &str {
        match self {
            Self::V1 => "1",
            Self::Custom(v) => v,
        }
    }
}

impl Default for ApiVersion {
    fn default() -> Self {
        Self::latest()
    }
}

impl fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.header_value())
    }
}

impl FromStr for ApiVersion {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() || trimmed.contains(char::is_whitespace) {
            return Err(ConfigError::InvalidApiVersion {
                version: s.to_string(),
            });
        }

        let normalized = trimmed.trim_start_matches(['v', 'V']);
        match normalized {
            "1" | "1.0" => Ok(Self::V1),
            _ => Ok(Self::Custom(trimmed.to_string())),
        }
    }
}

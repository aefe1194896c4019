//! Configuration types for the Tracechain SDK.
//!
//! This module provides the configuration used to construct a
//! [`TraceClient`](crate::TraceClient).
//!
//! # Overview
//!
//! - [`SdkConfig`]: the validated configuration
//! - [`SdkConfigBuilder`]: a builder for [`SdkConfig`]
//! - [`ApiKey`]: a validated API key with masked debug output
//! - [`BaseUrl`]: a validated API base URL
//! - [`ApiVersion`]: the API version sent in `X-API-Version`
//!
//! # Example
//!
//! ```rust
//! use std::time::Duration;
//! use tracechain::{ApiKey, BaseUrl, SdkConfig};
//!
//! let config = SdkConfig::builder()
//!     .base_url(BaseUrl::new("https://api.example.com/v1").unwrap())
//!     .api_key(ApiKey::new("my-api-key").unwrap())
//!     .timeout(Duration::from_secs(10))
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(config.timeout(), Duration::from_secs(10));
//! ```

mod newtypes;
mod version;

pub use newtypes::{ApiKey, BaseUrl};
pub use version::ApiVersion;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::auth::TokenSource;
use crate::clients::RetryPolicy;
use crate::error::ConfigError;
use crate::usage::{MemorySnapshotStore, SnapshotStore};

/// Default per-attempt timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default bound on the total time of one logical call, waits included.
pub const DEFAULT_OVERALL_DEADLINE: Duration = Duration::from_secs(300);

/// Environment variable holding the API base URL.
pub const ENV_BASE_URL: &str = "TRACECHAIN_BASE_URL";
/// Environment variable holding the API key.
pub const ENV_API_KEY: &str = "TRACECHAIN_API_KEY";
/// Environment variable holding the API version.
pub const ENV_API_VERSION: &str = "TRACECHAIN_API_VERSION";
/// Environment variable holding the per-attempt timeout in seconds.
pub const ENV_TIMEOUT_SECS: &str = "TRACECHAIN_TIMEOUT_SECS";

/// Configuration for the Tracechain SDK.
///
/// # Thread Safety
///
/// `SdkConfig` is `Clone`, `Send`, and `Sync`. The token source and
/// snapshot store are shared between clones.
#[derive(Clone)]
pub struct SdkConfig {
    base_url: BaseUrl,
    api_key: Option<ApiKey>,
    token_source: Option<Arc<dyn TokenSource>>,
    api_version: ApiVersion,
    timeout: Duration,
    retry: RetryPolicy,
    overall_deadline: Option<Duration>,
    user_agent_prefix: Option<String>,
    snapshot_store: Arc<dyn SnapshotStore>,
}

impl SdkConfig {
    /// Creates a new builder for constructing an `SdkConfig`.
    #[must_use]
    pub fn builder() -> SdkConfigBuilder {
        SdkConfigBuilder::new()
    }

    /// Builds a configuration from `TRACECHAIN_*` environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a variable is missing or malformed, or if
    /// no credentials are set.
    pub fn from_env() -> Result<Self, ConfigError> {
        SdkConfigBuilder::from_env()?.build()
    }

    /// Returns the API base URL.
    #[must_use]
    pub const fn base_url(&self) -> &BaseUrl {
        &self.base_url
    }

    /// Returns the API key, if configured.
    #[must_use]
    pub const fn api_key(&self) -> Option<&ApiKey> {
        self.api_key.as_ref()
    }

    /// Returns the bearer token source, if configured.
    #[must_use]
    pub fn token_source(&self) -> Option<Arc<dyn TokenSource>> {
        self.token_source.clone()
    }

    /// Returns the API version.
    #[must_use]
    pub const fn api_version(&self) -> &ApiVersion {
        &self.api_version
    }

    /// Returns the per-attempt timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Returns the retry policy.
    #[must_use]
    pub const fn retry(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Returns the overall deadline per logical call, if enabled.
    #[must_use]
    pub const fn overall_deadline(&self) -> Option<Duration> {
        self.overall_deadline
    }

    /// Returns the user agent prefix, if configured.
    #[must_use]
    pub fn user_agent_prefix(&self) -> Option<&str> {
        self.user_agent_prefix.as_deref()
    }

    /// Returns the usage snapshot store.
    #[must_use]
    pub fn snapshot_store(&self) -> Arc<dyn SnapshotStore> {
        Arc::clone(&self.snapshot_store)
    }
}

impl fmt::Debug for SdkConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SdkConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key)
            .field("token_source", &self.token_source.as_ref().map(|_| "*****"))
            .field("api_version", &self.api_version)
            .field("timeout", &self.timeout)
            .field("retry", &self.retry)
            .field("overall_deadline", &self.overall_deadline)
            .field("user_agent_prefix", &self.user_agent_prefix)
            .finish_non_exhaustive()
    }
}

// Verify SdkConfig is Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<SdkConfig>();
};

/// Builder for constructing [`SdkConfig`] instances.
///
/// `base_url` is required, as is at least one of `api_key` and
/// `token_source`.
///
/// # Defaults
///
/// - `api_version`: Latest stable version
/// - `timeout`: 30 seconds per attempt
/// - `retry`: [`RetryPolicy::default`] (3 retries, 1 second base delay)
/// - `overall_deadline`: 300 seconds
/// - `user_agent_prefix`: `None`
/// - `snapshot_store`: [`MemorySnapshotStore`]
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use tracechain::{ApiVersion, BaseUrl, SdkConfig};
/// use tracechain::auth::StaticToken;
/// use tracechain::clients::RetryPolicy;
///
/// let config = SdkConfig::builder()
///     .base_url(BaseUrl::new("https://api.example.com").unwrap())
///     .token_source(StaticToken::new("token"))
///     .api_version(ApiVersion::V1)
///     .retry(RetryPolicy { max_retries: 5, ..RetryPolicy::default() })
///     .overall_deadline(None)
///     .user_agent_prefix("MyApp/1.0")
///     .build()
///     .unwrap();
///
/// assert_eq!(config.retry().max_retries, 5);
/// assert!(config.overall_deadline().is_none());
/// ```
#[derive(Default)]
pub struct SdkConfigBuilder {
    base_url: Option<BaseUrl>,
    api_key: Option<ApiKey>,
    token_source: Option<Arc<dyn TokenSource>>,
    api_version: Option<ApiVersion>,
    timeout: Option<Duration>,
    retry: Option<RetryPolicy>,
    overall_deadline: Option<Option<Duration>>,
    user_agent_prefix: Option<String>,
    snapshot_store: Option<Arc<dyn SnapshotStore>>,
}

impl SdkConfigBuilder {
    /// Creates a new builder with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a builder seeded from `TRACECHAIN_*` environment variables.
    ///
    /// Reads `TRACECHAIN_BASE_URL` (required), `TRACECHAIN_API_KEY`,
    /// `TRACECHAIN_API_VERSION` and `TRACECHAIN_TIMEOUT_SECS`. Further
    /// settings, such as a token source, can be chained before `build`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a variable is missing or malformed.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let base_url = lookup(ENV_BASE_URL).ok_or(ConfigError::MissingRequiredField {
            field: ENV_BASE_URL,
        })?;
        let mut builder = Self::new().base_url(BaseUrl::new(base_url)?);

        if let Some(key) = lookup(ENV_API_KEY).filter(|k| !k.trim().is_empty()) {
            builder = builder.api_key(ApiKey::new(key)?);
        }

        if let Some(version) = lookup(ENV_API_VERSION) {
            builder = builder.api_version(version.parse()?);
        }

        if let Some(raw) = lookup(ENV_TIMEOUT_SECS) {
            let secs = raw
                .trim()
                .parse::<u64>()
                .map_err(|_| ConfigError::InvalidEnvVar {
                    var: ENV_TIMEOUT_SECS,
                    value: raw.clone(),
                })?;
            builder = builder.timeout(Duration::from_secs(secs));
        }

        Ok(builder)
    }

    /// Sets the API base URL (required).
    #[must_use]
    pub fn base_url(mut self, url: BaseUrl) -> Self {
        self.base_url = Some(url);
        self
    }

    /// Sets the API key sent in `X-API-Key`.
    #[must_use]
    pub fn api_key(mut self, key: ApiKey) -> Self {
        self.api_key = Some(key);
        self
    }

    /// Sets the source of bearer tokens sent in `Authorization`.
    ///
    /// The source is called once per attempt.
    #[must_use]
    pub fn token_source(mut self, source: impl TokenSource + 'static) -> Self {
        self.token_source = Some(Arc::new(source));
        self
    }

    /// Sets the API version.
    #[must_use]
    pub fn api_version(mut self, version: ApiVersion) -> Self {
        self.api_version = Some(version);
        self
    }

    /// Sets the per-attempt timeout.
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets the retry policy.
    #[must_use]
    pub fn retry(mut self, policy: RetryPolicy) -> Self {
        self.retry = Some(policy);
        self
    }

    /// Sets the overall deadline per logical call; `None` disables it.
    #[must_use]
    pub const fn overall_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.overall_deadline = Some(deadline);
        self
    }

    /// Sets the user agent prefix for HTTP requests.
    #[must_use]
    pub fn user_agent_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.user_agent_prefix = Some(prefix.into());
        self
    }

    /// Sets where the usage snapshot is persisted.
    #[must_use]
    pub fn snapshot_store(mut self, store: impl SnapshotStore + 'static) -> Self {
        self.snapshot_store = Some(Arc::new(store));
        self
    }

    /// Builds the [`SdkConfig`], validating the settings.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingRequiredField`] if `base_url` is not
    /// set, [`ConfigError::MissingCredentials`] if neither an API key nor a
    /// token source is set, and [`ConfigError::InvalidDuration`] for a zero
    /// timeout or deadline.
    pub fn build(self) -> Result<SdkConfig, ConfigError> {
        let base_url = self
            .base_url
            .ok_or(ConfigError::MissingRequiredField { field: "base_url" })?;

        if self.api_key.is_none() && self.token_source.is_none() {
            return Err(ConfigError::MissingCredentials);
        }

        let timeout = self.timeout.unwrap_or(DEFAULT_TIMEOUT);
        if timeout.is_zero() {
            return Err(ConfigError::InvalidDuration {
                field: "timeout",
                reason: "must be greater than zero",
            });
        }

        let overall_deadline = self
            .overall_deadline
            .unwrap_or(Some(DEFAULT_OVERALL_DEADLINE));
        if overall_deadline.is_some_and(|d| d.is_zero()) {
            return Err(ConfigError::InvalidDuration {
                field: "overall_deadline",
                reason: "must be greater than zero; use None to disable",
            });
        }

        Ok(SdkConfig {
            base_url,
            api_key: self.api_key,
            token_source: self.token_source,
            api_version: self.api_version.unwrap_or_else(ApiVersion::latest),
            timeout,
            retry: self.retry.unwrap_or_default(),
            overall_deadline,
            user_agent_prefix: self.user_agent_prefix,
            snapshot_store: self
                .snapshot_store
                .unwrap_or_else(|| Arc::new(MemorySnapshotStore::new())),
        })
    }
}

impl fmt::Debug for SdkConfigBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SdkConfigBuilder")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key)
            .field("api_version", &self.api_version)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

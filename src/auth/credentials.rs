//! Credential provider for outgoing requests.
//!
//! [`CredentialProvider`] produces the authentication headers for a single
//! attempt: the static API key under `X-API-Key` and, when a
//! [`TokenSource`] is configured, a freshly fetched bearer token under
//! `Authorization`. Tokens are never cached here; the token source owns
//! token lifetime.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::ApiKey;

/// Header carrying the static API key.
pub const API_KEY_HEADER: &str = "X-API-Key";

/// Header carrying the bearer token.
pub const AUTHORIZATION_HEADER: &str = "Authorization";

/// Errors raised while producing credentials.
///
/// These are never retried by the pipeline.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// The token source failed to produce a token.
    #[error("Bearer token source failed: {reason}")]
    TokenUnavailable {
        /// The reason reported by the token source.
        reason: String,
    },

    /// The token source returned an empty token.
    #[error("Bearer token source returned an empty token")]
    EmptyToken,

    /// The token contains characters that cannot be sent in a header.
    #[error("Bearer token contains characters not allowed in an HTTP header")]
    InvalidToken,
}

impl AuthError {
    /// Creates a [`AuthError::TokenUnavailable`] error.
    #[must_use]
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::TokenUnavailable {
            reason: reason.into(),
        }
    }
}

/// An asynchronous source of bearer tokens.
///
/// Implemented for any `Fn() -> impl Future<Output = Result<String, AuthError>>`
/// closure, so most callers never implement it by hand.
///
/// # Example
///
/// ```rust
/// use tracechain::auth::{AuthError, TokenSource};
///
/// async fn fetch_token() -> Result<String, AuthError> {
///     Ok("token-from-identity-provider".to_string())
/// }
///
/// fn assert_source<T: TokenSource>(_: &T) {}
/// assert_source(&fetch_token);
/// ```
#[async_trait]
pub trait TokenSource: Send + Sync {
    /// Returns a currently valid bearer token.
    async fn token(&self) -> Result<String, AuthError>;
}

#[async_trait]
impl<F, Fut> TokenSource for F
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<String, AuthError>> + Send,
{
    async fn token(&self) -> Result<String, AuthError> {
        (self)().await
    }
}

/// A fixed bearer token.
///
/// The `Debug` implementation masks the value.
#[derive(Clone)]
pub struct StaticToken(String);

impl StaticToken {
    /// Wraps a fixed token.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

impl fmt::Debug for StaticToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("StaticToken(*****)")
    }
}

#[async_trait]
impl TokenSource for StaticToken {
    async fn token(&self) -> Result<String, AuthError> {
        Ok(self.0.clone())
    }
}

/// Produces the authentication headers for each outgoing attempt.
#[derive(Clone, Default)]
pub struct CredentialProvider {
    api_key: Option<ApiKey>,
    token_source: Option<Arc<dyn TokenSource>>,
}

impl CredentialProvider {
    /// Creates a provider from an optional API key and optional token source.
    #[must_use]
    pub fn new(api_key: Option<ApiKey>, token_source: Option<Arc<dyn TokenSource>>) -> Self {
        Self {
            api_key,
            token_source,
        }
    }

    /// Returns `true` if at least one credential is configured.
    #[must_use]
    pub const fn is_configured(&self) -> bool {
        self.api_key.is_some() || self.token_source.is_some()
    }

    /// Returns the header set for one attempt.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError`] if the token source fails or yields an empty or
    /// non-header-safe token.
    pub async fn headers(&self) -> Result<HashMap<String, String>, AuthError> {
        let mut headers = HashMap::new();

        if let Some(key) = &self.api_key {
            headers.insert(API_KEY_HEADER.to_string(), key.as_ref().to_string());
        }

        if let Some(source) = &self.token_source {
            let token = source.token().await?;
            let token = token.trim();
            if token.is_empty() {
                return Err(AuthError::EmptyToken);
            }
            if !token.bytes().all(|b| b.is_ascii_graphic()) {
                return Err(AuthError::InvalidToken);
            }
            headers.insert(AUTHORIZATION_HEADER.to_string(), format!("Bearer {token}"));
        }

        Ok(headers)
    }
}

impl fmt::Debug for CredentialProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialProvider")
            .field("api_key", &self.api_key)
            .field("token_source", &self.token_source.as_ref().map(|_| "*****"))
            .finish()
    }
}

// Verify CredentialProvider is Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<CredentialProvider>();
};

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn test_api_key_only() {
        let provider = CredentialProvider::new(Some(ApiKey::new("key-1").unwrap()), None);
        let headers = provider.headers().await.unwrap();

        assert_eq!(headers.get(API_KEY_HEADER), Some(&"key-1".to_string()));
        assert!(!headers.contains_key(AUTHORIZATION_HEADER));
    }

    #[tokio::test]
    async fn test_bearer_and_api_key_together() {
        let provider = CredentialProvider::new(
            Some(ApiKey::new("key-1").unwrap()),
            Some(Arc::new(StaticToken::new("tok-1"))),
        );
        let headers = provider.headers().await.unwrap();

        assert_eq!(headers.get(API_KEY_HEADER), Some(&"key-1".to_string()));
        assert_eq!(
            headers.get(AUTHORIZATION_HEADER),
            Some(&"Bearer tok-1".to_string())
        );
    }

    #[tokio::test]
    async fn test_token_fetched_fresh_on_every_call() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);
        let source = move || {
            let counter = Arc::clone(&counter);
            async move {
                let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
                Ok::<_, AuthError>(format!("tok-{n}"))
            }
        };
        let provider = CredentialProvider::new(None, Some(Arc::new(source)));

        let first = provider.headers().await.unwrap();
        let second = provider.headers().await.unwrap();

        assert_eq!(first.get(AUTHORIZATION_HEADER).unwrap(), "Bearer tok-1");
        assert_eq!(second.get(AUTHORIZATION_HEADER).unwrap(), "Bearer tok-2");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failing_source_surfaces_auth_error() {
        let source = || async { Err::<String, _>(AuthError::unavailable("idp down")) };
        let provider = CredentialProvider::new(None, Some(Arc::new(source)));

        let err = provider.headers().await.unwrap_err();
        assert_eq!(err, AuthError::unavailable("idp down"));
    }

    #[tokio::test]
    async fn test_empty_and_invalid_tokens_are_rejected() {
        let provider = CredentialProvider::new(None, Some(Arc::new(StaticToken::new("  "))));
        assert_eq!(provider.headers().await.unwrap_err(), AuthError::EmptyToken);

        let provider =
            CredentialProvider::new(None, Some(Arc::new(StaticToken::new("bad\ntoken"))));
        assert_eq!(provider.headers().await.unwrap_err(), AuthError::InvalidToken);
    }

    #[test]
    fn test_debug_masks_secrets() {
        let provider = CredentialProvider::new(
            Some(ApiKey::new("secret-key").unwrap()),
            Some(Arc::new(StaticToken::new("secret-token"))),
        );
        let debug = format!("{provider:?}");
        assert!(!debug.contains("secret-key"));
        assert!(!debug.contains("secret-token"));
    }
}

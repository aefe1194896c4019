//! Authentication for the Tracechain SDK.
//!
//! Requests authenticate with a static API key, a bearer token from a
//! [`TokenSource`], or both. The [`CredentialProvider`] turns the
//! configured credentials into headers once per attempt, so a token that
//! rotates between retries is picked up without any caching here.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use tracechain::auth::{CredentialProvider, StaticToken};
//! use tracechain::ApiKey;
//!
//! let provider = CredentialProvider::new(
//!     Some(ApiKey::new("my-api-key").unwrap()),
//!     Some(Arc::new(StaticToken::new("my-token"))),
//! );
//! assert!(provider.is_configured());
//! ```

mod credentials;

pub use credentials::{
    AuthError, CredentialProvider, StaticToken, TokenSource, API_KEY_HEADER,
    AUTHORIZATION_HEADER,
};

//! HTTP request types for the Tracechain SDK.
//!
//! This module provides the [`HttpRequest`] descriptor and its builder. A
//! descriptor is built once per logical call and reused, unchanged, for
//! every retry attempt of that call.

use std::collections::HashMap;
use std::fmt;

use chrono::Utc;
use rand::distributions::Alphanumeric;
use rand::Rng;

use crate::clients::errors::InvalidHttpRequestError;

/// Length of the random suffix appended to generated idempotency keys.
const IDEMPOTENCY_SUFFIX_LEN: usize = 16;

/// HTTP methods supported by the Tracechain API.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HttpMethod {
    /// HTTP GET method for retrieving resources.
    Get,
    /// HTTP POST method for creating resources.
    Post,
    /// HTTP PUT method for updating resources.
    Put,
    /// HTTP DELETE method for removing resources.
    Delete,
}

impl HttpMethod {
    /// Returns the upper-case method name used on the wire.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A caller-generated token letting the backend deduplicate retried writes.
///
/// Generated keys have the form `<unix-millis>-<16 alphanumeric chars>`.
///
/// # Example
///
/// ```rust
/// use tracechain::clients::IdempotencyKey;
///
/// let a = IdempotencyKey::generate();
/// let b = IdempotencyKey::generate();
/// assert_ne!(a, b);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct IdempotencyKey(String);

impl IdempotencyKey {
    /// Generates a fresh key from the current timestamp and a random suffix.
    #[must_use]
    pub fn generate() -> Self {
        let suffix: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(IDEMPOTENCY_SUFFIX_LEN)
            .map(char::from)
            .collect();
        Self(format!("{}-{suffix}", Utc::now().timestamp_millis()))
    }

    /// Wraps a caller-supplied key.
    #[must_use]
    pub fn from_raw(key: impl Into<String>) -> Self {
        Self(key.into())
    }
}

impl AsRef<str> for IdempotencyKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IdempotencyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A request to be sent to the Tracechain API.
///
/// Use [`HttpRequest::builder`] to construct requests with the builder pattern.
/// A request carrying an [`IdempotencyKey`] is idempotent: the key is sent in
/// the `Idempotency-Key` header on every attempt.
///
/// # Example
///
/// ```rust
/// use tracechain::clients::{HttpRequest, HttpMethod};
/// use serde_json::json;
///
/// let get_request = HttpRequest::builder(HttpMethod::Get, "products/42")
///     .build()
///     .unwrap();
/// assert!(!get_request.is_idempotent());
///
/// let post_request = HttpRequest::builder(HttpMethod::Post, "products")
///     .body(json!({"name": "Jacket"}))
///     .idempotent()
///     .build()
///     .unwrap();
/// assert!(post_request.is_idempotent());
/// ```
#[derive(Clone, Debug)]
pub struct HttpRequest {
    /// The HTTP method for this request.
    pub http_method: HttpMethod,
    /// The path (relative to the base URL) for this request.
    pub path: String,
    /// The JSON request body, if any.
    pub body: Option<serde_json::Value>,
    /// Query parameters to append to the URL.
    pub query: Option<HashMap<String, String>>,
    /// Additional headers to include in the request.
    pub extra_headers: Option<HashMap<String, String>>,
    /// Deduplication key, fixed for the lifetime of the logical call.
    pub idempotency_key: Option<IdempotencyKey>,
}

impl HttpRequest {
    /// Creates a new builder for constructing an `HttpRequest`.
    #[must_use]
    pub fn builder(method: HttpMethod, path: impl Into<String>) -> HttpRequestBuilder {
        HttpRequestBuilder::new(method, path)
    }

    /// Returns `true` if this request carries an idempotency key.
    #[must_use]
    pub const fn is_idempotent(&self) -> bool {
        self.idempotency_key.is_some()
    }

    /// Validates the request, ensuring it meets all requirements.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidHttpRequestError`] if:
    /// - `path` is empty or absolute
    /// - `http_method` is `Post` or `Put` but `body` is `None`
    pub fn verify(&self) -> Result<(), InvalidHttpRequestError> {
        let trimmed = self.path.trim_matches('/');
        if trimmed.is_empty() {
            return Err(InvalidHttpRequestError::EmptyPath);
        }
        if self.path.contains("://") {
            return Err(InvalidHttpRequestError::AbsolutePath {
                path: self.path.clone(),
            });
        }

        if matches!(self.http_method, HttpMethod::Post | HttpMethod::Put) && self.body.is_none() {
            return Err(InvalidHttpRequestError::MissingBody {
                method: self.http_method.as_str().to_lowercase(),
            });
        }

        Ok(())
    }
}

/// Builder for constructing [`HttpRequest`] instances.
#[derive(Debug)]
pub struct HttpRequestBuilder {
    http_method: HttpMethod,
    path: String,
    body: Option<serde_json::Value>,
    query: Option<HashMap<String, String>>,
    extra_headers: Option<HashMap<String, String>>,
    idempotency_key: Option<IdempotencyKey>,
}

impl HttpRequestBuilder {
    fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            http_method: method,
            path: path.into(),
            body: None,
            query: None,
            extra_headers: None,
            idempotency_key: None,
        }
    }

    /// Sets the JSON request body.
    #[must_use]
    pub fn body(mut self, body: impl Into<serde_json::Value>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Serializes `value` as the JSON request body.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidHttpRequestError::UnserializableBody`] if `value`
    /// cannot be represented as JSON.
    pub fn json_body<T: serde::Serialize>(
        mut self,
        value: &T,
    ) -> Result<Self, InvalidHttpRequestError> {
        let body = serde_json::to_value(value).map_err(|e| {
            InvalidHttpRequestError::UnserializableBody {
                reason: e.to_string(),
            }
        })?;
        self.body = Some(body);
        Ok(self)
    }

    /// Adds a single query parameter.
    #[must_use]
    pub fn query_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query
            .get_or_insert_with(HashMap::new)
            .insert(key.into(), value.into());
        self
    }

    /// Adds a single extra header.
    #[must_use]
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_headers
            .get_or_insert_with(HashMap::new)
            .insert(key.into(), value.into());
        self
    }

    /// Marks the request idempotent, generating its key now.
    ///
    /// Calling this more than once keeps the first key.
    #[must_use]
    pub fn idempotent(mut self) -> Self {
        if self.idempotency_key.is_none() {
            self.idempotency_key = Some(IdempotencyKey::generate());
        }
        self
    }

    /// Marks the request idempotent with a caller-supplied key.
    #[must_use]
    pub fn idempotency_key(mut self, key: IdempotencyKey) -> Self {
        self.idempotency_key = Some(key);
        self
    }

    /// Builds the [`HttpRequest`], validating it in the process.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidHttpRequestError`] if the request fails validation.
    pub fn build(self) -> Result<HttpRequest, InvalidHttpRequestError> {
        let request = HttpRequest {
            http_method: self.http_method,
            path: self.path,
            body: self.body,
            query: self.query,
            extra_headers: self.extra_headers,
            idempotency_key: self.idempotency_key,
        };
        request.verify()?;
        Ok(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_http_method_display() {
        assert_eq!(HttpMethod::Get.to_string(), "GET");
        assert_eq!(HttpMethod::Post.to_string(), "POST");
        assert_eq!(HttpMethod::Put.to_string(), "PUT");
        assert_eq!(HttpMethod::Delete.to_string(), "DELETE");
    }

    #[test]
    fn test_builder_creates_valid_get_request() {
        let request = HttpRequest::builder(HttpMethod::Get, "products/1")
            .build()
            .unwrap();

        assert_eq!(request.http_method, HttpMethod::Get);
        assert_eq!(request.path, "products/1");
        assert!(request.body.is_none());
        assert!(!request.is_idempotent());
    }

    #[test]
    fn test_verify_requires_body_for_post() {
        let result = HttpRequest::builder(HttpMethod::Post, "products").build();

        assert!(matches!(
            result,
            Err(InvalidHttpRequestError::MissingBody { method }) if method == "post"
        ));
    }

    #[test]
    fn test_verify_rejects_empty_and_absolute_paths() {
        assert!(matches!(
            HttpRequest::builder(HttpMethod::Get, "/").build(),
            Err(InvalidHttpRequestError::EmptyPath)
        ));
        assert!(matches!(
            HttpRequest::builder(HttpMethod::Get, "https://evil.example.com/x").build(),
            Err(InvalidHttpRequestError::AbsolutePath { .. })
        ));
    }

    #[test]
    fn test_idempotent_generates_key_once() {
        let request = HttpRequest::builder(HttpMethod::Post, "products")
            .body(json!({"name": "x"}))
            .idempotent()
            .build()
            .unwrap();

        let key = request.idempotency_key.clone().unwrap();
        let cloned = request.clone();
        assert_eq!(cloned.idempotency_key, Some(key));
    }

    #[test]
    fn test_idempotent_called_twice_keeps_first_key() {
        let explicit = IdempotencyKey::from_raw("fixed-key");
        let request = HttpRequest::builder(HttpMethod::Post, "products")
            .body(json!({}))
            .idempotency_key(explicit.clone())
            .idempotent()
            .build()
            .unwrap();

        assert_eq!(request.idempotency_key, Some(explicit));
    }

    #[test]
    fn test_generated_keys_are_distinct_and_well_formed() {
        let a = IdempotencyKey::generate();
        let b = IdempotencyKey::generate();
        assert_ne!(a, b);

        let (millis, suffix) = a.as_ref().split_once('-').unwrap();
        assert!(millis.parse::<i64>().is_ok());
        assert_eq!(suffix.len(), IDEMPOTENCY_SUFFIX_LEN);
        assert!(suffix.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_json_body_serializes_value() {
        #[derive(serde::Serialize)]
        struct Payload {
            name: &'static str,
        }

        let request = HttpRequest::builder(HttpMethod::Post, "products")
            .json_body(&Payload { name: "Jacket" })
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(request.body, Some(json!({"name": "Jacket"})));

        let mut bad = HashMap::new();
        bad.insert(vec![1u8], 1);
        let result = HttpRequest::builder(HttpMethod::Post, "products").json_body(&bad);
        assert!(matches!(
            result,
            Err(InvalidHttpRequestError::UnserializableBody { .. })
        ));
    }

    #[test]
    fn test_builder_with_query_params_and_headers() {
        let request = HttpRequest::builder(HttpMethod::Get, "products")
            .query_param("limit", "50")
            .header("X-Trace", "abc")
            .build()
            .unwrap();

        assert_eq!(
            request.query.unwrap().get("limit"),
            Some(&"50".to_string())
        );
        assert_eq!(
            request.extra_headers.unwrap().get("X-Trace"),
            Some(&"abc".to_string())
        );
    }
}

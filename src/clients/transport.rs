//! Request transport: one network exchange per call to [`Transport::send`].
//!
//! The transport attaches standard and per-call headers, performs the
//! exchange, and classifies the outcome. It never retries and never
//! decodes a successful body into a caller type; both happen in
//! [`HttpClient`](crate::clients::HttpClient).

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;

use crate::clients::errors::{ClassifiedError, ErrorKind};
use crate::clients::http_request::{HttpMethod, HttpRequest};
use crate::clients::http_response::HttpResponse;
use crate::config::{ApiVersion, BaseUrl, SdkConfig};
use crate::error::ConfigError;

/// SDK version from Cargo.toml.
pub const SDK_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Header carrying the API version.
pub const API_VERSION_HEADER: &str = "X-API-Version";

/// Header carrying the idempotency key.
pub const IDEMPOTENCY_KEY_HEADER: &str = "Idempotency-Key";

/// Performs a single exchange with the Tracechain API.
///
/// Implementations must not retry. Tests substitute scripted transports
/// through [`TraceClient::with_transport`](crate::TraceClient::with_transport).
#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends `request` with the given authentication headers.
    ///
    /// # Errors
    ///
    /// Returns a [`ClassifiedError`] for transport failures and for any
    /// non-2xx response.
    async fn send(
        &self,
        request: &HttpRequest,
        auth_headers: &HashMap<String, String>,
    ) -> Result<HttpResponse, ClassifiedError>;
}

/// [`Transport`] backed by a `reqwest` client with rustls.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
    base_url: BaseUrl,
    default_headers: HashMap<String, String>,
}

// Verify ReqwestTransport is Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<ReqwestTransport>();
};

impl ReqwestTransport {
    /// Creates a transport for `base_url`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::HttpClientInit`] if the underlying client
    /// cannot be built (for example, TLS initialization failure).
    pub fn new(
        base_url: BaseUrl,
        api_version: &ApiVersion,
        user_agent_prefix: Option<&str>,
        timeout: Duration,
    ) -> Result<Self, ConfigError> {
        let user_agent_prefix = user_agent_prefix.map_or(String::new(), |p| format!("{p} | "));
        let rust_version = env!("CARGO_PKG_RUST_VERSION");
        let user_agent =
            format!("{user_agent_prefix}Tracechain SDK v{SDK_VERSION} | Rust {rust_version}");

        let mut default_headers = HashMap::new();
        default_headers.insert("User-Agent".to_string(), user_agent);
        default_headers.insert("Accept".to_string(), "application/json".to_string());
        default_headers.insert("Content-Type".to_string(), "application/json".to_string());
        default_headers.insert(
            API_VERSION_HEADER.to_string(),
            api_version.header_value().to_string(),
        );

        let client = reqwest::Client::builder()
            .use_rustls_tls()
            .timeout(timeout)
            .build()
            .map_err(|e| ConfigError::HttpClientInit {
                reason: e.to_string(),
            })?;

        Ok(Self {
            client,
            base_url,
            default_headers,
        })
    }

    /// Creates a transport from an [`SdkConfig`].
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::HttpClientInit`] if the client cannot be built.
    pub fn from_config(config: &SdkConfig) -> Result<Self, ConfigError> {
        Self::new(
            config.base_url().clone(),
            config.api_version(),
            config.user_agent_prefix(),
            config.timeout(),
        )
    }

    /// Returns the base URL requests are resolved against.
    #[must_use]
    pub const fn base_url(&self) -> &BaseUrl {
        &self.base_url
    }

    /// Returns the headers attached to every request.
    #[must_use]
    pub const fn default_headers(&self) -> &HashMap<String, String> {
        &self.default_headers
    }

    fn merged_headers(
        &self,
        request: &HttpRequest,
        auth_headers: &HashMap<String, String>,
    ) -> HashMap<String, String> {
        let mut headers = self.default_headers.clone();
        if let Some(extra) = &request.extra_headers {
            for (key, value) in extra {
                headers.insert(key.clone(), value.clone());
            }
        }
        for (key, value) in auth_headers {
            headers.insert(key.clone(), value.clone());
        }
        if let Some(key) = &request.idempotency_key {
            headers.insert(IDEMPOTENCY_KEY_HEADER.to_string(), key.to_string());
        }
        headers
    }

    /// Parses response headers into a `HashMap`.
    fn parse_response_headers(
        headers: &reqwest::header::HeaderMap,
    ) -> HashMap<String, Vec<String>> {
        let mut result: HashMap<String, Vec<String>> = HashMap::new();
        for (name, value) in headers {
            let key = name.as_str().to_lowercase();
            let value = value.to_str().unwrap_or_default().to_string();
            result.entry(key).or_default().push(value);
        }
        result
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(
        &self,
        request: &HttpRequest,
        auth_headers: &HashMap<String, String>,
    ) -> Result<HttpResponse, ClassifiedError> {
        let url = self.base_url.join(&request.path);

        let mut req_builder = match request.http_method {
            HttpMethod::Get => self.client.get(&url),
            HttpMethod::Post => self.client.post(&url),
            HttpMethod::Put => self.client.put(&url),
            HttpMethod::Delete => self.client.delete(&url),
        };

        for (key, value) in self.merged_headers(request, auth_headers) {
            req_builder = req_builder.header(key, value);
        }

        if let Some(query) = &request.query {
            req_builder = req_builder.query(query);
        }

        if let Some(body) = &request.body {
            req_builder = req_builder.body(body.to_string());
        }

        tracing::debug!(
            method = %request.http_method,
            path = %request.path,
            idempotency_key = request.idempotency_key.as_ref().map(AsRef::<str>::as_ref),
            "sending request"
        );

        let res = req_builder.send().await.map_err(classify_reqwest_error)?;

        let code = res.status().as_u16();
        let headers = Self::parse_response_headers(res.headers());
        let body = res.text().await.map_err(classify_reqwest_error)?;

        tracing::debug!(status = code, path = %request.path, "received response");

        HttpResponse::new(code, headers, body).into_result()
    }
}

/// Maps a `reqwest` failure onto an [`ErrorKind`].
fn classify_reqwest_error(error: reqwest::Error) -> ClassifiedError {
    let kind = if error.is_timeout() {
        ErrorKind::Timeout
    } else if error.is_builder() {
        ErrorKind::Unknown
    } else {
        ErrorKind::Network
    };
    ClassifiedError::new(kind, error.to_string())
}

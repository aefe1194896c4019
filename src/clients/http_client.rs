//! Request pipeline composition.
//!
//! [`HttpClient`] wires the pipeline stages together for one logical call:
//!
//! 1. validate the [`HttpRequest`]
//! 2. consult the local [`UsageGate`] (once, before any attempt)
//! 3. inside the [`RetryController`] loop, per attempt: fetch credential
//!    headers, send through the [`Transport`], decode a 2xx body
//!
//! Decoding happens inside the attempt so a malformed success body is
//! classified as `Decode` by the same state machine as every other failure.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;

use crate::auth::CredentialProvider;
use crate::clients::errors::{ClassifiedError, HttpError};
use crate::clients::http_request::HttpRequest;
use crate::clients::http_response::{excerpt, HttpResponse, CORRELATION_ID_HEADER};
use crate::clients::retry::RetryController;
use crate::clients::transport::Transport;
use crate::usage::{Admission, UsageGate};

/// Maximum characters of a response body included in decode diagnostics.
const DECODE_EXCERPT_LEN: usize = 200;

/// The resilient request pipeline.
///
/// # Thread Safety
///
/// `HttpClient` is `Send + Sync`. Concurrent calls share only the
/// read-mostly usage gate and the credential configuration.
#[derive(Clone)]
pub struct HttpClient {
    transport: Arc<dyn Transport>,
    credentials: CredentialProvider,
    gate: Arc<UsageGate>,
    controller: RetryController,
}

// Verify HttpClient is Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<HttpClient>();
};

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("credentials", &self.credentials)
            .field("gate", &self.gate)
            .field("controller", &self.controller)
            .finish_non_exhaustive()
    }
}

impl HttpClient {
    /// Assembles a pipeline from its stages.
    #[must_use]
    pub fn new(
        transport: Arc<dyn Transport>,
        credentials: CredentialProvider,
        gate: Arc<UsageGate>,
        controller: RetryController,
    ) -> Self {
        Self {
            transport,
            credentials,
            gate,
            controller,
        }
    }

    /// Returns the usage gate consulted before each call.
    #[must_use]
    pub const fn gate(&self) -> &Arc<UsageGate> {
        &self.gate
    }

    /// Returns the retry controller.
    #[must_use]
    pub const fn controller(&self) -> &RetryController {
        &self.controller
    }

    /// Runs `request` through the pipeline and returns the raw 2xx response.
    ///
    /// # Errors
    ///
    /// Returns [`HttpError`] if validation fails, the usage gate rejects the
    /// call, credentials cannot be produced, `cancel` fires, or the final
    /// attempt fails.
    pub async fn request(
        &self,
        request: &HttpRequest,
        admission: Admission,
        cancel: &CancellationToken,
    ) -> Result<HttpResponse, HttpError> {
        self.execute(request, admission, cancel, Ok).await
    }

    /// Runs `request` through the pipeline and decodes the 2xx body as `T`.
    ///
    /// A body that does not match `T` is a `Decode` failure, which is
    /// terminal.
    ///
    /// # Errors
    ///
    /// Same as [`HttpClient::request`], plus `Decode`.
    pub async fn request_json<T: DeserializeOwned>(
        &self,
        request: &HttpRequest,
        admission: Admission,
        cancel: &CancellationToken,
    ) -> Result<T, HttpError> {
        self.execute(request, admission, cancel, |response| {
            decode_body(&request.path, &response)
        })
        .await
    }

    async fn execute<T, D>(
        &self,
        request: &HttpRequest,
        admission: Admission,
        cancel: &CancellationToken,
        decode: D,
    ) -> Result<T, HttpError>
    where
        D: Fn(HttpResponse) -> Result<T, ClassifiedError> + Sync,
    {
        request.verify()?;
        self.gate.check_admission(admission)?;

        let decode = &decode;
        self.controller
            .execute(cancel, move |attempt| async move {
                let headers = self.credentials.headers().await?;
                tracing::debug!(
                    attempt,
                    method = %request.http_method,
                    path = %request.path,
                    "dispatching attempt"
                );
                let response = self.transport.send(request, &headers).await?;
                Ok::<T, HttpError>(decode(response)?)
            })
            .await
    }
}

/// Decodes a successful response body.
fn decode_body<T: DeserializeOwned>(
    path: &str,
    response: &HttpResponse,
) -> Result<T, ClassifiedError> {
    serde_json::from_str(&response.body).map_err(|e| {
        let body = excerpt(&response.body, DECODE_EXCERPT_LEN);
        tracing::warn!(
            path,
            status = response.code,
            "response body did not match the expected shape: {e}; body: {body}"
        );
        let error =
            ClassifiedError::decode(format!("failed to decode response from '{path}': {e}"));
        match response.header(CORRELATION_ID_HEADER) {
            Some(id) => error.with_correlation_id(id),
            None => error,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::errors::ErrorKind;
    use std::collections::HashMap;

    #[derive(Debug, serde::Deserialize, PartialEq)]
    struct Item {
        id: String,
    }

    #[test]
    fn test_decode_body_success() {
        let response = HttpResponse::new(200, HashMap::new(), r#"{"id":"p-1"}"#);
        let item: Item = decode_body("products/p-1", &response).unwrap();
        assert_eq!(item.id, "p-1");
    }

    #[test]
    fn test_decode_body_failure_is_decode_kind() {
        let mut headers = HashMap::new();
        headers.insert("X-Correlation-Id".to_string(), vec!["c-7".to_string()]);
        let response = HttpResponse::new(200, headers, r#"{"unexpected":true}"#);

        let err = decode_body::<Item>("products/p-1", &response).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Decode);
        assert!(err.message.contains("products/p-1"));
        assert_eq!(err.correlation_id.as_deref(), Some("c-7"));
    }
}

//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;
use tracechain::clients::{ClassifiedError, HttpRequest, HttpResponse, Transport};
use tracechain::{ApiKey, BaseUrl, RetryPolicy, SdkConfig, SdkConfigBuilder, TraceClient};

/// One request as seen by the [`ScriptedTransport`].
#[derive(Clone, Debug)]
pub struct RecordedCall {
    pub at: Instant,
    pub path: String,
    pub idempotency_key: Option<String>,
    pub auth_headers: HashMap<String, String>,
    pub body: Option<serde_json::Value>,
}

/// Transport replaying a fixed list of outcomes and recording every call.
///
/// Once the script runs out, every further call fails with a 500.
#[derive(Default)]
pub struct ScriptedTransport {
    script: Mutex<VecDeque<Result<HttpResponse, ClassifiedError>>>,
    calls: Mutex<Vec<RecordedCall>>,
    latency: Option<Duration>,
}

impl ScriptedTransport {
    pub fn new(script: Vec<Result<HttpResponse, ClassifiedError>>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            ..Self::default()
        })
    }

    /// Like [`ScriptedTransport::new`], but every call stays in flight for
    /// `latency` after being recorded.
    pub fn with_latency(
        script: Vec<Result<HttpResponse, ClassifiedError>>,
        latency: Duration,
    ) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            latency: Some(latency),
            ..Self::default()
        })
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Gaps between consecutive calls.
    pub fn delays(&self) -> Vec<Duration> {
        self.calls()
            .windows(2)
            .map(|pair| pair[1].at.duration_since(pair[0].at))
            .collect()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(
        &self,
        request: &HttpRequest,
        auth_headers: &HashMap<String, String>,
    ) -> Result<HttpResponse, ClassifiedError> {
        self.calls.lock().unwrap().push(RecordedCall {
            at: Instant::now(),
            path: request.path.clone(),
            idempotency_key: request.idempotency_key.as_ref().map(ToString::to_string),
            auth_headers: auth_headers.clone(),
            body: request.body.clone(),
        });

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        let next = self.script.lock().unwrap().pop_front();
        let response = next.unwrap_or_else(|| Ok(response(500, &[], "{}")))?;
        response.into_result()
    }
}

/// Builds a raw response.
pub fn response(code: u16, headers: &[(&str, &str)], body: &str) -> HttpResponse {
    let headers = headers
        .iter()
        .map(|(k, v)| (k.to_lowercase(), vec![(*v).to_string()]))
        .collect();
    HttpResponse::new(code, headers, body)
}

pub fn ok_json(body: serde_json::Value) -> Result<HttpResponse, ClassifiedError> {
    Ok(response(200, &[], &body.to_string()))
}

pub fn status(code: u16) -> Result<HttpResponse, ClassifiedError> {
    Ok(response(code, &[], ""))
}

pub fn product_json(id: &str) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "gtin": "09506000134352",
        "name": "Merino Jacket",
        "createdAt": "2025-03-01T10:00:00Z"
    })
}

pub fn config_builder() -> SdkConfigBuilder {
    SdkConfig::builder()
        .base_url(BaseUrl::new("https://api.tracechain.test/v1").unwrap())
        .api_key(ApiKey::new("test-key").unwrap())
        .retry(RetryPolicy::default())
}

pub fn client_with(transport: &Arc<ScriptedTransport>) -> TraceClient {
    client_from(config_builder().build().unwrap(), transport)
}

pub fn client_from(config: SdkConfig, transport: &Arc<ScriptedTransport>) -> TraceClient {
    TraceClient::with_transport(config, Arc::clone(transport) as Arc<dyn Transport>)
}

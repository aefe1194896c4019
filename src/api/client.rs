//! The typed Tracechain API client.

use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;

use crate::api::errors::ApiError;
use crate::auth::CredentialProvider;
use crate::clients::{
    HttpClient, HttpError, HttpMethod, HttpRequest, InvalidHttpRequestError, ReqwestTransport,
    RetryController, Transport,
};
use crate::config::SdkConfig;
use crate::error::ConfigError;
use crate::models::{
    CirpassProduct, LifecycleEvent, NewLifecycleEvent, NewProduct, Product, ProductListParams,
    ProductPage, SubscriptionInfo,
};
use crate::usage::{Admission, SnapshotStore, UsageGate, UsageSnapshot};

/// Client for the Tracechain product-tracking API.
///
/// Every operation builds one request, runs it through the resilient
/// pipeline (credentials, local usage gate, transport, retries) and
/// decodes the result. No retry logic lives here.
///
/// `TraceClient` is cheap to clone. Clones share the connection pool and
/// the usage snapshot. Each clone gets a child of the original's
/// cancellation token: cancelling the original cancels every clone, while
/// cancelling a clone only affects that clone. Use
/// `client.clone().with_cancellation(token)` to scope cancellation to a
/// single unit of work.
///
/// # Example
///
/// ```rust,no_run
/// use tracechain::{ApiKey, BaseUrl, SdkConfig, TraceClient};
/// use tracechain::models::{EventType, NewLifecycleEvent, NewProduct};
///
/// # async fn run() -> Result<(), tracechain::ApiError> {
/// let config = SdkConfig::builder()
///     .base_url(BaseUrl::new("https://api.example.com/v1")?)
///     .api_key(ApiKey::new("my-api-key")?)
///     .build()?;
/// let client = TraceClient::new(config)?;
///
/// let product = client
///     .register_product(&NewProduct::new("09506000134352", "Merino Jacket"))
///     .await?;
/// client
///     .add_event(&product.id, &NewLifecycleEvent::new(EventType::Shipped))
///     .await?;
/// # Ok(())
/// # }
/// ```
pub struct TraceClient {
    http: HttpClient,
    store: Arc<dyn SnapshotStore>,
    cancel: CancellationToken,
}

// Verify TraceClient is Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<TraceClient>();
};

impl Clone for TraceClient {
    fn clone(&self) -> Self {
        Self {
            http: self.http.clone(),
            store: Arc::clone(&self.store),
            cancel: self.cancel.child_token(),
        }
    }
}

impl fmt::Debug for TraceClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TraceClient")
            .field("http", &self.http)
            .field("cancelled", &self.cancel.is_cancelled())
            .finish_non_exhaustive()
    }
}

impl TraceClient {
    /// Creates a client that talks HTTP through `reqwest`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::HttpClientInit`] if the HTTP client cannot
    /// be built.
    pub fn new(config: SdkConfig) -> Result<Self, ConfigError> {
        let transport = ReqwestTransport::from_config(&config)?;
        Ok(Self::with_transport(config, Arc::new(transport)))
    }

    /// Creates a client on top of a custom [`Transport`].
    ///
    /// The usage gate is seeded from the configured snapshot store; a
    /// store that cannot be read is logged and treated as empty.
    #[must_use]
    pub fn with_transport(config: SdkConfig, transport: Arc<dyn Transport>) -> Self {
        let store = config.snapshot_store();
        let seed = match store.load() {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::warn!("ignoring unreadable usage snapshot: {e}");
                None
            }
        };

        let credentials = CredentialProvider::new(config.api_key().cloned(), config.token_source());
        let controller = RetryController::new(
            config.retry().clone(),
            config.timeout(),
            config.overall_deadline(),
        );
        let http = HttpClient::new(
            transport,
            credentials,
            Arc::new(UsageGate::new(seed)),
            controller,
        );

        Self {
            http,
            store,
            cancel: CancellationToken::new(),
        }
    }

    /// Returns a copy of this client whose calls are cancelled by `token`.
    ///
    /// In-flight attempts and backoff waits stop promptly and resolve as
    /// cancelled once the token fires.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Returns the token that cancels this client's calls.
    ///
    /// For a clone this is a child token, so cancelling it leaves the
    /// client it was cloned from untouched.
    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Returns the underlying pipeline.
    #[must_use]
    pub const fn http_client(&self) -> &HttpClient {
        &self.http
    }

    /// Returns the usage snapshot the local gate is currently using.
    #[must_use]
    pub fn usage_snapshot(&self) -> Option<Arc<UsageSnapshot>> {
        self.http.gate().current()
    }

    /// Replaces the usage snapshot and persists it.
    ///
    /// The gate switches to `snapshot` before it is written; a store
    /// failure is logged. Store I/O runs on the calling thread, so prefer
    /// [`TraceClient::refresh_subscription`] from async code.
    pub fn set_usage_snapshot(&self, snapshot: UsageSnapshot) {
        self.http.gate().replace(snapshot.clone());
        if let Err(e) = self.store.save(&snapshot) {
            tracing::warn!("failed to persist usage snapshot: {e}");
        }
    }

    /// Drops the usage snapshot from memory and from the store.
    ///
    /// Store I/O runs on the calling thread.
    pub fn clear_usage_snapshot(&self) {
        self.http.gate().clear();
        if let Err(e) = self.store.clear() {
            tracing::warn!("failed to clear persisted usage snapshot: {e}");
        }
    }

    /// Fetches a product by ID.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] if `id` is empty or the call fails.
    pub async fn get_product(&self, id: &str) -> Result<Product, ApiError> {
        let path = format!("products/{}", segment("id", id)?);
        let request = HttpRequest::builder(HttpMethod::Get, path).build();
        self.call("get_product", id, request, Admission::Call)
            .await
    }

    /// Lists products one page at a time.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] if the call fails.
    pub async fn list_products(&self, params: &ProductListParams) -> Result<ProductPage, ApiError> {
        let mut builder = HttpRequest::builder(HttpMethod::Get, "products");
        if let Some(limit) = params.limit {
            builder = builder.query_param("limit", limit.to_string());
        }
        if let Some(cursor) = &params.cursor {
            builder = builder.query_param("cursor", cursor.as_str());
        }
        self.call("list_products", "products", builder.build(), Admission::Call)
            .await
    }

    /// Registers a product.
    ///
    /// The request carries an idempotency key that stays the same across
    /// retries, so a retried registration is not duplicated.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] if the free-tier product quota is exhausted or
    /// the call fails.
    pub async fn register_product(&self, product: &NewProduct) -> Result<Product, ApiError> {
        let request = HttpRequest::builder(HttpMethod::Post, "products")
            .json_body(product)
            .and_then(|b| b.idempotent().build());
        self.call(
            "register_product",
            &product.gtin,
            request,
            Admission::RegisterProduct,
        )
        .await
    }

    /// Adds a lifecycle event to a product.
    ///
    /// Idempotent across retries, like [`TraceClient::register_product`].
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] if `product_id` is empty, the free-tier event
    /// quota is exhausted, or the call fails.
    pub async fn add_event(
        &self,
        product_id: &str,
        event: &NewLifecycleEvent,
    ) -> Result<LifecycleEvent, ApiError> {
        let path = format!("products/{}/events", segment("product_id", product_id)?);
        let request = HttpRequest::builder(HttpMethod::Post, path)
            .json_body(event)
            .and_then(|b| b.idempotent().build());
        self.call("add_event", product_id, request, Admission::SubmitEvent)
            .await
    }

    /// Lists the lifecycle events of a serialized item.
    ///
    /// `product_ref` has the form `gtin:serial` (see
    /// [`DigitalLink::product_ref`](crate::gs1::DigitalLink::product_ref)).
    /// It is split at the first colon, so the serial may itself contain
    /// colons.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::InvalidProductRef`] if either part is missing,
    /// or [`ApiError::Operation`] if the call fails.
    pub async fn list_events(&self, product_ref: &str) -> Result<Vec<LifecycleEvent>, ApiError> {
        let (gtin, serial) = split_product_ref(product_ref)?;
        let path = format!(
            "products/{}/{}/events",
            urlencoding::encode(gtin),
            urlencoding::encode(serial)
        );
        let request = HttpRequest::builder(HttpMethod::Get, path).build();
        self.call("list_events", product_ref, request, Admission::Call)
            .await
    }

    /// Fetches passport data from the simulated CIRPASS registry.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] if `id` is empty or the call fails.
    pub async fn get_cirpass_product(&self, id: &str) -> Result<CirpassProduct, ApiError> {
        let path = format!("cirpass/products/{}", segment("id", id)?);
        let request = HttpRequest::builder(HttpMethod::Get, path).build();
        self.call("get_cirpass_product", id, request, Admission::Call)
            .await
    }

    /// Fetches the account's subscription and usage and refreshes the
    /// local usage gate with it.
    ///
    /// This call is never blocked by the local gate. The new snapshot is
    /// swapped in atomically, then persisted on the blocking thread pool;
    /// a persistence failure is logged and does not fail the call.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] if the call fails.
    pub async fn refresh_subscription(&self) -> Result<SubscriptionInfo, ApiError> {
        let request = HttpRequest::builder(HttpMethod::Get, "auth/me").build();
        let info: SubscriptionInfo = self
            .call("refresh_subscription", "auth/me", request, Admission::Unmetered)
            .await?;

        tracing::debug!(tier = %info.tier, "refreshed subscription snapshot");
        let snapshot = info.to_snapshot(Utc::now());
        self.http.gate().replace(snapshot.clone());
        self.persist(snapshot).await;
        Ok(info)
    }

    async fn persist(&self, snapshot: UsageSnapshot) {
        let store = Arc::clone(&self.store);
        match tokio::task::spawn_blocking(move || store.save(&snapshot)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::warn!("failed to persist usage snapshot: {e}"),
            Err(e) => tracing::warn!("usage snapshot persistence task failed: {e}"),
        }
    }

    async fn call<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        target: &str,
        request: Result<HttpRequest, InvalidHttpRequestError>,
        admission: Admission,
    ) -> Result<T, ApiError> {
        let wrap = |source: HttpError| ApiError::Operation {
            operation,
            target: target.to_string(),
            source,
        };

        let request = request.map_err(|e| wrap(e.into()))?;
        self.http
            .request_json(&request, admission, &self.cancel)
            .await
            .map_err(wrap)
    }
}

/// Percent-encodes a single path segment, rejecting empty values.
fn segment(name: &'static str, value: &str) -> Result<String, ApiError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ApiError::EmptyIdentifier { name });
    }
    Ok(urlencoding::encode(value).into_owned())
}

/// Splits `gtin:serial` at the first colon.
fn split_product_ref(reference: &str) -> Result<(&str, &str), ApiError> {
    reference
        .split_once(':')
        .map(|(gtin, serial)| (gtin.trim(), serial.trim()))
        .filter(|(gtin, serial)| !gtin.is_empty() && !serial.is_empty())
        .ok_or_else(|| ApiError::InvalidProductRef {
            reference: reference.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_product_ref() {
        assert_eq!(
            split_product_ref("09506000134352:SN-1").unwrap(),
            ("09506000134352", "SN-1")
        );
        assert_eq!(
            split_product_ref("09506000134352:A:B").unwrap(),
            ("09506000134352", "A:B")
        );
        for bad in ["", "09506000134352", ":SN", "0950:", " : "] {
            assert!(matches!(
                split_product_ref(bad),
                Err(ApiError::InvalidProductRef { .. })
            ));
        }
    }

    #[test]
    fn test_clone_cancellation_is_scoped_to_clone() {
        let config = SdkConfig::builder()
            .base_url(crate::config::BaseUrl::new("https://api.tracechain.test/v1").unwrap())
            .api_key(crate::config::ApiKey::new("test-key").unwrap())
            .build()
            .unwrap();
        let client = TraceClient::new(config).unwrap();

        let first = client.clone();
        let second = client.clone();
        first.cancellation_token().cancel();
        assert!(first.cancellation_token().is_cancelled());
        assert!(!client.cancellation_token().is_cancelled());
        assert!(!second.cancellation_token().is_cancelled());

        client.cancellation_token().cancel();
        assert!(second.cancellation_token().is_cancelled());
    }

    #[test]
    fn test_segment_encodes_and_rejects_empty() {
        assert_eq!(segment("id", "a/b c").unwrap(), "a%2Fb%20c");
        assert!(matches!(
            segment("id", "  "),
            Err(ApiError::EmptyIdentifier { name: "id" })
        ));
    }
}

//! HTTP transport for chart REST resources.
//!
//! [`FetchClient`] is the seam between the resource layer and the network.
//! Everything above it (caching, sequencing, aggregation) is written against
//! the trait, so tests script a [`MockFetchClient`] while production wires in
//! the reqwest-backed [`HttpFetchClient`].
//!
//! Requests are described by [`RequestDescriptor`] values: pure data naming a
//! relative path and an optional representation qualifier. A descriptor's
//! [`key`](RequestDescriptor::key) is the full relative URL and doubles as the
//! response-cache key.

use async_trait::async_trait;
use dashmap::DashMap;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};
use std::fmt;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Re-exported so callers can match on response statuses without naming the
/// underlying HTTP crate.
pub use reqwest::StatusCode;

/// Errors produced by the transport layer.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// The request could not be sent or the connection failed mid-flight
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    /// The server answered with a non-success status code
    #[error("server returned {status}: {body}")]
    Status { status: StatusCode, body: String },
    /// The response body was not valid JSON for the expected shape
    #[error("failed to decode response body: {0}")]
    Decode(#[from] serde_json::Error),
    /// The caller's cancellation token fired before the request settled
    #[error("request cancelled")]
    Cancelled,
}

impl FetchError {
    /// True when this failure only reflects caller-requested cancellation.
    ///
    /// Callers normally suppress these instead of surfacing them to users.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, FetchError::Cancelled)
    }
}

/// Result type for transport operations.
pub type FetchResult<T> = std::result::Result<T, FetchError>;

/// Representation qualifier appended to resource requests as `v=`.
///
/// `Full` asks the server to expand nested metadata. `Custom` passes a
/// caller-built projection string through unchanged, for example
/// `custom:(uuid,display,units)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Representation {
    Default,
    Full,
    Custom(String),
}

impl Representation {
    fn query_value(&self) -> &str {
        match self {
            Representation::Default => "default",
            Representation::Full => "full",
            Representation::Custom(projection) => projection,
        }
    }
}

/// Cache key for a planned request: the full relative URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestKey(String);

impl RequestKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequestKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single planned request against the REST API.
///
/// Descriptors are pure data: building one performs no I/O. Two descriptors
/// with the same relative URL share the same [`RequestKey`] and therefore
/// coalesce onto the same cache entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestDescriptor {
    path: String,
    representation: Option<Representation>,
}

impl RequestDescriptor {
    /// Creates a descriptor for `path`, which must start with `/`.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            representation: None,
        }
    }

    /// Attaches a representation qualifier.
    pub fn with_representation(mut self, representation: Representation) -> Self {
        self.representation = Some(representation);
        self
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Relative URL including the query string, exactly as sent on the wire.
    pub fn relative_url(&self) -> String {
        match &self.representation {
            Some(representation) => format!("{}?v={}", self.path, representation.query_value()),
            None => self.path.clone(),
        }
    }

    /// Cache key identifying this request.
    pub fn key(&self) -> RequestKey {
        RequestKey(self.relative_url())
    }
}

/// A completed response envelope: status plus the raw JSON body.
///
/// Bodies stay as [`serde_json::Value`] so one envelope type serves every
/// resource; callers project into typed structs with [`FetchResponse::json`].
/// A `204 No Content` reply carries `Value::Null`.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    status: StatusCode,
    body: serde_json::Value,
}

impl FetchResponse {
    pub fn new(status: StatusCode, body: serde_json::Value) -> Self {
        Self { status, body }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn body(&self) -> &serde_json::Value {
        &self.body
    }

    /// Deserialises the body into `T`.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Decode`] if the body does not match `T`.
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> FetchResult<T> {
        Ok(serde_json::from_value(self.body.clone())?)
    }
}

/// Transport seam for the resource layer.
#[async_trait]
pub trait FetchClient: Send + Sync {
    /// Fetches a resource.
    async fn get(&self, request: &RequestDescriptor) -> FetchResult<FetchResponse>;

    /// Deletes a resource.
    ///
    /// The request aborts when `token` is cancelled and resolves to
    /// [`FetchError::Cancelled`].
    async fn delete(
        &self,
        request: &RequestDescriptor,
        token: &CancellationToken,
    ) -> FetchResult<FetchResponse>;
}

/// Configuration for [`HttpFetchClient`].
#[derive(Debug, Clone)]
pub struct HttpFetchClientConfig {
    /// Server base URL up to the webapp root, without a trailing slash, for
    /// example `https://emr.example.org/openmrs`.
    pub base_url: String,
    pub timeout_secs: u64,
    pub extra_headers: HeaderMap,
}

impl Default for HttpFetchClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080/openmrs".to_string(),
            timeout_secs: 30,
            extra_headers: HeaderMap::new(),
        }
    }
}

/// HTTP implementation of [`FetchClient`] backed by a pooled reqwest client.
pub struct HttpFetchClient {
    client: reqwest::Client,
    config: HttpFetchClientConfig,
}

impl HttpFetchClient {
    /// Builds the client, normalising the configured base URL.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Transport`] if the underlying HTTP client cannot
    /// be constructed.
    pub fn new(mut config: HttpFetchClientConfig) -> FetchResult<Self> {
        // A trailing slash would double up when joined with descriptor paths.
        while config.base_url.ends_with('/') {
            config.base_url.pop();
        }
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { client, config })
    }

    fn absolute_url(&self, request: &RequestDescriptor) -> String {
        format!("{}{}", self.config.base_url, request.relative_url())
    }

    async fn read_envelope(response: reqwest::Response) -> FetchResult<FetchResponse> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::Status { status, body });
        }
        let text = response.text().await?;
        let body = if text.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_str(&text)?
        };
        Ok(FetchResponse::new(status, body))
    }
}

#[async_trait]
impl FetchClient for HttpFetchClient {
    async fn get(&self, request: &RequestDescriptor) -> FetchResult<FetchResponse> {
        let url = self.absolute_url(request);
        tracing::debug!(url = %url, "GET");

        let mut headers = self.config.extra_headers.clone();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let response = self.client.get(&url).headers(headers).send().await?;
        Self::read_envelope(response).await
    }

    async fn delete(
        &self,
        request: &RequestDescriptor,
        token: &CancellationToken,
    ) -> FetchResult<FetchResponse> {
        if token.is_cancelled() {
            return Err(FetchError::Cancelled);
        }

        let url = self.absolute_url(request);
        tracing::debug!(url = %url, "DELETE");

        let mut headers = self.config.extra_headers.clone();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let send = self.client.delete(&url).headers(headers).send();
        tokio::select! {
            _ = token.cancelled() => Err(FetchError::Cancelled),
            response = send => Self::read_envelope(response?).await,
        }
    }
}

/// Scripted in-memory [`FetchClient`] for tests.
///
/// Responses are registered per request key; unscripted requests answer 404.
/// Every call is counted so tests can assert on deduplication behaviour.
#[derive(Default)]
pub struct MockFetchClient {
    responses: DashMap<RequestKey, MockResponse>,
    calls: DashMap<RequestKey, usize>,
}

#[derive(Debug, Clone)]
struct MockResponse {
    status: StatusCode,
    body: serde_json::Value,
    delay: Option<Duration>,
}

impl MockFetchClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scripts a `200 OK` JSON response for `request`.
    pub fn script_json(&self, request: &RequestDescriptor, body: serde_json::Value) {
        self.responses.insert(
            request.key(),
            MockResponse {
                status: StatusCode::OK,
                body,
                delay: None,
            },
        );
    }

    /// Scripts a `200 OK` JSON response delivered after `delay`.
    pub fn script_delayed_json(
        &self,
        request: &RequestDescriptor,
        delay: Duration,
        body: serde_json::Value,
    ) {
        self.responses.insert(
            request.key(),
            MockResponse {
                status: StatusCode::OK,
                body,
                delay: Some(delay),
            },
        );
    }

    /// Scripts a bare status response for `request`. Non-success statuses
    /// surface as [`FetchError::Status`].
    pub fn script_status(&self, request: &RequestDescriptor, status: StatusCode) {
        self.responses.insert(
            request.key(),
            MockResponse {
                status,
                body: serde_json::Value::Null,
                delay: None,
            },
        );
    }

    /// Number of calls that reached `request`'s key.
    pub fn calls_for(&self, request: &RequestDescriptor) -> usize {
        self.calls
            .get(&request.key())
            .map(|count| *count)
            .unwrap_or(0)
    }

    /// Total calls across every key.
    pub fn total_calls(&self) -> usize {
        self.calls.iter().map(|entry| *entry.value()).sum()
    }

    async fn respond(&self, request: &RequestDescriptor) -> FetchResult<FetchResponse> {
        let key = request.key();
        *self.calls.entry(key.clone()).or_insert(0) += 1;

        let Some(scripted) = self.responses.get(&key).map(|entry| entry.value().clone()) else {
            return Err(FetchError::Status {
                status: StatusCode::NOT_FOUND,
                body: format!("no script for {key}"),
            });
        };

        if let Some(delay) = scripted.delay {
            tokio::time::sleep(delay).await;
        }

        if !scripted.status.is_success() {
            return Err(FetchError::Status {
                status: scripted.status,
                body: scripted.body.to_string(),
            });
        }

        Ok(FetchResponse::new(scripted.status, scripted.body))
    }
}

#[async_trait]
impl FetchClient for MockFetchClient {
    async fn get(&self, request: &RequestDescriptor) -> FetchResult<FetchResponse> {
        self.respond(request).await
    }

    async fn delete(
        &self,
        request: &RequestDescriptor,
        token: &CancellationToken,
    ) -> FetchResult<FetchResponse> {
        if token.is_cancelled() {
            return Err(FetchError::Cancelled);
        }
        self.respond(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::{Path, Query};
    use axum::routing::{delete as axum_delete, get as axum_get};
    use axum::{Json, Router};
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    async fn stub_server(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn http_client(base_url: String) -> HttpFetchClient {
        HttpFetchClient::new(HttpFetchClientConfig {
            base_url,
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_relative_url_without_representation() {
        let request = RequestDescriptor::new("/ws/rest/v1/encounter/abc");
        assert_eq!(request.relative_url(), "/ws/rest/v1/encounter/abc");
        assert_eq!(request.key().as_str(), "/ws/rest/v1/encounter/abc");
    }

    #[test]
    fn test_relative_url_with_representation() {
        let request = RequestDescriptor::new("/ws/rest/v1/encountertype/abc")
            .with_representation(Representation::Full);
        assert_eq!(
            request.relative_url(),
            "/ws/rest/v1/encountertype/abc?v=full"
        );
    }

    #[test]
    fn test_custom_representation_passes_through() {
        let request = RequestDescriptor::new("/ws/rest/v1/concept/abc")
            .with_representation(Representation::Custom("custom:(uuid,display)".into()));
        assert_eq!(
            request.relative_url(),
            "/ws/rest/v1/concept/abc?v=custom:(uuid,display)"
        );
    }

    #[test]
    fn test_same_url_same_key() {
        let first = RequestDescriptor::new("/ws/rest/v1/encountertype/abc")
            .with_representation(Representation::Full);
        let second = RequestDescriptor::new("/ws/rest/v1/encountertype/abc")
            .with_representation(Representation::Full);
        assert_eq!(first.key(), second.key());

        let other = RequestDescriptor::new("/ws/rest/v1/encountertype/abc");
        assert_ne!(first.key(), other.key());
    }

    #[test]
    fn test_response_json_projection() {
        #[derive(serde::Deserialize)]
        struct Body {
            display: String,
        }

        let response = FetchResponse::new(StatusCode::OK, json!({"display": "Vitals"}));
        let body: Body = response.json().unwrap();
        assert_eq!(body.display, "Vitals");

        let mismatch = response.json::<Vec<String>>();
        assert!(matches!(mismatch, Err(FetchError::Decode(_))));
    }

    #[tokio::test]
    async fn test_mock_counts_calls_per_key() {
        let mock = MockFetchClient::new();
        let request = RequestDescriptor::new("/ws/rest/v1/encountertype/abc");
        mock.script_json(&request, json!({"uuid": "abc", "display": "Vitals"}));

        mock.get(&request).await.unwrap();
        mock.get(&request).await.unwrap();

        assert_eq!(mock.calls_for(&request), 2);
        assert_eq!(mock.total_calls(), 2);
    }

    #[tokio::test]
    async fn test_mock_unscripted_request_is_not_found() {
        let mock = MockFetchClient::new();
        let request = RequestDescriptor::new("/ws/rest/v1/encountertype/missing");

        let error = mock.get(&request).await.unwrap_err();
        match error {
            FetchError::Status { status, .. } => assert_eq!(status, StatusCode::NOT_FOUND),
            other => panic!("expected status error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_mock_delete_honours_cancellation() {
        let mock = MockFetchClient::new();
        let request = RequestDescriptor::new("/ws/rest/v1/encounter/abc");
        mock.script_status(&request, StatusCode::NO_CONTENT);

        let token = CancellationToken::new();
        token.cancel();

        let error = mock.delete(&request, &token).await.unwrap_err();
        assert!(error.is_cancelled());
        // A cancelled request never reaches the transport.
        assert_eq!(mock.calls_for(&request), 0);
    }

    #[tokio::test]
    async fn test_http_get_decodes_envelope_and_sends_representation() {
        let app = Router::new().route(
            "/ws/rest/v1/encountertype/:uuid",
            axum_get(
                |Path(uuid): Path<String>, Query(params): Query<HashMap<String, String>>| async move {
                    assert_eq!(params.get("v").map(String::as_str), Some("full"));
                    Json(json!({"uuid": uuid, "display": "Vitals"}))
                },
            ),
        );
        let client = http_client(stub_server(app).await);

        let request = RequestDescriptor::new("/ws/rest/v1/encountertype/abc")
            .with_representation(Representation::Full);
        let response = client.get(&request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.body()["display"], "Vitals");
        assert_eq!(response.body()["uuid"], "abc");
    }

    #[tokio::test]
    async fn test_http_get_maps_server_failure_to_status_error() {
        let app = Router::new().route(
            "/ws/rest/v1/encountertype/:uuid",
            axum_get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
        );
        let client = http_client(stub_server(app).await);

        let request = RequestDescriptor::new("/ws/rest/v1/encountertype/abc");
        let error = client.get(&request).await.unwrap_err();

        match error {
            FetchError::Status { status, body } => {
                assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
                assert!(body.contains("boom"));
            }
            other => panic!("expected status error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_http_delete_sends_json_content_type() {
        let seen: Arc<Mutex<Option<String>>> = Arc::new(Mutex::new(None));
        let seen_handler = Arc::clone(&seen);
        let app = Router::new().route(
            "/ws/rest/v1/encounter/:uuid",
            axum_delete(move |headers: HeaderMap| {
                let seen = Arc::clone(&seen_handler);
                async move {
                    let content_type = headers
                        .get(CONTENT_TYPE)
                        .and_then(|value| value.to_str().ok())
                        .map(str::to_owned);
                    *seen.lock().unwrap() = content_type;
                    StatusCode::NO_CONTENT
                }
            }),
        );
        let client = http_client(stub_server(app).await);

        let request = RequestDescriptor::new("/ws/rest/v1/encounter/abc");
        let response = client
            .delete(&request, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert!(response.body().is_null());
        assert_eq!(seen.lock().unwrap().as_deref(), Some("application/json"));
    }

    #[tokio::test]
    async fn test_http_delete_cancelled_before_send() {
        let client = http_client(stub_server(Router::new()).await);
        let token = CancellationToken::new();
        token.cancel();

        let request = RequestDescriptor::new("/ws/rest/v1/encounter/abc");
        let error = client.delete(&request, &token).await.unwrap_err();
        assert!(error.is_cancelled());
    }

    #[tokio::test]
    async fn test_http_delete_cancelled_mid_flight() {
        let app = Router::new().route(
            "/ws/rest/v1/encounter/:uuid",
            axum_delete(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                StatusCode::NO_CONTENT
            }),
        );
        let client = http_client(stub_server(app).await);

        let token = CancellationToken::new();
        let trigger = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        });

        let request = RequestDescriptor::new("/ws/rest/v1/encounter/abc");
        let error = client.delete(&request, &token).await.unwrap_err();
        assert!(error.is_cancelled());
    }
}

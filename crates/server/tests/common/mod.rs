//! Common test utilities for API testing with mocks.
//!
//! This module provides a test fixture that creates an in-process router
//! with mock dependencies injected, so the API can be exercised without
//! an indexer or a listening socket.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use selectarr_core::{
    testing::MockReleaseSource, Config, PolicySettings, PolicyStore, ReleasePolicy,
    ReleaseSource, SessionState,
};

/// Re-export fixtures for test convenience
pub use selectarr_core::testing::fixtures;

/// Test fixture for API testing.
///
/// Holds the router together with handles to the state behind it, so a
/// test can seed the retry tracker or the policy store and observe the
/// effect through the API.
///
/// # Example
///
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_unsuppress() {
///     let fixture = TestFixture::new();
///     fixture.session.record_failure("movie|heat", 1).await;
///
///     let response = fixture.delete("/api/v1/suppressed/movie%7Cheat").await;
///     assert_eq!(response.status, 204);
/// }
/// ```
pub struct TestFixture {
    /// The Axum router for testing
    pub router: Router,
    /// Mock release source, if the fixture was built with one
    pub source: Option<Arc<MockReleaseSource>>,
    pub session: Arc<SessionState>,
    pub policy: Arc<ReleasePolicy>,
    /// Keeps the policy file alive for the fixture's lifetime
    pub temp_dir: TempDir,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
    pub text: String,
}

impl TestFixture {
    /// Create a fixture without a search backend.
    pub fn new() -> Self {
        Self::build(Config::default(), None)
    }

    /// Create a fixture backed by a mock release source.
    pub fn with_source() -> Self {
        Self::build(Config::default(), Some(Arc::new(MockReleaseSource::new())))
    }

    /// Create a fixture with a custom configuration.
    pub fn with_config(config: Config) -> Self {
        Self::build(config, None)
    }

    fn build(config: Config, source: Option<Arc<MockReleaseSource>>) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = Arc::new(PolicyStore::open(
            &temp_dir.path().join(selectarr_core::policy::POLICY_FILE_NAME),
        ));
        let policy = Arc::new(ReleasePolicy::new(store, PolicySettings::default()));
        let session = Arc::new(SessionState::new());

        let state = Arc::new(selectarr_server::state::AppState::new(
            config,
            Arc::clone(&session),
            Arc::clone(&policy),
            source
                .as_ref()
                .map(|s| Arc::clone(s) as Arc<dyn ReleaseSource>),
        ));

        let router = selectarr_server::api::create_router(state);

        Self {
            router,
            source,
            session,
            policy,
            temp_dir,
        }
    }

    /// The mock source; panics if the fixture was built without one.
    pub fn source(&self) -> &MockReleaseSource {
        self.source.as_deref().expect("Fixture has no release source")
    }

    /// Send a GET request to the test server.
    pub async fn get(&self, path: &str) -> TestResponse {
        self.request("GET", path, None).await
    }

    /// Send a POST request with JSON body.
    pub async fn post(&self, path: &str, body: Value) -> TestResponse {
        self.request("POST", path, Some(body)).await
    }

    /// Send a DELETE request.
    pub async fn delete(&self, path: &str) -> TestResponse {
        self.request("DELETE", path, None).await
    }

    /// Send a request to the test server.
    async fn request(&self, method: &str, path: &str, body: Option<Value>) -> TestResponse {
        let mut request_builder = Request::builder().method(method).uri(path);

        let body = if let Some(json_body) = body {
            request_builder = request_builder.header("Content-Type", "application/json");
            Body::from(serde_json::to_vec(&json_body).unwrap())
        } else {
            Body::empty()
        };

        let request = request_builder.body(body).unwrap();

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        let text = String::from_utf8_lossy(&body_bytes).to_string();
        let body: Value = if body_bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
        };

        TestResponse { status, body, text }
    }
}

//! Test harness for driving the HTTP API in-process.
//!
//! Every test gets fresh in-memory dependencies; nothing touches the network
//! or a database. Requests go through the real router with `oneshot`.

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::Value;
use test_context::AsyncTestContext;
use tower::ServiceExt;

use verification_core::kernel::TestDependencies;
use verification_core::server::{build_router, AxumAppState};

const MAX_RESPONSE_BYTES: usize = 1024 * 1024;

/// A response with its body already parsed
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub retry_after: Option<String>,
    pub body: Value,
}

/// Test harness that owns the mocks and the router built on them.
///
/// # Example using test-context
///
/// ```ignore
/// use test_context::test_context;
///
/// #[test_context(TestHarness)]
/// #[tokio::test]
/// async fn my_test(ctx: &TestHarness) {
///     let res = ctx.get("/health").await;
/// }
/// ```
pub struct TestHarness {
    /// Handles to every mock for setup and assertions
    pub deps: TestDependencies,
    router: Router,
}

impl AsyncTestContext for TestHarness {
    async fn setup() -> Self {
        Self::new()
    }

    async fn teardown(self) {}
}

impl TestHarness {
    pub fn new() -> Self {
        Self::with_deps(TestDependencies::new())
    }

    pub fn with_deps(deps: TestDependencies) -> Self {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();

        let state = AxumAppState::new(deps.server_deps(), "memory");
        let router = build_router(state, &[]);
        Self { deps, router }
    }

    pub async fn get(&self, uri: &str) -> TestResponse {
        self.send(Request::builder().method(Method::GET).uri(uri).body(Body::empty()).unwrap())
            .await
    }

    pub async fn post_json(&self, uri: &str, body: Value) -> TestResponse {
        self.send(
            Request::builder()
                .method(Method::POST)
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }

    pub async fn post_multipart(&self, uri: &str, form: super::MultipartForm) -> TestResponse {
        let (content_type, body) = form.finish();
        self.send(
            Request::builder()
                .method(Method::POST)
                .uri(uri)
                .header(header::CONTENT_TYPE, content_type)
                .body(Body::from(body))
                .unwrap(),
        )
        .await
    }

    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.router.clone().oneshot(request).await.unwrap();

        let status = response.status();
        let retry_after = response
            .headers()
            .get(header::RETRY_AFTER)
            .map(|v| v.to_str().unwrap().to_string());
        let bytes = to_bytes(response.into_body(), MAX_RESPONSE_BYTES).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };

        TestResponse {
            status,
            retry_after,
            body,
        }
    }
}

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode};
use serde_json::{Value, json};
use tower::ServiceExt;

use crate::client::DynCompletionClient;
use crate::config::PipelineSettings;
use crate::error::UpstreamError;
use crate::orchestrator::Orchestrator;
use crate::test_support::{ScriptedClient, StalledClient, shared};

use super::{AppState, AuthState, RateLimitState, router};

const REPLIES: [&str; 4] = [
    r#"{"issues":[]}"#,
    r#"{"channels":["search"]}"#,
    r#"{"files":[{"path":"app/page.tsx","content":"<Hero />"}],"changelog":[]}"#,
    r#"{"events":["page_view"]}"#,
];

fn app_with(client: Arc<DynCompletionClient>, burst: u32, timeout: Duration) -> Router {
    let settings = PipelineSettings {
        default_budget: 10_000,
        upstream_retry: false,
        retry_backoff_ms: 0,
    };
    let state = AppState {
        orchestrator: Arc::new(Orchestrator::standard(client, &settings)),
        request_timeout: timeout,
    };
    let keys = BTreeMap::from([("test-key".to_string(), "acme".to_string())]);

    router(state, AuthState::new(keys), RateLimitState::new(60, burst))
}

fn app(client: Arc<ScriptedClient>) -> Router {
    app_with(shared(client), 10, Duration::from_secs(30))
}

fn post_run(key: Option<&str>, body: &str) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/run")
        .header("content-type", "application/json");
    if let Some(key) = key {
        builder = builder.header("authorization", format!("Bearer {key}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

const GOAL: &str = r#"{"intent":"test campaign","context":{"icp":"test-icp","budget":5000}}"#;

#[tokio::test]
async fn health_needs_no_credentials() {
    let response = app(ScriptedClient::replying(&[]))
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await, json!({ "status": "ok" }));
}

#[tokio::test]
async fn missing_credential_is_unauthorized() {
    let client = ScriptedClient::replying(&REPLIES);
    let response = app(client.clone())
        .oneshot(post_run(None, GOAL))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(response).await, json!({ "error": "missing API key" }));
    assert_eq!(client.calls(), 0);
}

#[tokio::test]
async fn unknown_key_is_forbidden() {
    let response = app(ScriptedClient::replying(&REPLIES))
        .oneshot(post_run(Some("nope"), GOAL))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn get_on_run_is_method_not_allowed() {
    let response = app(ScriptedClient::replying(&REPLIES))
        .oneshot(
            Request::get("/run")
                .header("x-api-key", "test-key")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn successful_run_returns_state_with_rate_limit_headers() {
    let client = ScriptedClient::replying(&REPLIES);
    let response = app(client.clone())
        .oneshot(post_run(Some("test-key"), GOAL))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers();
    assert_eq!(headers["x-ratelimit-limit"], "10");
    assert_eq!(headers["x-ratelimit-remaining"], "9");
    assert!(headers.contains_key("x-ratelimit-reset"));

    let body = json_body(response).await;
    assert_eq!(
        body["files"],
        json!([{ "path": "app/page.tsx", "content": "<Hero />" }])
    );
    assert_eq!(body["tracking"], json!({ "events": ["page_view"] }));
    assert_eq!(client.calls(), 4);
}

#[tokio::test]
async fn api_key_header_is_accepted() {
    let request = Request::post("/run")
        .header("x-api-key", "test-key")
        .body(Body::from(GOAL))
        .unwrap();

    let response = app(ScriptedClient::replying(&REPLIES))
        .oneshot(request)
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn empty_bearer_does_not_hide_api_key_header() {
    let request = Request::post("/run")
        .header("authorization", "Bearer ")
        .header("x-api-key", "test-key")
        .body(Body::from(GOAL))
        .unwrap();

    let response = app(ScriptedClient::replying(&REPLIES))
        .oneshot(request)
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn quota_exhaustion_returns_too_many_requests() {
    let client = ScriptedClient::replying(&[&REPLIES[..], &REPLIES[..]].concat());
    let app = app_with(shared(client), 1, Duration::from_secs(30));

    let first = app
        .clone()
        .oneshot(post_run(Some("test-key"), GOAL))
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::OK);

    let second = app.oneshot(post_run(Some("test-key"), GOAL)).await.unwrap();
    assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(second.headers().contains_key("retry-after"));
    assert_eq!(second.headers()["x-ratelimit-remaining"], "0");
    assert_eq!(second.headers()["x-ratelimit-limit"], "1");
}

#[tokio::test]
async fn missing_intent_is_bad_request() {
    let client = ScriptedClient::replying(&REPLIES);
    let response = app(client.clone())
        .oneshot(post_run(Some("test-key"), r#"{"context":{"budget":10}}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["stage"], "goal");
    assert!(body["error"].as_str().unwrap().contains("intent"));
    assert_eq!(client.calls(), 0);
}

#[tokio::test]
async fn empty_or_malformed_body_is_bad_request() {
    for body in ["", "   ", "{not json"] {
        let response = app(ScriptedClient::replying(&REPLIES))
            .oneshot(post_run(Some("test-key"), body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "body {body:?}");
    }
}

#[tokio::test]
async fn upstream_failure_is_bad_gateway() {
    let client = ScriptedClient::new([Err(UpstreamError::Unavailable)]);
    let response = app(client)
        .oneshot(post_run(Some("test-key"), GOAL))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let body = json_body(response).await;
    assert_eq!(body["stage"], "analysis");
    assert_eq!(
        body["error"],
        "analysis failed: completion: service is temporarily unavailable"
    );
}

#[tokio::test]
async fn request_deadline_cancels_the_pipeline() {
    let app = app_with(Arc::new(StalledClient), 10, Duration::from_millis(20));

    let response = app
        .oneshot(post_run(Some("test-key"), GOAL))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
    assert_eq!(json_body(response).await["stage"], "analysis");
}

use std::time::Instant;

use axum::body::{Body, to_bytes};
use axum::extract::Request;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use serde_json::{Map, Value};
use tracing::{debug, info};

use super::auth::Tenant;
use super::error::ApiError;

/// Largest request body the service accepts.
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

const SECRET_KEYS: &[&str] = &["password", "apikey", "api_key", "token", "authorization"];

/// Replaces the values of secret-looking keys with `***`, at any depth.
pub fn mask_secrets(value: Value) -> Value {
    match value {
        Value::Object(object) => Value::Object(
            object
                .into_iter()
                .map(|(key, value)| {
                    if SECRET_KEYS.contains(&key.to_ascii_lowercase().as_str()) {
                        (key, Value::String("***".to_string()))
                    } else {
                        (key, mask_secrets(value))
                    }
                })
                .collect::<Map<_, _>>(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(mask_secrets).collect()),
        other => other,
    }
}

/// Emits one `audit` record per authenticated request.
pub async fn audit_middleware(request: Request, next: Next) -> Response {
    let started = Instant::now();
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let tenant = request
        .extensions()
        .get::<Tenant>()
        .map(|tenant| tenant.0.clone())
        .unwrap_or_default();

    let (parts, body) = request.into_parts();
    let bytes = match to_bytes(body, MAX_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(_) => {
            return ApiError::new(
                axum::http::StatusCode::PAYLOAD_TOO_LARGE,
                "request body is too large",
            )
            .into_response();
        }
    };
    if let Ok(body) = serde_json::from_slice::<Value>(&bytes) {
        debug!(target: "audit", tenant = %tenant, body = %mask_secrets(body), "request body");
    }

    let response = next.run(Request::from_parts(parts, Body::from(bytes))).await;

    info!(
        target: "audit",
        tenant = %tenant,
        method = %method,
        path = %path,
        status = response.status().as_u16(),
        latency_ms = started.elapsed().as_millis() as u64,
        "request handled"
    );
    response
}

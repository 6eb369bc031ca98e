use std::collections::BTreeMap;
use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;

use super::error::ApiError;

/// Tenant id attached to an authenticated request.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Tenant(pub String);

#[derive(Debug, Clone)]
pub struct AuthState {
    keys: Arc<BTreeMap<String, String>>,
}

impl AuthState {
    /// `keys` maps API key to tenant id.
    pub fn new(keys: BTreeMap<String, String>) -> Self {
        Self {
            keys: Arc::new(keys),
        }
    }

    fn tenant_for(&self, key: &str) -> Option<Tenant> {
        self.keys.get(key).cloned().map(Tenant)
    }
}

/// Reads the credential from `Authorization: Bearer` or `X-API-Key`.
fn credential(headers: &HeaderMap) -> Option<&str> {
    let bearer = headers
        .get("authorization")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| {
            let (scheme, token) = value.split_once(' ')?;
            scheme.eq_ignore_ascii_case("bearer").then(|| token.trim())
        })
        .filter(|token| !token.is_empty());

    bearer.or_else(|| {
        headers
            .get("x-api-key")
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|key| !key.is_empty())
    })
}

/// Rejects requests without a known API key (401 when absent, 403 when
/// unknown) and attaches the caller's [`Tenant`] otherwise.
pub async fn auth_middleware(
    State(state): State<AuthState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let key = credential(request.headers())
        .ok_or_else(|| ApiError::unauthorized("missing API key"))?;
    let tenant = state
        .tenant_for(key)
        .ok_or_else(|| ApiError::forbidden("unknown API key"))?;

    request.extensions_mut().insert(tenant);
    Ok(next.run(request).await)
}

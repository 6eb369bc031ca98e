use std::num::NonZeroU32;
use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::{HeaderMap, HeaderName, HeaderValue};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use dashmap::DashMap;
use governor::clock::{Clock, DefaultClock};
use governor::middleware::StateInformationMiddleware;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};

use super::auth::Tenant;
use super::error::ApiError;

type TenantLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock, StateInformationMiddleware>;

/// Per-tenant request quotas, created on first use.
#[derive(Clone)]
pub struct RateLimitState {
    per_minute: u32,
    burst: u32,
    limiters: Arc<DashMap<String, Arc<TenantLimiter>>>,
}

impl RateLimitState {
    pub fn new(per_minute: u32, burst: u32) -> Self {
        Self {
            per_minute: per_minute.max(1),
            burst: burst.max(1),
            limiters: Arc::new(DashMap::new()),
        }
    }

    fn limiter(&self, tenant: &str) -> Arc<TenantLimiter> {
        self.limiters
            .entry(tenant.to_string())
            .or_insert_with(|| {
                let quota = Quota::per_minute(NonZeroU32::new(self.per_minute).unwrap_or(NonZeroU32::MIN))
                    .allow_burst(NonZeroU32::new(self.burst).unwrap_or(NonZeroU32::MIN));
                Arc::new(RateLimiter::direct(quota).with_middleware::<StateInformationMiddleware>())
            })
            .clone()
    }

    /// Seconds for one request slot to replenish.
    fn replenish_secs(&self) -> u64 {
        60u64.div_ceil(u64::from(self.per_minute)).max(1)
    }
}

struct RateLimitHeaders {
    limit: u32,
    remaining: u32,
    reset_secs: u64,
}

impl RateLimitHeaders {
    fn apply(&self, headers: &mut HeaderMap) {
        let pairs = [
            ("x-ratelimit-limit", self.limit.to_string()),
            ("x-ratelimit-remaining", self.remaining.to_string()),
            ("x-ratelimit-reset", self.reset_secs.to_string()),
        ];
        for (name, value) in pairs {
            if let Ok(value) = HeaderValue::from_str(&value) {
                headers.insert(HeaderName::from_static(name), value);
            }
        }
    }
}

/// Enforces the tenant's quota. Runs after authentication; every response
/// carries `X-RateLimit-*` headers and rejections get `Retry-After`.
pub async fn rate_limit_middleware(
    State(state): State<RateLimitState>,
    request: Request,
    next: Next,
) -> Response {
    let tenant = request
        .extensions()
        .get::<Tenant>()
        .map(|tenant| tenant.0.clone())
        .unwrap_or_default();
    let limiter = state.limiter(&tenant);

    match limiter.check() {
        Ok(snapshot) => {
            let remaining = snapshot.remaining_burst_capacity();
            let reset_secs = if remaining >= state.burst {
                0
            } else {
                state.replenish_secs()
            };

            let mut response = next.run(request).await;
            RateLimitHeaders {
                limit: state.burst,
                remaining,
                reset_secs,
            }
            .apply(response.headers_mut());
            response
        }
        Err(not_until) => {
            let retry_after = not_until
                .wait_time_from(DefaultClock::default().now())
                .as_secs()
                .max(1);
            tracing::warn!(tenant = %tenant, retry_after, "rate limit exceeded");

            let mut response = ApiError::too_many_requests(retry_after).into_response();
            let headers = response.headers_mut();
            RateLimitHeaders {
                limit: state.burst,
                remaining: 0,
                reset_secs: retry_after,
            }
            .apply(headers);
            if let Ok(value) = HeaderValue::from_str(&retry_after.to_string()) {
                headers.insert(HeaderName::from_static("retry-after"), value);
            }
            response
        }
    }
}

//! Request-Path Middleware
//!
//! Axum integration for the quota and caching layers: a rate-limit guard
//! consulted before any handler work, and a GET response cache over the
//! cache manager.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    extract::{ConnectInfo, Request, State},
    http::{header, HeaderValue, Method, StatusCode, Uri},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::warn;

use crate::cache::entry::current_timestamp_ms;
use crate::cache::CacheManager;
use crate::ratelimit::{RateLimitDecision, RateLimiter};

// == Rate Limit Middleware ==
/// Counts the request against the client's window before any handler or
/// cache work happens.
///
/// Denied requests receive `429` with a JSON error body; every response
/// carries `x-ratelimit-*` quota headers.
pub async fn rate_limit_middleware(
    State(limiter): State<Arc<RateLimiter>>,
    req: Request,
    next: Next,
) -> Response {
    let identifier = client_identifier(&req);
    let decision = limiter.check(&identifier);

    if !decision.allowed {
        let retry_ms = (decision.reset_time - current_timestamp_ms()).max(0) as u64;
        let retry_secs = (retry_ms + 999) / 1000;

        let mut response = (
            StatusCode::TOO_MANY_REQUESTS,
            Json(json!({ "error": "Too many requests" })),
        )
            .into_response();
        insert_quota_headers(&mut response, limiter.max(), &decision);
        response
            .headers_mut()
            .insert(header::RETRY_AFTER, HeaderValue::from(retry_secs));
        return response;
    }

    let mut response = next.run(req).await;
    insert_quota_headers(&mut response, limiter.max(), &decision);
    response
}

/// Client identity for quota accounting: the first `x-forwarded-for`
/// hop, then the peer address, then a shared bucket.
fn client_identifier(req: &Request) -> String {
    req.headers()
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .or_else(|| {
            req.extensions()
                .get::<ConnectInfo<SocketAddr>>()
                .map(|info| info.0.ip().to_string())
        })
        .unwrap_or_else(|| "unknown".to_string())
}

fn insert_quota_headers(response: &mut Response, max: u32, decision: &RateLimitDecision) {
    let headers = response.headers_mut();
    headers.insert("x-ratelimit-limit", HeaderValue::from(max));
    headers.insert("x-ratelimit-remaining", HeaderValue::from(decision.remaining));
    headers.insert("x-ratelimit-reset", HeaderValue::from(decision.reset_time));
}

// == Response Cache Middleware ==
/// State for [`cache_response_middleware`].
#[derive(Clone)]
pub struct ResponseCacheState {
    /// Shared cache manager the bodies are stored through
    pub manager: Arc<CacheManager>,
    /// TTL in seconds for cached responses
    pub ttl: u64,
}

/// Serves successful GET JSON responses from the cache.
///
/// Keys are derived from the request path and query under a `route:`
/// segment, so mutation handlers can invalidate whole route families
/// with `clear(Some("route:*"))`. Hits are marked `x-cache: HIT`; stored
/// misses replay the buffered body with `x-cache: MISS`. Non-GET
/// requests and non-JSON or non-200 responses pass through untouched.
pub async fn cache_response_middleware(
    State(state): State<ResponseCacheState>,
    req: Request,
    next: Next,
) -> Response {
    if req.method() != Method::GET {
        return next.run(req).await;
    }

    let key = route_key(req.uri());

    if let Some(body) = state.manager.get::<serde_json::Value>(&key).await {
        let mut response = Json(body).into_response();
        response
            .headers_mut()
            .insert("x-cache", HeaderValue::from_static("HIT"));
        return response;
    }

    let response = next.run(req).await;

    if response.status() != StatusCode::OK || !is_json(&response) {
        return response;
    }

    let (parts, body) = response.into_parts();
    let bytes = match to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(key = %key, error = %e, "failed to buffer response body for caching");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    if let Ok(value) = serde_json::from_slice::<serde_json::Value>(&bytes) {
        state.manager.set(&key, &value, Some(state.ttl)).await;
    }

    let mut response = Response::from_parts(parts, Body::from(bytes));
    response
        .headers_mut()
        .insert("x-cache", HeaderValue::from_static("MISS"));
    response
}

fn route_key(uri: &Uri) -> String {
    match uri.query() {
        Some(query) => format!("route:{}?{}", uri.path(), query),
        None => format!("route:{}", uri.path()),
    }
}

fn is_json(response: &Response) -> bool {
    response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("application/json"))
}

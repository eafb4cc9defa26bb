//! Rate-limit admission middleware (spec §4.7). Grounded on the teacher's
//! `rate_limit_middleware` in `api/rest_api.rs` (an axum `from_fn_with_state`
//! function reading `X-Forwarded-For`, consulting a shared rate limiter,
//! and short-circuiting with an error before `next.run(req)`), generalized
//! from the teacher's single global counter to the four endpoint classes
//! the queue/CI/relationship surface actually needs.

use super::AppState;
use crate::ratelimit::EndpointClass;
use axum::extract::State;
use axum::http::{HeaderMap, Method, Request};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use std::sync::Arc;

pub async fn rate_limit(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    req: Request<axum::body::Body>,
    next: Next,
) -> Response {
    if req.uri().path() == "/health" {
        return next.run(req).await;
    }

    let client_ip = headers
        .get("X-Forwarded-For")
        .and_then(|h| h.to_str().ok())
        .unwrap_or("unknown");

    let class = classify(req.method(), req.uri().path());

    match state.rate_limiter.check(client_ip, class).await {
        Ok(_) => next.run(req).await,
        Err(e) => e.into_response(),
    }
}

/// Map a request's method and path to one of the four rate-limit classes
/// (spec §4.7). Reads never mutate the graph; the three write tiers track
/// how much damage a misfire does — a single CI edit vs. a full database
/// wipe.
fn classify(method: &Method, path: &str) -> EndpointClass {
    if path == "/api/cmdb/database/clear" {
        return EndpointClass::Destructive;
    }

    let is_heavy_read = path == "/api/cmdb/topology"
        || path == "/api/cmdb/topology/temporal"
        || path == "/api/cmdb/browse"
        || path.starts_with("/api/cmdb/impact/")
        || path.starts_with("/api/cmdb/failover-plan/")
        || path.starts_with("/api/relationships/shortest-path/")
        || path.starts_with("/api/relationships/all-paths/")
        || path == "/api/relationships/criticality-rankings"
        || path.ends_with("/trend")
        || path == "/api/relationships/temporal/expiring";

    match *method {
        Method::GET if is_heavy_read => EndpointClass::Expensive,
        Method::GET => EndpointClass::Read,
        Method::DELETE => EndpointClass::WriteSensitive,
        _ if path == "/api/relationships/auto-calculate-weights"
            || path == "/api/relationships/temporal/scaling-event"
            || path.ends_with("/activate")
            || path.ends_with("/deactivate")
            || path.ends_with("/engine/start")
            || path.ends_with("/engine/stop")
            || path == "/api/relationships/conditional/evaluate" =>
        {
            EndpointClass::WriteSensitive
        }
        _ => EndpointClass::Write,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clear_database_is_destructive() {
        assert_eq!(classify(&Method::DELETE, "/api/cmdb/database/clear"), EndpointClass::Destructive);
    }

    #[test]
    fn plain_get_is_read() {
        assert_eq!(classify(&Method::GET, "/api/cmdb/items/abc"), EndpointClass::Read);
    }

    #[test]
    fn topology_get_is_expensive() {
        assert_eq!(classify(&Method::GET, "/api/cmdb/topology"), EndpointClass::Expensive);
    }

    #[test]
    fn engine_start_is_write_sensitive() {
        assert_eq!(
            classify(&Method::POST, "/api/relationships/conditional/engine/start"),
            EndpointClass::WriteSensitive
        );
    }

    #[test]
    fn plain_post_is_write() {
        assert_eq!(classify(&Method::POST, "/api/cmdb/items"), EndpointClass::Write);
    }
}

//! Per-client rate limiting for `/api` routes.
//!
//! The counting itself lives in `wxcard_core::ratelimit` behind the
//! pluggable [`CounterStore`](wxcard_core::ratelimit::CounterStore); this
//! middleware only resolves the client address and answers 429.

use axum::extract::{Request, State};
use axum::http::{HeaderValue, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::state::AppState;

/// Axum middleware enforcing the per-route request limits.
pub async fn enforce(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let client = client_address(&request);
    let path = request.uri().path().to_string();

    if !state.limiter.check(&client, &path) {
        tracing::debug!(client = %client, path = %path, "Rate limit exceeded");
        let mut response =
            (StatusCode::TOO_MANY_REQUESTS, "Too Many Requests").into_response();
        response
            .headers_mut()
            .insert("retry-after", HeaderValue::from_static("60"));
        return response;
    }

    next.run(request).await
}

/// Resolve the client address from proxy headers, falling back to `local`
/// for direct development traffic.
fn client_address(request: &Request) -> String {
    request
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
        .unwrap_or_else(|| "local".to_string())
}

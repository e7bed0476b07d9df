//! Image proxy: serves card blobs with long-lived cache headers.
//!
//! Access is granted by a valid signed token when `IMAGE_SECRET` is
//! configured; otherwise (and for token-less requests) a Referer, if
//! present, must come from the same host so other sites cannot embed the
//! images.

use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, HeaderValue};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use serde::Deserialize;

use wxcard_core::error::CoreError;
use wxcard_core::token::verify_token;

use crate::error::{AppError, AppResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ImageParams {
    pub token: Option<String>,
}

/// GET /images/{key}?token= — stream one blob.
async fn serve_image(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Query(params): Query<ImageParams>,
    headers: HeaderMap,
) -> AppResult<impl IntoResponse> {
    match (state.config.image_secret.as_deref(), params.token.as_deref()) {
        (Some(secret), Some(token)) => {
            if !verify_token(&key, token, secret) {
                return Err(AppError::Core(CoreError::Forbidden(
                    "Invalid or expired image token".into(),
                )));
            }
        }
        _ => check_referer(&headers)?,
    }

    let object = state
        .blobs
        .get(&key)
        .await?
        .ok_or_else(|| AppError::Core(CoreError::NotFound {
            entity: "Image",
            key: key.clone(),
        }))?;

    let mut response_headers = HeaderMap::new();
    response_headers.insert(
        header::CONTENT_TYPE,
        object
            .mime_type
            .parse()
            .unwrap_or(HeaderValue::from_static("application/octet-stream")),
    );
    response_headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("public, max-age=31536000, immutable"),
    );

    Ok((response_headers, object.bytes))
}

/// Hotlink protection: a present Referer must come from the same host.
fn check_referer(headers: &HeaderMap) -> Result<(), AppError> {
    let Some(referer) = headers.get(header::REFERER).and_then(|v| v.to_str().ok()) else {
        return Ok(());
    };

    let host = headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    match referer_authority(referer) {
        Some(authority) if authority == host => Ok(()),
        _ => Err(AppError::Core(CoreError::Forbidden(
            "Cross-site image embedding is not allowed".into(),
        ))),
    }
}

/// Extract `host[:port]` from an absolute Referer URL.
fn referer_authority(referer: &str) -> Option<&str> {
    let rest = referer.split_once("://")?.1;
    let authority = rest.split(['/', '?', '#']).next()?;
    if authority.is_empty() {
        None
    } else {
        Some(authority)
    }
}

/// Image routes — mounted at `/images`.
pub fn router() -> Router<AppState> {
    Router::new().route("/{*key}", get(serve_image))
}

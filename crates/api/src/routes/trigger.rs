//! Manual run trigger.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::auth::AccessToken;
use crate::error::AppResult;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct TriggerParams {
    /// Optional city override; the pipeline draws a random city without it.
    pub city: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TriggerResponse {
    pub ok: bool,
    pub run_id: String,
    pub city: Option<String>,
}

/// POST /trigger?city=杭州 — start a run and answer immediately.
///
/// The pipeline may take minutes; execution is fire-and-forget and the
/// caller observes the outcome later through the run ledger.
async fn trigger_run(
    State(state): State<AppState>,
    _auth: AccessToken,
    Query(params): Query<TriggerParams>,
) -> AppResult<impl IntoResponse> {
    let run_id = uuid::Uuid::new_v4().to_string();
    let city = params
        .city
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty());

    let pipeline = Arc::clone(&state.pipeline);
    {
        let run_id = run_id.clone();
        let city = city.clone();
        tokio::spawn(async move {
            // Terminal state is already persisted by the pipeline itself;
            // the error here is for the operator log only.
            if let Err(e) = pipeline.execute(&run_id, city).await {
                tracing::warn!(run_id = %run_id, error = %e, "Triggered run failed");
            }
        });
    }

    tracing::info!(run_id = %run_id, city = ?city, "Manual run accepted");

    Ok((
        StatusCode::ACCEPTED,
        Json(TriggerResponse {
            ok: true,
            run_id,
            city,
        }),
    ))
}

/// Trigger routes — mounted at the `/api/v1` root.
pub fn router() -> Router<AppState> {
    Router::new().route("/trigger", post(trigger_run))
}

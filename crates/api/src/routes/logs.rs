//! Run history for the admin log view.

use axum::extract::{Path, Query, State};
use axum::routing::{delete, get};
use axum::{Json, Router};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::json;

use wxcard_core::error::CoreError;
use wxcard_core::status::RunStatus;
use wxcard_db::models::run::{Run, RunFilter};
use wxcard_db::repositories::RunRepo;

use crate::auth::AccessToken;
use crate::error::{AppError, AppResult};
use crate::state::AppState;

const DEFAULT_LIMIT: i64 = 30;
const MAX_LIMIT: i64 = 100;

#[derive(Debug, Deserialize)]
pub struct LogsParams {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub status: Option<RunStatus>,
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Serialize)]
pub struct LogsResponse {
    pub logs: Vec<Run>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
}

/// GET /logs?page=&limit=&status=&date= — full run rows, newest first.
async fn list_logs(
    State(state): State<AppState>,
    _auth: AccessToken,
    Query(params): Query<LogsParams>,
) -> AppResult<Json<LogsResponse>> {
    let page = params.page.unwrap_or(1).max(1);
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);

    let filter = RunFilter {
        status: params.status,
        date: params.date,
    };
    let (logs, total) = RunRepo::find_page(&state.pool, &filter, page, limit).await?;

    Ok(Json(LogsResponse {
        logs,
        total,
        page,
        limit,
    }))
}

/// DELETE /logs/{run_id} — administrative removal of one run record.
async fn delete_log(
    State(state): State<AppState>,
    _auth: AccessToken,
    Path(run_id): Path<String>,
) -> AppResult<Json<serde_json::Value>> {
    let deleted = RunRepo::delete(&state.pool, &run_id).await?;
    if !deleted {
        return Err(AppError::Core(CoreError::NotFound {
            entity: "Run",
            key: run_id,
        }));
    }

    tracing::info!(run_id = %run_id, "Run record deleted");
    Ok(Json(json!({ "ok": true })))
}

/// Log routes — mounted at `/logs`.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_logs))
        .route("/{run_id}", delete(delete_log))
}

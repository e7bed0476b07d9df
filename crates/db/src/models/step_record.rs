//! Durable step record models.

use serde::Serialize;
use sqlx::FromRow;
use wxcard_core::types::{DbId, Timestamp};

/// A row from the `run_steps` table: one completed step of a run with its
/// memoized output.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct StepRecord {
    pub id: DbId,
    pub run_id: String,
    pub step_name: String,
    pub output: serde_json::Value,
    pub attempt: i32,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

//! Run ledger models and DTOs.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use wxcard_core::status::RunStatus;
use wxcard_core::types::{DbId, Timestamp};

/// A row from the `generation_runs` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Run {
    pub id: DbId,
    pub run_id: String,
    pub city: String,
    pub resolved_city_name: Option<String>,
    pub weather_date: Option<NaiveDate>,
    pub weather_condition: Option<String>,
    pub weather_icon: Option<String>,
    pub temp_min: Option<i32>,
    pub temp_max: Option<i32>,
    pub current_temp: Option<i32>,
    pub model: Option<String>,
    pub image_key: Option<String>,
    pub status: String,
    pub error_message: Option<String>,
    pub duration_ms: Option<i64>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Run {
    /// Parse the status column into the domain enum.
    pub fn run_status(&self) -> Result<RunStatus, wxcard_core::error::CoreError> {
        RunStatus::from_str(&self.status)
    }
}

/// DTO for inserting the run identity row at pipeline start.
#[derive(Debug, Clone)]
pub struct NewRun {
    pub run_id: String,
    pub city: String,
    pub weather_date: NaiveDate,
}

/// Weather fields persisted after a successful lookup.
#[derive(Debug, Clone)]
pub struct WeatherUpdate {
    pub resolved_city_name: String,
    pub weather_date: NaiveDate,
    pub weather_condition: String,
    pub weather_icon: String,
    pub temp_min: i32,
    pub temp_max: i32,
    pub current_temp: i32,
}

/// Optional filters for listing runs.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RunFilter {
    /// Filter by run status.
    pub status: Option<RunStatus>,
    /// Filter by weather date.
    pub date: Option<NaiveDate>,
}

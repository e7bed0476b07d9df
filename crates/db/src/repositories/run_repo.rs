//! Repository for the `generation_runs` table — the run ledger.
//!
//! The pipeline exclusively owns writes to a row while its status is
//! `running`; both terminal transitions are guarded so a terminal row is
//! never overwritten.

use sqlx::PgPool;

use wxcard_core::status::RunStatus;

use crate::models::run::{NewRun, Run, RunFilter, WeatherUpdate};

/// Column list for `generation_runs` queries.
const COLUMNS: &str = "\
    id, run_id, city, resolved_city_name, weather_date, weather_condition, \
    weather_icon, temp_min, temp_max, current_temp, model, image_key, \
    status, error_message, duration_ms, created_at, updated_at";

/// Provides CRUD operations for generation runs.
pub struct RunRepo;

impl RunRepo {
    /// Insert the run identity row with status `running`.
    ///
    /// Idempotent on `run_id`: re-executing the same logical run returns the
    /// existing row instead of failing on the unique constraint.
    pub async fn insert(pool: &PgPool, input: &NewRun) -> Result<Run, sqlx::Error> {
        let query = format!(
            "INSERT INTO generation_runs (run_id, city, weather_date, status) \
             VALUES ($1, $2, $3, $4) \
             ON CONFLICT (run_id) DO NOTHING \
             RETURNING {COLUMNS}"
        );
        let inserted = sqlx::query_as::<_, Run>(&query)
            .bind(&input.run_id)
            .bind(&input.city)
            .bind(input.weather_date)
            .bind(RunStatus::Running.as_str())
            .fetch_optional(pool)
            .await?;

        match inserted {
            Some(run) => Ok(run),
            // Conflict: this is a re-execution of an already-recorded run.
            None => Self::find_by_run_id(pool, &input.run_id)
                .await?
                .ok_or(sqlx::Error::RowNotFound),
        }
    }

    /// Find a run by its external run id.
    pub async fn find_by_run_id(pool: &PgPool, run_id: &str) -> Result<Option<Run>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM generation_runs WHERE run_id = $1");
        sqlx::query_as::<_, Run>(&query)
            .bind(run_id)
            .fetch_optional(pool)
            .await
    }

    /// Persist resolved weather fields onto a run. Plain overwrite.
    pub async fn update_weather(
        pool: &PgPool,
        run_id: &str,
        weather: &WeatherUpdate,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE generation_runs SET \
                resolved_city_name = $2, weather_date = $3, weather_condition = $4, \
                weather_icon = $5, temp_min = $6, temp_max = $7, current_temp = $8, \
                updated_at = NOW() \
             WHERE run_id = $1",
        )
        .bind(run_id)
        .bind(&weather.resolved_city_name)
        .bind(weather.weather_date)
        .bind(&weather.weather_condition)
        .bind(&weather.weather_icon)
        .bind(weather.temp_min)
        .bind(weather.temp_max)
        .bind(weather.current_temp)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Transition a run to `succeeded` with its image key, model, and
    /// wall-clock duration.
    ///
    /// Guarded on `status = 'running'`: a row that already reached a
    /// terminal status is left untouched (replays are no-ops).
    pub async fn mark_succeeded(
        pool: &PgPool,
        run_id: &str,
        image_key: &str,
        model: &str,
        duration_ms: i64,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE generation_runs SET \
                image_key = $2, model = $3, status = $4, error_message = NULL, \
                duration_ms = $5, updated_at = NOW() \
             WHERE run_id = $1 AND status = $6",
        )
        .bind(run_id)
        .bind(image_key)
        .bind(model)
        .bind(RunStatus::Succeeded.as_str())
        .bind(duration_ms)
        .bind(RunStatus::Running.as_str())
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Transition a run to `failed` with a human-readable message.
    ///
    /// Guarded on `status = 'running'` like [`mark_succeeded`](Self::mark_succeeded).
    pub async fn mark_failed(
        pool: &PgPool,
        run_id: &str,
        error_message: &str,
        duration_ms: i64,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE generation_runs SET \
                status = $2, error_message = $3, duration_ms = $4, updated_at = NOW() \
             WHERE run_id = $1 AND status = $5",
        )
        .bind(run_id)
        .bind(RunStatus::Failed.as_str())
        .bind(error_message)
        .bind(duration_ms)
        .bind(RunStatus::Running.as_str())
        .execute(pool)
        .await?;
        Ok(())
    }

    /// List runs ordered by creation time descending, with optional status
    /// and date filters. Returns the page plus the total matching count.
    pub async fn find_page(
        pool: &PgPool,
        filter: &RunFilter,
        page: i64,
        limit: i64,
    ) -> Result<(Vec<Run>, i64), sqlx::Error> {
        let offset = (page.max(1) - 1) * limit;

        // Build the WHERE clause and track the next bind parameter index.
        let mut conditions: Vec<String> = Vec::new();
        let mut bind_idx: u32 = 1;

        if filter.status.is_some() {
            conditions.push(format!("status = ${bind_idx}"));
            bind_idx += 1;
        }
        if filter.date.is_some() {
            conditions.push(format!("weather_date = ${bind_idx}"));
            bind_idx += 1;
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let query = format!(
            "SELECT {COLUMNS} FROM generation_runs \
             {where_clause} \
             ORDER BY created_at DESC \
             LIMIT ${bind_idx} OFFSET ${}",
            bind_idx + 1,
        );

        let mut q = sqlx::query_as::<_, Run>(&query);
        if let Some(status) = filter.status {
            q = q.bind(status.as_str());
        }
        if let Some(date) = filter.date {
            q = q.bind(date);
        }
        let rows = q.bind(limit).bind(offset).fetch_all(pool).await?;

        let count_query =
            format!("SELECT COUNT(*) FROM generation_runs {where_clause}");
        let mut c = sqlx::query_as::<_, (i64,)>(&count_query);
        if let Some(status) = filter.status {
            c = c.bind(status.as_str());
        }
        if let Some(date) = filter.date {
            c = c.bind(date);
        }
        let (total,) = c.fetch_one(pool).await?;

        Ok((rows, total))
    }

    /// List succeeded runs that have a stored image — the gallery feed.
    pub async fn list_cards(
        pool: &PgPool,
        page: i64,
        limit: i64,
    ) -> Result<(Vec<Run>, i64), sqlx::Error> {
        let offset = (page.max(1) - 1) * limit;
        let query = format!(
            "SELECT {COLUMNS} FROM generation_runs \
             WHERE status = $1 AND image_key IS NOT NULL \
             ORDER BY created_at DESC \
             LIMIT $2 OFFSET $3"
        );
        let rows = sqlx::query_as::<_, Run>(&query)
            .bind(RunStatus::Succeeded.as_str())
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await?;

        let (total,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM generation_runs \
             WHERE status = $1 AND image_key IS NOT NULL",
        )
        .bind(RunStatus::Succeeded.as_str())
        .fetch_one(pool)
        .await?;

        Ok((rows, total))
    }

    /// Delete a run by its external id. Returns true if a row was removed.
    ///
    /// Step records go with it via the foreign-key cascade.
    pub async fn delete(pool: &PgPool, run_id: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM generation_runs WHERE run_id = $1")
            .bind(run_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Fail `running` rows created before `cutoff` (watchdog sweep for runs
    /// whose process died mid-flight). Returns the number of rows failed.
    pub async fn fail_stale_running(
        pool: &PgPool,
        cutoff: wxcard_core::types::Timestamp,
        error_message: &str,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE generation_runs SET \
                status = $2, error_message = $3, \
                duration_ms = (EXTRACT(EPOCH FROM (NOW() - created_at)) * 1000)::BIGINT, \
                updated_at = NOW() \
             WHERE status = $1 AND created_at < $4",
        )
        .bind(RunStatus::Running.as_str())
        .bind(RunStatus::Failed.as_str())
        .bind(error_message)
        .bind(cutoff)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }
}

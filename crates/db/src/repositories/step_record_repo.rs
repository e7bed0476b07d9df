//! Repository for the `run_steps` table — the durable step memoization
//! arena keyed by `(run_id, step_name)`.

use sqlx::PgPool;

use crate::models::step_record::StepRecord;

const COLUMNS: &str = "id, run_id, step_name, output, attempt, created_at, updated_at";

/// Provides lookup and upsert for completed-step records.
pub struct StepRecordRepo;

impl StepRecordRepo {
    /// Find the completed record for one step of a run, if any.
    pub async fn find(
        pool: &PgPool,
        run_id: &str,
        step_name: &str,
    ) -> Result<Option<StepRecord>, sqlx::Error> {
        let query =
            format!("SELECT {COLUMNS} FROM run_steps WHERE run_id = $1 AND step_name = $2");
        sqlx::query_as::<_, StepRecord>(&query)
            .bind(run_id)
            .bind(step_name)
            .fetch_optional(pool)
            .await
    }

    /// Record a step completion with its memoized output.
    ///
    /// Upsert on `(run_id, step_name)`: at-least-once step execution means a
    /// replayed completion simply overwrites the record with the same data.
    pub async fn upsert(
        pool: &PgPool,
        run_id: &str,
        step_name: &str,
        output: &serde_json::Value,
        attempt: i32,
    ) -> Result<StepRecord, sqlx::Error> {
        let query = format!(
            "INSERT INTO run_steps (run_id, step_name, output, attempt) \
             VALUES ($1, $2, $3, $4) \
             ON CONFLICT (run_id, step_name) DO UPDATE SET \
                output = EXCLUDED.output, attempt = EXCLUDED.attempt, updated_at = NOW() \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, StepRecord>(&query)
            .bind(run_id)
            .bind(step_name)
            .bind(output)
            .bind(attempt)
            .fetch_one(pool)
            .await
    }

    /// List all completed steps for a run in execution order.
    pub async fn list_for_run(
        pool: &PgPool,
        run_id: &str,
    ) -> Result<Vec<StepRecord>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM run_steps WHERE run_id = $1 ORDER BY created_at, id"
        );
        sqlx::query_as::<_, StepRecord>(&query)
            .bind(run_id)
            .fetch_all(pool)
            .await
    }
}

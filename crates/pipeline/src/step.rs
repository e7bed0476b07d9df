//! Durable step execution.
//!
//! [`StepExecutor`] gives each named step at-least-once execution with
//! memoized replay: a step that already completed for this run returns its
//! persisted output instead of running again, so a run interrupted between
//! any two steps can be re-executed safely from the top.

use std::future::Future;

use serde::de::DeserializeOwned;
use serde::Serialize;
use sqlx::PgPool;

use wxcard_db::repositories::StepRecordRepo;

use crate::retry::RetryPolicy;

/// Errors from the step execution layer.
#[derive(Debug, thiserror::Error)]
pub enum StepError {
    /// Reading or writing the step record arena failed.
    #[error("step ledger error: {0}")]
    Ledger(#[from] sqlx::Error),

    /// A step output could not be serialized or a memoized output could
    /// not be deserialized.
    #[error("step output codec error: {0}")]
    Codec(#[from] serde_json::Error),

    /// The step failed and its retry budget is spent. The display form is
    /// the underlying error message — that is what gets persisted on the
    /// run row.
    #[error("{message}")]
    Exhausted {
        step: &'static str,
        attempts: u32,
        message: String,
    },
}

/// Executes named steps for one run.
pub struct StepExecutor {
    pool: PgPool,
    run_id: String,
}

impl StepExecutor {
    pub fn new(pool: PgPool, run_id: impl Into<String>) -> Self {
        Self {
            pool,
            run_id: run_id.into(),
        }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Run a named step, replaying its memoized output if it already
    /// completed for this run.
    ///
    /// On success the output is persisted before it is returned, so the
    /// step's effect is durable before the next step begins. On failure the
    /// step is retried per `policy`; once the budget is spent the final
    /// error is returned as [`StepError::Exhausted`].
    pub async fn run<T, E, F, Fut>(
        &self,
        name: &'static str,
        policy: &RetryPolicy,
        mut op: F,
    ) -> Result<T, StepError>
    where
        T: Serialize + DeserializeOwned,
        E: std::fmt::Display,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Some(record) = StepRecordRepo::find(&self.pool, &self.run_id, name).await? {
            tracing::debug!(run_id = %self.run_id, step = name, "Replaying memoized step output");
            return Ok(serde_json::from_value(record.output)?);
        }

        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            match op().await {
                Ok(output) => {
                    let value = serde_json::to_value(&output)?;
                    StepRecordRepo::upsert(&self.pool, &self.run_id, name, &value, attempt as i32)
                        .await?;
                    tracing::debug!(run_id = %self.run_id, step = name, attempt, "Step completed");
                    return Ok(output);
                }
                Err(e) if attempt <= policy.limit => {
                    let delay = policy.delay_for_attempt(attempt);
                    tracing::warn!(
                        run_id = %self.run_id,
                        step = name,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Step failed, retrying",
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    tracing::error!(
                        run_id = %self.run_id,
                        step = name,
                        attempts = attempt,
                        error = %e,
                        "Step failed, retry budget spent",
                    );
                    return Err(StepError::Exhausted {
                        step: name,
                        attempts: attempt,
                        message: e.to_string(),
                    });
                }
            }
        }
    }
}

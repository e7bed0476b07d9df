//! Scheduled card generation.
//!
//! Fires a fresh run on a fixed interval using `tokio::time::interval`.
//! Each tick gets its own run id and the pipeline executes on a detached
//! task, so a slow generation never delays the schedule. Runs until
//! `cancel` is triggered.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use wxcard_pipeline::GenerationPipeline;

/// Default schedule period: once daily.
const DEFAULT_INTERVAL_SECS: u64 = 86_400;

/// Run the scheduled-generation loop.
///
/// Disabled unless `SCHEDULER_ENABLED=true` — deployments that run the
/// standalone worker binary leave scheduling to it and would otherwise
/// generate every card twice.
pub async fn run(pipeline: Arc<GenerationPipeline>, cancel: CancellationToken) {
    let enabled = std::env::var("SCHEDULER_ENABLED")
        .map(|v| v == "true")
        .unwrap_or(false);
    if !enabled {
        tracing::info!("Card scheduler disabled (set SCHEDULER_ENABLED=true to enable)");
        return;
    }

    let interval_secs: u64 = std::env::var("SCHEDULE_INTERVAL_SECS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(DEFAULT_INTERVAL_SECS);
    let run_on_start = std::env::var("RUN_ON_START")
        .map(|v| v == "true")
        .unwrap_or(false);

    tracing::info!(interval_secs, run_on_start, "Card scheduler started");

    let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));
    if !run_on_start {
        // the first tick fires immediately; swallow it unless asked to
        // generate at startup
        interval.tick().await;
    }

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Card scheduler stopping");
                break;
            }
            _ = interval.tick() => {
                spawn_scheduled_run(&pipeline);
            }
        }
    }
}

/// Fire one scheduled run without waiting for its outcome.
fn spawn_scheduled_run(pipeline: &Arc<GenerationPipeline>) {
    let run_id = uuid::Uuid::new_v4().to_string();
    tracing::info!(run_id = %run_id, "Scheduled run starting");

    let pipeline = Arc::clone(pipeline);
    tokio::spawn(async move {
        match pipeline.execute(&run_id, None).await {
            Ok(outcome) => {
                tracing::info!(
                    run_id = %run_id,
                    image_key = %outcome.image_key,
                    duration_ms = outcome.duration_ms,
                    "Scheduled run succeeded",
                );
            }
            Err(e) => {
                tracing::warn!(run_id = %run_id, error = %e, "Scheduled run failed");
            }
        }
    });
}

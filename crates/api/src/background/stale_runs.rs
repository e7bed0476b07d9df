//! Watchdog for runs abandoned mid-flight.
//!
//! A process that dies between steps leaves its row `running` forever.
//! This sweep fails such rows once they exceed a timeout, restoring the
//! property that every run reaches a terminal status.

use std::time::Duration;

use chrono::Utc;
use sqlx::PgPool;
use tokio_util::sync::CancellationToken;
use wxcard_db::repositories::RunRepo;

/// How often the sweep runs.
const DEFAULT_CHECK_INTERVAL_SECS: u64 = 600;

/// Age after which a `running` row counts as abandoned.
const DEFAULT_TIMEOUT_SECS: i64 = 1800;

/// Message persisted on rows the watchdog fails.
const STALE_MESSAGE: &str = "run exceeded the watchdog timeout while still running";

/// Run the stale-run sweep loop until `cancel` is triggered.
pub async fn run(pool: PgPool, cancel: CancellationToken) {
    let check_interval_secs: u64 = std::env::var("STALE_CHECK_INTERVAL_SECS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(DEFAULT_CHECK_INTERVAL_SECS);
    let timeout_secs: i64 = std::env::var("STALE_RUN_TIMEOUT_SECS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(DEFAULT_TIMEOUT_SECS);

    tracing::info!(check_interval_secs, timeout_secs, "Stale-run watchdog started");

    let mut interval = tokio::time::interval(Duration::from_secs(check_interval_secs));

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Stale-run watchdog stopping");
                break;
            }
            _ = interval.tick() => {
                let cutoff = Utc::now() - chrono::Duration::seconds(timeout_secs);
                match RunRepo::fail_stale_running(&pool, cutoff, STALE_MESSAGE).await {
                    Ok(0) => {
                        tracing::debug!("Stale-run sweep: nothing to fail");
                    }
                    Ok(failed) => {
                        tracing::warn!(failed, "Stale-run sweep: failed abandoned runs");
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Stale-run sweep failed");
                    }
                }
            }
        }
    }
}

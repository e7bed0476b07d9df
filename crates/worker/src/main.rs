//! Standalone scheduled runner: generates one card per period without the
//! HTTP surface. Deployments that want an API process too run `wxcard-api`
//! alongside (with its scheduler left disabled).

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use wxcard_gemini::{GeminiClient, DEFAULT_MODEL};
use wxcard_pipeline::GenerationPipeline;
use wxcard_storage::{BlobStore, FsBlobStore, S3BlobStore};
use wxcard_weather::OpenMeteoClient;

/// Default schedule period: once daily.
const DEFAULT_INTERVAL_SECS: u64 = 86_400;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "wxcard_worker=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Database ---
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let pool = wxcard_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");
    wxcard_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database ready");

    // --- Blob store ---
    let blobs: Arc<dyn BlobStore> = match std::env::var("BLOB_BACKEND").as_deref() {
        Ok("s3") => {
            let bucket =
                std::env::var("BLOB_BUCKET").expect("BLOB_BUCKET must be set for the s3 backend");
            Arc::new(S3BlobStore::from_env(bucket).await)
        }
        _ => {
            let root = std::env::var("CARDS_DIR").unwrap_or_else(|_| "data/cards".into());
            Arc::new(FsBlobStore::new(root))
        }
    };

    // --- Generation pipeline ---
    let api_key = std::env::var("GEMINI_API_KEY").expect("GEMINI_API_KEY must be set");
    let model = std::env::var("GEMINI_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.into());
    let pipeline = GenerationPipeline::new(
        pool,
        Arc::new(OpenMeteoClient::new()),
        Arc::new(GeminiClient::new(api_key, model)),
        blobs,
    );

    // --- Shutdown wiring ---
    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Received shutdown signal");
            cancel.cancel();
        });
    }

    run_schedule(pipeline, cancel).await;
    tracing::info!("Worker stopped");
}

/// Generate one card per interval until cancelled.
///
/// Unlike the API trigger, the worker has nothing else to do, so it awaits
/// each run inline and logs the outcome.
async fn run_schedule(pipeline: GenerationPipeline, cancel: CancellationToken) {
    let interval_secs: u64 = std::env::var("SCHEDULE_INTERVAL_SECS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(DEFAULT_INTERVAL_SECS);
    let run_on_start = std::env::var("RUN_ON_START")
        .map(|v| v == "true")
        .unwrap_or(false);

    tracing::info!(interval_secs, run_on_start, "Schedule started");

    let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));
    if !run_on_start {
        // the first tick fires immediately; swallow it unless asked to
        // generate at startup
        interval.tick().await;
    }

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Schedule stopping");
                break;
            }
            _ = interval.tick() => {
                let run_id = uuid::Uuid::new_v4().to_string();
                tracing::info!(run_id = %run_id, "Scheduled generation starting");
                match pipeline.execute(&run_id, None).await {
                    Ok(outcome) => {
                        tracing::info!(
                            run_id = %run_id,
                            city = %outcome.city,
                            image_key = %outcome.image_key,
                            duration_ms = outcome.duration_ms,
                            "Scheduled generation finished",
                        );
                    }
                    Err(e) => {
                        tracing::error!(run_id = %run_id, error = %e, "Scheduled generation failed");
                    }
                }
            }
        }
    }
}

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use wxcard_api::config::ServerConfig;
use wxcard_api::router::build_app_router;
use wxcard_api::state::AppState;
use wxcard_api::background;
use wxcard_core::ratelimit::{InMemoryCounterStore, RateLimiter};
use wxcard_gemini::{GeminiClient, DEFAULT_MODEL};
use wxcard_pipeline::GenerationPipeline;
use wxcard_storage::{BlobStore, FsBlobStore, S3BlobStore};
use wxcard_weather::OpenMeteoClient;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "wxcard_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    // --- Database ---
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = wxcard_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");
    tracing::info!("Database connection pool created");

    wxcard_db::health_check(&pool)
        .await
        .expect("Database health check failed");

    wxcard_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database migrations applied");

    // --- Blob store ---
    let blobs: Arc<dyn BlobStore> = match std::env::var("BLOB_BACKEND").as_deref() {
        Ok("s3") => {
            let bucket =
                std::env::var("BLOB_BUCKET").expect("BLOB_BUCKET must be set for the s3 backend");
            tracing::info!(bucket = %bucket, "Using S3 blob store");
            Arc::new(S3BlobStore::from_env(bucket).await)
        }
        _ => {
            let root = std::env::var("CARDS_DIR").unwrap_or_else(|_| "data/cards".into());
            tracing::info!(root = %root, "Using filesystem blob store");
            Arc::new(FsBlobStore::new(root))
        }
    };

    // --- Generation pipeline ---
    let api_key = std::env::var("GEMINI_API_KEY").expect("GEMINI_API_KEY must be set");
    let model = std::env::var("GEMINI_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.into());
    let gemini = GeminiClient::new(api_key, model);
    let weather = OpenMeteoClient::new();

    let pipeline = Arc::new(GenerationPipeline::new(
        pool.clone(),
        Arc::new(weather),
        Arc::new(gemini),
        Arc::clone(&blobs),
    ));

    // --- App state ---
    let state = AppState {
        pool: pool.clone(),
        config: Arc::new(config.clone()),
        pipeline: Arc::clone(&pipeline),
        blobs,
        limiter: Arc::new(RateLimiter::new(InMemoryCounterStore::new())),
    };

    // --- Background tasks ---
    let cancel = tokio_util::sync::CancellationToken::new();
    let scheduler_handle = tokio::spawn(background::scheduler::run(
        Arc::clone(&pipeline),
        cancel.clone(),
    ));
    let watchdog_handle = tokio::spawn(background::stale_runs::run(pool, cancel.clone()));
    tracing::info!("Background tasks started (scheduler, stale-run watchdog)");

    // --- Router ---
    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    cancel.cancel();
    let _ = tokio::time::timeout(Duration::from_secs(5), scheduler_handle).await;
    let _ = tokio::time::timeout(Duration::from_secs(5), watchdog_handle).await;
    tracing::info!("Background tasks stopped");

    tracing::info!("Graceful shutdown complete");
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix) so the server
/// shuts down cleanly whether stopped interactively or by a process
/// manager (e.g. systemd, Docker, Kubernetes).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}

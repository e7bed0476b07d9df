use std::sync::Arc;

use wxcard_core::ratelimit::{InMemoryCounterStore, RateLimiter};
use wxcard_pipeline::GenerationPipeline;
use wxcard_storage::BlobStore;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: wxcard_db::DbPool,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// The generation pipeline spawned by triggers.
    pub pipeline: Arc<GenerationPipeline>,
    /// Blob store the image proxy reads from.
    pub blobs: Arc<dyn BlobStore>,
    /// Request rate limiter for `/api` routes.
    pub limiter: Arc<RateLimiter<InMemoryCounterStore>>,
}

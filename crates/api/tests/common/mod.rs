#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::Body;
use axum::http::Request;
use axum::response::Response;
use axum::Router;
use http_body_util::BodyExt;
use sqlx::PgPool;
use tower::ServiceExt;

use wxcard_api::config::ServerConfig;
use wxcard_api::router::build_app_router;
use wxcard_api::state::AppState;
use wxcard_core::ratelimit::{InMemoryCounterStore, RateLimiter};
use wxcard_gemini::{GeminiError, GeneratedImage};
use wxcard_pipeline::{Backoff, GenerationPipeline, ImageGenerator, RetryPolicy, WeatherLookup};
use wxcard_storage::{BlobStore, StorageError, StoredObject};
use wxcard_weather::{WeatherError, WeatherInfo};

/// Shared secret the test config accepts on protected endpoints.
pub const TEST_ACCESS_CODE: &str = "test-access-code";

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        access_code: TEST_ACCESS_CODE.to_string(),
        image_secret: None,
    }
}

// ---------------------------------------------------------------------------
// Mock pipeline leaves — tests never reach external services
// ---------------------------------------------------------------------------

struct NoWeather;

#[async_trait::async_trait]
impl WeatherLookup for NoWeather {
    async fn current_weather(&self, city: &str) -> Result<WeatherInfo, WeatherError> {
        Err(WeatherError::CityNotFound(city.to_string()))
    }
}

struct NoImages;

#[async_trait::async_trait]
impl ImageGenerator for NoImages {
    async fn generate(&self, _prompt: &str) -> Result<GeneratedImage, GeminiError> {
        Err(GeminiError::NoImage)
    }
}

/// In-memory blob store tests can seed and inspect.
#[derive(Default)]
pub struct MemoryBlobStore {
    objects: Mutex<HashMap<String, StoredObject>>,
}

#[async_trait::async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(&self, key: &str, bytes: &[u8], mime_type: &str) -> Result<(), StorageError> {
        self.objects.lock().unwrap().insert(
            key.to_string(),
            StoredObject {
                bytes: bytes.to_vec(),
                mime_type: mime_type.to_string(),
            },
        );
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<StoredObject>, StorageError> {
        Ok(self.objects.lock().unwrap().get(key).cloned())
    }
}

// ---------------------------------------------------------------------------
// App construction
// ---------------------------------------------------------------------------

/// Build the full application router with all middleware layers, mirroring
/// `main.rs` so tests exercise the production stack.
pub fn build_test_app(pool: PgPool) -> Router {
    build_test_app_with(pool, test_config(), Arc::new(MemoryBlobStore::default()))
}

/// Variant taking a custom config and blob store (image proxy tests seed
/// blobs and configure the token secret).
pub fn build_test_app_with(
    pool: PgPool,
    config: ServerConfig,
    blobs: Arc<dyn BlobStore>,
) -> Router {
    let pipeline = Arc::new(
        GenerationPipeline::new(
            pool.clone(),
            Arc::new(NoWeather),
            Arc::new(NoImages),
            Arc::clone(&blobs),
        )
        .with_image_retry(RetryPolicy {
            limit: 1,
            delay: Duration::ZERO,
            backoff: Backoff::Fixed,
        }),
    );

    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        pipeline,
        blobs,
        limiter: Arc::new(RateLimiter::new(InMemoryCounterStore::new())),
    };

    build_app_router(state, &config)
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

/// GET a path with no headers.
pub async fn get(app: Router, uri: &str) -> Response {
    app.oneshot(
        Request::builder()
            .uri(uri)
            .body(Body::empty())
            .unwrap(),
    )
    .await
    .unwrap()
}

/// Send a request with the test bearer secret attached.
pub async fn authed(app: Router, method: &str, uri: &str) -> Response {
    app.oneshot(
        Request::builder()
            .method(method)
            .uri(uri)
            .header("authorization", format!("Bearer {TEST_ACCESS_CODE}"))
            .body(Body::empty())
            .unwrap(),
    )
    .await
    .unwrap()
}

/// Collect a response body as JSON.
pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

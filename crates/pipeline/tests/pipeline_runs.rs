//! End-to-end pipeline tests over a real ledger with mocked leaves.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use assert_matches::assert_matches;
use chrono::NaiveDate;
use sqlx::PgPool;

use wxcard_core::cities::CITIES;
use wxcard_db::repositories::{RunRepo, StepRecordRepo};
use wxcard_gemini::{GeminiError, GeneratedImage};
use wxcard_pipeline::{
    Backoff, GenerationPipeline, ImageGenerator, PipelineError, RetryPolicy, WeatherLookup,
};
use wxcard_storage::{BlobStore, StorageError, StoredObject};
use wxcard_weather::{WeatherError, WeatherInfo};

// ---------------------------------------------------------------------------
// Mock leaves
// ---------------------------------------------------------------------------

struct StaticWeather(WeatherInfo);

#[async_trait::async_trait]
impl WeatherLookup for StaticWeather {
    async fn current_weather(&self, _city: &str) -> Result<WeatherInfo, WeatherError> {
        Ok(self.0.clone())
    }
}

struct FailingWeather;

#[async_trait::async_trait]
impl WeatherLookup for FailingWeather {
    async fn current_weather(&self, city: &str) -> Result<WeatherInfo, WeatherError> {
        Err(WeatherError::CityNotFound(city.to_string()))
    }
}

/// Returns `NoImage` for the first `fail_first` calls, then either succeeds
/// or keeps failing.
struct MockImages {
    calls: AtomicU32,
    fail_first: u32,
    succeed_after: bool,
}

impl MockImages {
    fn succeeding() -> Self {
        Self {
            calls: AtomicU32::new(0),
            fail_first: 0,
            succeed_after: true,
        }
    }

    fn never_an_image() -> Self {
        Self {
            calls: AtomicU32::new(0),
            fail_first: 0,
            succeed_after: false,
        }
    }

    fn failing_then_ok(failures: u32) -> Self {
        Self {
            calls: AtomicU32::new(0),
            fail_first: failures,
            succeed_after: true,
        }
    }

    fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl ImageGenerator for MockImages {
    async fn generate(&self, _prompt: &str) -> Result<GeneratedImage, GeminiError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        if n < self.fail_first || !self.succeed_after {
            return Err(GeminiError::NoImage);
        }
        Ok(GeneratedImage {
            bytes: b"card image bytes".to_vec(),
            mime_type: "image/png".to_string(),
            model: "test-model".to_string(),
        })
    }
}

#[derive(Default)]
struct MemoryBlobStore {
    objects: Mutex<HashMap<String, StoredObject>>,
    fail_puts: bool,
}

impl MemoryBlobStore {
    fn failing() -> Self {
        Self {
            objects: Mutex::new(HashMap::new()),
            fail_puts: true,
        }
    }
}

#[async_trait::async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(&self, key: &str, bytes: &[u8], mime_type: &str) -> Result<(), StorageError> {
        if self.fail_puts {
            return Err(StorageError::Backend("bucket unavailable".to_string()));
        }
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
// Helpers
// ---------------------------------------------------------------------------

fn hangzhou_weather() -> WeatherInfo {
    WeatherInfo {
        city: "杭州".to_string(),
        resolved_name: "杭州".to_string(),
        latitude: 30.29,
        longitude: 120.16,
        date: NaiveDate::from_ymd_opt(2026, 8, 4).unwrap(),
        condition_text: "多云".to_string(),
        condition_icon: "⛅".to_string(),
        temp_min: 10,
        temp_max: 18,
        current_temp: 15,
    }
}

/// Pipeline with a zero-delay retry so tests do not sleep.
fn pipeline(
    pool: &PgPool,
    weather: Arc<dyn WeatherLookup>,
    images: Arc<dyn ImageGenerator>,
    blobs: Arc<dyn BlobStore>,
) -> GenerationPipeline {
    GenerationPipeline::new(pool.clone(), weather, images, blobs).with_image_retry(RetryPolicy {
        limit: 1,
        delay: Duration::ZERO,
        backoff: Backoff::Fixed,
    })
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn successful_run_with_weather(pool: PgPool) {
    let blobs = Arc::new(MemoryBlobStore::default());
    let p = pipeline(
        &pool,
        Arc::new(StaticWeather(hangzhou_weather())),
        Arc::new(MockImages::succeeding()),
        blobs.clone(),
    );

    let outcome = p.execute("r1", Some("杭州".to_string())).await.unwrap();
    assert_eq!(outcome.run_id, "r1");
    assert_eq!(outcome.city, "杭州");
    assert_eq!(outcome.model, "test-model");
    assert!(outcome.duration_ms >= 0);

    let run = RunRepo::find_by_run_id(&pool, "r1").await.unwrap().unwrap();
    assert_eq!(run.status, "succeeded");
    assert_eq!(run.temp_min, Some(10));
    assert_eq!(run.temp_max, Some(18));
    assert_eq!(run.image_key.as_deref(), Some(outcome.image_key.as_str()));
    assert!(run.duration_ms.unwrap() >= 0);
    assert!(run.error_message.is_none());

    // The image landed in the store under the declared mime type.
    let stored = blobs.get(&outcome.image_key).await.unwrap().unwrap();
    assert_eq!(stored.bytes, b"card image bytes");
    assert_eq!(stored.mime_type, "image/png");
}

#[sqlx::test(migrations = "../db/migrations")]
async fn weather_failure_does_not_fail_the_run(pool: PgPool) {
    let p = pipeline(
        &pool,
        Arc::new(FailingWeather),
        Arc::new(MockImages::succeeding()),
        Arc::new(MemoryBlobStore::default()),
    );

    let outcome = p.execute("r2", Some("杭州".to_string())).await.unwrap();
    assert!(!outcome.image_key.is_empty());

    let run = RunRepo::find_by_run_id(&pool, "r2").await.unwrap().unwrap();
    assert_eq!(run.status, "succeeded");
    assert!(run.resolved_city_name.is_none());
    assert!(run.weather_condition.is_none());
    assert!(run.temp_min.is_none());
    assert!(run.temp_max.is_none());
    assert!(run.current_temp.is_none());
}

#[sqlx::test(migrations = "../db/migrations")]
async fn no_image_exhausts_retries_and_fails_the_run(pool: PgPool) {
    let images = Arc::new(MockImages::never_an_image());
    let p = pipeline(
        &pool,
        Arc::new(StaticWeather(hangzhou_weather())),
        images.clone(),
        Arc::new(MemoryBlobStore::default()),
    );

    let err = p.execute("r3", Some("杭州".to_string())).await.unwrap_err();
    assert_matches!(err, PipelineError::RunFailed { .. });

    // limit 1 retry → two attempts in total
    assert_eq!(images.calls(), 2);

    let run = RunRepo::find_by_run_id(&pool, "r3").await.unwrap().unwrap();
    assert_eq!(run.status, "failed");
    assert!(run.image_key.is_none());
    assert!(run.error_message.as_deref().unwrap().contains("no image"));
    assert!(run.duration_ms.unwrap() >= 0);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn transient_image_failure_recovers_within_the_retry_budget(pool: PgPool) {
    let images = Arc::new(MockImages::failing_then_ok(1));
    let p = pipeline(
        &pool,
        Arc::new(StaticWeather(hangzhou_weather())),
        images.clone(),
        Arc::new(MemoryBlobStore::default()),
    );

    p.execute("r4", Some("杭州".to_string())).await.unwrap();
    assert_eq!(images.calls(), 2);

    let record = StepRecordRepo::find(&pool, "r4", "generate-image")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.attempt, 2);

    let run = RunRepo::find_by_run_id(&pool, "r4").await.unwrap().unwrap();
    assert_eq!(run.status, "succeeded");
}

#[sqlx::test(migrations = "../db/migrations")]
async fn blob_upload_failure_fails_the_run(pool: PgPool) {
    let p = pipeline(
        &pool,
        Arc::new(StaticWeather(hangzhou_weather())),
        Arc::new(MockImages::succeeding()),
        Arc::new(MemoryBlobStore::failing()),
    );

    let err = p.execute("r5", Some("杭州".to_string())).await.unwrap_err();
    assert_matches!(err, PipelineError::RunFailed { .. });

    let run = RunRepo::find_by_run_id(&pool, "r5").await.unwrap().unwrap();
    assert_eq!(run.status, "failed");
    assert!(run.image_key.is_none());
    assert!(run
        .error_message
        .as_deref()
        .unwrap()
        .contains("bucket unavailable"));
}

#[sqlx::test(migrations = "../db/migrations")]
async fn re_execution_replays_memoized_steps(pool: PgPool) {
    let images = Arc::new(MockImages::succeeding());
    let p = pipeline(
        &pool,
        Arc::new(StaticWeather(hangzhou_weather())),
        images.clone(),
        Arc::new(MemoryBlobStore::default()),
    );

    let first = p.execute("r6", Some("杭州".to_string())).await.unwrap();
    let replay = p.execute("r6", Some("杭州".to_string())).await.unwrap();

    // The completed generate-image step was not re-invoked.
    assert_eq!(images.calls(), 1);
    assert_eq!(first.image_key, replay.image_key);
    assert_eq!(first.city, replay.city);

    // Exactly one terminal status, recorded once.
    let run = RunRepo::find_by_run_id(&pool, "r6").await.unwrap().unwrap();
    assert_eq!(run.status, "succeeded");
}

#[sqlx::test(migrations = "../db/migrations")]
async fn a_random_city_is_drawn_when_no_override_is_given(pool: PgPool) {
    let p = pipeline(
        &pool,
        Arc::new(FailingWeather),
        Arc::new(MockImages::succeeding()),
        Arc::new(MemoryBlobStore::default()),
    );

    let outcome = p.execute("r7", None).await.unwrap();
    assert!(CITIES.contains(&outcome.city.as_str()));

    let run = RunRepo::find_by_run_id(&pool, "r7").await.unwrap().unwrap();
    assert_eq!(run.city, outcome.city);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn every_step_leaves_a_ledger_record_on_success(pool: PgPool) {
    let p = pipeline(
        &pool,
        Arc::new(StaticWeather(hangzhou_weather())),
        Arc::new(MockImages::succeeding()),
        Arc::new(MemoryBlobStore::default()),
    );

    p.execute("r8", Some("杭州".to_string())).await.unwrap();

    let names: Vec<String> = StepRecordRepo::list_for_run(&pool, "r8")
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.step_name)
        .collect();
    assert_eq!(
        names,
        vec![
            "record-start",
            "fetch-weather",
            "update-weather",
            "generate-image",
            "upload-blob",
            "record-success",
        ]
    );
}

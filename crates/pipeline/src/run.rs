//! The card generation pipeline.
//!
//! Six strictly-ordered steps behind one run identity:
//! `record-start` → `fetch-weather` → `update-weather` → `generate-image`
//! → `upload-blob` → `record-success`, with a single failure handler that
//! records the terminal `failed` state.

use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use wxcard_core::cities::{city_slug, pick_random_city};
use wxcard_core::prompt::build_prompt;
use wxcard_core::types::Timestamp;
use wxcard_db::models::run::{NewRun, WeatherUpdate};
use wxcard_db::repositories::RunRepo;
use wxcard_gemini::{GeminiClient, GeminiError, GeneratedImage};
use wxcard_storage::{BlobStore, StorageError};
use wxcard_weather::{OpenMeteoClient, WeatherError, WeatherInfo};

use crate::retry::RetryPolicy;
use crate::step::{StepError, StepExecutor};

// ---------------------------------------------------------------------------
// Collaborator ports
// ---------------------------------------------------------------------------

/// Weather lookup seam; failures here never fail a run.
#[async_trait::async_trait]
pub trait WeatherLookup: Send + Sync {
    async fn current_weather(&self, city: &str) -> Result<WeatherInfo, WeatherError>;
}

#[async_trait::async_trait]
impl WeatherLookup for OpenMeteoClient {
    async fn current_weather(&self, city: &str) -> Result<WeatherInfo, WeatherError> {
        OpenMeteoClient::current_weather(self, city).await
    }
}

/// Image generation seam.
#[async_trait::async_trait]
pub trait ImageGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<GeneratedImage, GeminiError>;
}

#[async_trait::async_trait]
impl ImageGenerator for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<GeneratedImage, GeminiError> {
        GeminiClient::generate(self, prompt).await
    }
}

// ---------------------------------------------------------------------------
// Outcome and errors
// ---------------------------------------------------------------------------

/// Successful terminal state of a run.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub run_id: String,
    pub city: String,
    pub image_key: String,
    pub model: String,
    pub duration_ms: i64,
}

/// Terminal failure of a run.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// The run identity row could not be created; no later step ran and
    /// nothing was recorded.
    #[error("failed to record start of run '{run_id}': {message}")]
    RecordStart { run_id: String, message: String },

    /// The run failed; the `failed` terminal state has been recorded (or
    /// the recording failure was logged).
    #[error("run '{run_id}' failed: {message}")]
    RunFailed { run_id: String, message: String },
}

// ---------------------------------------------------------------------------
// Step outputs (memoized in the run ledger)
// ---------------------------------------------------------------------------

/// Output of `record-start`: the identity facts every later step and the
/// terminal handlers derive from. Memoized so a replayed run keeps its
/// originally drawn city and start time.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StartOutput {
    city: String,
    weather_date: NaiveDate,
    started_at: Timestamp,
}

/// Output of `generate-image`. The payload crosses the step boundary as
/// base64 so it can live in the JSONB arena.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ImageOutput {
    data_b64: String,
    mime_type: String,
    model: String,
}

/// Storage key for a card image: date + city slug for discoverability,
/// run id for collision-freedom. Deterministic per run, so a replayed
/// upload overwrites instead of duplicating.
pub fn card_blob_key(date: NaiveDate, city: &str, run_id: &str) -> String {
    format!("cards/{date}-{}-{run_id}.png", city_slug(city))
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// Orchestrates one run end to end. Cheap to clone per spawned run.
#[derive(Clone)]
pub struct GenerationPipeline {
    pool: PgPool,
    weather: Arc<dyn WeatherLookup>,
    images: Arc<dyn ImageGenerator>,
    blobs: Arc<dyn BlobStore>,
    image_retry: RetryPolicy,
}

impl GenerationPipeline {
    pub fn new(
        pool: PgPool,
        weather: Arc<dyn WeatherLookup>,
        images: Arc<dyn ImageGenerator>,
        blobs: Arc<dyn BlobStore>,
    ) -> Self {
        Self {
            pool,
            weather,
            images,
            blobs,
            image_retry: RetryPolicy::image_generation(),
        }
    }

    /// Override the image-generation retry policy (tests use zero delays).
    pub fn with_image_retry(mut self, policy: RetryPolicy) -> Self {
        self.image_retry = policy;
        self
    }

    /// Execute a run to its terminal state.
    ///
    /// Safe to re-invoke with the same `run_id` after a crash: completed
    /// steps replay from the ledger instead of re-executing.
    pub async fn execute(
        &self,
        run_id: &str,
        city_override: Option<String>,
    ) -> Result<RunOutcome, PipelineError> {
        let steps = StepExecutor::new(self.pool.clone(), run_id);

        // Step 1: record the run identity. Fatal on failure — without an
        // identity row there is nowhere to record anything else.
        let start: StartOutput = steps
            .run("record-start", &RetryPolicy::none(), || {
                let pool = self.pool.clone();
                let run_id = run_id.to_string();
                let city = city_override
                    .clone()
                    .unwrap_or_else(|| pick_random_city().to_string());
                async move {
                    let weather_date = Utc::now().date_naive();
                    let run = RunRepo::insert(
                        &pool,
                        &NewRun {
                            run_id,
                            city,
                            weather_date,
                        },
                    )
                    .await?;
                    Ok::<_, sqlx::Error>(StartOutput {
                        city: run.city,
                        weather_date: run.weather_date.unwrap_or(weather_date),
                        started_at: run.created_at,
                    })
                }
            })
            .await
            .map_err(|e| PipelineError::RecordStart {
                run_id: run_id.to_string(),
                message: e.to_string(),
            })?;

        tracing::info!(run_id, city = %start.city, "Run started");

        match self.generate_and_store(&steps, &start).await {
            Ok(outcome) => {
                tracing::info!(
                    run_id,
                    image_key = %outcome.image_key,
                    duration_ms = outcome.duration_ms,
                    "Run succeeded",
                );
                Ok(outcome)
            }
            Err(err) => {
                let message = err.to_string();
                let duration_ms = elapsed_ms(start.started_at);
                if let Err(db_err) =
                    RunRepo::mark_failed(&self.pool, run_id, &message, duration_ms).await
                {
                    // The one tolerated double failure: there is no further
                    // place to record it.
                    tracing::error!(run_id, error = %db_err, "Failed to persist run failure");
                }
                tracing::warn!(run_id, error = %message, "Run failed");
                Err(PipelineError::RunFailed {
                    run_id: run_id.to_string(),
                    message,
                })
            }
        }
    }

    /// Steps 2–6. Any error propagating out of here fails the run.
    async fn generate_and_store(
        &self,
        steps: &StepExecutor,
        start: &StartOutput,
    ) -> Result<RunOutcome, StepError> {
        let run_id = steps.run_id();

        // Step 2: weather is enrichment, not a precondition — lookup errors
        // degrade to "no weather" instead of failing the run.
        let weather: Option<WeatherInfo> = steps
            .run("fetch-weather", &RetryPolicy::none(), || {
                let lookup = Arc::clone(&self.weather);
                let city = start.city.clone();
                async move {
                    match lookup.current_weather(&city).await {
                        Ok(info) => Ok::<_, std::convert::Infallible>(Some(info)),
                        Err(e) => {
                            tracing::warn!(
                                city = %city,
                                error = %e,
                                "Weather fetch failed, continuing without weather",
                            );
                            Ok(None)
                        }
                    }
                }
            })
            .await?;

        // Step 3: persist the weather fields, skipped entirely without data.
        if let Some(info) = &weather {
            steps
                .run("update-weather", &RetryPolicy::none(), || {
                    let pool = self.pool.clone();
                    let run_id = run_id.to_string();
                    let update = WeatherUpdate {
                        resolved_city_name: info.resolved_name.clone(),
                        weather_date: info.date,
                        weather_condition: info.condition_text.clone(),
                        weather_icon: info.condition_icon.clone(),
                        temp_min: info.temp_min,
                        temp_max: info.temp_max,
                        current_temp: info.current_temp,
                    };
                    async move {
                        RunRepo::update_weather(&pool, &run_id, &update).await?;
                        Ok::<_, sqlx::Error>(())
                    }
                })
                .await?;
        }

        // Step 4: the image is the product — after the retry budget this
        // fails the run, with no fallback to a partial result.
        let image: ImageOutput = steps
            .run("generate-image", &self.image_retry, || {
                let images = Arc::clone(&self.images);
                let prompt = build_prompt(&start.city);
                async move {
                    let generated = images.generate(&prompt).await?;
                    Ok::<_, GeminiError>(ImageOutput {
                        data_b64: STANDARD.encode(&generated.bytes),
                        mime_type: generated.mime_type,
                        model: generated.model,
                    })
                }
            })
            .await?;

        // Step 5: upload under a deterministic key.
        let image_key: String = steps
            .run("upload-blob", &RetryPolicy::none(), || {
                let blobs = Arc::clone(&self.blobs);
                let key = card_blob_key(start.weather_date, &start.city, run_id);
                let image = image.clone();
                async move {
                    let bytes = STANDARD.decode(&image.data_b64).map_err(|e| {
                        StorageError::Backend(format!("invalid memoized image payload: {e}"))
                    })?;
                    blobs.put(&key, &bytes, &image.mime_type).await?;
                    Ok::<_, StorageError>(key)
                }
            })
            .await?;

        // Step 6: terminal success transition.
        let duration_ms = elapsed_ms(start.started_at);
        steps
            .run("record-success", &RetryPolicy::none(), || {
                let pool = self.pool.clone();
                let run_id = run_id.to_string();
                let image_key = image_key.clone();
                let model = image.model.clone();
                async move {
                    RunRepo::mark_succeeded(&pool, &run_id, &image_key, &model, duration_ms)
                        .await?;
                    Ok::<_, sqlx::Error>(())
                }
            })
            .await?;

        Ok(RunOutcome {
            run_id: run_id.to_string(),
            city: start.city.clone(),
            image_key,
            model: image.model,
            duration_ms,
        })
    }
}

/// Milliseconds elapsed since a run started, clamped to zero.
fn elapsed_ms(started_at: Timestamp) -> i64 {
    (Utc::now() - started_at).num_milliseconds().max(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blob_key_is_deterministic() {
        let date = NaiveDate::from_ymd_opt(2026, 8, 4).unwrap();
        let a = card_blob_key(date, "杭州", "r1");
        let b = card_blob_key(date, "杭州", "r1");
        assert_eq!(a, b);
        assert_eq!(a, "cards/2026-08-04-hangzhou-r1.png");
    }

    #[test]
    fn blob_key_varies_by_run_id() {
        let date = NaiveDate::from_ymd_opt(2026, 8, 4).unwrap();
        assert_ne!(
            card_blob_key(date, "杭州", "r1"),
            card_blob_key(date, "杭州", "r2")
        );
    }

    #[test]
    fn blob_key_uses_the_slug_fallback_for_unknown_cities() {
        let date = NaiveDate::from_ymd_opt(2026, 8, 4).unwrap();
        assert_eq!(
            card_blob_key(date, "New York", "r1"),
            "cards/2026-08-04-newyork-r1.png"
        );
    }
}

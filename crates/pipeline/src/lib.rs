//! The card generation pipeline: a durable, step-oriented executor that
//! coordinates weather lookup, image generation, and blob upload behind one
//! run identity.
//!
//! Steps are named, individually retryable, and memoized in the run ledger
//! so an interrupted run can be re-executed without repeating completed
//! work. Every run ends in exactly one terminal status.

pub mod retry;
pub mod run;
pub mod step;

pub use retry::{Backoff, RetryPolicy};
pub use run::{
    card_blob_key, GenerationPipeline, ImageGenerator, PipelineError, RunOutcome, WeatherLookup,
};
pub use step::{StepError, StepExecutor};

//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async CRUD methods
//! that accept `&PgPool` as the first argument.

pub mod run_repo;
pub mod step_record_repo;

pub use run_repo::RunRepo;
pub use step_record_repo::StepRecordRepo;

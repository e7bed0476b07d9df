//! Model structs and DTOs.
//!
//! Each submodule contains a `FromRow` + `Serialize` entity struct matching
//! the database row plus the `Deserialize`/plain DTOs used to write it.

pub mod run;
pub mod step_record;

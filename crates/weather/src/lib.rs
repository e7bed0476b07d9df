//! Weather lookup against the Open-Meteo geocoding and forecast APIs.
//!
//! Failures here are non-fatal to the generation pipeline: weather is
//! enrichment, not a precondition for image generation.

pub mod client;
pub mod codes;

pub use client::{OpenMeteoClient, WeatherError, WeatherInfo};

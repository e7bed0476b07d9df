//! REST client for the Gemini `generateContent` endpoint.
//!
//! The card pipeline asks the model for an image with search grounding
//! enabled; a response without inline image data is an error here, never a
//! silent success.

pub mod client;

pub use client::{GeminiClient, GeminiError, GeneratedImage, DEFAULT_MODEL};

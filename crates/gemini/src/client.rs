//! HTTP client for the Gemini generative image API.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Deserialize;

/// Default image-capable model.
pub const DEFAULT_MODEL: &str = "gemini-3-pro-image-preview";

const BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// A generated card image.
#[derive(Debug, Clone)]
pub struct GeneratedImage {
    pub bytes: Vec<u8>,
    pub mime_type: String,
    /// The model that actually produced the image.
    pub model: String,
}

/// Errors from the Gemini API layer.
#[derive(Debug, thiserror::Error)]
pub enum GeminiError {
    /// The HTTP request itself failed (network, DNS, TLS, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Gemini returned a non-2xx status code.
    #[error("Gemini API error ({status}): {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },

    /// The response carried no inline image data.
    #[error("no image in Gemini response")]
    NoImage,

    /// The inline image payload was not valid base64.
    #[error("invalid image payload: {0}")]
    Decode(#[from] base64::DecodeError),
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    inline_data: Option<InlineData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: Option<String>,
    data: Option<String>,
}

/// Client for one Gemini model.
pub struct GeminiClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl GeminiClient {
    /// Create a client for the public endpoint.
    pub fn new(api_key: String, model: String) -> Self {
        Self::with_base_url(BASE_URL.into(), api_key, model)
    }

    /// Create a client against a custom base URL (used by tests).
    pub fn with_base_url(base_url: String, api_key: String, model: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
            api_key,
            model,
        }
    }

    /// Model identifier this client generates with.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Generate a card image for a prompt.
    ///
    /// Runs with search grounding enabled so the model can look up live
    /// weather itself. The first candidate part carrying inline data wins;
    /// a response with none is [`GeminiError::NoImage`].
    pub async fn generate(&self, prompt: &str) -> Result<GeneratedImage, GeminiError> {
        let body = serde_json::json!({
            "contents": [{ "role": "user", "parts": [{ "text": prompt }] }],
            "generationConfig": { "responseModalities": ["IMAGE", "TEXT"] },
            "tools": [{ "googleSearch": {} }],
        });

        let response = self
            .client
            .post(format!(
                "{}/v1beta/models/{}:generateContent",
                self.base_url, self.model
            ))
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(GeminiError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: GenerateContentResponse = response.json().await?;
        self.extract_image(parsed)
    }

    /// Pull the first inline image out of a parsed response.
    fn extract_image(&self, response: GenerateContentResponse) -> Result<GeneratedImage, GeminiError> {
        let inline = response
            .candidates
            .into_iter()
            .filter_map(|c| c.content)
            .flat_map(|c| c.parts)
            .filter_map(|p| p.inline_data)
            .find(|d| d.data.as_deref().is_some_and(|s| !s.is_empty()))
            .ok_or(GeminiError::NoImage)?;

        let data = inline.data.ok_or(GeminiError::NoImage)?;
        let bytes = STANDARD.decode(data)?;

        Ok(GeneratedImage {
            bytes,
            mime_type: inline.mime_type.unwrap_or_else(|| "image/png".to_string()),
            model: self.model.clone(),
        })
    }
}

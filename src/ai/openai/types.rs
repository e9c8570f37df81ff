//! OpenAI Images API payloads.

use serde::{Deserialize, Serialize};

/// Request body for image generation.
#[derive(Debug, Serialize)]
pub struct ImageGenerationRequest<'a> {
    pub model: &'a str,
    pub prompt: &'a str,
    pub n: u32,
    pub size: &'a str,
    pub response_format: &'a str,
}

/// Top-level image generation response.
#[derive(Debug, Deserialize)]
pub struct ImageGenerationResponse {
    #[serde(default)]
    pub data: Vec<ImageData>,
}

/// One generated image item. Only base64 output is requested.
#[derive(Debug, Deserialize)]
pub struct ImageData {
    pub b64_json: Option<String>,
}

/// `{"error": {...}}` envelope returned on failures.
#[derive(Debug, Deserialize)]
pub struct ErrorEnvelope {
    pub error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
pub struct ErrorDetail {
    pub message: String,
    /// Machine-readable reason, e.g. `billing_hard_limit_reached`.
    #[serde(default)]
    pub code: Option<String>,
}

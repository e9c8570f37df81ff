use super::types::{ErrorEnvelope, ImageGenerationRequest, ImageGenerationResponse};
use crate::ai::client::{truncate, ProviderHttpClient};
use crate::ai::retry::RetryPolicy;
use crate::ai::ImageGenerationService;
use crate::models::GeneratedImage;
use crate::{Error, Result};
use async_trait::async_trait;
use reqwest::StatusCode;

const DEFAULT_BASE_URL: &str = "https://api.openai.com";
const GENERATIONS_PATH: &str = "/v1/images/generations";
const PROVIDER: &str = "OpenAI";

pub struct OpenAiImageClient {
    http: ProviderHttpClient,
    model: String,
}

impl OpenAiImageClient {
    pub fn new(api_key: String, model: String) -> Self {
        Self::new_with_client(api_key, model, reqwest::Client::new())
    }

    pub fn new_with_client(api_key: String, model: String, client: reqwest::Client) -> Self {
        Self {
            http: ProviderHttpClient::new(PROVIDER, api_key, DEFAULT_BASE_URL, client),
            model,
        }
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.http = self.http.with_base_url(base_url);
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.http = self.http.with_retry(retry);
        self
    }
}

/// Map an OpenAI failure onto the coded errors clients understand.
fn classify_error(status: StatusCode, body: &str) -> Error {
    let (message, code) = match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => (envelope.error.message, envelope.error.code),
        Err(_) => (body.to_string(), None),
    };
    let mentions_billing = |text: &str| text.to_ascii_lowercase().contains("billing");
    let billing =
        mentions_billing(message.as_str()) || code.as_deref().is_some_and(mentions_billing);

    match status {
        StatusCode::BAD_REQUEST if billing => Error::BillingLimit { provider: PROVIDER },
        StatusCode::BAD_REQUEST => Error::ProviderRejectedPrompt { provider: PROVIDER },
        StatusCode::UNAUTHORIZED => Error::ProviderAuth { provider: PROVIDER },
        _ if message.trim().is_empty() => Error::Upstream {
            status: status.as_u16(),
            message: "Failed to generate image".to_string(),
        },
        _ => Error::Upstream {
            status: status.as_u16(),
            message,
        },
    }
}

#[async_trait]
impl ImageGenerationService for OpenAiImageClient {
    fn provider_name(&self) -> &'static str {
        PROVIDER
    }

    async fn generate_image(&self, prompt: &str) -> Result<GeneratedImage> {
        let request = ImageGenerationRequest {
            model: &self.model,
            prompt,
            n: 1,
            size: "1024x1024",
            response_format: "b64_json",
        };

        let response = self.http.post(GENERATIONS_PATH, &request).await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            tracing::error!(
                "OpenAI API error (status {}): {}",
                status,
                truncate(&body, 200)
            );
            return Err(classify_error(status, &body));
        }

        let parsed: ImageGenerationResponse = serde_json::from_str(&body).map_err(|e| {
            tracing::error!("Failed to parse OpenAI response: {}", e);
            Error::Serialization(e)
        })?;

        let photo = parsed
            .data
            .into_iter()
            .next()
            .and_then(|item| item.b64_json)
            .filter(|b64| !b64.is_empty())
            .ok_or(Error::EmptyResponse { provider: PROVIDER })?;

        Ok(GeneratedImage {
            photo,
            content_type: "image/png".to_string(),
        })
    }
}

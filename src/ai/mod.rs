//! Text-to-image provider integrations
//!
//! Stability AI, Hugging Face Inference and OpenAI Images all sit behind
//! [`ImageGenerationService`]; configuration decides which one is live.

pub mod client;
pub mod huggingface;
pub mod mime;
pub mod mock;
pub mod openai;
pub mod retry;
pub mod stability;

pub use huggingface::HuggingFaceImageClient;
pub use mock::{MockImageGenerationClient, MockOutcome};
pub use openai::OpenAiImageClient;
pub use retry::{Backoff, RetryPolicy};
pub use stability::StabilityImageClient;

use crate::models::{AiProvider, Config, GeneratedImage};
use crate::Result;
use async_trait::async_trait;

#[async_trait]
pub trait ImageGenerationService: Send + Sync {
    /// Human-readable provider name used in messages and logs.
    fn provider_name(&self) -> &'static str;

    async fn generate_image(&self, prompt: &str) -> Result<GeneratedImage>;
}

/// Build the client for the configured provider.
pub fn build_image_client(
    config: &Config,
    api_key: String,
    http_client: reqwest::Client,
) -> Box<dyn ImageGenerationService> {
    let retry = config.retry_policy();

    macro_rules! configured {
        ($client:expr) => {{
            let client = $client.with_retry(retry);
            match config.base_url.clone() {
                Some(url) => client.with_base_url(url),
                None => client,
            }
        }};
    }

    match config.provider {
        AiProvider::Stability => Box::new(configured!(StabilityImageClient::new_with_client(
            api_key,
            http_client
        ))),
        AiProvider::HuggingFace => Box::new(configured!(HuggingFaceImageClient::new_with_client(
            api_key,
            config.hf_model.clone(),
            http_client
        ))),
        AiProvider::OpenAi => Box::new(configured!(OpenAiImageClient::new_with_client(
            api_key,
            config.openai_model.clone(),
            http_client
        ))),
    }
}

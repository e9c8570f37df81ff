use super::ImageGenerationService;
use crate::models::GeneratedImage;
use crate::placeholder::ONE_BY_ONE_PNG_BASE64;
use crate::{Error, Result};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};

/// Scripted outcome for one mock call.
#[derive(Debug, Clone)]
pub enum MockOutcome {
    Image(GeneratedImage),
    Empty,
    Status(u16, String),
}

/// In-memory provider for tests and harnesses. Clones share state so a retained
/// clone can observe calls made through a boxed copy.
#[derive(Clone)]
pub struct MockImageGenerationClient {
    outcomes: Arc<Mutex<Vec<MockOutcome>>>,
    prompts: Arc<Mutex<Vec<String>>>,
}

impl MockImageGenerationClient {
    pub fn new() -> Self {
        Self {
            outcomes: Arc::new(Mutex::new(Vec::new())),
            prompts: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_image_response(self, image: GeneratedImage) -> Self {
        self.outcomes.lock().unwrap().push(MockOutcome::Image(image));
        self
    }

    pub fn with_outcome(self, outcome: MockOutcome) -> Self {
        self.outcomes.lock().unwrap().push(outcome);
        self
    }

    pub fn get_call_count(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    pub fn get_prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

impl Default for MockImageGenerationClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ImageGenerationService for MockImageGenerationClient {
    fn provider_name(&self) -> &'static str {
        "Mock"
    }

    async fn generate_image(&self, prompt: &str) -> Result<GeneratedImage> {
        let count = {
            let mut prompts = self.prompts.lock().unwrap();
            prompts.push(prompt.to_string());
            prompts.len()
        };

        let outcomes = self.outcomes.lock().unwrap();
        if outcomes.is_empty() {
            return Ok(GeneratedImage {
                photo: ONE_BY_ONE_PNG_BASE64.to_string(),
                content_type: "image/png".to_string(),
            });
        }

        match &outcomes[(count - 1) % outcomes.len()] {
            MockOutcome::Image(image) => Ok(image.clone()),
            MockOutcome::Empty => Err(Error::EmptyResponse { provider: "Mock" }),
            MockOutcome::Status(status, body) => Err(Error::ProviderStatus {
                provider: "Mock",
                status: *status,
                body: body.clone(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_default_returns_one_pixel_png() {
        let client = MockImageGenerationClient::new();
        let image = client.generate_image("anything").await.unwrap();
        assert_eq!(image.photo, ONE_BY_ONE_PNG_BASE64);
        assert_eq!(image.content_type, "image/png");
    }

    #[tokio::test]
    async fn test_outcomes_cycle_and_calls_are_recorded() {
        let client = MockImageGenerationClient::new()
            .with_outcome(MockOutcome::Status(503, "busy".to_string()))
            .with_outcome(MockOutcome::Empty);
        let calls = client.clone();

        assert!(matches!(
            client.generate_image("one").await,
            Err(Error::ProviderStatus { status: 503, .. })
        ));
        assert!(matches!(
            client.generate_image("two").await,
            Err(Error::EmptyResponse { .. })
        ));
        assert!(matches!(
            client.generate_image("three").await,
            Err(Error::ProviderStatus { .. })
        ));

        assert_eq!(calls.get_call_count(), 3);
        assert_eq!(calls.get_prompts(), vec!["one", "two", "three"]);
    }
}

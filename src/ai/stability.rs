use super::client::ProviderHttpClient;
use super::retry::RetryPolicy;
use crate::ai::ImageGenerationService;
use crate::models::GeneratedImage;
use crate::{Error, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

const DEFAULT_BASE_URL: &str = "https://api.stability.ai";
const TEXT_TO_IMAGE_PATH: &str = "/v1/generation/stable-diffusion-xl-1024-v1-0/text-to-image";
const PROVIDER: &str = "Stability AI";

#[derive(Debug, Serialize)]
struct TextToImageRequest<'a> {
    text_prompts: Vec<TextPrompt<'a>>,
    cfg_scale: u32,
    height: u32,
    width: u32,
    samples: u32,
}

#[derive(Debug, Serialize)]
struct TextPrompt<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct TextToImageResponse {
    #[serde(default)]
    artifacts: Vec<Artifact>,
}

#[derive(Debug, Deserialize)]
struct Artifact {
    base64: Option<String>,
}

/// Stable Diffusion XL text-to-image over the Stability REST API.
pub struct StabilityImageClient {
    http: ProviderHttpClient,
}

impl StabilityImageClient {
    pub fn new(api_key: String) -> Self {
        Self::new_with_client(api_key, reqwest::Client::new())
    }

    pub fn new_with_client(api_key: String, client: reqwest::Client) -> Self {
        Self {
            http: ProviderHttpClient::new(PROVIDER, api_key, DEFAULT_BASE_URL, client)
                .with_accept("application/json"),
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

#[async_trait]
impl ImageGenerationService for StabilityImageClient {
    fn provider_name(&self) -> &'static str {
        PROVIDER
    }

    async fn generate_image(&self, prompt: &str) -> Result<GeneratedImage> {
        let request = TextToImageRequest {
            text_prompts: vec![TextPrompt { text: prompt }],
            cfg_scale: 7,
            height: 1024,
            width: 1024,
            samples: 1,
        };

        let response = self.http.post(TEXT_TO_IMAGE_PATH, &request).await?;
        let response = self.http.ensure_success(response).await?;

        let body = response.text().await?;
        let data: TextToImageResponse = serde_json::from_str(&body).map_err(|e| {
            tracing::error!("Failed to parse Stability AI response: {}", e);
            Error::Serialization(e)
        })?;

        let photo = data
            .artifacts
            .into_iter()
            .next()
            .and_then(|artifact| artifact.base64)
            .filter(|b64| !b64.is_empty())
            .ok_or(Error::EmptyResponse { provider: PROVIDER })?;

        Ok(GeneratedImage {
            photo,
            content_type: "image/png".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn make_client(server: &MockServer) -> StabilityImageClient {
        StabilityImageClient::new("sk-test".to_string()).with_base_url(server.uri())
    }

    #[tokio::test]
    async fn test_generate_image_sends_sdxl_request() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(TEXT_TO_IMAGE_PATH))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_json(serde_json::json!({
                "text_prompts": [{ "text": "a lighthouse at dusk" }],
                "cfg_scale": 7,
                "height": 1024,
                "width": 1024,
                "samples": 1
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "artifacts": [{ "base64": "iVBORw0KGgo=", "seed": 1, "finishReason": "SUCCESS" }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let image = make_client(&server)
            .generate_image("a lighthouse at dusk")
            .await
            .unwrap();

        assert_eq!(image.photo, "iVBORw0KGgo=");
        assert_eq!(image.content_type, "image/png");
    }

    #[tokio::test]
    async fn test_missing_artifacts_is_empty_response() {
        let server = MockServer::start().await;

        for body in [
            serde_json::json!({}),
            serde_json::json!({ "artifacts": [] }),
            serde_json::json!({ "artifacts": [{ "base64": "" }] }),
        ] {
            server.reset().await;
            Mock::given(method("POST"))
                .respond_with(ResponseTemplate::new(200).set_body_json(body))
                .mount(&server)
                .await;

            let err = make_client(&server).generate_image("x").await.unwrap_err();
            assert!(matches!(err, Error::EmptyResponse { provider: PROVIDER }));
        }
    }

    #[tokio::test]
    async fn test_non_ok_forwards_status_and_text() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(401)
                    .set_body_string(r#"{"name":"unauthorized","message":"missing key"}"#),
            )
            .mount(&server)
            .await;

        let err = make_client(&server).generate_image("x").await.unwrap_err();
        match err {
            Error::ProviderStatus { status, body, .. } => {
                assert_eq!(status, 401);
                assert_eq!(body, r#"{"name":"unauthorized","message":"missing key"}"#);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unparseable_success_body_is_serialization_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let err = make_client(&server).generate_image("x").await.unwrap_err();
        assert!(matches!(err, Error::Serialization(_)));
    }
}

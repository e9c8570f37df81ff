use super::client::{truncate, ProviderHttpClient};
use super::mime::detect_image_mime;
use super::retry::RetryPolicy;
use crate::ai::ImageGenerationService;
use crate::models::GeneratedImage;
use crate::{Error, Result};
use async_trait::async_trait;
use base64::Engine as _;
use reqwest::header::CONTENT_TYPE;
use serde::Serialize;

const DEFAULT_BASE_URL: &str = "https://api-inference.huggingface.co";
const PROVIDER: &str = "Hugging Face";

#[derive(Debug, Serialize)]
struct InferenceRequest<'a> {
    inputs: &'a str,
}

/// Text-to-image through the Hugging Face Inference API.
///
/// The API answers with raw image bytes, so the payload is base64-encoded here.
pub struct HuggingFaceImageClient {
    http: ProviderHttpClient,
    model: String,
}

impl HuggingFaceImageClient {
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

    fn model_path(&self) -> String {
        format!("/models/{}?wait_for_model=true", self.model)
    }
}

#[async_trait]
impl ImageGenerationService for HuggingFaceImageClient {
    fn provider_name(&self) -> &'static str {
        PROVIDER
    }

    async fn generate_image(&self, prompt: &str) -> Result<GeneratedImage> {
        let response = self
            .http
            .post(&self.model_path(), &InferenceRequest { inputs: prompt })
            .await?;
        let response = self.http.ensure_success(response).await?;

        let header_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let bytes = response.bytes().await?;
        let content_type =
            header_type.unwrap_or_else(|| detect_image_mime(&bytes).to_string());

        // A model error can still come back as 200 with a JSON body.
        if !content_type.starts_with("image/") {
            let body = String::from_utf8_lossy(&bytes).into_owned();
            tracing::error!(
                "Unexpected non-image response from Hugging Face ({}): {}",
                content_type,
                truncate(&body, 200)
            );
            return Err(Error::NonImageResponse {
                provider: PROVIDER,
                body,
            });
        }

        if bytes.is_empty() {
            return Err(Error::EmptyResponse { provider: PROVIDER });
        }

        let photo = base64::engine::general_purpose::STANDARD.encode(&bytes);
        tracing::info!(
            "Hugging Face OK response: {} bytes={}",
            content_type,
            photo.len()
        );

        Ok(GeneratedImage {
            photo,
            content_type,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::retry::Backoff;
    use base64::Engine as _;
    use std::time::Duration;
    use wiremock::matchers::{body_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const MODEL: &str = "runwayml/stable-diffusion-v1-5";
    const PNG_BYTES: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

    fn make_client(server: &MockServer) -> HuggingFaceImageClient {
        HuggingFaceImageClient::new("hf_test".to_string(), MODEL.to_string())
            .with_base_url(server.uri())
            .with_retry(RetryPolicy::new(3, Duration::from_millis(5), Backoff::Linear))
    }

    #[tokio::test]
    async fn test_generate_image_encodes_raw_bytes() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(format!("/models/{}", MODEL)))
            .and(query_param("wait_for_model", "true"))
            .and(body_json(serde_json::json!({ "inputs": "a koi pond" })))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "image/jpeg")
                    .set_body_bytes(vec![0xFF, 0xD8, 0xFF, 0xE0]),
            )
            .mount(&server)
            .await;

        let image = make_client(&server).generate_image("a koi pond").await.unwrap();
        assert_eq!(image.content_type, "image/jpeg");
        assert_eq!(
            image.photo,
            base64::engine::general_purpose::STANDARD.encode([0xFF, 0xD8, 0xFF, 0xE0])
        );
    }

    #[tokio::test]
    async fn test_retries_while_model_is_loading() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("loading"))
            .up_to_n_times(1)
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "image/png")
                    .set_body_bytes(PNG_BYTES.to_vec()),
            )
            .expect(1)
            .mount(&server)
            .await;

        let image = make_client(&server).generate_image("x").await.unwrap();
        assert_eq!(image.content_type, "image/png");
    }

    #[tokio::test]
    async fn test_gives_up_after_three_busy_responses() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("model is loading"))
            .expect(3)
            .mount(&server)
            .await;

        let err = make_client(&server).generate_image("x").await.unwrap_err();
        match err {
            Error::ProviderStatus { status, body, .. } => {
                assert_eq!(status, 503);
                assert_eq!(body, "model is loading");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_json_on_success_is_non_image_response() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw(r#"{"error":"bad input"}"#, "application/json"),
            )
            .mount(&server)
            .await;

        let err = make_client(&server).generate_image("x").await.unwrap_err();
        match err {
            Error::NonImageResponse { body, .. } => assert_eq!(body, r#"{"error":"bad input"}"#),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_empty_image_body_is_empty_response() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "image/png")
                    .set_body_bytes(Vec::new()),
            )
            .mount(&server)
            .await;

        let err = make_client(&server).generate_image("x").await.unwrap_err();
        assert!(matches!(err, Error::EmptyResponse { .. }));
    }
}

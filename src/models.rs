//! Data models and structures
//!
//! Defines the request/response payloads of the generation endpoint and the
//! explicit configuration object the app is built from.

use crate::ai::retry::{Backoff, RetryPolicy};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    InvalidRequest,
    InvalidApiKey,
    BillingLimitReached,
    EmptyResponse,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::InvalidRequest => "INVALID_REQUEST",
            ErrorCode::InvalidApiKey => "INVALID_API_KEY",
            ErrorCode::BillingLimitReached => "BILLING_LIMIT_REACHED",
            ErrorCode::EmptyResponse => "EMPTY_RESPONSE",
        }
    }
}

impl From<ErrorCode> for String {
    fn from(code: ErrorCode) -> Self {
        code.as_str().to_string()
    }
}

/// Body of `POST /api/generateImage`.
///
/// `prompt` is kept as a raw JSON value so a non-string prompt is reported as
/// an invalid request instead of a deserialization failure.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GenerateImageRequest {
    #[serde(default)]
    pub prompt: serde_json::Value,
}

impl GenerateImageRequest {
    /// The prompt, if it is a string with non-whitespace content.
    pub fn prompt(&self) -> Option<&str> {
        self.prompt.as_str().filter(|p| !p.trim().is_empty())
    }
}

/// Image produced by a provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedImage {
    /// Base64 payload or a complete data URL.
    pub photo: String,
    pub content_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageResponse {
    pub success: bool,
    pub photo: String,
    pub content_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ImageResponse {
    pub fn success(image: GeneratedImage) -> Self {
        Self {
            success: true,
            photo: image.photo,
            content_type: image.content_type,
            message: None,
        }
    }

    pub fn with_message(mut self, message: String) -> Self {
        self.message = Some(message);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub success: bool,
    pub message: String,
    pub error: String,
}

impl ErrorBody {
    pub fn new(message: String, error: String) -> Self {
        Self {
            success: false,
            message,
            error,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForwardedErrorBody {
    pub success: bool,
    pub status: u16,
    pub message: String,
}

impl ForwardedErrorBody {
    pub fn new(status: u16, message: String) -> Self {
        Self {
            success: false,
            status,
            message,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AiProvider {
    #[default]
    Stability,
    HuggingFace,
    OpenAi,
}

impl AiProvider {
    pub fn display_name(&self) -> &'static str {
        match self {
            AiProvider::Stability => "Stability AI",
            AiProvider::HuggingFace => "Hugging Face",
            AiProvider::OpenAi => "OpenAI",
        }
    }

    /// Environment variables holding the API key, primary name first.
    pub fn api_key_vars(&self) -> &'static [&'static str] {
        match self {
            AiProvider::Stability => &["STABILITY_API_KEY"],
            AiProvider::HuggingFace => &["HF_API_KEY", "HFAPIKEY", "HUGGINGFACE_API_KEY"],
            AiProvider::OpenAi => &["OPEN_API_KEY", "OPENAI_API_KEY"],
        }
    }

    pub fn primary_key_var(&self) -> &'static str {
        self.api_key_vars()[0]
    }

    /// Hugging Face answers 503 while a model is loading, so it retries by default.
    pub fn default_retry(&self) -> RetryPolicy {
        match self {
            AiProvider::HuggingFace => {
                RetryPolicy::new(3, Duration::from_millis(2000), Backoff::Linear)
            }
            AiProvider::Stability | AiProvider::OpenAi => RetryPolicy::none(),
        }
    }
}

impl fmt::Display for AiProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AiProvider::Stability => "stability",
            AiProvider::HuggingFace => "huggingface",
            AiProvider::OpenAi => "openai",
        };
        f.write_str(name)
    }
}

impl FromStr for AiProvider {
    type Err = String;

    fn from_str(input: &str) -> std::result::Result<Self, Self::Err> {
        match input.trim().to_ascii_lowercase().as_str() {
            "stability" | "stabilityai" => Ok(AiProvider::Stability),
            "huggingface" | "hf" => Ok(AiProvider::HuggingFace),
            "openai" => Ok(AiProvider::OpenAi),
            other => Err(format!(
                "Unknown image provider '{}'. Expected one of: stability, huggingface, openai",
                other
            )),
        }
    }
}

/// What to do when the active provider has no API key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MissingKeyPolicy {
    /// Serve the placeholder image.
    #[default]
    Mock,
    /// Respond 401 `INVALID_API_KEY`.
    Reject,
}

impl FromStr for MissingKeyPolicy {
    type Err = String;

    fn from_str(input: &str) -> std::result::Result<Self, Self::Err> {
        match input.trim().to_ascii_lowercase().as_str() {
            "mock" => Ok(MissingKeyPolicy::Mock),
            "reject" => Ok(MissingKeyPolicy::Reject),
            other => Err(format!(
                "Unknown missing-key policy '{}'. Expected mock or reject",
                other
            )),
        }
    }
}

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_HF_MODEL: &str = "runwayml/stable-diffusion-v1-5";
pub const DEFAULT_OPENAI_IMAGE_MODEL: &str = "dall-e-2";
const DEFAULT_TIMEOUT_SECS: u64 = 120;
const DEFAULT_RETRY_DELAY_MS: u64 = 2000;

// Configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub port: u16,
    pub use_mock: bool,
    pub provider: AiProvider,
    pub api_key: Option<String>,
    pub missing_key_policy: MissingKeyPolicy,
    /// Overrides the provider's public endpoint.
    pub base_url: Option<String>,
    pub hf_model: String,
    pub openai_model: String,
    pub timeout: Duration,
    /// `None` uses the provider default.
    pub retry: Option<RetryPolicy>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            use_mock: false,
            provider: AiProvider::default(),
            api_key: None,
            missing_key_policy: MissingKeyPolicy::default(),
            base_url: None,
            hf_model: DEFAULT_HF_MODEL.to_string(),
            openai_model: DEFAULT_OPENAI_IMAGE_MODEL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            retry: None,
        }
    }
}

fn parse_var<T: FromStr>(key: &str, value: &str) -> Result<T>
where
    T::Err: fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| Error::Config(format!("Invalid {} '{}': {}", key, value, e)))
}

impl Config {
    /// Build configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let provider = match var("IMAGE_PROVIDER") {
            Some(value) => parse_var("IMAGE_PROVIDER", &value)?,
            None => defaults.provider,
        };

        let api_key = provider.api_key_vars().iter().find_map(|key| var(*key));

        let missing_key_policy = match var("MISSING_KEY_POLICY") {
            Some(value) => parse_var("MISSING_KEY_POLICY", &value)?,
            None => defaults.missing_key_policy,
        };

        let port = match var("PORT") {
            Some(value) => parse_var("PORT", &value)?,
            None => defaults.port,
        };

        let timeout = match var("PROVIDER_TIMEOUT_SECS") {
            Some(value) => Duration::from_secs(parse_var("PROVIDER_TIMEOUT_SECS", &value)?),
            None => defaults.timeout,
        };
        if timeout.is_zero() {
            return Err(Error::Config(
                "PROVIDER_TIMEOUT_SECS must be at least 1".to_string(),
            ));
        }

        let retry = Self::retry_from_lookup(&var, provider)?;

        Ok(Self {
            port,
            use_mock: var("USE_MOCK_IMAGE").as_deref() == Some("true"),
            provider,
            api_key,
            missing_key_policy,
            base_url: var("PROVIDER_BASE_URL").map(|url| url.trim_end_matches('/').to_string()),
            hf_model: var("HF_MODEL").unwrap_or(defaults.hf_model),
            openai_model: var("OPENAI_IMAGE_MODEL").unwrap_or(defaults.openai_model),
            timeout,
            retry,
        })
    }

    fn retry_from_lookup<F>(var: &F, provider: AiProvider) -> Result<Option<RetryPolicy>>
    where
        F: Fn(&str) -> Option<String>,
    {
        let max_attempts = var("RETRY_MAX_ATTEMPTS");
        let delay = var("RETRY_DELAY_MS");
        let backoff = var("RETRY_BACKOFF");

        if max_attempts.is_none() && delay.is_none() && backoff.is_none() {
            return Ok(None);
        }

        let base = provider.default_retry();
        let max_attempts = match max_attempts {
            Some(value) => parse_var::<usize>("RETRY_MAX_ATTEMPTS", &value)?,
            None => base.max_attempts,
        };
        if max_attempts == 0 {
            return Err(Error::Config(
                "RETRY_MAX_ATTEMPTS must be at least 1".to_string(),
            ));
        }
        let delay = match delay {
            Some(value) => Duration::from_millis(parse_var("RETRY_DELAY_MS", &value)?),
            None if base.delay.is_zero() => Duration::from_millis(DEFAULT_RETRY_DELAY_MS),
            None => base.delay,
        };
        let backoff = match backoff {
            Some(value) => parse_var("RETRY_BACKOFF", &value)?,
            None => base.backoff,
        };

        Ok(Some(RetryPolicy::new(max_attempts, delay, backoff)))
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
            .clone()
            .unwrap_or_else(|| self.provider.default_retry())
    }
}

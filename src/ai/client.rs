use super::retry::RetryPolicy;
use crate::{Error, Result};
use reqwest::header::ACCEPT;
use reqwest::{Client, Response};
use serde::Serialize;

/// Number of body characters included in provider error logs.
const LOG_BODY_CHARS: usize = 200;

/// Bearer-authenticated JSON client shared by the provider modules.
pub struct ProviderHttpClient {
    client: Client,
    api_key: String,
    base_url: String,
    provider: &'static str,
    accept: Option<&'static str>,
    retry: RetryPolicy,
}

impl ProviderHttpClient {
    pub fn new(provider: &'static str, api_key: String, base_url: &str, client: Client) -> Self {
        Self {
            client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            provider,
            accept: None,
            retry: RetryPolicy::none(),
        }
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_accept(mut self, accept: &'static str) -> Self {
        self.accept = Some(accept);
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// POST a JSON body to `path`, applying the retry policy.
    ///
    /// Any response is returned as-is; status handling is left to the caller.
    pub async fn post<Req: Serialize + Sync>(&self, path: &str, request: &Req) -> Result<Response> {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!("Sending image generation request to {}", self.provider);

        self.retry
            .send(self.provider, || {
                let mut builder = self
                    .client
                    .post(&url)
                    .bearer_auth(&self.api_key)
                    .json(request);
                if let Some(accept) = self.accept {
                    builder = builder.header(ACCEPT, accept);
                }
                builder.send()
            })
            .await
    }

    /// Pass successful responses through; turn anything else into
    /// [`Error::ProviderStatus`] carrying the provider's body text.
    pub async fn ensure_success(&self, response: Response) -> Result<Response> {
        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status();
        let error_text = response.text().await?;
        tracing::error!(
            "{} non-OK response: {} {}",
            self.provider,
            status,
            truncate(&error_text, LOG_BODY_CHARS)
        );
        Err(Error::ProviderStatus {
            provider: self.provider,
            status: status.as_u16(),
            body: error_text,
        })
    }
}

/// Cut `text` to at most `max` characters on a char boundary.
pub(crate) fn truncate(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

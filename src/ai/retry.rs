//! Bounded retry for provider-busy responses.
//!
//! Only HTTP 503 is retried. Once attempts run out the last 503 response is
//! handed back to the caller like any other non-OK response.

use crate::{Error, Result};
use reqwest::{Response, StatusCode};
use std::future::Future;
use std::str::FromStr;
use std::time::Duration;
use tokio_retry::RetryIf;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    Fixed,
    Linear,
    Exponential,
}

impl FromStr for Backoff {
    type Err = String;

    fn from_str(input: &str) -> std::result::Result<Self, Self::Err> {
        match input.trim().to_ascii_lowercase().as_str() {
            "fixed" => Ok(Backoff::Fixed),
            "linear" => Ok(Backoff::Linear),
            "exponential" => Ok(Backoff::Exponential),
            other => Err(format!(
                "Unknown backoff '{}'. Expected fixed, linear or exponential",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one; always at least 1.
    pub max_attempts: usize,
    pub delay: Duration,
    pub backoff: Backoff,
}

enum Attempt {
    Busy(Response),
    Transport(reqwest::Error),
}

impl RetryPolicy {
    pub fn new(max_attempts: usize, delay: Duration, backoff: Backoff) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
            backoff,
        }
    }

    /// A single attempt.
    pub fn none() -> Self {
        Self::new(1, Duration::ZERO, Backoff::Fixed)
    }

    /// Delay slept before retry number `retry` (1-based).
    pub fn delay_before(&self, retry: u32) -> Duration {
        match self.backoff {
            Backoff::Fixed => self.delay,
            Backoff::Linear => self.delay.saturating_mul(retry),
            Backoff::Exponential => self
                .delay
                .saturating_mul(2u32.saturating_pow(retry.saturating_sub(1))),
        }
    }

    /// The sleep schedule between attempts.
    pub fn delays(&self) -> impl Iterator<Item = Duration> + '_ {
        (1..self.max_attempts as u32).map(move |retry| self.delay_before(retry))
    }

    /// Send a request, re-sending it while the provider answers 503.
    pub async fn send<F, Fut>(&self, provider: &str, mut send: F) -> Result<Response>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = reqwest::Result<Response>>,
    {
        let max_attempts = self.max_attempts;
        let mut attempt = 0usize;

        let outcome = RetryIf::spawn(
            self.delays(),
            || {
                let request = send();
                async move {
                    match request.await {
                        Ok(response) if response.status() == StatusCode::SERVICE_UNAVAILABLE => {
                            Err(Attempt::Busy(response))
                        }
                        Ok(response) => Ok(response),
                        Err(e) => Err(Attempt::Transport(e)),
                    }
                }
            },
            |outcome: &Attempt| match outcome {
                Attempt::Busy(_) => {
                    attempt += 1;
                    if attempt < max_attempts {
                        tracing::warn!(
                            "{} busy (503), retrying (attempt {}/{})",
                            provider,
                            attempt,
                            max_attempts
                        );
                    }
                    true
                }
                Attempt::Transport(_) => false,
            },
        )
        .await;

        match outcome {
            Ok(response) | Err(Attempt::Busy(response)) => Ok(response),
            Err(Attempt::Transport(e)) => {
                tracing::error!("Failed to send request to {}: {}", provider, e);
                Err(Error::Http(e))
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::none()
    }
}

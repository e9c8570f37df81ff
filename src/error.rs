//! Error handling and custom error types
//!
//! `Error` is the crate-wide failure type built with thiserror. `ApiError` is
//! what the HTTP layer renders; every `Error` is mapped to it in one place so
//! coded rejections and forwarded failures keep a stable JSON shape.

use crate::models::{ErrorBody, ErrorCode, ForwardedErrorBody};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Prompt is required")]
    InvalidPrompt,

    #[error("Missing {env_var}. Set {env_var} in your server .env.")]
    MissingApiKey { env_var: &'static str },

    /// Non-OK provider response; the body text is forwarded unchanged.
    #[error("{provider} API error (status {status}): {body}")]
    ProviderStatus {
        provider: &'static str,
        status: u16,
        body: String,
    },

    #[error("{provider} billing limit reached. Please check your API key or billing status.")]
    BillingLimit { provider: &'static str },

    #[error("Invalid request to {provider} API. Please check your prompt.")]
    ProviderRejectedPrompt { provider: &'static str },

    #[error("Invalid {provider} API key. Please check your configuration.")]
    ProviderAuth { provider: &'static str },

    #[error("No image returned by {provider}")]
    EmptyResponse { provider: &'static str },

    #[error("Unexpected non-image response from {provider}")]
    NonImageResponse { provider: &'static str, body: String },

    /// Failure that carries an upstream status but no error code.
    #[error("{message}")]
    Upstream { status: u16, message: String },

    #[error("Generic error: {0}")]
    Generic(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Error response rendered by the HTTP layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// `{success: false, message, error}`
    Coded {
        status: StatusCode,
        message: String,
        error: String,
    },
    /// `{success: false, status, message}`, the shared forwarding path.
    Forwarded { status: StatusCode, message: String },
}

impl ApiError {
    fn coded(status: StatusCode, message: impl Into<String>, error: impl Into<String>) -> Self {
        Self::Coded {
            status,
            message: message.into(),
            error: error.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Coded { status, .. } | Self::Forwarded { status, .. } => *status,
        }
    }
}

fn status_or_500(status: u16) -> StatusCode {
    StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        let message = err.to_string();
        match err {
            Error::InvalidPrompt => {
                Self::coded(StatusCode::BAD_REQUEST, message, ErrorCode::InvalidRequest)
            }
            Error::MissingApiKey { .. } | Error::ProviderAuth { .. } => {
                Self::coded(StatusCode::UNAUTHORIZED, message, ErrorCode::InvalidApiKey)
            }
            Error::BillingLimit { .. } => Self::coded(
                StatusCode::BAD_REQUEST,
                message,
                ErrorCode::BillingLimitReached,
            ),
            Error::ProviderRejectedPrompt { .. } => {
                Self::coded(StatusCode::BAD_REQUEST, message, ErrorCode::InvalidRequest)
            }
            Error::EmptyResponse { .. } => Self::coded(
                StatusCode::INTERNAL_SERVER_ERROR,
                message,
                ErrorCode::EmptyResponse,
            ),
            Error::ProviderStatus {
                provider,
                status,
                body,
            } => Self::coded(
                status_or_500(status),
                format!("{} API Error", provider),
                body,
            ),
            Error::NonImageResponse { body, .. } => {
                Self::coded(StatusCode::BAD_GATEWAY, message, body)
            }
            Error::Upstream { status, message } => Self::Forwarded {
                status: status_or_500(status),
                message,
            },
            Error::Http(e) => Self::Forwarded {
                status: e
                    .status()
                    .map(|s| status_or_500(s.as_u16()))
                    .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
                message,
            },
            _ => Self::Forwarded {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                message,
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            Self::Coded {
                status,
                message,
                error,
            } => (status, Json(ErrorBody::new(message, error))).into_response(),
            Self::Forwarded { status, message } => (
                status,
                Json(ForwardedErrorBody::new(status.as_u16(), message)),
            )
                .into_response(),
        }
    }
}

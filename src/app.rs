//! HTTP application: router, shared state and the image generation handler.

use crate::ai::{build_image_client, ImageGenerationService};
use crate::error::ApiError;
use crate::models::{Config, GenerateImageRequest, ImageResponse, MissingKeyPolicy};
use crate::{placeholder, Error, Result};
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info, warn};
use uuid::Uuid;

pub const GENERATE_IMAGE_ROUTE: &str = "/api/generateImage";

/// State shared by every request. Immutable after startup.
#[derive(Clone)]
pub struct AppState {
    config: Arc<Config>,
    image_gen: Option<Arc<dyn ImageGenerationService>>,
}

impl AppState {
    /// Whether generation requests are answered with the placeholder image.
    fn serves_mock(&self) -> bool {
        self.config.use_mock
            || (self.image_gen.is_none()
                && self.config.missing_key_policy == MissingKeyPolicy::Mock)
    }
}

/// Serves the generation endpoint for one configured provider.
pub struct App {
    state: AppState,
}

/// Injectable service bundle used to construct [`App`] in tests/harnesses.
pub struct AppServices {
    /// `None` when no API key is configured for the provider.
    pub image_gen: Option<Box<dyn ImageGenerationService>>,
}

impl App {
    /// Build an app from concrete service dependencies.
    pub fn with_services(config: Config, services: AppServices) -> Self {
        Self {
            state: AppState {
                config: Arc::new(config),
                image_gen: services.image_gen.map(Arc::from),
            },
        }
    }

    /// Construct the live provider client from configuration.
    pub fn new(config: Config) -> Result<Self> {
        // One connection pool for the provider client.
        let http_client = reqwest::Client::builder().timeout(config.timeout).build()?;

        let image_gen = match config.api_key.clone() {
            Some(api_key) => {
                info!(
                    "Image provider: {} (retry attempts: {})",
                    config.provider.display_name(),
                    config.retry_policy().max_attempts
                );
                Some(build_image_client(&config, api_key, http_client))
            }
            None => {
                warn!(
                    "{} not set; provider requests will {}",
                    config.provider.primary_key_var(),
                    match config.missing_key_policy {
                        MissingKeyPolicy::Mock => "return the mock image",
                        MissingKeyPolicy::Reject => "be rejected with 401",
                    }
                );
                None
            }
        };

        if config.use_mock {
            info!("USE_MOCK_IMAGE enabled; the provider will not be called");
        }

        Ok(Self::with_services(config, AppServices { image_gen }))
    }

    pub fn config(&self) -> &Config {
        &self.state.config
    }

    pub fn router(&self) -> Router {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);

        Router::new()
            .route("/health", get(health))
            .route(GENERATE_IMAGE_ROUTE, post(generate_image))
            .route(&format!("{}/", GENERATE_IMAGE_ROUTE), post(generate_image))
            .layer(cors)
            .with_state(self.state.clone())
    }

    /// Bind and serve until the process is stopped.
    pub async fn serve(self, addr: SocketAddr) -> Result<()> {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        info!("HTTP server listening on http://{}", addr);
        info!("  GET  /health");
        info!("  POST {}", GENERATE_IMAGE_ROUTE);
        axum::serve(listener, self.router()).await?;
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    provider: String,
    mock: bool,
    timestamp: String,
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        provider: state.config.provider.to_string(),
        mock: state.serves_mock(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

/// POST /api/generateImage - generate an image from `{prompt}`.
async fn generate_image(
    State(state): State<AppState>,
    payload: std::result::Result<Json<GenerateImageRequest>, JsonRejection>,
) -> std::result::Result<Json<ImageResponse>, ApiError> {
    let request_id = Uuid::new_v4();

    let Json(request) = payload.map_err(|rejection| {
        warn!("[{}] Rejected request body: {}", request_id, rejection);
        Error::InvalidPrompt
    })?;

    let prompt = request.prompt().ok_or_else(|| {
        warn!("[{}] Missing or blank prompt", request_id);
        Error::InvalidPrompt
    })?;

    let provider = state.config.provider;
    if state.config.use_mock {
        info!("[{}] Mock mode, returning placeholder image", request_id);
        return Ok(Json(placeholder::mock_response(provider)));
    }

    let Some(image_gen) = state.image_gen.as_ref() else {
        return match state.config.missing_key_policy {
            MissingKeyPolicy::Mock => {
                info!(
                    "[{}] No {} configured, returning placeholder image",
                    request_id,
                    provider.primary_key_var()
                );
                Ok(Json(placeholder::mock_response(provider)))
            }
            MissingKeyPolicy::Reject => Err(Error::MissingApiKey {
                env_var: provider.primary_key_var(),
            }
            .into()),
        };
    };

    info!(
        "[{}] Generating image with {} ({} chars)",
        request_id,
        image_gen.provider_name(),
        prompt.len()
    );

    match image_gen.generate_image(prompt).await {
        Ok(image) => {
            info!(
                "[{}] Generated {} image ({} chars of payload)",
                request_id,
                image.content_type,
                image.photo.len()
            );
            Ok(Json(ImageResponse::success(image)))
        }
        Err(e) => {
            error!(
                "[{}] {} generation failed: {}",
                request_id,
                image_gen.provider_name(),
                e
            );
            Err(e.into())
        }
    }
}

//! Image generation proxy - turns a text prompt into an image via a
//! text-to-image provider
//!
//! Exposes a small HTTP API that validates a prompt, optionally answers with a
//! placeholder image, and otherwise forwards the prompt to Stability AI,
//! Hugging Face or OpenAI, normalizing their responses into one JSON shape.

pub mod ai;
pub mod app;
pub mod display;
pub mod error;
pub mod models;
pub mod placeholder;

pub use error::{ApiError, Error, Result};

//! Fixed placeholder images served in mock mode.

use crate::models::{AiProvider, GeneratedImage, ImageResponse};

/// Bright SVG data URL so the mock image is clearly visible in the card.
pub const MOCK_DATA_URL: &str = "data:image/svg+xml;utf8,<svg xmlns='http://www.w3.org/2000/svg' width='512' height='512'><rect width='100%' height='100%' fill='%2300bcd4'/><text x='50%' y='50%' dominant-baseline='middle' text-anchor='middle' font-size='48' fill='white'>MOCK</text></svg>";

pub const MOCK_CONTENT_TYPE: &str = "image/svg+xml";

/// A valid 1x1 PNG (black pixel).
pub const ONE_BY_ONE_PNG_BASE64: &str =
    "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAQAAAC1HAwCAAAAC0lEQVR4nGNgYAAAAAMAASsJTYQAAAAASUVORK5CYII=";

pub fn mock_image() -> GeneratedImage {
    GeneratedImage {
        photo: MOCK_DATA_URL.to_string(),
        content_type: MOCK_CONTENT_TYPE.to_string(),
    }
}

/// The mock payload, with a hint on how to switch to the real provider.
pub fn mock_response(provider: AiProvider) -> ImageResponse {
    ImageResponse::success(mock_image()).with_message(format!(
        "Mock image generated. Set {} in server/.env and USE_MOCK_IMAGE=false to use real {} images.",
        provider.primary_key_var(),
        provider.display_name()
    ))
}

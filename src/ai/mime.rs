/// Guess an image content type from magic bytes, for providers that omit the
/// `Content-Type` header. Unknown data falls back to `image/png`.
pub fn detect_image_mime(bytes: &[u8]) -> &'static str {
    match bytes {
        [0x89, 0x50, 0x4E, 0x47, ..] => "image/png",
        [0xFF, 0xD8, 0xFF, ..] => "image/jpeg",
        [0x52, 0x49, 0x46, 0x46, _, _, _, _, 0x57, 0x45, 0x42, 0x50, ..] => "image/webp",
        [0x47, 0x49, 0x46, 0x38, ..] => "image/gif",
        _ => {
            tracing::warn!(
                "Unrecognized image bytes (first 4: {:02X?}), assuming image/png",
                &bytes[..bytes.len().min(4)]
            );
            "image/png"
        }
    }
}

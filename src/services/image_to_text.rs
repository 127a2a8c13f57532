//! `ImageToText`: the optional vision/OCR capability consumed when a reader
//! hands back embedded-image placeholders that need text extracted.

use crate::cancel::Ctx;
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Media type inferred from magic bytes, defaulting to `Jpeg` when nothing
/// matches (§6: "defaulting to JPEG").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImageType {
    Png,
    Jpeg,
    Gif,
    WebP,
}

/// Sniff an image's media type from its leading bytes.
pub fn detect_image_type(bytes: &[u8]) -> ImageType {
    if bytes.starts_with(&[0x89, 0x50, 0x4E, 0x47]) {
        ImageType::Png
    } else if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        ImageType::Jpeg
    } else if bytes.starts_with(b"GIF") {
        ImageType::Gif
    } else if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        ImageType::WebP
    } else {
        ImageType::Jpeg
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImageToTextOptions {
    pub language_hint: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageToTextResult {
    pub extracted_text: String,
    pub confidence: f32,
    pub detected_language: Option<String>,
    pub image_type: ImageType,
    pub processing_time_ms: u64,
    pub metadata: serde_json::Value,
    pub error_message: Option<String>,
}

#[async_trait]
pub trait ImageToText: Send + Sync {
    async fn extract_text(
        &self,
        image_bytes: &[u8],
        options: &ImageToTextOptions,
        ctx: &Ctx,
    ) -> Result<ImageToTextResult>;
}

/// Stand-in used in tests; always reports a low-confidence empty result
/// rather than failing, since image extraction is non-fatal everywhere
/// it's consulted.
#[derive(Default)]
pub struct MockImageToText;

#[async_trait]
impl ImageToText for MockImageToText {
    async fn extract_text(
        &self,
        image_bytes: &[u8],
        _options: &ImageToTextOptions,
        _ctx: &Ctx,
    ) -> Result<ImageToTextResult> {
        Ok(ImageToTextResult {
            extracted_text: String::new(),
            confidence: 0.0,
            detected_language: None,
            image_type: detect_image_type(image_bytes),
            processing_time_ms: 0,
            metadata: serde_json::json!({}),
            error_message: Some("no vision service configured".to_string()),
        })
    }
}

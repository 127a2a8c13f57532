//! External collaborator traits consumed (not implemented) by the core:
//! `TextCompletion`, `Embedding`, `ImageToText`. Every consumer must
//! tolerate their absence and degrade to a heuristic fallback — this
//! replaces "async + optional services" conditional-compile mocks (§9
//! design notes) with a single trait per capability and an explicit
//! "not available" sentinel (`is_available`).

pub mod embedding;
pub mod image_to_text;
pub mod text_completion;

pub use embedding::{Embedding, MockEmbedding};
pub use image_to_text::{ImageToText, ImageToTextResult, ImageType, MockImageToText};
pub use text_completion::{
    strip_code_fence, ContentSummary, MetadataExtractionResult, MockTextCompletion, QualityAssessment,
    StructureAnalysisResult, TextCompletion,
};

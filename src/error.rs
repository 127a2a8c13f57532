//! Error handling for the document pipeline

use thiserror::Error;

/// Result type alias for the document pipeline
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Stage of the pipeline an error originated in
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Extract,
    Refine,
    LlmRefine,
    Chunk,
    Enrich,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Extract => write!(f, "extract"),
            Stage::Refine => write!(f, "refine"),
            Stage::LlmRefine => write!(f, "llm_refine"),
            Stage::Chunk => write!(f, "chunk"),
            Stage::Enrich => write!(f, "enrich"),
        }
    }
}

/// Main error type for the document pipeline
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("reader error: {0}")]
    Reader(#[from] ReaderError),

    #[error("refinement error: {0}")]
    Refinement(#[from] RefinementError),

    #[error("chunking error: {0}")]
    Chunking(#[from] ChunkingError),

    #[error("enrichment error: {0}")]
    Enrichment(#[from] EnrichmentError),

    #[error("external service error: {0}")]
    ExternalService(#[from] ServiceError),

    #[error("cancelled")]
    Cancelled,

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("generic error: {0}")]
    Generic(#[from] anyhow::Error),
}

impl PipelineError {
    /// The stage this error is attributable to, when known.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            PipelineError::Reader(_) => Some(Stage::Extract),
            PipelineError::Refinement(_) => Some(Stage::Refine),
            PipelineError::Chunking(_) => Some(Stage::Chunk),
            PipelineError::Enrichment(_) => Some(Stage::Enrich),
            _ => None,
        }
    }
}

/// Errors that occur while turning a source into `RawContent`
#[derive(Error, Debug)]
pub enum ReaderError {
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("source not found: {0}")]
    SourceNotFound(String),

    #[error("source unreadable: {0}")]
    SourceUnreadable(String),

    #[error("parse error: {0}")]
    ParseError(String),
}

/// Errors that occur while refining `RawContent` into `RefinedContent`
#[derive(Error, Debug)]
pub enum RefinementError {
    #[error("structural extraction failed: {0}")]
    StructureExtractionFailed(String),
}

/// Errors that occur while segmenting refined text into chunks
#[derive(Error, Debug)]
pub enum ChunkingError {
    #[error("strategy produced non-monotone chunk indices")]
    NonMonotoneIndices,

    #[error("strategy produced out-of-range location: {0}")]
    OutOfRangeLocation(String),

    #[error("max_chunk_size smaller than the shortest sentence with preserve_sentences enabled")]
    UnsplittableWithPreservedSentences,

    #[error("strategy failed: {0}")]
    StrategyFailed(String),
}

/// Errors that occur while enriching chunks
#[derive(Error, Debug)]
pub enum EnrichmentError {
    #[error("scoring failed: {0}")]
    ScoringFailed(String),

    #[error("graph assembly failed: {0}")]
    GraphAssemblyFailed(String),
}

/// Errors surfaced by optional external collaborators (LLM / embedding / vision)
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("service unavailable: {0}")]
    Unavailable(String),

    #[error("request failed: {0}")]
    RequestFailed(String),

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("timeout: operation took too long")]
    Timeout,
}

/// A non-fatal anomaly recorded alongside a stage's output: a fallback was
/// used, confidence was low, input was truncated, and so on.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Warning {
    pub stage: Stage,
    pub message: String,
}

impl Warning {
    pub fn new(stage: Stage, message: impl Into<String>) -> Self {
        Self {
            stage,
            message: message.into(),
        }
    }
}

/// A recorded, non-panicking failure of a pipeline stage, kept in
/// `ProcessingResult.errors` so batch consumers can inspect partial
/// progress after a document enters the batch's failed list.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ProcessingError {
    pub stage: Stage,
    pub message: String,
    pub cause: Option<String>,
}

impl ProcessingError {
    pub fn from_pipeline_error(stage: Stage, err: &PipelineError) -> Self {
        use std::error::Error as _;
        Self {
            stage,
            message: err.to_string(),
            cause: err.source().map(|s| s.to_string()),
        }
    }
}

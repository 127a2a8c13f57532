//! docflux: a document ingestion and chunking pipeline for retrieval-augmented
//! generation.
//!
//! Raw bytes move through five stages — Extract, Refine, Chunk, Enrich, and
//! Graph — coordinated by a single stateful [`pipeline::PipelineCoordinator`]
//! per document:
//!
//! - **Extract** ([`reader`], [`raw`]): turn an opaque source into text plus
//!   structural hints, via a capability-trait [`reader::Reader`] registry.
//! - **Refine** ([`refine`]): clean noise, normalize tables/lists/images to
//!   markdown, and detect headings and structural elements.
//! - **Chunk** ([`chunking`], [`chunk_model`]): segment refined text with one
//!   of eight strategies, then run a shared post-processing pipeline
//!   (header separation, overlap, merge, dedup).
//! - **Enrich** ([`enrich`]): annotate, score, and optionally LLM-filter
//!   chunks for relevance.
//! - **Graph** ([`graph`]): assemble sequential, hierarchical, and optional
//!   semantic-similarity edges between finished chunks.
//!
//! Every stage degrades gracefully in the absence of an optional
//! [`services::TextCompletion`], [`services::Embedding`], or
//! [`services::ImageToText`] collaborator, and every public operation takes
//! a [`cancel::Ctx`] for cooperative cancellation.
//!
//! # Example
//!
//! ```rust,no_run
//! use docflux::cancel::Ctx;
//! use docflux::config::PipelineConfig;
//! use docflux::pipeline::{OwnedSource, PipelineCoordinator, PipelineServices};
//! use std::sync::Arc;
//! use uuid::Uuid;
//!
//! # async fn run(registry: docflux::reader::ReaderRegistry) -> docflux::error::Result<()> {
//! let services = PipelineServices {
//!     readers: Arc::new(registry),
//!     ..Default::default()
//! };
//! let source = OwnedSource::Path(std::path::PathBuf::from("report.pdf"));
//! let mut coordinator = PipelineCoordinator::new(Uuid::new_v4(), source, services);
//! coordinator.process(&PipelineConfig::default(), &Ctx::new()).await?;
//! let result = coordinator.result();
//! println!("produced {} chunks", result.chunks.as_ref().map(|c| c.len()).unwrap_or(0));
//! # Ok(())
//! # }
//! ```

pub mod boundary;
pub mod cache;
pub mod cancel;
pub mod chunk_model;
pub mod chunking;
pub mod config;
pub mod enrich;
pub mod error;
pub mod graph;
pub mod pipeline;
pub mod raw;
pub mod reader;
pub mod refine;
pub mod services;
pub mod tokenizer;

// Re-export main types
pub use cache::{AutoStrategyCache, AutoStrategyCacheConfig};
pub use cancel::Ctx;
pub use chunk_model::{ContextDependency, DocumentChunk, HierarchicalDocumentChunk, SourceLocation, SourceMetadataInfo};
pub use config::{BoundaryOptions, ChunkingOptions, EnrichOptions, PipelineConfig, RefineOptions, Strategy};
pub use error::{PipelineError, ProcessingError, Result, Stage, Warning};
pub use graph::{ChunkEdge, ChunkNode, DocumentGraph, EdgeType};
pub use pipeline::{CoordinatorState, OwnedSource, PipelineCoordinator, PipelineServices, ProcessingResult, StageMetrics};
pub use raw::{DocumentFormat, FileInfo, RawContent, TableData};
pub use reader::{Reader, ReaderRegistry, Source};
pub use refine::{DocumentMetadata, RefinedContent, Section};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(VERSION.starts_with(char::is_numeric));
    }
}

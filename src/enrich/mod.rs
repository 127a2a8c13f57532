//! Enrich stage (C7, §4.4): chunk annotation, scoring, and the optional
//! three-stage LLM relevance filter.

mod enricher;
mod header;
mod keywords;
mod llm_filter;
mod scoring;
pub mod types;

pub use enricher::enrich;
pub use llm_filter::{assess_chunk, filter_chunks, FilterAssessment, ScoredFactor, StageResult};
pub use types::{ContentType, DocumentDomain, EnrichmentAnnotation, StructuralRole, TopicScores};

//! Value types produced by the Enrich stage (§4.4).

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// What kind of content a chunk mostly contains, decided heuristically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    Text,
    Code,
    Table,
    List,
    Heading,
}

impl ContentType {
    /// `StructuralRole` is a deterministic function of `ContentType`.
    pub fn structural_role(self) -> StructuralRole {
        match self {
            ContentType::Heading => StructuralRole::Title,
            ContentType::Code => StructuralRole::CodeBlock,
            ContentType::Table => StructuralRole::TableContent,
            ContentType::List => StructuralRole::ListContent,
            ContentType::Text => StructuralRole::Content,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StructuralRole {
    Title,
    CodeBlock,
    TableContent,
    ListContent,
    Content,
}

/// Document-level subject-matter classification, decided once per
/// document from keyword density across all chunks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentDomain {
    Technical,
    Business,
    Academic,
    General,
}

impl Default for DocumentDomain {
    fn default() -> Self {
        DocumentDomain::General
    }
}

impl std::fmt::Display for DocumentDomain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DocumentDomain::Technical => write!(f, "Technical"),
            DocumentDomain::Business => write!(f, "Business"),
            DocumentDomain::Academic => write!(f, "Academic"),
            DocumentDomain::General => write!(f, "General"),
        }
    }
}

/// Per-chunk, per-topic keyword density for the document's decided domain.
pub type TopicScores = HashMap<String, f32>;

/// Everything the enricher attaches to a chunk beyond the base scores
/// already stored on `DocumentChunk` (quality/importance/density).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichmentAnnotation {
    pub content_type: ContentType,
    pub structural_role: StructuralRole,
    pub domain: DocumentDomain,
    pub topic_scores: TopicScores,
    pub technical_keywords: Vec<String>,
    pub relevance_score: f32,
    pub contextual_header: String,
    pub used_llm: bool,
}

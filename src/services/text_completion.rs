//! `TextCompletion`: the optional LLM capability consumed by the refiner's
//! structural re-ordering pass, the enricher's quality/domain assessment,
//! and the chunk filter. Mirrors `the_agency`'s `LlmProvider` trait shape
//! (`generate`/`embed`/`is_available`) generalized across the extra
//! response types this pipeline needs.

use crate::cancel::Ctx;
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Result of asking the model to infer a section structure from raw text.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StructureAnalysisResult {
    pub sections: Vec<String>,
    pub confidence: f32,
    pub raw_response: String,
    pub tokens_used: Option<u32>,
}

/// Result of summarizing a chunk or document.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ContentSummary {
    pub summary: String,
    pub keywords: Vec<String>,
    pub confidence: f32,
}

/// Result of asking the model to extract document-level metadata.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MetadataExtractionResult {
    pub keywords: Vec<String>,
    pub language: Option<String>,
    pub categories: Vec<String>,
    pub entities: Vec<String>,
    pub technical_metadata: serde_json::Value,
    pub confidence: f32,
}

/// Result of asking the model to assess chunk/document quality.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityAssessment {
    pub confidence_score: f32,
    pub completeness_score: f32,
    pub consistency_score: f32,
    pub explanation: String,
    pub recommendations: Vec<String>,
}

impl Default for QualityAssessment {
    fn default() -> Self {
        Self {
            confidence_score: 0.5,
            completeness_score: 0.5,
            consistency_score: 0.5,
            explanation: "no assessment available".to_string(),
            recommendations: Vec::new(),
        }
    }
}

/// The optional LLM text-completion capability. All methods must tolerate
/// responses wrapped in markdown code fences; callers strip those before
/// parsing, and treat unparseable JSON as a default result with confidence
/// 0.5 plus a recorded warning rather than a hard failure.
#[async_trait]
pub trait TextCompletion: Send + Sync {
    async fn generate(&self, prompt: &str, ctx: &Ctx) -> Result<String>;

    async fn analyze_structure(
        &self,
        prompt: &str,
        document_type: &str,
        ctx: &Ctx,
    ) -> Result<StructureAnalysisResult>;

    async fn summarize(&self, prompt: &str, max_length: usize, ctx: &Ctx) -> Result<ContentSummary>;

    async fn extract_metadata(
        &self,
        prompt: &str,
        document_type: &str,
        ctx: &Ctx,
    ) -> Result<MetadataExtractionResult>;

    async fn assess_quality(&self, prompt: &str, ctx: &Ctx) -> Result<QualityAssessment>;

    async fn is_available(&self, ctx: &Ctx) -> bool;
}

/// Strip a leading/trailing ``` fence (optionally with a language tag) from
/// a model response before attempting to parse it as JSON. Used by every
/// consumer of `TextCompletion` responses (§6).
pub fn strip_code_fence(response: &str) -> &str {
    let trimmed = response.trim();
    if let Some(rest) = trimmed.strip_prefix("```") {
        let rest = rest.trim_start_matches(|c: char| c.is_alphabetic());
        let rest = rest.strip_prefix('\n').unwrap_or(rest);
        rest.strip_suffix("```").unwrap_or(rest).trim()
    } else {
        trimmed
    }
}

/// An in-memory stand-in used in tests and by callers without a real LLM
/// backend, wired via configuration rather than a compile-time feature
/// flag (§9 design notes: no conditional-compile mock services).
#[derive(Default, Clone)]
pub struct MockTextCompletion {
    pub available: bool,
    pub canned_response: String,
}

impl MockTextCompletion {
    pub fn unavailable() -> Self {
        Self {
            available: false,
            canned_response: String::new(),
        }
    }

    pub fn with_response(response: impl Into<String>) -> Self {
        Self {
            available: true,
            canned_response: response.into(),
        }
    }
}

#[async_trait]
impl TextCompletion for MockTextCompletion {
    async fn generate(&self, _prompt: &str, _ctx: &Ctx) -> Result<String> {
        Ok(self.canned_response.clone())
    }

    async fn analyze_structure(
        &self,
        _prompt: &str,
        _document_type: &str,
        _ctx: &Ctx,
    ) -> Result<StructureAnalysisResult> {
        Ok(StructureAnalysisResult {
            sections: vec![],
            confidence: 0.5,
            raw_response: self.canned_response.clone(),
            tokens_used: None,
        })
    }

    async fn summarize(&self, _prompt: &str, _max_length: usize, _ctx: &Ctx) -> Result<ContentSummary> {
        Ok(ContentSummary {
            summary: self.canned_response.clone(),
            keywords: vec![],
            confidence: 0.5,
        })
    }

    async fn extract_metadata(
        &self,
        _prompt: &str,
        _document_type: &str,
        _ctx: &Ctx,
    ) -> Result<MetadataExtractionResult> {
        Ok(MetadataExtractionResult::default())
    }

    async fn assess_quality(&self, _prompt: &str, _ctx: &Ctx) -> Result<QualityAssessment> {
        Ok(QualityAssessment::default())
    }

    async fn is_available(&self, _ctx: &Ctx) -> bool {
        self.available
    }
}

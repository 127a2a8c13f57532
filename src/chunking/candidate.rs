//! Raw candidate type every chunking strategy produces (§4.3), before the
//! chunk builder (C6) finalizes them into `DocumentChunk`s.

use crate::tokenizer::estimate_tokens;

/// One proposed chunk boundary from a strategy, not yet a `DocumentChunk`.
#[derive(Debug, Clone)]
pub struct RawChunkCandidate {
    pub content: String,
    pub start_char: usize,
    pub end_char: usize,
    pub heading_path: Vec<String>,
    pub tokens_est: usize,
}

impl RawChunkCandidate {
    pub fn new(content: impl Into<String>, start_char: usize, end_char: usize, heading_path: Vec<String>) -> Self {
        let content = content.into();
        let tokens_est = estimate_tokens(&content);
        Self {
            content,
            start_char,
            end_char,
            heading_path,
            tokens_est,
        }
    }
}

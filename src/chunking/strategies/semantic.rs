//! Semantic strategy (§4.3): splits into sentences, runs the boundary
//! detector pairwise, and cuts wherever boundary confidence clears the
//! configured threshold, respecting `max`/`min` chunk sizes.

use crate::boundary::{self};
use crate::cancel::Ctx;
use crate::chunking::candidate::RawChunkCandidate;
use crate::chunking::strategy::{ChunkInput, ChunkStrategy};
use crate::config::{BoundaryOptions, ChunkingOptions};
use crate::error::Result;
use crate::services::Embedding;
use crate::tokenizer::split_sentences;
use async_trait::async_trait;

pub struct SemanticStrategy;

#[async_trait]
impl ChunkStrategy for SemanticStrategy {
    async fn chunk(
        &self,
        input: &ChunkInput<'_>,
        options: &ChunkingOptions,
        embedding: Option<&dyn Embedding>,
        ctx: &Ctx,
    ) -> Result<Vec<RawChunkCandidate>> {
        let text = &input.refined.text;
        let sentences: Vec<&str> = split_sentences(text);
        let mut candidates = Vec::new();
        if sentences.is_empty() {
            return Ok(candidates);
        }

        let boundary_options = BoundaryOptions::default();
        let sentence_strings: Vec<String> = sentences.iter().map(|s| s.to_string()).collect();
        let boundary_points = boundary::detect_all(&sentence_strings, embedding, &boundary_options, ctx).await;
        let mut cut_after: std::collections::HashSet<usize> =
            boundary_points.into_iter().map(|p| p.segment_index).collect();

        let max = options.max_chunk_size.max(1);
        let min = options.min_chunk_size;

        let mut offset = 0usize;
        let mut acc_start = offset;
        let mut acc_len = 0usize;

        for (i, sentence) in sentences.iter().enumerate() {
            ctx.check()?;
            let sentence_start = text[offset..].find(sentence).map(|p| offset + p).unwrap_or(offset);
            let sentence_end = sentence_start + sentence.len();
            offset = sentence_end;

            if acc_len == 0 {
                acc_start = sentence_start;
            }
            acc_len += sentence.len();

            let should_cut = (cut_after.remove(&i) && acc_len >= min) || acc_len >= max;
            let is_last = i == sentences.len() - 1;

            if should_cut || is_last {
                let content = text[acc_start..sentence_end].to_string();
                candidates.push(RawChunkCandidate::new(content, acc_start, sentence_end, Vec::new()));
                acc_len = 0;
            }
        }

        Ok(candidates)
    }
}

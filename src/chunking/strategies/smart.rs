//! Smart strategy (§4.3): like `Paragraph`, but enforces a per-chunk
//! completeness score floor; candidates falling short are extended to the
//! next sentence boundary, up to 1.5x `max_chunk_size`.

use super::paragraph::split_paragraphs;
use crate::cancel::Ctx;
use crate::chunking::candidate::RawChunkCandidate;
use crate::chunking::strategy::{ChunkInput, ChunkStrategy};
use crate::config::ChunkingOptions;
use crate::error::Result;
use crate::services::Embedding;
use crate::tokenizer::completeness_score;
use async_trait::async_trait;

/// Default completeness floor the `Smart` strategy enforces (§4.4's
/// `EnrichOptions::completeness_floor` default; chunking strategies have
/// no enrichment config of their own, so this mirrors that default).
const SMART_COMPLETENESS_FLOOR: f32 = 0.7;

pub struct SmartStrategy;

#[async_trait]
impl ChunkStrategy for SmartStrategy {
    async fn chunk(
        &self,
        input: &ChunkInput<'_>,
        options: &ChunkingOptions,
        _embedding: Option<&dyn Embedding>,
        ctx: &Ctx,
    ) -> Result<Vec<RawChunkCandidate>> {
        let text = &input.refined.text;
        let paragraphs = split_paragraphs(text);
        let mut candidates = Vec::new();
        let max = options.max_chunk_size.max(1);
        let hard_cap = ((max as f32) * 1.5).ceil() as usize;

        let mut acc_start: Option<usize> = None;
        let mut acc_end = 0usize;

        for (p_start, p_end) in paragraphs {
            ctx.check()?;
            match acc_start {
                None => {
                    acc_start = Some(p_start);
                    acc_end = p_end;
                }
                Some(s) => {
                    if p_end - s <= max {
                        acc_end = p_end;
                        continue;
                    }
                    flush(text, s, acc_end, hard_cap, &mut candidates);
                    acc_start = Some(p_start);
                    acc_end = p_end;
                }
            }
        }
        if let Some(s) = acc_start {
            flush(text, s, acc_end, hard_cap, &mut candidates);
        }

        Ok(candidates)
    }
}

fn flush(text: &str, start: usize, mut end: usize, hard_cap_len: usize, out: &mut Vec<RawChunkCandidate>) {
    let mut content = text[start..end].to_string();
    if completeness_score(&content) < SMART_COMPLETENESS_FLOOR {
        let limit = (start + hard_cap_len).min(text.len());
        if let Some(rel) = text[end..limit].find(|c: char| matches!(c, '.' | '!' | '?')) {
            let mut new_end = end + rel + 1;
            while new_end < text.len() && !text.is_char_boundary(new_end) {
                new_end += 1;
            }
            end = new_end;
            content = text[start..end].to_string();
        }
    }
    out.push(RawChunkCandidate::new(content, start, end, Vec::new()));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::refine::RefinedContent;
    use uuid::Uuid;

    fn refined_with(text: &str) -> RefinedContent {
        RefinedContent {
            id: Uuid::new_v4(),
            raw_id: Uuid::new_v4(),
            text: text.to_string(),
            sections: Vec::new(),
            structures: Vec::new(),
            metadata: crate::refine::DocumentMetadata::default(),
            quality: crate::refine::RefinementQuality::compute(false, text.len(), text.len()),
            info: Default::default(),
        }
    }

    #[tokio::test]
    async fn produces_candidates_for_multi_paragraph_text() {
        let text = "First complete sentence here. Second one too.\n\nAnother paragraph with full sentences.";
        let refined = refined_with(text);
        let input = ChunkInput::new(&refined);
        let strategy = SmartStrategy;
        let candidates = strategy
            .chunk(&input, &ChunkingOptions::default(), None, &Ctx::new())
            .await
            .unwrap();
        assert!(!candidates.is_empty());
    }
}

//! FixedSize strategy (§4.3): cuts at `max_chunk_size` boundaries, stepping
//! by `max - overlap`, never splitting mid-word.

use crate::cancel::Ctx;
use crate::chunking::candidate::RawChunkCandidate;
use crate::chunking::strategy::{snap_to_word_boundary, ChunkInput, ChunkStrategy};
use crate::config::ChunkingOptions;
use crate::error::Result;
use crate::refine::types::enclosing_code_block_end;
use crate::services::Embedding;
use async_trait::async_trait;

pub struct FixedSizeStrategy;

#[async_trait]
impl ChunkStrategy for FixedSizeStrategy {
    async fn chunk(
        &self,
        input: &ChunkInput<'_>,
        options: &ChunkingOptions,
        _embedding: Option<&dyn Embedding>,
        ctx: &Ctx,
    ) -> Result<Vec<RawChunkCandidate>> {
        let text = &input.refined.text;
        let mut candidates = Vec::new();
        let len = text.len();
        if len == 0 {
            return Ok(candidates);
        }

        let max = options.max_chunk_size.max(1);
        let overlap = options.overlap_size.min(max.saturating_sub(1).max(0));
        let step = max.saturating_sub(overlap).max(1);
        let extension_allowance = ((max as f32) * 0.2).ceil() as usize;
        let code_ranges = input.refined.code_block_ranges();

        let mut start = 0usize;
        while start < len {
            ctx.check()?;
            let tentative_end = (start + max).min(len);
            let mut end = tentative_end;

            if end < len {
                if let Some(code_end) = enclosing_code_block_end(&code_ranges, end) {
                    // Never cut inside a fenced code block (§8 scenario 3):
                    // extend past it even if that exceeds max_chunk_size.
                    end = code_end.min(len);
                } else {
                    let relative = snap_to_word_boundary(&text[start..], end - start);
                    end = if relative > 0 { start + relative } else { tentative_end };

                    if options.preserve_sentences {
                        let search_limit = (end + extension_allowance).min(len);
                        if let Some(rel_pos) = text[end..search_limit].find(|c: char| matches!(c, '.' | '!' | '?')) {
                            let mut new_end = end + rel_pos + 1;
                            while new_end < len && !text.is_char_boundary(new_end) {
                                new_end += 1;
                            }
                            end = new_end;
                        }
                    }
                }
            }

            if end <= start {
                end = tentative_end.max(start + 1).min(len);
            }

            let content = text[start..end].to_string();
            candidates.push(RawChunkCandidate::new(content, start, end, Vec::new()));

            if end >= len {
                break;
            }
            let next_start = end.saturating_sub(overlap);
            start = if next_start > start { next_start } else { start + step };
        }

        Ok(candidates)
    }
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
    async fn never_splits_mid_word() {
        let text = "word ".repeat(200);
        let refined = refined_with(&text);
        let input = ChunkInput::new(&refined);
        let mut options = ChunkingOptions::default();
        options.max_chunk_size = 50;
        options.overlap_size = 0;
        options.preserve_sentences = false;

        let strategy = FixedSizeStrategy;
        let candidates = strategy.chunk(&input, &options, None, &Ctx::new()).await.unwrap();

        assert!(!candidates.is_empty());
        for c in &candidates {
            assert!(!c.content.starts_with(' '));
        }
    }

    #[tokio::test]
    async fn respects_max_chunk_size_bound() {
        let text = "a".repeat(10) + " " + &"b".repeat(10).repeat(50);
        let refined = refined_with(&text);
        let input = ChunkInput::new(&refined);
        let mut options = ChunkingOptions::default();
        options.max_chunk_size = 64;
        options.overlap_size = 0;
        options.preserve_sentences = false;

        let strategy = FixedSizeStrategy;
        let candidates = strategy.chunk(&input, &options, None, &Ctx::new()).await.unwrap();
        for c in &candidates {
            assert!(c.content.len() <= 64 + 1);
        }
    }

    #[tokio::test]
    async fn never_cuts_inside_a_fenced_code_block() {
        let prose = "word ".repeat(10);
        let code = "```rust\nfn example() {\n    println!(\"hi\");\n}\n```\n";
        let text = format!("{prose}{code}{}", "word ".repeat(10));
        let code_start = prose.len();
        let code_end = code_start + code.len();

        let mut refined = refined_with(&text);
        refined.structures.push(crate::refine::StructuredElement::Code {
            language: Some("rust".to_string()),
            content: code.to_string(),
            location: crate::refine::Location {
                start_char: code_start,
                end_char: code_end,
            },
            source_chunk_id: None,
        });

        let input = ChunkInput::new(&refined);
        let mut options = ChunkingOptions::default();
        options.max_chunk_size = code_start + code.len() / 2; // cut point lands mid-fence
        options.overlap_size = 0;
        options.preserve_sentences = false;

        let strategy = FixedSizeStrategy;
        let candidates = strategy.chunk(&input, &options, None, &Ctx::new()).await.unwrap();

        assert!(candidates
            .iter()
            .any(|c| c.start_char <= code_start && c.end_char >= code_end));
    }

    #[tokio::test]
    async fn empty_text_yields_no_candidates() {
        let refined = refined_with("");
        let input = ChunkInput::new(&refined);
        let strategy = FixedSizeStrategy;
        let candidates = strategy
            .chunk(&input, &ChunkingOptions::default(), None, &Ctx::new())
            .await
            .unwrap();
        assert!(candidates.is_empty());
    }
}

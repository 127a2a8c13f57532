//! Paragraph strategy (§4.3): splits on blank-line boundaries, accumulating
//! paragraphs until the next would exceed `max_chunk_size`; an oversized
//! single paragraph falls back to `FixedSize` within that paragraph.

use super::fixed_size::FixedSizeStrategy;
use crate::cancel::Ctx;
use crate::chunking::candidate::RawChunkCandidate;
use crate::chunking::strategy::{ChunkInput, ChunkStrategy};
use crate::config::ChunkingOptions;
use crate::error::Result;
use crate::refine::RefinedContent;
use crate::services::Embedding;
use async_trait::async_trait;

/// Byte ranges of blank-line-delimited paragraphs in `text`, in order.
pub fn split_paragraphs(text: &str) -> Vec<(usize, usize)> {
    let mut ranges = Vec::new();
    let mut start = 0usize;
    let mut offset = 0usize;
    let mut blank_run = 0usize;
    let mut saw_content = false;

    for line in text.split_inclusive('\n') {
        let trimmed = line.trim_end_matches('\n');
        let line_start = offset;
        offset += line.len();

        if trimmed.trim().is_empty() {
            blank_run += 1;
            if blank_run >= 1 && saw_content {
                // boundary candidate; flush happens below once non-blank resumes
            }
        } else {
            if blank_run > 0 && saw_content {
                ranges.push((start, line_start));
                start = line_start;
            }
            saw_content = true;
            blank_run = 0;
        }
    }
    if saw_content && start < text.len() {
        ranges.push((start, text.len()));
    }
    ranges
}

pub struct ParagraphStrategy;

#[async_trait]
impl ChunkStrategy for ParagraphStrategy {
    async fn chunk(
        &self,
        input: &ChunkInput<'_>,
        options: &ChunkingOptions,
        embedding: Option<&dyn Embedding>,
        ctx: &Ctx,
    ) -> Result<Vec<RawChunkCandidate>> {
        let text = &input.refined.text;
        let paragraphs = split_paragraphs(text);
        let mut candidates = Vec::new();
        let max = options.max_chunk_size.max(1);

        let mut acc_start: Option<usize> = None;
        let mut acc_end = 0usize;

        for (p_start, p_end) in paragraphs {
            ctx.check()?;
            let para_len = p_end - p_start;

            if para_len > max {
                if let Some(s) = acc_start.take() {
                    candidates.push(RawChunkCandidate::new(text[s..acc_end].to_string(), s, acc_end, Vec::new()));
                }
                let sub_refined = sub_refined_content(input.refined, &text[p_start..p_end]);
                let sub_input = ChunkInput::new(&sub_refined);
                let sub_candidates = FixedSizeStrategy.chunk(&sub_input, options, embedding, ctx).await?;
                for c in sub_candidates {
                    candidates.push(RawChunkCandidate::new(c.content, p_start + c.start_char, p_start + c.end_char, Vec::new()));
                }
                continue;
            }

            match acc_start {
                None => {
                    acc_start = Some(p_start);
                    acc_end = p_end;
                }
                Some(s) => {
                    if p_end - s > max {
                        candidates.push(RawChunkCandidate::new(text[s..acc_end].to_string(), s, acc_end, Vec::new()));
                        acc_start = Some(p_start);
                        acc_end = p_end;
                    } else {
                        acc_end = p_end;
                    }
                }
            }
        }

        if let Some(s) = acc_start {
            candidates.push(RawChunkCandidate::new(text[s..acc_end].to_string(), s, acc_end, Vec::new()));
        }

        Ok(candidates)
    }
}

fn sub_refined_content(parent: &RefinedContent, slice: &str) -> RefinedContent {
    RefinedContent {
        id: uuid::Uuid::new_v4(),
        raw_id: parent.raw_id,
        text: slice.to_string(),
        sections: Vec::new(),
        structures: Vec::new(),
        metadata: parent.metadata.clone(),
        quality: parent.quality.clone(),
        info: parent.info.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_blank_lines() {
        let text = "para one line.\n\npara two line.\n\npara three.";
        let ranges = split_paragraphs(text);
        assert_eq!(ranges.len(), 3);
        assert_eq!(&text[ranges[0].0..ranges[0].1].trim(), &"para one line.");
    }

    #[test]
    fn single_paragraph_with_no_blank_lines() {
        let text = "just one paragraph of text with no breaks";
        let ranges = split_paragraphs(text);
        assert_eq!(ranges.len(), 1);
    }
}

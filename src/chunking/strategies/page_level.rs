//! PageLevel strategy (§4.3): one candidate per page, using the reader's
//! per-page offsets; long pages are split by paragraph.

use super::paragraph::split_paragraphs;
use crate::cancel::Ctx;
use crate::chunking::candidate::RawChunkCandidate;
use crate::chunking::strategy::{ChunkInput, ChunkStrategy};
use crate::config::ChunkingOptions;
use crate::error::Result;
use crate::services::Embedding;
use async_trait::async_trait;

pub struct PageLevelStrategy;

#[async_trait]
impl ChunkStrategy for PageLevelStrategy {
    async fn chunk(
        &self,
        input: &ChunkInput<'_>,
        options: &ChunkingOptions,
        _embedding: Option<&dyn Embedding>,
        ctx: &Ctx,
    ) -> Result<Vec<RawChunkCandidate>> {
        let text = &input.refined.text;
        let mut candidates = Vec::new();

        let pages: Vec<(usize, usize)> = match input.page_offsets {
            Some(offsets) if !offsets.is_empty() => offsets.to_vec(),
            _ => vec![(0, text.len())],
        };

        for (page_start, page_end) in pages {
            ctx.check()?;
            let page_start = page_start.min(text.len());
            let page_end = page_end.min(text.len());
            if page_start >= page_end {
                continue;
            }
            let page_text = &text[page_start..page_end];

            if page_text.len() <= options.max_chunk_size {
                candidates.push(RawChunkCandidate::new(page_text.to_string(), page_start, page_end, Vec::new()));
            } else {
                for (p_start, p_end) in split_paragraphs(page_text) {
                    candidates.push(RawChunkCandidate::new(
                        page_text[p_start..p_end].to_string(),
                        page_start + p_start,
                        page_start + p_end,
                        Vec::new(),
                    ));
                }
            }
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
    async fn one_candidate_per_page() {
        let text = "page one content here.page two content here.";
        let refined = refined_with(text);
        let offsets = vec![(0usize, 22usize), (22usize, text.len())];
        let input = ChunkInput::new(&refined).with_page_offsets(Some(&offsets));
        let strategy = PageLevelStrategy;
        let candidates = strategy
            .chunk(&input, &ChunkingOptions::default(), None, &Ctx::new())
            .await
            .unwrap();
        assert_eq!(candidates.len(), 2);
    }

    #[tokio::test]
    async fn no_offsets_treats_whole_document_as_one_page() {
        let refined = refined_with("short text without page hints");
        let input = ChunkInput::new(&refined);
        let strategy = PageLevelStrategy;
        let candidates = strategy
            .chunk(&input, &ChunkingOptions::default(), None, &Ctx::new())
            .await
            .unwrap();
        assert_eq!(candidates.len(), 1);
    }
}

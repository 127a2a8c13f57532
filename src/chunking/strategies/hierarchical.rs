//! Hierarchical strategy (§4.3): walks the section tree; each section at
//! level <= `max_heading_level` becomes a candidate, recursively split by
//! paragraph when it exceeds `max_chunk_size`.

use super::paragraph::split_paragraphs;
use crate::cancel::Ctx;
use crate::chunking::candidate::RawChunkCandidate;
use crate::chunking::strategy::{ChunkInput, ChunkStrategy};
use crate::config::ChunkingOptions;
use crate::error::Result;
use crate::refine::Section;
use crate::services::Embedding;
use async_trait::async_trait;

fn walk(section: &Section, full_text: &str, max_heading_level: u8, max_chunk_size: usize, path: &mut Vec<String>, out: &mut Vec<RawChunkCandidate>) {
    if section.level > max_heading_level {
        return;
    }
    path.push(section.title.clone());

    // Own body only; nested subsections are walked separately below and
    // would otherwise be double-counted (`build_sections` widens a
    // parent's `end` to cover its last descendant).
    let (content_start, _) = section.own_content_range();
    let span = section.content.as_str();
    if span.len() <= max_chunk_size || section.children.is_empty() {
        if !span.trim().is_empty() {
            out.push(RawChunkCandidate::new(span.to_string(), content_start, content_start + span.len(), path.clone()));
        }
    } else {
        for (p_start, p_end) in split_paragraphs(span) {
            let content = &span[p_start..p_end];
            if !content.trim().is_empty() {
                out.push(RawChunkCandidate::new(
                    content.to_string(),
                    content_start + p_start,
                    content_start + p_end,
                    path.clone(),
                ));
            }
        }
    }

    for child in &section.children {
        walk(child, full_text, max_heading_level, max_chunk_size, path, out);
    }
    path.pop();
}

pub struct HierarchicalStrategy;

#[async_trait]
impl ChunkStrategy for HierarchicalStrategy {
    async fn chunk(
        &self,
        input: &ChunkInput<'_>,
        options: &ChunkingOptions,
        _embedding: Option<&dyn Embedding>,
        ctx: &Ctx,
    ) -> Result<Vec<RawChunkCandidate>> {
        let refined = input.refined;
        let mut candidates = Vec::new();

        if refined.sections.is_empty() {
            for (p_start, p_end) in split_paragraphs(&refined.text) {
                ctx.check()?;
                candidates.push(RawChunkCandidate::new(
                    refined.text[p_start..p_end].to_string(),
                    p_start,
                    p_end,
                    Vec::new(),
                ));
            }
            return Ok(candidates);
        }

        let mut path = Vec::new();
        for section in &refined.sections {
            ctx.check()?;
            walk(section, &refined.text, options.max_heading_level, options.max_chunk_size, &mut path, &mut candidates);
        }

        Ok(candidates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::refine::RefinedContent;
    use uuid::Uuid;

    fn build_refined() -> RefinedContent {
        let text = "# A\nintro text here\n## A.1\nsubsection body text here";
        RefinedContent {
            id: Uuid::new_v4(),
            raw_id: Uuid::new_v4(),
            text: text.to_string(),
            sections: Vec::new(),
            structures: Vec::new(),
            metadata: crate::refine::DocumentMetadata::default(),
            quality: crate::refine::RefinementQuality::compute(true, text.len(), text.len()),
            info: Default::default(),
        }
    }

    #[tokio::test]
    async fn falls_back_to_paragraphs_without_sections() {
        let refined = build_refined();
        let input = ChunkInput::new(&refined);
        let strategy = HierarchicalStrategy;
        let candidates = strategy
            .chunk(&input, &ChunkingOptions::default(), None, &Ctx::new())
            .await
            .unwrap();
        assert!(!candidates.is_empty());
    }

    #[tokio::test]
    async fn nested_sections_exclude_descendant_body_and_keep_full_path() {
        let text = "# A\nbody a1.\n## A.1\nbody a2.\n";
        let mut section_a = Section::new("A", 1, 0, text.len());
        section_a.content_start = 4;
        section_a.content = "body a1.\n".to_string();
        let mut section_a1 = Section::new("A.1", 2, 13, text.len());
        section_a1.content_start = 20;
        section_a1.content = "body a2.\n".to_string();
        section_a.children.push(section_a1);

        let refined = {
            let mut r = build_refined();
            r.text = text.to_string();
            r.sections = vec![section_a];
            r
        };
        let input = ChunkInput::new(&refined);
        let strategy = HierarchicalStrategy;
        let candidates = strategy
            .chunk(&input, &ChunkingOptions::default(), None, &Ctx::new())
            .await
            .unwrap();

        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].content, "body a1.\n");
        assert_eq!(candidates[0].heading_path, vec!["A".to_string()]);
        assert_eq!(candidates[1].content, "body a2.\n");
        assert_eq!(candidates[1].heading_path, vec!["A".to_string(), "A.1".to_string()]);
    }
}

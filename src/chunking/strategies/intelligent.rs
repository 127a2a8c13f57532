//! Intelligent strategy (§4.3): heading detection -> structure-aware
//! grouping -> `FixedSize` fallback for long regions. The default shape
//! when domain signals (technical/business/academic) are present.

use super::fixed_size::FixedSizeStrategy;
use super::paragraph::split_paragraphs;
use crate::cancel::Ctx;
use crate::chunking::candidate::RawChunkCandidate;
use crate::chunking::strategy::{ChunkInput, ChunkStrategy};
use crate::config::ChunkingOptions;
use crate::error::Result;
use crate::refine::Section;
use crate::services::Embedding;
use async_trait::async_trait;

fn flatten_sections<'a>(sections: &'a [Section], path: &mut Vec<String>, out: &mut Vec<(&'a Section, Vec<String>)>) {
    for section in sections {
        path.push(section.title.clone());
        out.push((section, path.clone()));
        flatten_sections(&section.children, path, out);
        path.pop();
    }
}

pub struct IntelligentStrategy;

#[async_trait]
impl ChunkStrategy for IntelligentStrategy {
    async fn chunk(
        &self,
        input: &ChunkInput<'_>,
        options: &ChunkingOptions,
        embedding: Option<&dyn Embedding>,
        ctx: &Ctx,
    ) -> Result<Vec<RawChunkCandidate>> {
        let refined = input.refined;
        let mut candidates = Vec::new();

        if refined.sections.is_empty() {
            for (p_start, p_end) in split_paragraphs(&refined.text) {
                ctx.check()?;
                let region = &refined.text[p_start..p_end];
                if region.len() <= options.max_chunk_size {
                    candidates.push(RawChunkCandidate::new(region.to_string(), p_start, p_end, Vec::new()));
                } else {
                    let sub = sub_refined(refined, region);
                    let sub_input = ChunkInput::new(&sub);
                    let sub_candidates = FixedSizeStrategy.chunk(&sub_input, options, embedding, ctx).await?;
                    for c in sub_candidates {
                        candidates.push(RawChunkCandidate::new(c.content, p_start + c.start_char, p_start + c.end_char, Vec::new()));
                    }
                }
            }
            return Ok(candidates);
        }

        let mut flat = Vec::new();
        flatten_sections(&refined.sections, &mut Vec::new(), &mut flat);

        for (section, heading_path) in flat {
            ctx.check()?;
            // Own body only (excludes nested subsections, which are their
            // own entries in `flat`): `section.start..section.end` would
            // double-count descendant text since `build_sections` widens a
            // parent's `end` to cover its last child.
            let (content_start, _) = section.own_content_range();
            let span = section.content.as_str();
            if span.trim().is_empty() {
                continue;
            }
            if span.len() <= options.max_chunk_size {
                candidates.push(RawChunkCandidate::new(span.to_string(), content_start, content_start + span.len(), heading_path.clone()));
            } else {
                let sub = sub_refined(refined, span);
                let sub_input = ChunkInput::new(&sub);
                let sub_candidates = FixedSizeStrategy.chunk(&sub_input, options, embedding, ctx).await?;
                for c in sub_candidates {
                    candidates.push(RawChunkCandidate::new(
                        c.content,
                        content_start + c.start_char,
                        content_start + c.end_char,
                        heading_path.clone(),
                    ));
                }
            }
        }

        Ok(candidates)
    }
}

fn sub_refined(parent: &crate::refine::RefinedContent, slice: &str) -> crate::refine::RefinedContent {
    crate::refine::RefinedContent {
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
    async fn falls_back_to_paragraph_and_fixed_size_without_sections() {
        let refined = refined_with("a short paragraph.\n\nanother short one.");
        let input = ChunkInput::new(&refined);
        let strategy = IntelligentStrategy;
        let candidates = strategy
            .chunk(&input, &ChunkingOptions::default(), None, &Ctx::new())
            .await
            .unwrap();
        assert_eq!(candidates.len(), 2);
    }

    #[tokio::test]
    async fn nested_sections_get_full_ancestor_heading_paths() {
        // "# A\nbody a1.\n## A.1\nbody a2.\n# B\nbody b.\n"
        let text = "# A\nbody a1.\n## A.1\nbody a2.\n# B\nbody b.\n";
        let mut section_a = crate::refine::Section::new("A", 1, 0, text.find("# B").unwrap());
        section_a.content_start = 4; // right after "# A\n"
        section_a.content = "body a1.\n".to_string();
        let mut section_a1 = crate::refine::Section::new("A.1", 2, 13, text.find("# B").unwrap());
        section_a1.content_start = 20; // right after "## A.1\n"
        section_a1.content = "body a2.\n".to_string();
        section_a.children.push(section_a1);

        let b_start = text.find("# B").unwrap();
        let mut section_b = crate::refine::Section::new("B", 1, b_start, text.len());
        section_b.content_start = b_start + 4; // right after "# B\n"
        section_b.content = "body b.\n".to_string();

        let mut refined = refined_with(text);
        refined.sections = vec![section_a, section_b];

        let input = ChunkInput::new(&refined);
        let strategy = IntelligentStrategy;
        let candidates = strategy
            .chunk(&input, &ChunkingOptions::default(), None, &Ctx::new())
            .await
            .unwrap();

        assert_eq!(candidates.len(), 3);
        assert_eq!(candidates[0].heading_path, vec!["A".to_string()]);
        assert_eq!(candidates[1].heading_path, vec!["A".to_string(), "A.1".to_string()]);
        assert_eq!(candidates[2].heading_path, vec!["B".to_string()]);
        assert_eq!(candidates[0].content, "body a1.\n");
        assert_eq!(candidates[1].content, "body a2.\n");
    }
}

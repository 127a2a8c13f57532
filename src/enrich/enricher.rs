//! Enrich stage orchestrator (C7, §4.4): attaches content type, structural
//! role, domain, topic scores, technical keywords, relevance/importance/
//! density scores, and a contextual header to every chunk, then optionally
//! runs the LLM chunk filter.

use super::header::build_contextual_header;
use super::keywords::{classify_content_type, classify_domain, technical_keywords_in, topic_scores};
use super::llm_filter::filter_chunks;
use super::scoring::{information_density, relevance_score};
use crate::cancel::Ctx;
use crate::chunk_model::DocumentChunk;
use crate::config::EnrichOptions;
use crate::error::{Result, Warning};
use crate::refine::RefinedContent;
use crate::services::TextCompletion;

/// Run the full Enrich stage: score and annotate every chunk, then filter.
///
/// `document_title` comes from `refined.metadata.title`, if any; `query`
/// drives the LLM filter's content-relevance factor and is otherwise
/// unused. Returns any non-fatal warnings raised during filtering (e.g.
/// falling back to keyword-overlap mode when no `TextCompletion` is
/// available) alongside the enriched, reindexed chunks.
pub async fn enrich(
    chunks: Vec<DocumentChunk>,
    refined: &RefinedContent,
    options: &EnrichOptions,
    llm: Option<&dyn TextCompletion>,
    query: Option<&str>,
    ctx: &Ctx,
) -> Result<(Vec<DocumentChunk>, Vec<Warning>)> {
    ctx.check()?;

    let domain = classify_domain(&refined.text);
    let document_title = refined.metadata.title.as_deref();

    let mut annotated = Vec::with_capacity(chunks.len());
    for chunk in chunks {
        ctx.check()?;
        annotated.push(annotate(chunk, document_title, domain));
    }

    let (filtered, warnings) = filter_chunks(annotated, query, options, llm, ctx).await;
    Ok((reindex(filtered), warnings))
}

fn annotate(mut chunk: DocumentChunk, document_title: Option<&str>, domain: crate::enrich::types::DocumentDomain) -> DocumentChunk {
    let content_type = classify_content_type(&chunk.content);
    let role = content_type.structural_role();
    let keywords = technical_keywords_in(&chunk.content);
    let topics = topic_scores(domain, &chunk.content);

    chunk.importance = structural_importance(content_type, &topics);
    chunk.density = (information_density(&chunk.content) / 10.0).clamp(0.0, 1.0);
    chunk.quality = relevance_score(&chunk.content);

    let section = chunk.location.heading_path.last().map(|s| s.as_str());
    let header = build_contextual_header(document_title, section, content_type, role, domain, &keywords);

    chunk.props.insert("content_type".to_string(), serde_json::json!(format!("{:?}", content_type)));
    chunk.props.insert("structural_role".to_string(), serde_json::json!(format!("{:?}", role)));
    chunk.props.insert("domain".to_string(), serde_json::json!(domain.to_string()));
    chunk.props.insert("topic_scores".to_string(), serde_json::json!(topics));
    chunk.props.insert("technical_keywords".to_string(), serde_json::json!(keywords));
    chunk.props.insert("contextual_header".to_string(), serde_json::json!(header));

    chunk
}

/// A content type's base contribution to structural importance, boosted by
/// the strongest topic-score hit.
fn structural_importance(content_type: crate::enrich::types::ContentType, topics: &std::collections::HashMap<String, f32>) -> f32 {
    use crate::enrich::types::ContentType;
    let base = match content_type {
        ContentType::Heading => 0.9,
        ContentType::Table => 0.7,
        ContentType::Code => 0.65,
        ContentType::List => 0.6,
        ContentType::Text => 0.5,
    };
    let boost = topics.values().cloned().fold(0.0f32, f32::max);
    (base + boost).clamp(0.0, 1.0)
}

fn reindex(chunks: Vec<DocumentChunk>) -> Vec<DocumentChunk> {
    chunks
        .into_iter()
        .enumerate()
        .map(|(i, mut c)| {
            c.index = i;
            c
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk_model::{ContextDependency, SourceLocation, SourceMetadataInfo};
    use crate::config::Strategy;
    use crate::refine::{DocumentMetadata, RefinementQuality};
    use chrono::Utc;
    use uuid::Uuid;

    fn sample_chunk(content: &str, index: usize) -> DocumentChunk {
        DocumentChunk {
            id: Uuid::new_v4(),
            raw_id: Uuid::new_v4(),
            parsed_id: Uuid::new_v4(),
            content: content.to_string(),
            index,
            location: SourceLocation::new(0, content.len(), Vec::new()),
            metadata: DocumentMetadata::default(),
            quality: 0.0,
            importance: 0.0,
            density: 0.0,
            strategy: Strategy::Paragraph,
            tokens: 10,
            created_at: Utc::now(),
            props: Default::default(),
            context_dependency: ContextDependency::None,
            source_info: SourceMetadataInfo {
                file_name: "doc.txt".to_string(),
                file_extension: "txt".to_string(),
                strategy: Strategy::Paragraph,
            },
        }
    }

    fn refined_with(text: &str) -> RefinedContent {
        RefinedContent {
            id: Uuid::new_v4(),
            raw_id: Uuid::new_v4(),
            text: text.to_string(),
            sections: Vec::new(),
            structures: Vec::new(),
            metadata: DocumentMetadata::default(),
            quality: RefinementQuality::compute(false, text.len(), text.len()),
            info: Default::default(),
        }
    }

    #[tokio::test]
    async fn enrich_attaches_props_and_scores() {
        let chunks = vec![sample_chunk("This is a complete sentence describing our REST api.", 0)];
        let refined = refined_with("This is a complete sentence describing our REST api.");
        let options = EnrichOptions::default();
        let (enriched, _warnings) = enrich(chunks, &refined, &options, None, None, &Ctx::new()).await.unwrap();
        assert_eq!(enriched.len(), 1);
        assert!(enriched[0].props.contains_key("contextual_header"));
        assert!(enriched[0].quality > 0.0);
    }

    #[tokio::test]
    async fn enrich_reindexes_after_filtering() {
        let chunks = vec![sample_chunk("alpha beta gamma delta epsilon zeta.", 0), sample_chunk("numeric data", 1)];
        let refined = refined_with("alpha beta gamma delta epsilon zeta. numeric data");
        let mut options = EnrichOptions::default();
        options.enable_llm_filter = true;
        options.min_relevance_score = 0.9;
        let (enriched, _warnings) = enrich(chunks, &refined, &options, None, None, &Ctx::new()).await.unwrap();
        for (i, c) in enriched.iter().enumerate() {
            assert_eq!(c.index, i);
        }
    }
}

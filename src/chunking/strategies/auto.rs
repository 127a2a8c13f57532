//! Auto strategy (§4.3): analyzes the refined text and selects one of the
//! other seven strategies, with an optional decision cache keyed by
//! document size bucket, structure fingerprint, and options fingerprint.

use super::fixed_size::FixedSizeStrategy;
use super::hierarchical::HierarchicalStrategy;
use super::intelligent::IntelligentStrategy;
use super::page_level::PageLevelStrategy;
use super::paragraph::ParagraphStrategy;
use super::semantic::SemanticStrategy;
use super::smart::SmartStrategy;
use crate::cache::{structure_fingerprint, size_bucket, AutoStrategyCache, AutoStrategyCacheKey};
use crate::cancel::Ctx;
use crate::chunking::candidate::RawChunkCandidate;
use crate::chunking::strategy::{ChunkInput, ChunkStrategy};
use crate::config::{ChunkingOptions, Strategy};
use crate::error::Result;
use crate::services::Embedding;
use async_trait::async_trait;

/// Pick a concrete strategy for `input` given `options`, honoring
/// `force_strategy` and the speed/quality tie-break preferences. Does not
/// consult the cache itself; callers that want caching go through
/// `AutoStrategy::chunk`, which wraps this.
pub fn analyze(input: &ChunkInput<'_>, options: &ChunkingOptions) -> Strategy {
    if let Some(forced) = options.strategy_options.force_strategy {
        return forced;
    }

    let refined = input.refined;
    let char_count = refined.text.chars().count();
    let has_tables = refined.structures.iter().any(|s| matches!(s, crate::refine::StructuredElement::Table { .. }));
    let has_code = refined.structures.iter().any(|s| matches!(s, crate::refine::StructuredElement::Code { .. }));
    let heading_count: usize = refined.metadata.heading_levels_seen.len();
    let has_page_offsets = input.page_offsets.map(|o| !o.is_empty()).unwrap_or(false);

    let prefer_speed = options.strategy_options.prefer_speed;
    let prefer_quality = options.strategy_options.prefer_quality;

    if has_page_offsets {
        return Strategy::PageLevel;
    }
    if !refined.sections.is_empty() && heading_count >= 2 {
        if prefer_speed {
            return Strategy::Hierarchical;
        }
        return if has_tables || has_code {
            Strategy::Intelligent
        } else {
            Strategy::Hierarchical
        };
    }
    if has_tables || has_code {
        return Strategy::Intelligent;
    }
    if prefer_quality && char_count < 200_000 {
        return Strategy::Semantic;
    }
    if prefer_speed || char_count > 1_000_000 {
        return Strategy::FixedSize;
    }
    Strategy::Paragraph
}

fn dispatch(strategy: Strategy) -> Option<Box<dyn ChunkStrategy>> {
    match strategy {
        Strategy::FixedSize => Some(Box::new(FixedSizeStrategy)),
        Strategy::Paragraph => Some(Box::new(ParagraphStrategy)),
        Strategy::Semantic => Some(Box::new(SemanticStrategy)),
        Strategy::Hierarchical => Some(Box::new(HierarchicalStrategy)),
        Strategy::PageLevel => Some(Box::new(PageLevelStrategy)),
        Strategy::Intelligent => Some(Box::new(IntelligentStrategy)),
        Strategy::Smart => Some(Box::new(SmartStrategy)),
        Strategy::Auto => None,
    }
}

pub struct AutoStrategy<'a> {
    pub cache: Option<&'a AutoStrategyCache>,
}

#[async_trait]
impl<'a> ChunkStrategy for AutoStrategy<'a> {
    async fn chunk(
        &self,
        input: &ChunkInput<'_>,
        options: &ChunkingOptions,
        embedding: Option<&dyn Embedding>,
        ctx: &Ctx,
    ) -> Result<Vec<RawChunkCandidate>> {
        let refined = input.refined;
        let char_count = refined.text.chars().count();
        let bucket = size_bucket(char_count);
        let has_tables = refined.structures.iter().any(|s| matches!(s, crate::refine::StructuredElement::Table { .. }));
        let has_code = refined.structures.iter().any(|s| matches!(s, crate::refine::StructuredElement::Code { .. }));
        let fingerprint = structure_fingerprint(has_tables, has_code, refined.metadata.heading_levels_seen.len(), char_count);
        let options_fingerprint = format!(
            "{}-{}-{}-{}",
            options.max_chunk_size, options.overlap_size, options.min_chunk_size, options.max_heading_level
        );
        let cache_key = AutoStrategyCacheKey {
            document_size_bucket: bucket,
            structure_fingerprint: &fingerprint,
            options_fingerprint: &options_fingerprint,
        };

        let chosen = if options.strategy_options.enable_cache {
            if let Some(cache) = self.cache {
                if let Some(cached) = cache.get(&cache_key) {
                    cached
                } else {
                    let decided = analyze(input, options);
                    cache.put(&cache_key, decided);
                    decided
                }
            } else {
                analyze(input, options)
            }
        } else {
            analyze(input, options)
        };

        let strategy = dispatch(chosen).unwrap_or_else(|| Box::new(ParagraphStrategy));
        strategy.chunk(input, options, embedding, ctx).await
    }
}

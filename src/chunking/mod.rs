//! Chunk stage (C5/C6, §4.3): splits refined text into `DocumentChunk`s
//! using one of eight strategies, then runs the shared post-processing
//! pipeline (header separation, overlap, merging, dedup) over the result.

pub mod builder;
pub mod candidate;
pub mod strategy;
pub mod strategies;

use crate::cache::AutoStrategyCache;
use crate::cancel::Ctx;
use crate::chunk_model::DocumentChunk;
use crate::config::{ChunkingOptions, Strategy};
use crate::error::Result;
use crate::raw::RawContent;
use crate::refine::RefinedContent;
use crate::services::Embedding;

pub use candidate::RawChunkCandidate;
pub use strategy::{ChunkInput, ChunkStrategy};
pub use strategies::{
    AutoStrategy, FixedSizeStrategy, HierarchicalStrategy, IntelligentStrategy, PageLevelStrategy, ParagraphStrategy,
    SemanticStrategy, SmartStrategy,
};

fn dispatch(strategy: Strategy) -> Box<dyn ChunkStrategy> {
    match strategy {
        Strategy::FixedSize => Box::new(FixedSizeStrategy),
        Strategy::Paragraph => Box::new(ParagraphStrategy),
        Strategy::Semantic => Box::new(SemanticStrategy),
        Strategy::Hierarchical => Box::new(HierarchicalStrategy),
        Strategy::PageLevel => Box::new(PageLevelStrategy),
        Strategy::Intelligent => Box::new(IntelligentStrategy),
        Strategy::Smart => Box::new(SmartStrategy),
        Strategy::Auto => Box::new(ParagraphStrategy),
    }
}

/// Run the Chunk stage end to end: pick (or dispatch to) a strategy,
/// segment `refined` into raw candidates, and finalize them into
/// `DocumentChunk`s via the C6 builder.
///
/// `cache` is consulted only when `options.strategy` is `Auto`.
pub async fn chunk(
    raw: &RawContent,
    refined: &RefinedContent,
    options: &ChunkingOptions,
    embedding: Option<&dyn Embedding>,
    cache: Option<&AutoStrategyCache>,
    ctx: &Ctx,
) -> Result<(Vec<DocumentChunk>, Vec<String>)> {
    ctx.check()?;

    let page_offsets = raw.page_offsets();
    let input = ChunkInput::new(refined).with_page_offsets(page_offsets.as_deref());

    let (candidates, strategy_used) = if matches!(options.strategy, Strategy::Auto) {
        let auto = AutoStrategy { cache };
        let candidates = auto.chunk(&input, options, embedding, ctx).await?;
        let used = strategies::auto::analyze(&input, options);
        (candidates, used)
    } else {
        let strategy = dispatch(options.strategy);
        let candidates = strategy.chunk(&input, options, embedding, ctx).await?;
        (candidates, options.strategy)
    };

    ctx.check()?;
    Ok(builder::build(refined, raw, options, strategy_used, candidates))
}

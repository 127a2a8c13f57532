//! Pipeline coordinator (C9, §4.6): a single stateful processor instance per
//! document that enforces stage ordering, auto-runs prerequisite stages, and
//! surfaces per-stage metrics and errors.
//!
//! State machine: `Created -> Extracted -> Refined -> (LlmRefined) -> Chunked
//! -> Enriched`, with a terminal `Failed` or `Disposed` reachable from any
//! state. Each transition runs exactly once; a stage invoked while already
//! past its target state is a no-op; a stage invoked before its prerequisite
//! auto-runs the prerequisite chain.

use crate::cache::AutoStrategyCache;
use crate::cancel::Ctx;
use crate::chunk_model::DocumentChunk;
use crate::chunking;
use crate::config::{ChunkingOptions, EnrichOptions, PipelineConfig, RefineOptions};
use crate::enrich;
use crate::error::{PipelineError, ProcessingError, Result, Stage, Warning};
use crate::graph::{self, DocumentGraph};
use crate::raw::RawContent;
use crate::reader::{ReaderRegistry, Source};
use crate::refine::{self, RefinedContent};
use crate::services::{Embedding, ImageToText, TextCompletion};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// An owned source, since a coordinator outlives the borrow an individual
/// `extract` call would otherwise need (§5: "each coordinator instance
/// processes one document").
#[derive(Debug, Clone)]
pub enum OwnedSource {
    Path(PathBuf),
    Bytes { name: String, bytes: Vec<u8> },
}

impl OwnedSource {
    fn as_source(&self) -> Source<'_> {
        match self {
            OwnedSource::Path(p) => Source::Path(p.as_path()),
            OwnedSource::Bytes { name, bytes } => Source::Bytes { name, bytes },
        }
    }
}

/// The shared, independently thread-safe collaborators a coordinator
/// consults. Each is optional except the reader registry; every stage
/// degrades to a heuristic fallback in the absence of a service (§5, §6).
#[derive(Clone, Default)]
pub struct PipelineServices {
    pub readers: Arc<ReaderRegistry>,
    pub text_completion: Option<Arc<dyn TextCompletion>>,
    pub embedding: Option<Arc<dyn Embedding>>,
    pub image_to_text: Option<Arc<dyn ImageToText>>,
    pub auto_strategy_cache: Option<Arc<AutoStrategyCache>>,
}

/// Current position of a coordinator in its state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoordinatorState {
    Created,
    Extracted,
    Refined,
    LlmRefined,
    Chunked,
    Enriched,
    Failed,
    Disposed,
}

impl CoordinatorState {
    /// Ordinal position along the happy-path state sequence, used to decide
    /// whether a stage call is a no-op (state already past target) or needs
    /// its prerequisite chain auto-run. `Failed`/`Disposed` are terminal and
    /// never compared this way.
    fn ordinal(self) -> u8 {
        match self {
            CoordinatorState::Created => 0,
            CoordinatorState::Extracted => 1,
            CoordinatorState::Refined => 2,
            CoordinatorState::LlmRefined => 3,
            CoordinatorState::Chunked => 4,
            CoordinatorState::Enriched => 5,
            CoordinatorState::Failed | CoordinatorState::Disposed => u8::MAX,
        }
    }
}

/// Per-stage duration plus document-level totals (§3).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StageMetrics {
    pub source_file_size: u64,
    pub original_char_count: usize,
    pub refined_char_count: usize,
    pub structures_extracted: usize,
    pub total_chunks: usize,
    pub total_tokens: usize,
    pub graph_nodes: usize,
    pub graph_edges: usize,
    pub llm_refine_tokens: usize,
    pub stage_durations_ms: std::collections::HashMap<String, u64>,
}

/// Aggregate output of a coordinator's run (§3). Each stage populates its
/// field exactly once; fields are never overwritten. On failure the result
/// remains readable up to the last completed stage.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProcessingResult {
    pub document_id: Uuid,
    pub raw: Option<RawContent>,
    pub refined: Option<RefinedContent>,
    pub llm_refined: Option<RefinedContent>,
    pub chunks: Option<Vec<DocumentChunk>>,
    pub graph: Option<DocumentGraph>,
    /// Paragraphs the chunk builder detached from the body (§4.3.1) rather
    /// than prepending to every chunk.
    pub header_paragraphs: Vec<String>,
    pub metrics: StageMetrics,
    pub errors: Vec<ProcessingError>,
    pub warnings: Vec<Warning>,
}

impl ProcessingResult {
    fn new(document_id: Uuid) -> Self {
        Self {
            document_id,
            ..Default::default()
        }
    }
}

/// A single-document, single-use processor. Enforces stage ordering,
/// auto-runs prerequisites, and never overwrites a stage's output once set.
pub struct PipelineCoordinator {
    services: PipelineServices,
    source: Option<OwnedSource>,
    state: CoordinatorState,
    result: ProcessingResult,
}

impl PipelineCoordinator {
    pub fn new(document_id: Uuid, source: OwnedSource, services: PipelineServices) -> Self {
        Self {
            services,
            source: Some(source),
            state: CoordinatorState::Created,
            result: ProcessingResult::new(document_id),
        }
    }

    pub fn state(&self) -> CoordinatorState {
        self.state
    }

    pub fn result(&self) -> &ProcessingResult {
        &self.result
    }

    fn guard_terminal(&self) -> Result<()> {
        match self.state {
            CoordinatorState::Disposed => Err(PipelineError::InvalidState("coordinator has been disposed".to_string())),
            CoordinatorState::Failed => Err(PipelineError::InvalidState("coordinator is in a failed state".to_string())),
            _ => Ok(()),
        }
    }

    fn fail(&mut self, stage: Stage, err: PipelineError) -> PipelineError {
        self.result.errors.push(ProcessingError::from_pipeline_error(stage, &err));
        self.state = CoordinatorState::Failed;
        err
    }

    fn record_duration(&mut self, stage: Stage, started: Instant) {
        self.result
            .metrics
            .stage_durations_ms
            .insert(stage.to_string(), started.elapsed().as_millis() as u64);
    }

    /// Extract stage: turn the coordinator's source into `RawContent` via
    /// the reader registry. No-op if already past `Created`.
    pub async fn extract(&mut self, ctx: &Ctx) -> Result<()> {
        self.guard_terminal()?;
        if self.state.ordinal() >= CoordinatorState::Extracted.ordinal() {
            return Ok(());
        }
        if ctx.check().is_err() {
            return Err(self.fail(Stage::Extract, PipelineError::Cancelled));
        }

        let source = self
            .source
            .take()
            .ok_or_else(|| PipelineError::InvalidState("no source configured for extraction".to_string()))?;
        let started = Instant::now();
        match self.services.readers.extract(source.as_source()).await {
            Ok(raw) => {
                self.result.metrics.source_file_size = raw.file.size;
                self.result.metrics.original_char_count = raw.text.chars().count();
                info!(chars = self.result.metrics.original_char_count, "extract stage complete");
                self.result.raw = Some(raw);
                self.state = CoordinatorState::Extracted;
                self.record_duration(Stage::Extract, started);
                Ok(())
            }
            Err(err) => Err(self.fail(Stage::Extract, err)),
        }
    }

    /// Refine stage: clean, markdownify, and structurally annotate the raw
    /// text. Auto-runs `extract` first if needed.
    pub async fn refine(&mut self, options: &RefineOptions, ctx: &Ctx) -> Result<()> {
        self.guard_terminal()?;
        if self.state.ordinal() >= CoordinatorState::Refined.ordinal() {
            return Ok(());
        }
        if self.state.ordinal() < CoordinatorState::Extracted.ordinal() {
            self.extract(ctx).await?;
        }
        if ctx.check().is_err() {
            return Err(self.fail(Stage::Refine, PipelineError::Cancelled));
        }

        let raw = self
            .result
            .raw
            .as_ref()
            .ok_or_else(|| PipelineError::InvalidState("extract has not produced raw content".to_string()))?;
        let started = Instant::now();
        match refine::refine(raw, options, self.services.text_completion.as_deref(), ctx).await {
            Ok(refined) => {
                self.result.metrics.refined_char_count = refined.text.chars().count();
                self.result.metrics.structures_extracted = refined.structures.len();
                debug!(sections = refined.sections.len(), "refine stage complete");
                if refined.info.empty_input {
                    self.result.warnings.push(Warning::new(Stage::Refine, "empty input"));
                }
                if refined.info.truncated_for_llm {
                    self.result
                        .warnings
                        .push(Warning::new(Stage::Refine, "input truncated before llm structure analysis"));
                }
                if refined.info.used_llm && !refined.info.llm_replaced_heuristic {
                    self.result.warnings.push(Warning::new(
                        Stage::Refine,
                        "llm structure analysis low confidence or unextractable, kept heuristic sections",
                    ));
                }
                self.result.refined = Some(refined);
                self.state = CoordinatorState::Refined;
                self.record_duration(Stage::Refine, started);
                Ok(())
            }
            Err(err) => Err(self.fail(Stage::Refine, err)),
        }
    }

    /// Optional LLM-refine stage: asks the text-completion service for a
    /// document summary and metadata extraction, merging both into the
    /// refined content's `DocumentMetadata.extra`. Non-fatal: any failure
    /// or absent service produces a pass-through copy of `refined` plus a
    /// recorded warning, never an error (§4.6).
    pub async fn llm_refine(&mut self, ctx: &Ctx) -> Result<()> {
        self.guard_terminal()?;
        if self.state.ordinal() >= CoordinatorState::LlmRefined.ordinal() {
            return Ok(());
        }
        if self.state.ordinal() < CoordinatorState::Refined.ordinal() {
            self.refine(&RefineOptions::default(), ctx).await?;
        }
        if ctx.check().is_err() {
            return Err(self.fail(Stage::LlmRefine, PipelineError::Cancelled));
        }

        let refined = self
            .result
            .refined
            .clone()
            .ok_or_else(|| PipelineError::InvalidState("refine has not produced refined content".to_string()))?;
        let started = Instant::now();

        let Some(llm) = self.services.text_completion.clone() else {
            self.result
                .warnings
                .push(Warning::new(Stage::LlmRefine, "no text completion service configured; using heuristic refined content"));
            self.result.llm_refined = Some(refined);
            self.state = CoordinatorState::LlmRefined;
            self.record_duration(Stage::LlmRefine, started);
            return Ok(());
        };

        if !llm.is_available(ctx).await {
            self.result
                .warnings
                .push(Warning::new(Stage::LlmRefine, "text completion unavailable; using heuristic refined content"));
            self.result.llm_refined = Some(refined);
            self.state = CoordinatorState::LlmRefined;
            self.record_duration(Stage::LlmRefine, started);
            return Ok(());
        }

        let mut enriched = refined.clone();
        enriched.info.used_llm = true;

        match llm.summarize(&refined.text, 500, ctx).await {
            Ok(summary) => {
                enriched.metadata.extra.insert("llm_summary".to_string(), serde_json::json!(summary.summary));
                enriched
                    .metadata
                    .extra
                    .insert("llm_summary_keywords".to_string(), serde_json::json!(summary.keywords));
                self.result.metrics.llm_refine_tokens += crate::tokenizer::estimate_tokens(&summary.summary);
                enriched.info.llm_replaced_heuristic = true;
            }
            Err(err) => {
                warn!(error = %err, "llm summarize failed, keeping heuristic metadata");
                self.result
                    .warnings
                    .push(Warning::new(Stage::LlmRefine, format!("summarize failed: {err}")));
            }
        }

        match llm.extract_metadata(&refined.text, "document", ctx).await {
            Ok(meta) => {
                enriched.metadata.extra.insert("llm_keywords".to_string(), serde_json::json!(meta.keywords));
                enriched.metadata.extra.insert("llm_categories".to_string(), serde_json::json!(meta.categories));
                enriched.metadata.extra.insert("llm_entities".to_string(), serde_json::json!(meta.entities));
            }
            Err(err) => {
                warn!(error = %err, "llm extract_metadata failed, keeping heuristic metadata");
                self.result
                    .warnings
                    .push(Warning::new(Stage::LlmRefine, format!("extract_metadata failed: {err}")));
            }
        }

        self.result.llm_refined = Some(enriched);
        self.state = CoordinatorState::LlmRefined;
        self.record_duration(Stage::LlmRefine, started);
        Ok(())
    }

    /// The refined content chunking and enrichment should read from:
    /// `llm_refined` when present, otherwise `refined`.
    fn best_refined(&self) -> Result<RefinedContent> {
        self.result
            .llm_refined
            .clone()
            .or_else(|| self.result.refined.clone())
            .ok_or_else(|| PipelineError::InvalidState("no refined content available".to_string()))
    }

    /// Chunk stage: segment refined text into `DocumentChunk`s via the
    /// configured strategy. Auto-runs `refine` if needed; `llm_refine` is
    /// optional and is used only if it already ran.
    pub async fn chunk(&mut self, options: &ChunkingOptions, ctx: &Ctx) -> Result<()> {
        self.guard_terminal()?;
        if self.state.ordinal() >= CoordinatorState::Chunked.ordinal() {
            return Ok(());
        }
        if self.state.ordinal() < CoordinatorState::Refined.ordinal() {
            self.refine(&RefineOptions::default(), ctx).await?;
        }
        if ctx.check().is_err() {
            return Err(self.fail(Stage::Chunk, PipelineError::Cancelled));
        }

        let raw = self
            .result
            .raw
            .clone()
            .ok_or_else(|| PipelineError::InvalidState("no raw content available".to_string()))?;
        let refined = match self.best_refined() {
            Ok(r) => r,
            Err(err) => return Err(self.fail(Stage::Chunk, err)),
        };

        let started = Instant::now();
        match chunking::chunk(
            &raw,
            &refined,
            options,
            self.services.embedding.as_deref(),
            self.services.auto_strategy_cache.as_deref(),
            ctx,
        )
        .await
        {
            Ok((chunks, header_paragraphs)) => {
                self.result.metrics.total_chunks = chunks.len();
                self.result.metrics.total_tokens = chunks.iter().map(|c| c.tokens).sum();
                self.result.header_paragraphs = header_paragraphs;
                self.result.chunks = Some(chunks);
                self.state = CoordinatorState::Chunked;
                self.record_duration(Stage::Chunk, started);
                Ok(())
            }
            Err(err) => Err(self.fail(Stage::Chunk, err)),
        }
    }

    /// Enrich stage: score, annotate, optionally filter, and build the
    /// document graph over the finished chunks. Auto-runs `chunk` if
    /// needed.
    pub async fn enrich(&mut self, options: &EnrichOptions, ctx: &Ctx) -> Result<()> {
        self.guard_terminal()?;
        if self.state.ordinal() >= CoordinatorState::Enriched.ordinal() {
            return Ok(());
        }
        if self.state.ordinal() < CoordinatorState::Chunked.ordinal() {
            self.chunk(&ChunkingOptions::default(), ctx).await?;
        }
        if ctx.check().is_err() {
            return Err(self.fail(Stage::Enrich, PipelineError::Cancelled));
        }

        let chunks = self
            .result
            .chunks
            .clone()
            .ok_or_else(|| PipelineError::InvalidState("chunk has not produced chunks".to_string()))?;
        let refined = match self.best_refined() {
            Ok(r) => r,
            Err(err) => return Err(self.fail(Stage::Enrich, err)),
        };

        let started = Instant::now();
        let (enriched_chunks, enrich_warnings) = match enrich::enrich(chunks, &refined, options, self.services.text_completion.as_deref(), None, ctx).await {
            Ok(result) => result,
            Err(err) => return Err(self.fail(Stage::Enrich, err)),
        };
        self.result.warnings.extend(enrich_warnings);

        match graph::build(self.result.document_id, &enriched_chunks, self.services.embedding.as_deref(), options, ctx).await {
            Ok(graph) => {
                self.result.metrics.total_chunks = enriched_chunks.len();
                self.result.metrics.total_tokens = enriched_chunks.iter().map(|c| c.tokens).sum();
                self.result.metrics.graph_nodes = graph.nodes.len();
                self.result.metrics.graph_edges = graph.edges.len();
                self.result.chunks = Some(enriched_chunks);
                self.result.graph = Some(graph);
                self.state = CoordinatorState::Enriched;
                self.record_duration(Stage::Enrich, started);
                Ok(())
            }
            Err(err) => Err(self.fail(Stage::Enrich, err)),
        }
    }

    /// Run every stage in order, including the optional LLM-refine stage
    /// when a text-completion service is configured.
    pub async fn process(&mut self, config: &PipelineConfig, ctx: &Ctx) -> Result<()> {
        self.extract(ctx).await?;
        self.refine(&config.refine, ctx).await?;
        if self.services.text_completion.is_some() {
            self.llm_refine(ctx).await?;
        }
        self.chunk(&config.chunking, ctx).await?;
        self.enrich(&config.enrich, ctx).await?;
        Ok(())
    }

    /// Run `chunk` then `enrich` (auto-running earlier prerequisites), then
    /// hand the finished chunks to the caller one at a time over a bounded
    /// channel (capacity `2 * worker_count`), mirroring `§5`'s backpressure
    /// requirement. Finite and not restartable: the channel closes once
    /// every chunk has been sent. Chunks are yielded in ascending `index`
    /// order and remain retained in `result().chunks` once the stream
    /// completes.
    pub async fn chunk_stream(
        &mut self,
        chunking_options: ChunkingOptions,
        enrich_options: EnrichOptions,
        worker_count: usize,
        ctx: Ctx,
    ) -> Result<tokio::sync::mpsc::Receiver<DocumentChunk>> {
        self.chunk(&chunking_options, &ctx).await?;
        self.enrich(&enrich_options, &ctx).await?;

        let chunks = self.result.chunks.clone().unwrap_or_default();
        let capacity = (2 * worker_count.max(1)).max(1);
        let (tx, rx) = tokio::sync::mpsc::channel(capacity);

        tokio::spawn(async move {
            for chunk in chunks {
                if ctx.check().is_err() {
                    break;
                }
                if tx.send(chunk).await.is_err() {
                    break;
                }
            }
        });

        Ok(rx)
    }

    /// Dispose the coordinator: clears intermediate buffers (raw/refined
    /// text) and transitions to the terminal `Disposed` state. The final
    /// chunks/graph/metrics already handed to callers remain in `result()`.
    pub fn dispose(&mut self) {
        self.source = None;
        self.result.raw = None;
        self.result.refined = None;
        self.result.llm_refined = None;
        self.state = CoordinatorState::Disposed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raw::FileInfo;
    use crate::reader::Reader;
    use async_trait::async_trait;

    struct EchoReader;

    #[async_trait]
    impl Reader for EchoReader {
        fn extensions(&self) -> &[&str] {
            &["txt", "md"]
        }

        async fn extract(&self, source: Source<'_>) -> Result<RawContent> {
            match source {
                Source::Bytes { name, bytes } => {
                    let text = String::from_utf8_lossy(bytes).to_string();
                    Ok(RawContent::new(FileInfo::in_memory(name, bytes.len() as u64), text))
                }
                Source::Path(_) => Err(PipelineError::InvalidState("path sources unsupported in test reader".to_string())),
            }
        }
    }

    fn services() -> PipelineServices {
        let mut registry = ReaderRegistry::new();
        registry.register(Arc::new(EchoReader));
        PipelineServices {
            readers: Arc::new(registry),
            ..Default::default()
        }
    }

    fn source(text: &str) -> OwnedSource {
        OwnedSource::Bytes {
            name: "doc.txt".to_string(),
            bytes: text.as_bytes().to_vec(),
        }
    }

    #[tokio::test]
    async fn process_runs_all_stages_in_order() {
        let text = "First paragraph here.\n\nSecond paragraph follows right here too.";
        let mut coordinator = PipelineCoordinator::new(Uuid::new_v4(), source(text), services());
        coordinator.process(&PipelineConfig::default(), &Ctx::new()).await.unwrap();
        assert_eq!(coordinator.state(), CoordinatorState::Enriched);
        assert!(coordinator.result().chunks.is_some());
        assert!(coordinator.result().graph.is_some());
    }

    #[tokio::test]
    async fn enrich_auto_runs_every_prerequisite() {
        let text = "Just one short paragraph of body text to chunk and enrich.";
        let mut coordinator = PipelineCoordinator::new(Uuid::new_v4(), source(text), services());
        coordinator.enrich(&EnrichOptions::default(), &Ctx::new()).await.unwrap();
        assert_eq!(coordinator.state(), CoordinatorState::Enriched);
        assert!(coordinator.result().raw.is_some());
        assert!(coordinator.result().refined.is_some());
    }

    #[tokio::test]
    async fn repeated_stage_call_is_a_no_op() {
        let text = "Some body text here for the pipeline to process end to end.";
        let mut coordinator = PipelineCoordinator::new(Uuid::new_v4(), source(text), services());
        coordinator.extract(&Ctx::new()).await.unwrap();
        let raw_id = coordinator.result().raw.as_ref().unwrap().id;
        coordinator.extract(&Ctx::new()).await.unwrap();
        assert_eq!(coordinator.result().raw.as_ref().unwrap().id, raw_id);
    }

    #[tokio::test]
    async fn cancellation_transitions_to_failed() {
        let text = "Body text for a document that will be cancelled mid-flight here.";
        let mut coordinator = PipelineCoordinator::new(Uuid::new_v4(), source(text), services());
        let ctx = Ctx::new();
        ctx.cancel();
        let err = coordinator.extract(&ctx).await.unwrap_err();
        assert!(matches!(err, PipelineError::Cancelled));
        assert_eq!(coordinator.state(), CoordinatorState::Failed);
        assert_eq!(coordinator.result().errors.len(), 1);
    }

    #[tokio::test]
    async fn disposed_coordinator_rejects_further_stages() {
        let text = "Body text for a document that will be disposed early.";
        let mut coordinator = PipelineCoordinator::new(Uuid::new_v4(), source(text), services());
        coordinator.extract(&Ctx::new()).await.unwrap();
        coordinator.dispose();
        assert_eq!(coordinator.state(), CoordinatorState::Disposed);
        let err = coordinator.refine(&RefineOptions::default(), &Ctx::new()).await.unwrap_err();
        assert!(matches!(err, PipelineError::InvalidState(_)));
    }

    #[tokio::test]
    async fn chunk_stream_yields_chunks_in_ascending_index_order() {
        let text = "Paragraph one is here.\n\nParagraph two is here.\n\nParagraph three is here.";
        let mut coordinator = PipelineCoordinator::new(Uuid::new_v4(), source(text), services());
        let mut rx = coordinator
            .chunk_stream(ChunkingOptions::default(), EnrichOptions::default(), 2, Ctx::new())
            .await
            .unwrap();

        let mut received = Vec::new();
        while let Some(chunk) = rx.recv().await {
            received.push(chunk);
        }
        assert!(!received.is_empty());
        for (i, c) in received.iter().enumerate() {
            assert_eq!(c.index, i);
        }
        assert_eq!(coordinator.result().chunks.as_ref().unwrap().len(), received.len());
    }

    #[tokio::test]
    async fn empty_input_yields_zero_chunks_with_warning() {
        let mut coordinator = PipelineCoordinator::new(Uuid::new_v4(), source("   "), services());
        coordinator.process(&PipelineConfig::default(), &Ctx::new()).await.unwrap();
        assert_eq!(coordinator.state(), CoordinatorState::Enriched);
        assert_eq!(coordinator.result().chunks.as_ref().map(|c| c.len()), Some(0));
        assert!(coordinator.result().errors.is_empty());
        assert!(coordinator.result().warnings.iter().any(|w| w.message.contains("empty input")));
    }

    #[tokio::test]
    async fn llm_filter_without_text_completion_warns_and_keeps_all_chunks() {
        let text = (0..20)
            .map(|i| format!("Paragraph number {i} has a complete sentence of its own."))
            .collect::<Vec<_>>()
            .join("\n\n");
        let mut coordinator = PipelineCoordinator::new(Uuid::new_v4(), source(&text), services());
        let mut options = EnrichOptions::default();
        options.enable_llm_filter = true;
        options.min_relevance_score = 0.0;
        coordinator.enrich(&options, &Ctx::new()).await.unwrap();
        assert!(coordinator.result().chunks.as_ref().map(|c| c.len()).unwrap_or(0) > 0);
        assert!(coordinator
            .result()
            .warnings
            .iter()
            .any(|w| w.message == "llm filter unavailable; used heuristic"));
    }
}

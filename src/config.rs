//! Configuration surface for the document pipeline
//!
//! Every tunable named in the specification is a field here, each with a
//! named `default_*()` helper so the struct can be deserialized from a
//! partial TOML/JSON document the way `the_agency`'s `AgentConfig` is.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Which chunking algorithm to run. `Auto` analyzes the refined text and
/// picks one of the others.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    Auto,
    Smart,
    Intelligent,
    Semantic,
    Paragraph,
    FixedSize,
    Hierarchical,
    PageLevel,
}

impl Default for Strategy {
    fn default() -> Self {
        Strategy::Auto
    }
}

/// Auto-strategy tie-break preference and force-override knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyOptions {
    /// When set, `Auto` skips analysis and uses this strategy directly.
    #[serde(default)]
    pub force_strategy: Option<Strategy>,

    /// Minimum confidence the `Auto` analyzer needs before trusting its pick.
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f32,

    /// Enable the auto-strategy decision cache.
    #[serde(default = "default_true")]
    pub enable_cache: bool,

    /// Upper bound on how long `Auto`'s analysis pass may run.
    #[serde(default = "default_max_analysis_time_seconds")]
    pub max_analysis_time_seconds: u64,

    /// Tie-break toward faster strategies (FixedSize/Paragraph).
    #[serde(default)]
    pub prefer_speed: bool,

    /// Tie-break toward higher-quality strategies (Intelligent/Semantic).
    #[serde(default)]
    pub prefer_quality: bool,
}

impl Default for StrategyOptions {
    fn default() -> Self {
        Self {
            force_strategy: None,
            confidence_threshold: default_confidence_threshold(),
            enable_cache: default_true(),
            max_analysis_time_seconds: default_max_analysis_time_seconds(),
            prefer_speed: false,
            prefer_quality: false,
        }
    }
}

fn default_confidence_threshold() -> f32 {
    0.6
}

fn default_max_analysis_time_seconds() -> u64 {
    300
}

fn default_true() -> bool {
    true
}

/// Configuration for the chunking stage (C5/C6), as enumerated in the
/// specification's §4.3.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkingOptions {
    #[serde(default)]
    pub strategy: Strategy,

    #[serde(default = "default_max_chunk_size")]
    pub max_chunk_size: usize,

    #[serde(default = "default_overlap_size")]
    pub overlap_size: usize,

    #[serde(default = "default_min_chunk_size")]
    pub min_chunk_size: usize,

    #[serde(default = "default_true")]
    pub preserve_paragraphs: bool,

    #[serde(default = "default_true")]
    pub preserve_sentences: bool,

    #[serde(default = "default_max_heading_level")]
    pub max_heading_level: u8,

    #[serde(default = "default_true")]
    pub separate_document_header: bool,

    #[serde(default = "default_max_header_paragraphs")]
    pub max_header_paragraphs: usize,

    #[serde(default = "default_max_header_paragraph_length")]
    pub max_header_paragraph_length: usize,

    #[serde(default = "default_true")]
    pub recognize_korean_section_markers: bool,

    #[serde(default = "default_true")]
    pub deduplicate_overlaps: bool,

    #[serde(default = "default_language_code")]
    pub language_code: String,

    #[serde(default)]
    pub strategy_options: StrategyOptions,

    #[serde(default)]
    pub custom_properties: HashMap<String, serde_json::Value>,
}

fn default_max_chunk_size() -> usize {
    1024
}

fn default_overlap_size() -> usize {
    128
}

fn default_min_chunk_size() -> usize {
    200
}

fn default_max_heading_level() -> u8 {
    3
}

fn default_max_header_paragraphs() -> usize {
    5
}

fn default_max_header_paragraph_length() -> usize {
    200
}

fn default_language_code() -> String {
    "auto".to_string()
}

impl Default for ChunkingOptions {
    fn default() -> Self {
        Self {
            strategy: Strategy::default(),
            max_chunk_size: default_max_chunk_size(),
            overlap_size: default_overlap_size(),
            min_chunk_size: default_min_chunk_size(),
            preserve_paragraphs: true,
            preserve_sentences: true,
            max_heading_level: default_max_heading_level(),
            separate_document_header: true,
            max_header_paragraphs: default_max_header_paragraphs(),
            max_header_paragraph_length: default_max_header_paragraph_length(),
            recognize_korean_section_markers: true,
            deduplicate_overlaps: true,
            language_code: default_language_code(),
            strategy_options: StrategyOptions::default(),
            custom_properties: HashMap::new(),
        }
    }
}

/// Configuration for the refine stage (C2), per the specification's §4.1.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefineOptions {
    #[serde(default = "default_true")]
    pub clean_noise: bool,

    #[serde(default = "default_true")]
    pub convert_tables_to_markdown: bool,

    #[serde(default = "default_true")]
    pub convert_blocks_to_markdown: bool,

    #[serde(default = "default_true")]
    pub extract_structures: bool,

    #[serde(default = "default_true")]
    pub build_sections: bool,

    #[serde(default)]
    pub use_llm: bool,

    #[serde(default = "default_true")]
    pub normalize_whitespace: bool,

    #[serde(default = "default_min_heading_level")]
    pub min_heading_level: u8,

    #[serde(default = "default_max_refine_heading_level")]
    pub max_heading_level: u8,

    #[serde(default = "default_true")]
    pub preserve_lists: bool,

    #[serde(default = "default_true")]
    pub preserve_headings: bool,

    #[serde(default = "default_true")]
    pub include_image_placeholders: bool,

    #[serde(default = "default_true")]
    pub detect_code_blocks: bool,

    /// Input is truncated to this many characters before being sent to the
    /// LLM structure-analysis call, with a "... (truncated)" marker appended.
    #[serde(default = "default_llm_truncate_chars")]
    pub llm_truncate_chars: usize,
}

fn default_min_heading_level() -> u8 {
    1
}

fn default_max_refine_heading_level() -> u8 {
    6
}

fn default_llm_truncate_chars() -> usize {
    8_000
}

impl Default for RefineOptions {
    fn default() -> Self {
        Self {
            clean_noise: true,
            convert_tables_to_markdown: true,
            convert_blocks_to_markdown: true,
            extract_structures: true,
            build_sections: true,
            use_llm: false,
            normalize_whitespace: true,
            min_heading_level: default_min_heading_level(),
            max_heading_level: default_max_refine_heading_level(),
            preserve_lists: true,
            preserve_headings: true,
            include_image_placeholders: true,
            detect_code_blocks: true,
            llm_truncate_chars: default_llm_truncate_chars(),
        }
    }
}

/// Configuration for the boundary detector (C4), per the specification's §4.2.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoundaryOptions {
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f32,

    /// Multiplier applied to `similarity_threshold` when falling back to
    /// text-based (Jaccard) similarity instead of embeddings.
    #[serde(default = "default_text_threshold_factor")]
    pub text_threshold_factor: f32,

    /// Similarity below this is always a `TopicChange` boundary.
    #[serde(default = "default_topic_change_similarity")]
    pub topic_change_similarity: f32,

    /// Size-ratio below which a boundary's confidence gets boosted.
    #[serde(default = "default_size_ratio_boost_threshold")]
    pub size_ratio_boost_threshold: f32,

    /// How many segments apart two boundaries can be before being merged.
    #[serde(default = "default_merge_distance")]
    pub merge_distance: usize,
}

fn default_similarity_threshold() -> f32 {
    0.7
}

fn default_text_threshold_factor() -> f32 {
    0.8
}

fn default_topic_change_similarity() -> f32 {
    0.3
}

fn default_size_ratio_boost_threshold() -> f32 {
    0.3
}

fn default_merge_distance() -> usize {
    2
}

impl Default for BoundaryOptions {
    fn default() -> Self {
        Self {
            similarity_threshold: default_similarity_threshold(),
            text_threshold_factor: default_text_threshold_factor(),
            topic_change_similarity: default_topic_change_similarity(),
            size_ratio_boost_threshold: default_size_ratio_boost_threshold(),
            merge_distance: default_merge_distance(),
        }
    }
}

/// Configuration for the enrichment stage (C7), per the specification's §4.4.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichOptions {
    /// Run the (optional) three-stage LLM relevance filter.
    #[serde(default)]
    pub enable_llm_filter: bool,

    /// Minimum combined score a chunk needs to pass the LLM filter.
    #[serde(default = "default_min_relevance_score")]
    pub min_relevance_score: f32,

    /// Cap on how many chunks the filter keeps; `None` keeps all passing chunks.
    #[serde(default)]
    pub max_chunks: Option<usize>,

    /// Restore original chunk order after filtering/reordering.
    #[serde(default = "default_true")]
    pub preserve_order: bool,

    /// How many chunks are assessed concurrently by the LLM filter.
    #[serde(default = "default_filter_batch_size")]
    pub filter_batch_size: usize,

    /// Minimum fraction of well-formed sentences the `Smart` strategy
    /// requires before a candidate stops being extended.
    #[serde(default = "default_completeness_floor")]
    pub completeness_floor: f32,

    /// Build `SemanticLink` graph edges from the embedding service, when available.
    #[serde(default)]
    pub enable_semantic_links: bool,

    /// Cosine-similarity threshold for `SemanticLink` edges.
    #[serde(default = "default_semantic_link_threshold")]
    pub semantic_link_threshold: f32,

    /// Maximum `SemanticLink` out-edges per node.
    #[serde(default = "default_semantic_link_cap")]
    pub semantic_link_cap: usize,
}

fn default_min_relevance_score() -> f32 {
    0.7
}

fn default_filter_batch_size() -> usize {
    5
}

fn default_completeness_floor() -> f32 {
    0.7
}

fn default_semantic_link_threshold() -> f32 {
    0.85
}

fn default_semantic_link_cap() -> usize {
    3
}

impl Default for EnrichOptions {
    fn default() -> Self {
        Self {
            enable_llm_filter: false,
            min_relevance_score: default_min_relevance_score(),
            max_chunks: None,
            preserve_order: true,
            filter_batch_size: default_filter_batch_size(),
            completeness_floor: default_completeness_floor(),
            enable_semantic_links: false,
            semantic_link_threshold: default_semantic_link_threshold(),
            semantic_link_cap: default_semantic_link_cap(),
        }
    }
}

/// Top-level pipeline configuration, analogous to `the_agency::config::AgentConfig`:
/// one struct aggregating all per-stage option blocks, loadable from layered
/// TOML/env sources via the `config` crate.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub refine: RefineOptions,

    #[serde(default)]
    pub boundary: BoundaryOptions,

    #[serde(default)]
    pub chunking: ChunkingOptions,

    #[serde(default)]
    pub enrich: EnrichOptions,
}

impl PipelineConfig {
    /// Load configuration from a TOML file, falling back to defaults for any
    /// field the file omits (mirrors `the_agency`'s config-loading style).
    pub fn load_from_file(path: impl AsRef<std::path::Path>) -> crate::error::Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .build()
            .map_err(|e| anyhow::anyhow!(e))?;
        settings
            .try_deserialize()
            .map_err(|e| anyhow::anyhow!(e).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn chunking_defaults_match_spec() {
        let opts = ChunkingOptions::default();
        assert_eq!(opts.max_chunk_size, 1024);
        assert_eq!(opts.overlap_size, 128);
        assert_eq!(opts.min_chunk_size, 200);
        assert_eq!(opts.strategy, Strategy::Auto);
        assert_eq!(opts.strategy_options.confidence_threshold, 0.6);
    }

    #[test]
    fn refine_defaults_match_spec() {
        let opts = RefineOptions::default();
        assert!(opts.clean_noise);
        assert_eq!(opts.min_heading_level, 1);
        assert_eq!(opts.max_heading_level, 6);
        assert_eq!(opts.llm_truncate_chars, 8_000);
    }

    #[test]
    fn deserializes_partial_toml() {
        let toml_str = r#"
            [chunking]
            max_chunk_size = 2048
        "#;
        let cfg: PipelineConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(cfg.chunking.max_chunk_size, 2048);
        assert_eq!(cfg.chunking.overlap_size, 128);
    }

    #[test]
    fn loads_partial_config_from_disk() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[enrich]\nmin_relevance_score = 0.9").unwrap();

        let cfg = PipelineConfig::load_from_file(file.path()).unwrap();
        assert_eq!(cfg.enrich.min_relevance_score, 0.9);
        assert_eq!(cfg.refine.min_heading_level, 1, "omitted sections fall back to defaults");
    }
}

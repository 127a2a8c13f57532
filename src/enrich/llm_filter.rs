//! Three-stage LLM chunk filter (§4.4): initial assessment, self-reflection,
//! critic validation. Skipped entirely when no `TextCompletion` is
//! configured; any LLM failure falls back to keyword-overlap scoring, and
//! the filter never propagates an error.

use super::scoring::information_density;
use crate::cancel::Ctx;
use crate::chunk_model::DocumentChunk;
use crate::config::EnrichOptions;
use crate::error::{Stage, Warning};
use crate::services::TextCompletion;
use serde::{Deserialize, Serialize};

/// One named, weighted contribution to a stage's score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredFactor {
    pub name: String,
    pub weight: f32,
    pub value: f32,
    pub explanation: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageResult {
    pub score: f32,
    pub factors: Vec<ScoredFactor>,
}

/// Full record of how a chunk fared through the filter, kept for
/// diagnostics even when the chunk is dropped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterAssessment {
    pub initial: StageResult,
    pub reflection: Option<StageResult>,
    pub critic: Option<StageResult>,
    pub final_score: f32,
    pub passed: bool,
}

fn query_overlap(content: &str, query: Option<&str>) -> f32 {
    let Some(query) = query else { return 0.5 };
    let query_words: Vec<String> = query
        .split_whitespace()
        .map(|w| w.to_ascii_lowercase())
        .collect();
    if query_words.is_empty() {
        return 0.5;
    }
    let content_lower = content.to_ascii_lowercase();
    let hits = query_words.iter().filter(|w| content_lower.contains(w.as_str())).count();
    hits as f32 / query_words.len() as f32
}

fn structural_importance(chunk: &DocumentChunk) -> f32 {
    chunk.importance.clamp(0.0, 1.0)
}

/// Stage 1: weighted combination of content-relevance (query overlap),
/// information density, structural importance, and (if available) the
/// LLM's own relevance judgement.
async fn initial_assessment(
    chunk: &DocumentChunk,
    query: Option<&str>,
    llm: Option<&dyn TextCompletion>,
    ctx: &Ctx,
) -> StageResult {
    let relevance = query_overlap(&chunk.content, query);
    let density = (information_density(&chunk.content) / 10.0).clamp(0.0, 1.0);
    let importance = structural_importance(chunk);

    let mut factors = vec![
        ScoredFactor {
            name: "content_relevance".to_string(),
            weight: 1.0,
            value: relevance,
            explanation: "query word overlap against chunk content".to_string(),
        },
        ScoredFactor {
            name: "information_density".to_string(),
            weight: 0.5,
            value: density,
            explanation: "normalized unique-word/sentence density".to_string(),
        },
        ScoredFactor {
            name: "structural_importance".to_string(),
            weight: 0.3,
            value: importance,
            explanation: "chunk's structural importance score".to_string(),
        },
    ];

    let mut llm_score = None;
    if let Some(llm) = llm {
        if llm.is_available(ctx).await {
            let prompt = format!(
                "Rate the relevance of this text chunk on a 0 to 1 scale. Respond with JSON {{\"score\": <number>}}.\n\n{}",
                truncate_for_prompt(&chunk.content, 2000)
            );
            if let Ok(assessment) = llm.assess_quality(&prompt, ctx).await {
                llm_score = Some(assessment.confidence_score);
            }
        }
    }

    if let Some(score) = llm_score {
        factors.push(ScoredFactor {
            name: "llm_relevance".to_string(),
            weight: 0.8,
            value: score,
            explanation: "LLM-assessed relevance score".to_string(),
        });
    }

    let total_weight: f32 = factors.iter().map(|f| f.weight).sum();
    let weighted: f32 = factors.iter().map(|f| f.weight * f.value).sum();
    let score = if total_weight > 0.0 { (weighted / total_weight).clamp(0.0, 1.0) } else { 0.0 };

    StageResult { score, factors }
}

/// Stage 2: bias check (any factor carrying >70% of absolute weight
/// triggers a correction proportional to `concentration - 0.7`),
/// completeness check, and an alternative-perspective nudge.
fn self_reflection(initial: &StageResult, chunk: &DocumentChunk) -> StageResult {
    let total_weight: f32 = initial.factors.iter().map(|f| f.weight).sum();
    let mut score = initial.score;
    let mut factors = Vec::new();

    if total_weight > 0.0 {
        if let Some(dominant) = initial
            .factors
            .iter()
            .max_by(|a, b| a.weight.partial_cmp(&b.weight).unwrap_or(std::cmp::Ordering::Equal))
        {
            let concentration = dominant.weight / total_weight;
            if concentration > 0.7 {
                let correction = -(concentration - 0.7);
                score += correction;
                factors.push(ScoredFactor {
                    name: "bias_check".to_string(),
                    weight: 1.0,
                    value: correction,
                    explanation: format!("factor '{}' carried {:.0}% of weight", dominant.name, concentration * 100.0),
                });
            }
        }
    }

    let completeness = super::scoring::completeness(&chunk.content);
    if completeness < 0.7 {
        let penalty = -(0.7 - completeness) * 0.5;
        score += penalty;
        factors.push(ScoredFactor {
            name: "completeness_check".to_string(),
            weight: 1.0,
            value: penalty,
            explanation: format!("completeness {:.2} below floor 0.70", completeness),
        });
    }

    let alternative = structural_importance(chunk);
    let diff = alternative - initial.score;
    if diff.abs() > 0.2 {
        let contribution = diff * 0.3;
        score += contribution;
        factors.push(ScoredFactor {
            name: "alternative_perspective".to_string(),
            weight: 0.3,
            value: contribution,
            explanation: "structural-importance view diverged from initial score by more than 0.2".to_string(),
        });
    }

    StageResult {
        score: score.clamp(0.0, 1.0),
        factors,
    }
}

/// Stage 3: consistency across the first two stages, length/shape
/// pattern validation, and edge-case detection (numeric-only, heavily
/// repeated content).
fn critic_validation(initial: &StageResult, reflection: &StageResult, chunk: &DocumentChunk) -> StageResult {
    let mut score = (initial.score + reflection.score) / 2.0;
    let mut factors = Vec::new();

    let variance = (initial.score - reflection.score).powi(2);
    let consistency_penalty = -(variance * 0.5);
    if consistency_penalty != 0.0 {
        score += consistency_penalty;
        factors.push(ScoredFactor {
            name: "consistency".to_string(),
            weight: 1.0,
            value: consistency_penalty,
            explanation: format!("initial/reflection variance {:.3}", variance),
        });
    }

    let len = chunk.content.len();
    let pattern_penalty = if len < 50 {
        -0.3
    } else if (100..=2000).contains(&len) {
        0.1
    } else {
        0.0
    };
    let line_break_ratio = chunk.content.matches('\n').count() as f32 / len.max(1) as f32;
    let pattern_penalty = if line_break_ratio > 0.3 { pattern_penalty - 0.2 } else { pattern_penalty };
    if pattern_penalty != 0.0 {
        score += pattern_penalty;
        factors.push(ScoredFactor {
            name: "pattern_validation".to_string(),
            weight: 1.0,
            value: pattern_penalty,
            explanation: format!("content length {} bytes, line-break ratio {:.2}", len, line_break_ratio),
        });
    }

    if is_numeric_only(&chunk.content) || is_heavily_repeated(&chunk.content) {
        score -= 0.4;
        factors.push(ScoredFactor {
            name: "edge_case".to_string(),
            weight: 1.0,
            value: -0.4,
            explanation: "numeric-only or heavily repeated content".to_string(),
        });
    }

    StageResult {
        score: score.clamp(0.0, 1.0),
        factors,
    }
}

fn is_numeric_only(text: &str) -> bool {
    let stripped: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    !stripped.is_empty() && stripped.chars().all(|c| c.is_ascii_digit() || matches!(c, '.' | ',' | '-' | '+'))
}

fn is_heavily_repeated(text: &str) -> bool {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.len() < 6 {
        return false;
    }
    let unique: std::collections::HashSet<&str> = words.iter().copied().collect();
    (unique.len() as f32 / words.len() as f32) < 0.3
}

fn truncate_for_prompt(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let truncated: String = text.chars().take(max_chars).collect();
    format!("{}... (truncated)", truncated)
}

/// Run all three filter stages for one chunk. Never returns an error: an
/// LLM failure simply means stage 1 proceeds without the `llm_relevance`
/// factor, degrading to pure keyword/heuristic scoring.
pub async fn assess_chunk(
    chunk: &DocumentChunk,
    query: Option<&str>,
    options: &EnrichOptions,
    llm: Option<&dyn TextCompletion>,
    ctx: &Ctx,
) -> FilterAssessment {
    let initial = initial_assessment(chunk, query, llm, ctx).await;
    let reflection = self_reflection(&initial, chunk);
    let critic = critic_validation(&initial, &reflection, chunk);

    let final_score = initial.score * 0.4 + reflection.score * 0.3 + critic.score * 0.3;
    let passed = final_score >= options.min_relevance_score;

    FilterAssessment {
        initial,
        reflection: Some(reflection),
        critic: Some(critic),
        final_score,
        passed,
    }
}

/// Run the filter over a batch of chunks concurrently (§4.4: batch size
/// `filter_batch_size`, concurrent within a batch), then apply `max_chunks`
/// and `preserve_order`. Returns any non-fatal warnings raised along the
/// way, such as falling back to keyword-overlap mode when no
/// `TextCompletion` is registered or available.
pub async fn filter_chunks(
    chunks: Vec<DocumentChunk>,
    query: Option<&str>,
    options: &EnrichOptions,
    llm: Option<&dyn TextCompletion>,
    ctx: &Ctx,
) -> (Vec<DocumentChunk>, Vec<Warning>) {
    if !options.enable_llm_filter {
        return (chunks, Vec::new());
    }

    let mut warnings = Vec::new();
    let llm_available = match llm {
        Some(l) => l.is_available(ctx).await,
        None => false,
    };
    if !llm_available {
        warnings.push(Warning::new(Stage::Enrich, "llm filter unavailable; used heuristic"));
    }

    let mut scored: Vec<(DocumentChunk, f32)> = Vec::with_capacity(chunks.len());
    for batch in chunks.chunks(options.filter_batch_size.max(1)) {
        if ctx.check().is_err() {
            break;
        }
        let assessments = futures::future::join_all(
            batch.iter().map(|c| assess_chunk(c, query, options, llm, ctx)),
        )
        .await;
        for (chunk, assessment) in batch.iter().zip(assessments.into_iter()) {
            if assessment.passed {
                scored.push((chunk.clone(), assessment.final_score));
            }
        }
    }

    if let Some(max_chunks) = options.max_chunks {
        if scored.len() > max_chunks {
            let original_order: Vec<usize> = (0..scored.len()).collect();
            let mut by_score = original_order;
            by_score.sort_by(|&a, &b| scored[b].1.partial_cmp(&scored[a].1).unwrap_or(std::cmp::Ordering::Equal));
            by_score.truncate(max_chunks);
            if options.preserve_order {
                by_score.sort_unstable();
            }
            let capped = by_score.into_iter().map(|i| scored[i].0.clone()).collect();
            return (capped, warnings);
        }
    }

    (scored.into_iter().map(|(chunk, _)| chunk).collect(), warnings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk_model::{ContextDependency, SourceLocation, SourceMetadataInfo};
    use crate::config::Strategy;
    use crate::refine::DocumentMetadata;
    use chrono::Utc;
    use uuid::Uuid;

    fn sample_chunk(content: &str) -> DocumentChunk {
        DocumentChunk {
            id: Uuid::new_v4(),
            raw_id: Uuid::new_v4(),
            parsed_id: Uuid::new_v4(),
            content: content.to_string(),
            index: 0,
            location: SourceLocation::new(0, content.len(), Vec::new()),
            metadata: DocumentMetadata::default(),
            quality: 0.8,
            importance: 0.6,
            density: 0.5,
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

    #[tokio::test]
    async fn well_formed_chunk_passes_default_floor() {
        let chunk = sample_chunk("This is a complete and well formed sentence about the topic at hand.");
        let options = EnrichOptions::default();
        let assessment = assess_chunk(&chunk, Some("topic"), &options, None, &Ctx::new()).await;
        assert!(assessment.final_score > 0.0);
    }

    #[tokio::test]
    async fn numeric_only_chunk_is_penalized() {
        let chunk = sample_chunk("123456 789012 345678");
        let options = EnrichOptions::default();
        let assessment = assess_chunk(&chunk, None, &options, None, &Ctx::new()).await;
        let critic = assessment.critic.unwrap();
        assert!(critic.factors.iter().any(|f| f.name == "edge_case"));
    }

    #[tokio::test]
    async fn disabled_filter_returns_all_chunks_unchanged() {
        let chunks = vec![sample_chunk("one"), sample_chunk("two")];
        let options = EnrichOptions::default();
        let (filtered, warnings) = filter_chunks(chunks, None, &options, None, &Ctx::new()).await;
        assert_eq!(filtered.len(), 2);
        assert!(warnings.is_empty());
    }

    #[tokio::test]
    async fn max_chunks_caps_and_preserve_order_restores_sequence() {
        let chunks = vec![
            sample_chunk("A complete sentence about alpha topics and structure."),
            sample_chunk("A complete sentence about beta topics and structure."),
            sample_chunk("A complete sentence about gamma topics and structure."),
        ];
        let mut options = EnrichOptions::default();
        options.enable_llm_filter = true;
        options.min_relevance_score = 0.0;
        options.max_chunks = Some(2);
        options.preserve_order = true;
        let (filtered, _warnings) = filter_chunks(chunks, None, &options, None, &Ctx::new()).await;
        assert_eq!(filtered.len(), 2);
        assert!(filtered[0].content.contains("alpha") || filtered[0].content.contains("beta"));
    }

    #[tokio::test]
    async fn missing_llm_service_falls_back_to_heuristic_with_warning() {
        let chunks: Vec<DocumentChunk> = (0..20)
            .map(|i| sample_chunk(&format!("A complete sentence about topic number {i}.")))
            .collect();
        let mut options = EnrichOptions::default();
        options.enable_llm_filter = true;
        options.min_relevance_score = 0.0;
        let (filtered, warnings) = filter_chunks(chunks, None, &options, None, &Ctx::new()).await;
        assert_eq!(filtered.len(), 20);
        assert!(warnings
            .iter()
            .any(|w| w.message == "llm filter unavailable; used heuristic"));
    }
}

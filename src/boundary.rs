//! Boundary detector (C4): classifies a potential cut between two
//! consecutive text segments and computes a confidence score for it.

use crate::cancel::Ctx;
use crate::config::BoundaryOptions;
use crate::services::{cosine_similarity, Embedding, EmbeddingPurpose};
use crate::tokenizer::ends_with_sentence_terminator;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// The kind of boundary a cut most likely represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BoundaryType {
    Section,
    CodeBlock,
    Table,
    List,
    TopicChange,
    Paragraph,
    Sentence,
}

/// Result of classifying the cut between two segments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoundaryResult {
    pub is_boundary: bool,
    pub similarity: f32,
    pub confidence: f32,
    pub boundary_type: BoundaryType,
    pub used_embedding: bool,
}

/// A boundary found while scanning a sequence of segments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoundaryPoint {
    pub segment_index: usize,
    pub similarity: f32,
    pub confidence: f32,
    pub boundary_type: BoundaryType,
}

fn lowercase_words_over_3(text: &str) -> HashSet<String> {
    text.split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()).to_ascii_lowercase())
        .filter(|w| w.chars().count() > 3)
        .collect()
}

fn jaccard_similarity(a: &str, b: &str) -> f32 {
    let wa = lowercase_words_over_3(a);
    let wb = lowercase_words_over_3(b);
    if wa.is_empty() && wb.is_empty() {
        return 1.0;
    }
    let intersection = wa.intersection(&wb).count();
    let union = wa.union(&wb).count();
    if union == 0 {
        0.0
    } else {
        intersection as f32 / union as f32
    }
}

fn has_heading_marker(text: &str) -> bool {
    text.lines().any(|l| l.trim_start().starts_with('#'))
}

fn has_fenced_code_marker(text: &str) -> bool {
    text.lines().any(|l| l.trim_start().starts_with("```"))
}

fn has_table_markers(text: &str) -> bool {
    text.lines().any(|l| l.matches('|').count() > 2)
}

fn has_list_markers(text: &str) -> bool {
    text.lines().any(|l| {
        let t = l.trim_start();
        t.starts_with("- ") || t.starts_with("* ") || {
            let digit_end = t.find(|c: char| !c.is_ascii_digit()).unwrap_or(0);
            digit_end > 0 && t[digit_end..].starts_with('.')
        }
    })
}

fn classify(segment_a: &str, segment_b: &str, similarity: f32, topic_change_threshold: f32) -> BoundaryType {
    if has_heading_marker(segment_b) {
        return BoundaryType::Section;
    }
    if has_fenced_code_marker(segment_a) || has_fenced_code_marker(segment_b) {
        return BoundaryType::CodeBlock;
    }
    if has_table_markers(segment_a) || has_table_markers(segment_b) {
        return BoundaryType::Table;
    }
    if has_list_markers(segment_a) || has_list_markers(segment_b) {
        return BoundaryType::List;
    }
    if similarity < topic_change_threshold {
        return BoundaryType::TopicChange;
    }

    let a_terminated = ends_with_sentence_terminator(segment_a);
    let b_capitalized = segment_b
        .trim_start()
        .chars()
        .next()
        .map(|c| c.is_uppercase())
        .unwrap_or(false);
    if a_terminated && b_capitalized {
        if similarity < 0.5 {
            BoundaryType::Paragraph
        } else {
            BoundaryType::Sentence
        }
    } else if similarity < topic_change_threshold {
        BoundaryType::TopicChange
    } else {
        BoundaryType::Paragraph
    }
}

/// Classify the cut between `segment_a` and `segment_b`. When `embedding`
/// is `Some`, cosine similarity of their embeddings is used; otherwise (or
/// on embedding failure) Jaccard similarity over words longer than 3
/// characters is used against a threshold scaled by
/// `options.text_threshold_factor`.
pub async fn detect(
    segment_a: &str,
    segment_b: &str,
    embedding: Option<&dyn Embedding>,
    options: &BoundaryOptions,
    ctx: &Ctx,
) -> BoundaryResult {
    let mut used_embedding = false;
    let mut similarity = jaccard_similarity(segment_a, segment_b);
    let mut threshold = options.similarity_threshold * options.text_threshold_factor;

    if let Some(embedding) = embedding {
        if ctx.check().is_ok() {
            let a = embedding.generate_one(segment_a, EmbeddingPurpose::BoundaryDetection, ctx).await;
            let b = embedding.generate_one(segment_b, EmbeddingPurpose::BoundaryDetection, ctx).await;
            if let (Ok(a), Ok(b)) = (a, b) {
                similarity = cosine_similarity(&a, &b);
                threshold = options.similarity_threshold;
                used_embedding = true;
            }
        }
    }

    let is_boundary = similarity < threshold;
    let confidence_multiplier = if used_embedding { 2.0 } else { 1.5 };
    let confidence = (((similarity - threshold).abs() / threshold.max(f32::EPSILON)) * confidence_multiplier).min(1.0);

    let boundary_type = classify(segment_a, segment_b, similarity, options.topic_change_similarity);

    BoundaryResult {
        is_boundary,
        similarity,
        confidence,
        boundary_type,
        used_embedding,
    }
}

/// Run `detect` pairwise across consecutive `segments`, merging boundaries
/// within `merge_distance` segments of each other (keeping the
/// higher-confidence one) and boosting confidence 20% for boundaries
/// between very differently sized segments.
pub async fn detect_all(
    segments: &[String],
    embedding: Option<&dyn Embedding>,
    options: &BoundaryOptions,
    ctx: &Ctx,
) -> Vec<BoundaryPoint> {
    if segments.len() < 2 {
        return Vec::new();
    }

    let mut raw_points = Vec::new();
    for i in 0..segments.len() - 1 {
        ctx.check().ok();
        let result = detect(&segments[i], &segments[i + 1], embedding, options, ctx).await;
        if !result.is_boundary {
            continue;
        }

        let mut confidence = result.confidence;
        let len_a = segments[i].chars().count().max(1);
        let len_b = segments[i + 1].chars().count().max(1);
        let ratio = len_a.min(len_b) as f32 / len_a.max(len_b) as f32;
        if ratio < options.size_ratio_boost_threshold {
            confidence = (confidence * 1.2).min(1.0);
        }

        raw_points.push(BoundaryPoint {
            segment_index: i,
            similarity: result.similarity,
            confidence,
            boundary_type: result.boundary_type,
        });
    }

    merge_nearby(raw_points, options.merge_distance)
}

fn merge_nearby(points: Vec<BoundaryPoint>, merge_distance: usize) -> Vec<BoundaryPoint> {
    let mut merged: Vec<BoundaryPoint> = Vec::new();
    for point in points {
        if let Some(last) = merged.last() {
            if point.segment_index.saturating_sub(last.segment_index) <= merge_distance {
                if point.confidence > last.confidence {
                    *merged.last_mut().unwrap() = point;
                }
                continue;
            }
        }
        merged.push(point);
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn identical_segments_are_not_a_boundary() {
        let result = detect("the quick brown fox", "the quick brown fox", None, &BoundaryOptions::default(), &Ctx::new()).await;
        assert!(!result.is_boundary);
    }

    #[tokio::test]
    async fn heading_marker_classifies_as_section() {
        let result = detect("some prose here", "# New Section", None, &BoundaryOptions::default(), &Ctx::new()).await;
        assert_eq!(result.boundary_type, BoundaryType::Section);
    }

    #[tokio::test]
    async fn unrelated_segments_are_topic_change() {
        let result = detect(
            "quantum mechanics describes particles",
            "banana bread recipe instructions follow",
            None,
            &BoundaryOptions::default(),
            &Ctx::new(),
        )
        .await;
        assert!(matches!(result.boundary_type, BoundaryType::TopicChange));
    }

    #[tokio::test]
    async fn empty_segment_list_yields_empty_result() {
        let points = detect_all(&[], None, &BoundaryOptions::default(), &Ctx::new()).await;
        assert!(points.is_empty());
    }

    #[tokio::test]
    async fn nearby_boundaries_are_merged() {
        let segments: Vec<String> = vec![
            "alpha topic one words here".into(),
            "totally unrelated banana bread".into(),
            "completely different astrophysics content".into(),
            "yet another unrelated gardening topic".into(),
        ];
        let points = detect_all(&segments, None, &BoundaryOptions::default(), &Ctx::new()).await;
        for window in points.windows(2) {
            assert!(window[1].segment_index - window[0].segment_index > 2);
        }
    }
}

//! Per-chunk scoring formulas (§4.4): relevance, information density, and
//! the `Smart`-strategy completeness floor.

use crate::tokenizer::{completeness_score, split_sentences};
use std::collections::HashSet;

/// `0.5 + (len > 200 -> +0.1) + (len > 500 -> +0.1) + completeness * 0.3`,
/// clamped to `[0, 1]`.
pub fn relevance_score(content: &str) -> f32 {
    let len = content.len();
    let mut score: f32 = 0.5;
    if len > 200 {
        score += 0.1;
    }
    if len > 500 {
        score += 0.1;
    }
    score += completeness_score(content) * 0.3;
    score.clamp(0.0, 1.0)
}

/// `(unique_words_longer_than_3 + sentence_count) * 1000 / content_length`.
/// Returns 0.0 for empty content rather than dividing by zero.
pub fn information_density(content: &str) -> f32 {
    if content.is_empty() {
        return 0.0;
    }
    let unique_words: HashSet<String> = content
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.len() > 3)
        .map(|w| w.to_ascii_lowercase())
        .collect();
    let sentence_count = split_sentences(content).len();
    ((unique_words.len() + sentence_count) as f32 * 1000.0) / content.len() as f32
}

/// `Smart`-strategy completeness score, required to be `>= completeness_floor`
/// (default 0.7). Delegates to the shared sentence-well-formedness heuristic.
pub fn completeness(content: &str) -> f32 {
    completeness_score(content)
}

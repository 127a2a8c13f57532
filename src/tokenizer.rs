//! Language-aware sentence and token counting (C3).
//!
//! §9 Open Question: the token counter is a documented *estimate*, not an
//! exact BPE count — none of the pack repos for this spec pull in a real
//! tokenizer for RAG chunk sizing, they all approximate from character/word
//! counts (see `other_examples/*chunk*` `estimate_tokens_from_content`
//! helpers). This module keeps that idiom but adds a CJK-aware adjustment
//! since CJK text tokenizes far denser than ~4 chars/token.

/// Roughly how many ASCII characters make up one token for typical BPE
/// vocabularies. An estimate, not a guarantee.
const CHARS_PER_TOKEN: f32 = 4.0;

fn is_cjk(c: char) -> bool {
    matches!(c as u32,
        0x4E00..=0x9FFF   // CJK Unified Ideographs
        | 0x3040..=0x30FF // Hiragana + Katakana
        | 0xAC00..=0xD7A3 // Hangul syllables
        | 0x3130..=0x318F // Hangul compatibility jamo
    )
}

/// Estimate the token count of `text`. CJK code points are counted at
/// roughly one token each; the remainder is estimated at
/// `CHARS_PER_TOKEN` characters per token. This is always an estimate with
/// an unspecified error bound — never present it as an exact count.
pub fn estimate_tokens(text: &str) -> usize {
    if text.is_empty() {
        return 0;
    }

    let mut cjk_count = 0usize;
    let mut other_count = 0usize;
    for c in text.chars() {
        if is_cjk(c) {
            cjk_count += 1;
        } else if !c.is_whitespace() {
            other_count += 1;
        }
    }

    let other_tokens = (other_count as f32 / CHARS_PER_TOKEN).ceil() as usize;
    (cjk_count + other_tokens).max(if text.trim().is_empty() { 0 } else { 1 })
}

/// Common abbreviations whose trailing period is never treated as a
/// sentence boundary.
const ABBREVIATIONS: &[&str] = &[
    "dr", "mr", "mrs", "ms", "prof", "sr", "jr", "st", "vs", "etc", "e.g", "i.e", "no", "fig",
];

fn ends_with_abbreviation(text_before_period: &str) -> bool {
    let word = text_before_period
        .rsplit(|c: char| c.is_whitespace())
        .next()
        .unwrap_or("")
        .trim_matches(|c: char| !c.is_alphanumeric() && c != '.')
        .to_ascii_lowercase();
    ABBREVIATIONS.contains(&word.as_str())
}

/// Split text into sentences using terminal-punctuation + capitalization
/// heuristics (no language model required). Abbreviation-aware: a period
/// preceded by a known abbreviation, or followed by a lowercase letter, is
/// not treated as a boundary.
pub fn split_sentences(text: &str) -> Vec<&str> {
    let bytes = text.as_bytes();
    let mut sentences = Vec::new();
    let mut start = 0usize;
    let chars: Vec<(usize, char)> = text.char_indices().collect();

    for (i, &(byte_idx, c)) in chars.iter().enumerate() {
        if matches!(c, '.' | '!' | '?') {
            let next = chars.get(i + 1).map(|&(_, c)| c);
            let is_boundary = match next {
                None => true,
                Some(n) if n.is_whitespace() => {
                    let after_ws = chars[i + 1..]
                        .iter()
                        .find(|&&(_, c)| !c.is_whitespace())
                        .map(|&(_, c)| c);
                    let lowercase_follows = matches!(after_ws, Some(a) if a.is_lowercase());
                    let abbreviation = c == '.' && ends_with_abbreviation(&text[start..byte_idx]);
                    !lowercase_follows && !abbreviation
                }
                _ => false,
            };

            if is_boundary {
                let end = byte_idx + c.len_utf8();
                if end <= bytes.len() {
                    let candidate = text[start..end].trim();
                    if !candidate.is_empty() {
                        sentences.push(&text[start..end]);
                    }
                    start = end;
                }
            }
        }
    }

    if start < text.len() && !text[start..].trim().is_empty() {
        sentences.push(&text[start..]);
    }

    sentences
}

/// `true` when `text` ends with a sentence-terminal mark (`.`, `!`, `?`) —
/// used by completeness scoring (C7) and boundary classification (C4).
pub fn ends_with_sentence_terminator(text: &str) -> bool {
    text.trim_end().ends_with(['.', '!', '?'])
}

/// Fraction of `text`'s sentences that are "well-formed": longer than 10
/// characters and not ellipsis-terminated. Used by the `Smart` chunking
/// strategy and enrichment's completeness score, each compared against
/// their own configured floor (see `EnrichOptions::completeness_floor`).
pub fn completeness_score(text: &str) -> f32 {
    let sentences = split_sentences(text);
    if sentences.is_empty() {
        return 1.0;
    }
    let well_formed = sentences
        .iter()
        .filter(|s| {
            let trimmed = s.trim();
            trimmed.chars().count() > 10 && !trimmed.ends_with('\u{2026}') && !trimmed.ends_with("...")
        })
        .count();
    well_formed as f32 / sentences.len() as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn estimates_ascii_tokens() {
        let text = "word ".repeat(40); // 200 chars
        let tokens = estimate_tokens(&text);
        assert!(tokens > 30 && tokens < 60);
    }

    #[test]
    fn empty_text_has_zero_tokens() {
        assert_eq!(estimate_tokens(""), 0);
        assert_eq!(estimate_tokens("   "), 0);
    }

    #[test]
    fn cjk_text_counts_near_one_token_per_char() {
        let text = "한국어 문장입니다";
        let tokens = estimate_tokens(text);
        let cjk_chars = text.chars().filter(|c| !c.is_whitespace()).count();
        assert!(tokens >= cjk_chars - 1);
    }

    #[test]
    fn splits_simple_sentences() {
        let text = "This is sentence one. This is sentence two! Is this three?";
        let sentences = split_sentences(text);
        assert_eq!(sentences.len(), 3);
    }

    #[test]
    fn does_not_split_on_abbreviation() {
        let text = "Dr. Smith arrived. He left soon after.";
        let sentences = split_sentences(text);
        assert_eq!(sentences.len(), 2);
        assert!(sentences[0].contains("Dr. Smith arrived."));
    }

    #[test]
    fn detects_sentence_terminator() {
        assert!(ends_with_sentence_terminator("Hello there."));
        assert!(!ends_with_sentence_terminator("Hello there"));
        assert!(!ends_with_sentence_terminator("Hello there…"));
    }

    #[test]
    fn completeness_score_penalizes_fragments() {
        let complete = "This is a full sentence. This is another full sentence.";
        let fragmented = "ok. no. This is a full and well formed sentence.";
        assert_eq!(completeness_score(complete), 1.0);
        assert!(completeness_score(fragmented) < 1.0);
    }
}

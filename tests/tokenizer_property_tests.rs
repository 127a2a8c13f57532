//! Property-based tests for the token-estimation and sentence-splitting
//! heuristics, independent of any fixed example text.

use docflux::tokenizer::{completeness_score, ends_with_sentence_terminator, estimate_tokens, split_sentences};
use proptest::prelude::*;

proptest! {
    #[test]
    fn estimate_tokens_never_panics_and_is_non_negative(text in ".*") {
        let _ = estimate_tokens(&text);
    }

    #[test]
    fn estimate_tokens_is_zero_only_for_blank_input(text in "[ \t\n]*") {
        prop_assert_eq!(estimate_tokens(&text), 0);
    }

    #[test]
    fn completeness_score_is_always_in_unit_range(text in "\\PC{0,200}") {
        let score = completeness_score(&text);
        prop_assert!((0.0..=1.0).contains(&score));
    }

    #[test]
    fn split_sentences_never_drops_non_whitespace_characters(text in "[A-Za-z0-9 .!?]{0,200}") {
        let sentences = split_sentences(&text);
        let reassembled: String = sentences.concat();
        let expected: String = text.chars().filter(|c| !c.is_whitespace()).collect();
        let got: String = reassembled.chars().filter(|c| !c.is_whitespace()).collect();
        prop_assert_eq!(got, expected);
    }

    #[test]
    fn terminator_detection_matches_final_punctuation(word in "[A-Za-z]{1,20}", mark in prop::sample::select(vec!['.', '!', '?', 'x'])) {
        let text = format!("{word}{mark}");
        prop_assert_eq!(ends_with_sentence_terminator(&text), mark != 'x');
    }
}

//! Strategy contract shared by all eight chunking algorithms (§4.3).

use super::candidate::RawChunkCandidate;
use crate::cancel::Ctx;
use crate::config::ChunkingOptions;
use crate::error::Result;
use crate::refine::RefinedContent;
use crate::services::Embedding;
use async_trait::async_trait;

/// Everything a strategy needs beyond the refined text: the per-page
/// character offsets a reader reported (for `PageLevel`), since strategies
/// otherwise only see `RefinedContent`.
pub struct ChunkInput<'a> {
    pub refined: &'a RefinedContent,
    pub page_offsets: Option<&'a [(usize, usize)]>,
}

impl<'a> ChunkInput<'a> {
    pub fn new(refined: &'a RefinedContent) -> Self {
        Self {
            refined,
            page_offsets: None,
        }
    }

    pub fn with_page_offsets(mut self, offsets: Option<&'a [(usize, usize)]>) -> Self {
        self.page_offsets = offsets;
        self
    }
}

/// A chunking algorithm: segments refined text into raw chunk candidates.
/// Strategies are `async` since `Semantic` and `Auto` may consult the
/// (optional) embedding service via the boundary detector.
#[async_trait]
pub trait ChunkStrategy: Send + Sync {
    async fn chunk(
        &self,
        input: &ChunkInput<'_>,
        options: &ChunkingOptions,
        embedding: Option<&dyn Embedding>,
        ctx: &Ctx,
    ) -> Result<Vec<RawChunkCandidate>>;
}

/// Split `text` on word boundaries near `target_len`, never mid-word.
/// Returns the split index (a byte offset) closest to but not exceeding
/// `target_len`, snapped backward to the nearest preceding whitespace.
pub fn snap_to_word_boundary(text: &str, target_len: usize) -> usize {
    if target_len >= text.len() {
        return text.len();
    }
    let mut boundary = target_len;
    while boundary > 0 && !text.is_char_boundary(boundary) {
        boundary -= 1;
    }
    while boundary > 0 {
        if text.as_bytes()[boundary - 1].is_ascii_whitespace() {
            break;
        }
        boundary -= 1;
    }
    if boundary == 0 {
        // No whitespace found before target_len (one giant word): cut at
        // the char boundary nearest target_len instead of losing progress.
        let mut fallback = target_len;
        while fallback < text.len() && !text.is_char_boundary(fallback) {
            fallback += 1;
        }
        fallback
    } else {
        boundary
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snaps_back_to_preceding_whitespace() {
        let text = "hello world this is fine";
        let idx = snap_to_word_boundary(text, 8);
        assert_eq!(&text[..idx], "hello ");
    }

    #[test]
    fn falls_back_to_char_boundary_with_no_whitespace() {
        let text = "abcdefghij";
        let idx = snap_to_word_boundary(text, 5);
        assert_eq!(idx, 5);
    }
}

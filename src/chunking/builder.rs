//! Chunk builder (C6): turns a strategy's raw candidates into finished
//! `DocumentChunk`s via header separation, Korean section markers,
//! overlap, minimum-size merging, deduplication, and final indexing.

use super::candidate::RawChunkCandidate;
use super::strategies::paragraph::split_paragraphs;
use crate::chunk_model::{ContextDependency, DocumentChunk, SourceLocation, SourceMetadataInfo};
use crate::config::{ChunkingOptions, Strategy};
use crate::raw::RawContent;
use crate::refine::{DocumentMetadata, RefinedContent};
use crate::tokenizer::{ends_with_sentence_terminator, estimate_tokens};
use chrono::Utc;
use uuid::Uuid;

/// Korean section-marker glyphs in nesting-rank order (outermost first), per
/// spec.md §4.3.2: "lines starting with □ ㅇ ■ ○ ● ◆ are treated as section
/// boundaries". A marker's rank is its index here; encountering a marker
/// pops any open section of equal or deeper rank before nesting under it.
const KOREAN_MARKERS: &[char] = &['\u{25A1}', '\u{3147}', '\u{25A0}', '\u{25CB}', '\u{25CF}', '\u{25C6}'];

fn korean_marker_rank(c: char) -> Option<usize> {
    KOREAN_MARKERS.iter().position(|&m| m == c)
}

#[derive(Debug, Clone)]
struct BuilderChunk {
    content: String,
    start_char: usize,
    end_char: usize,
    heading_path: Vec<String>,
    atomic: bool,
}

impl From<RawChunkCandidate> for BuilderChunk {
    fn from(c: RawChunkCandidate) -> Self {
        Self {
            content: c.content,
            start_char: c.start_char,
            end_char: c.end_char,
            heading_path: c.heading_path,
            atomic: false,
        }
    }
}

/// Detach the first `N <= max_header_paragraphs` leading paragraphs into
/// document-level header text, provided each is shorter than
/// `max_header_paragraph_length`. Returns the header paragraphs and the
/// byte offset where chunkable content resumes.
fn separate_header(text: &str, options: &ChunkingOptions) -> (Vec<String>, usize) {
    if !options.separate_document_header {
        return (Vec::new(), 0);
    }
    let paragraphs = split_paragraphs(text);
    let mut header = Vec::new();
    let mut cursor = 0usize;

    for (start, end) in paragraphs.into_iter().take(options.max_header_paragraphs) {
        let content = text[start..end].trim();
        if content.is_empty() || content.chars().count() > options.max_header_paragraph_length {
            break;
        }
        header.push(content.to_string());
        cursor = end;
    }

    (header, cursor)
}

/// Drop or trim candidates that fall entirely or partly within the
/// separated header region.
fn strip_header_region(candidates: Vec<RawChunkCandidate>, text: &str, header_end: usize) -> Vec<RawChunkCandidate> {
    if header_end == 0 {
        return candidates;
    }
    candidates
        .into_iter()
        .filter_map(|c| {
            if c.end_char <= header_end {
                return None;
            }
            if c.start_char < header_end {
                let mut new_start = header_end;
                while new_start < c.end_char && !text.is_char_boundary(new_start) {
                    new_start += 1;
                }
                return Some(RawChunkCandidate::new(
                    text[new_start..c.end_char].to_string(),
                    new_start,
                    c.end_char,
                    c.heading_path,
                ));
            }
            Some(c)
        })
        .collect()
}

/// Cut candidates at every Korean section-marker line (`□ ㅇ ■ ○ ● ◆` at
/// line start), nesting a heading path across the marker's rank the way the
/// markdown section tree nests heading levels: a new marker pops any open
/// section of equal-or-deeper rank, then pushes itself as the new deepest
/// ancestor. The nesting state persists across candidates since strategies
/// hand candidates to the builder in document order.
fn split_on_korean_markers(candidates: Vec<RawChunkCandidate>, text: &str, enabled: bool) -> Vec<RawChunkCandidate> {
    if !enabled {
        return candidates;
    }
    let mut out = Vec::new();
    let mut stack: Vec<(usize, String)> = Vec::new();

    for candidate in candidates {
        let base_path = candidate.heading_path.clone();
        let mut piece_start = candidate.start_char;
        let mut cursor = candidate.start_char;
        let mut current_suffix: Vec<String> = stack.iter().map(|(_, t)| t.clone()).collect();
        let mut pieces: Vec<(usize, usize, Vec<String>)> = Vec::new();

        for line in text[candidate.start_char..candidate.end_char].split_inclusive('\n') {
            let line_start = cursor;
            let trimmed_line = line.trim_end_matches('\n');
            cursor += line.len();

            let trimmed_start = trimmed_line.trim_start();
            let Some(rank) = trimmed_start.chars().next().and_then(korean_marker_rank) else {
                continue;
            };

            if line_start > piece_start {
                pieces.push((piece_start, line_start, current_suffix.clone()));
            }

            while stack.last().map(|(r, _)| *r >= rank).unwrap_or(false) {
                stack.pop();
            }
            let title = trimmed_start[trimmed_start.chars().next().unwrap().len_utf8()..].trim().to_string();
            stack.push((rank, title));
            current_suffix = stack.iter().map(|(_, t)| t.clone()).collect();
            piece_start = line_start;
        }

        if piece_start < candidate.end_char {
            pieces.push((piece_start, candidate.end_char, current_suffix.clone()));
        }

        if pieces.is_empty() {
            out.push(candidate);
            continue;
        }
        for (start, end, suffix) in pieces {
            let heading_path: Vec<String> = base_path.iter().cloned().chain(suffix).collect();
            out.push(RawChunkCandidate::new(text[start..end].to_string(), start, end, heading_path));
        }
    }
    out
}

fn snap_forward_to_word_start(text: &str, mut start: usize, floor: usize) -> usize {
    while start < text.len() && !text.is_char_boundary(start) {
        start += 1;
    }
    let boundary_limit = text.len();
    while start < boundary_limit && start > floor && !text.as_bytes()[start - 1].is_ascii_whitespace() {
        start += 1;
    }
    start
}

/// Prepend up to `overlap_size` trailing characters of the previous chunk
/// as leading context on each subsequent, non-already-overlapping chunk.
/// Skips any transition whose candidate overlap text falls inside a fenced
/// code block (§8 scenario 3: "no overlap is inserted into fenced blocks").
fn apply_overlap(text: &str, mut chunks: Vec<BuilderChunk>, overlap_size: usize, code_ranges: &[(usize, usize)]) -> Vec<BuilderChunk> {
    if overlap_size == 0 || chunks.len() < 2 {
        return chunks;
    }
    for i in 1..chunks.len() {
        let prev_end = chunks[i - 1].end_char;
        let prev_start = chunks[i - 1].start_char;
        let cur_start = chunks[i].start_char;
        if cur_start < prev_end {
            continue; // strategy already produced overlapping ranges
        }
        let floor = prev_start.max(prev_end.saturating_sub(overlap_size));
        let snapped = snap_forward_to_word_start(text, floor, prev_start);
        if snapped < cur_start && snapped < prev_end {
            let overlap_end = cur_start.min(prev_end);
            let crosses_code_block = code_ranges.iter().any(|&(cs, ce)| snapped < ce && overlap_end > cs);
            if crosses_code_block {
                continue;
            }
            let prefix = &text[snapped..overlap_end];
            if !prefix.trim().is_empty() {
                chunks[i].content = format!("{}{}", prefix, chunks[i].content);
                chunks[i].start_char = snapped;
            }
        }
    }
    chunks
}

/// Merge any chunk below `min_chunk_size` into whichever neighbor yields
/// the smaller combined size, unless that combined size would exceed
/// 1.5x `max_chunk_size`, in which case the chunk stands alone (flagged
/// atomic).
fn merge_undersized(mut chunks: Vec<BuilderChunk>, min_chunk_size: usize, max_chunk_size: usize) -> Vec<BuilderChunk> {
    let hard_cap = ((max_chunk_size as f32) * 1.5) as usize;
    let mut i = 0;
    while i < chunks.len() {
        if chunks[i].content.len() >= min_chunk_size || chunks.len() == 1 {
            i += 1;
            continue;
        }

        let left_len = if i > 0 { chunks[i - 1].content.len() + chunks[i].content.len() } else { usize::MAX };
        let right_len = if i + 1 < chunks.len() { chunks[i].content.len() + chunks[i + 1].content.len() } else { usize::MAX };

        if left_len == usize::MAX && right_len == usize::MAX {
            chunks[i].atomic = true;
            i += 1;
            continue;
        }

        let merge_left = left_len <= right_len;
        let target_len = if merge_left { left_len } else { right_len };

        if target_len > hard_cap {
            chunks[i].atomic = true;
            i += 1;
            continue;
        }

        if merge_left {
            let merged_content = format!("{}{}", chunks[i - 1].content, chunks[i].content);
            let merged_end = chunks[i].end_char;
            chunks[i - 1].content = merged_content;
            chunks[i - 1].end_char = merged_end;
            chunks.remove(i);
        } else {
            let merged_content = format!("{}{}", chunks[i].content, chunks[i + 1].content);
            let merged_end = chunks[i + 1].end_char;
            chunks[i].content = merged_content;
            chunks[i].end_char = merged_end;
            chunks.remove(i + 1);
        }
    }
    chunks
}

fn normalize_for_dedup(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ").to_ascii_lowercase()
}

fn overlap_ratio(a: &str, b: &str) -> f32 {
    let na = normalize_for_dedup(a);
    let nb = normalize_for_dedup(b);
    if na.is_empty() || nb.is_empty() {
        return 0.0;
    }
    let shorter_len = na.len().min(nb.len());
    let common = na.chars().zip(nb.chars()).take_while(|(x, y)| x == y).count();
    common as f32 / shorter_len as f32
}

/// Collapse consecutive chunks whose normalized content overlaps by 50%
/// or more.
fn deduplicate(chunks: Vec<BuilderChunk>, enabled: bool) -> Vec<BuilderChunk> {
    if !enabled || chunks.len() < 2 {
        return chunks;
    }
    let mut out: Vec<BuilderChunk> = Vec::with_capacity(chunks.len());
    for chunk in chunks {
        if let Some(last) = out.last() {
            if overlap_ratio(&last.content, &chunk.content) >= 0.5 {
                continue;
            }
        }
        out.push(chunk);
    }
    out
}

/// Run the full C6 post-processing pipeline over a strategy's candidates,
/// returning finished `DocumentChunk`s plus the detached header paragraphs.
pub fn build(
    refined: &RefinedContent,
    raw: &RawContent,
    options: &ChunkingOptions,
    strategy_used: Strategy,
    candidates: Vec<RawChunkCandidate>,
) -> (Vec<DocumentChunk>, Vec<String>) {
    let (header_paragraphs, header_end) = separate_header(&refined.text, options);
    let candidates = strip_header_region(candidates, &refined.text, header_end);
    let candidates = split_on_korean_markers(candidates, &refined.text, options.recognize_korean_section_markers);

    let code_ranges = refined.code_block_ranges();
    let builder_chunks: Vec<BuilderChunk> = candidates.into_iter().map(BuilderChunk::from).collect();
    let builder_chunks = apply_overlap(&refined.text, builder_chunks, options.overlap_size, &code_ranges);
    let builder_chunks = merge_undersized(builder_chunks, options.min_chunk_size, options.max_chunk_size);
    let builder_chunks = deduplicate(builder_chunks, options.deduplicate_overlaps);

    let now = Utc::now();
    let chunks = builder_chunks
        .into_iter()
        .enumerate()
        .map(|(index, bc)| {
            let heading_path = if bc.heading_path.is_empty() {
                refined.heading_path_at(bc.start_char)
            } else {
                bc.heading_path
            };
            let context_dependency = match (
                bc.start_char > 0 && !starts_at_paragraph_boundary(&refined.text, bc.start_char),
                !ends_with_sentence_terminator(&bc.content),
            ) {
                (true, true) => ContextDependency::RequiresBoth,
                (true, false) => ContextDependency::RequiresPrevious,
                (false, true) => ContextDependency::RequiresNext,
                (false, false) => ContextDependency::None,
            };

            let tokens = estimate_tokens(&bc.content);
            let mut props = std::collections::HashMap::new();
            if bc.atomic {
                props.insert("atomic".to_string(), serde_json::json!(true));
            }

            DocumentChunk {
                id: Uuid::new_v4(),
                raw_id: refined.raw_id,
                parsed_id: refined.id,
                content: bc.content,
                index,
                location: SourceLocation::new(bc.start_char, bc.end_char, heading_path),
                metadata: DocumentMetadata::default(),
                quality: 0.0,
                importance: 0.0,
                density: 0.0,
                strategy: strategy_used,
                tokens,
                created_at: now,
                props,
                context_dependency,
                source_info: SourceMetadataInfo {
                    file_name: raw.file.name.clone(),
                    file_extension: raw.file.extension.clone(),
                    strategy: strategy_used,
                },
            }
        })
        .collect();

    (chunks, header_paragraphs)
}

fn starts_at_paragraph_boundary(text: &str, start: usize) -> bool {
    if start == 0 {
        return true;
    }
    text[..start].ends_with("\n\n") || text[..start].trim_end().is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raw::FileInfo;

    fn refined_with(text: &str) -> RefinedContent {
        RefinedContent {
            id: Uuid::new_v4(),
            raw_id: Uuid::new_v4(),
            text: text.to_string(),
            sections: Vec::new(),
            structures: Vec::new(),
            metadata: DocumentMetadata::default(),
            quality: crate::refine::RefinementQuality::compute(false, text.len(), text.len()),
            info: Default::default(),
        }
    }

    fn raw_with(text: &str) -> RawContent {
        RawContent::new(FileInfo::in_memory("doc.txt", text.len() as u64), text.to_string())
    }

    #[test]
    fn assigns_contiguous_indices() {
        let text = "para one here.\n\npara two here.\n\npara three here.";
        let refined = refined_with(text);
        let raw = raw_with(text);
        let candidates = split_paragraphs(text)
            .into_iter()
            .map(|(s, e)| RawChunkCandidate::new(text[s..e].to_string(), s, e, Vec::new()))
            .collect();
        let (chunks, _) = build(&refined, &raw, &ChunkingOptions::default(), Strategy::Paragraph, candidates);
        for (i, c) in chunks.iter().enumerate() {
            assert_eq!(c.index, i);
        }
    }

    #[test]
    fn merges_undersized_chunk_with_smaller_neighbor() {
        let text = "a".repeat(300) + "\n\n" + "b" + "\n\n" + &"c".repeat(300);
        let refined = refined_with(&text);
        let raw = raw_with(&text);
        let candidates = split_paragraphs(&text)
            .into_iter()
            .map(|(s, e)| RawChunkCandidate::new(text[s..e].to_string(), s, e, Vec::new()))
            .collect();
        let mut options = ChunkingOptions::default();
        options.min_chunk_size = 10;
        options.max_chunk_size = 1024;
        let (chunks, _) = build(&refined, &raw, &options, Strategy::Paragraph, candidates);
        assert!(chunks.len() < 3);
    }

    #[test]
    fn overlap_is_not_inserted_across_a_fenced_code_block() {
        let prose_a = "a".repeat(50);
        let code = "```\nfn f() {}\n```\n";
        let prose_b = "b".repeat(50);
        let text = format!("{prose_a}\n\n{code}\n{prose_b}");
        let code_start = prose_a.len() + 2;
        let code_end = code_start + code.len();

        let mut refined = refined_with(&text);
        refined.structures.push(crate::refine::StructuredElement::Code {
            language: None,
            content: code.clone(),
            location: crate::refine::Location {
                start_char: code_start,
                end_char: code_end,
            },
            source_chunk_id: None,
        });
        let raw = raw_with(&text);

        let candidates = vec![
            RawChunkCandidate::new(text[..code_end].to_string(), 0, code_end, Vec::new()),
            RawChunkCandidate::new(text[code_end..].to_string(), code_end, text.len(), Vec::new()),
        ];
        let mut options = ChunkingOptions::default();
        options.overlap_size = 30;
        options.min_chunk_size = 0;
        options.deduplicate_overlaps = false;
        let (chunks, _) = build(&refined, &raw, &options, Strategy::Paragraph, candidates);

        assert_eq!(chunks.len(), 2);
        assert!(chunks[1].location.start_char >= code_end, "overlap must not reach back into the fenced block");
    }

    #[test]
    fn korean_section_markers_produce_nested_heading_paths() {
        let text = "\u{25A1} 개요\n내용 a.\n\u{3147} 세부\n내용 b.";
        let refined = refined_with(text);
        let raw = raw_with(text);
        let candidates = vec![RawChunkCandidate::new(text.to_string(), 0, text.len(), Vec::new())];
        let mut options = ChunkingOptions::default();
        options.min_chunk_size = 0;
        options.deduplicate_overlaps = false;
        let (chunks, _) = build(&refined, &raw, &options, Strategy::Paragraph, candidates);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].location.heading_path, vec!["개요".to_string()]);
        assert_eq!(chunks[1].location.heading_path, vec!["개요".to_string(), "세부".to_string()]);
    }

    #[test]
    fn deduplicates_near_identical_consecutive_chunks() {
        let text = "repeated content block here twice over";
        let refined = refined_with(text);
        let raw = raw_with(text);
        let candidates = vec![
            RawChunkCandidate::new(text.to_string(), 0, text.len(), Vec::new()),
            RawChunkCandidate::new(text.to_string(), 0, text.len(), Vec::new()),
        ];
        let (chunks, _) = build(&refined, &raw, &ChunkingOptions::default(), Strategy::Paragraph, candidates);
        assert_eq!(chunks.len(), 1);
    }
}

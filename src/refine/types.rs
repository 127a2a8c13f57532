//! Value types produced by the Refine stage (§3).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Kind of section a heading introduces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SectionType {
    Heading,
    Root,
}

/// A node in the document's heading tree.
///
/// Invariant: `start <= end`; children lie within the parent's range;
/// levels are monotone non-decreasing along the tree path from root.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Section {
    pub id: Uuid,
    pub title: String,
    pub section_type: SectionType,
    pub content: String,
    pub level: u8,
    pub start: usize,
    pub end: usize,
    /// Offset where `content` begins in the document text. Unlike `start`
    /// (the heading line) and `end` (which `build_sections` widens to
    /// cover the last descendant), this plus `content.len()` bounds the
    /// section's own body, excluding any nested subsections.
    pub content_start: usize,
    pub children: Vec<Section>,
}

impl Section {
    pub fn new(title: impl Into<String>, level: u8, start: usize, end: usize) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            section_type: SectionType::Heading,
            content: String::new(),
            level,
            start,
            end,
            content_start: start,
            children: Vec::new(),
        }
    }

    /// Byte range of this section's own body, excluding nested subsections.
    pub fn own_content_range(&self) -> (usize, usize) {
        (self.content_start, self.content_start + self.content.len())
    }

    /// Ordered ancestor titles (including self) whose range contains
    /// `offset`, deepest last. Used to populate `SourceLocation.heading_path`.
    pub fn path_to(&self, offset: usize) -> Vec<String> {
        if offset < self.start || offset > self.end {
            return Vec::new();
        }
        let mut path = vec![self.title.clone()];
        for child in &self.children {
            if offset >= child.start && offset <= child.end {
                path.extend(child.path_to(offset));
                break;
            }
        }
        path
    }
}

/// A non-prose region identified in refined text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum StructuredElement {
    Code {
        language: Option<String>,
        content: String,
        location: Location,
        source_chunk_id: Option<Uuid>,
    },
    Table {
        rows: Vec<Vec<String>>,
        location: Location,
        source_chunk_id: Option<Uuid>,
    },
    List {
        items: Vec<String>,
        location: Location,
        source_chunk_id: Option<Uuid>,
    },
    Image {
        reference: String,
        alt: String,
        width: Option<u32>,
        height: Option<u32>,
        location: Location,
        source_chunk_id: Option<Uuid>,
    },
}

impl StructuredElement {
    pub fn location(&self) -> &Location {
        match self {
            StructuredElement::Code { location, .. } => location,
            StructuredElement::Table { location, .. } => location,
            StructuredElement::List { location, .. } => location,
            StructuredElement::Image { location, .. } => location,
        }
    }

    pub fn set_source_chunk(&mut self, id: Uuid) {
        match self {
            StructuredElement::Code { source_chunk_id, .. } => *source_chunk_id = Some(id),
            StructuredElement::Table { source_chunk_id, .. } => *source_chunk_id = Some(id),
            StructuredElement::List { source_chunk_id, .. } => *source_chunk_id = Some(id),
            StructuredElement::Image { source_chunk_id, .. } => *source_chunk_id = Some(id),
        }
    }
}

/// A character-offset range within refined text.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Location {
    pub start_char: usize,
    pub end_char: usize,
}

/// Document-level metadata accumulated across refine/enrich.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub title: Option<String>,
    pub heading_levels_seen: Vec<u8>,
    /// Paragraphs detached from the body by header separation (§4.3.1),
    /// rather than prepended to every chunk.
    pub header_paragraphs: Vec<String>,
    pub extra: HashMap<String, serde_json::Value>,
}

/// Heuristic quality scores the refiner computes for its own output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefinementQuality {
    pub structure_score: f32,
    pub cleanup_score: f32,
    pub retention_score: f32,
    pub confidence_score: f32,
    pub overall: f32,
}

impl RefinementQuality {
    pub fn compute(has_structures: bool, refined_len: usize, raw_len: usize) -> Self {
        let structure_score = if has_structures { 0.8 } else { 0.5 };
        let cleanup_score = 0.7;
        let retention_score = if raw_len == 0 {
            1.0
        } else {
            (refined_len as f32 / raw_len as f32).min(1.0)
        };
        let confidence_score = 0.75;
        let overall = (structure_score + cleanup_score + retention_score) / 3.0;
        Self {
            structure_score,
            cleanup_score,
            retention_score,
            confidence_score,
            overall,
        }
    }
}

/// Non-scoring information about how refinement went: whether the LLM
/// enhancement ran, whether it replaced the heuristic output, etc.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RefinementInfo {
    pub used_llm: bool,
    pub llm_replaced_heuristic: bool,
    pub heading_level_distribution: HashMap<u8, usize>,
    pub truncated_for_llm: bool,
    /// Set when `raw.text` was blank: refinement short-circuited to an
    /// empty result rather than failing (§4.1, §8 "empty raw text").
    pub empty_input: bool,
}

/// The immutable output of the Refine stage: cleaned, structurally
/// annotated markdown derived from `RawContent`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefinedContent {
    pub id: Uuid,
    pub raw_id: Uuid,
    pub text: String,
    pub sections: Vec<Section>,
    pub structures: Vec<StructuredElement>,
    pub metadata: DocumentMetadata,
    pub quality: RefinementQuality,
    pub info: RefinementInfo,
}

impl RefinedContent {
    /// Ordered ancestor section titles at `offset`, or empty if `offset`
    /// falls outside every section (e.g. document-header text).
    pub fn heading_path_at(&self, offset: usize) -> Vec<String> {
        for section in &self.sections {
            let path = section.path_to(offset);
            if !path.is_empty() {
                return path;
            }
        }
        Vec::new()
    }

    /// Byte ranges of every fenced code block, sorted by start offset.
    /// Chunking strategies consult this to avoid cutting or overlapping
    /// mid-block (§8 scenario 3: "no overlap is inserted into fenced
    /// blocks").
    pub fn code_block_ranges(&self) -> Vec<(usize, usize)> {
        let mut ranges: Vec<(usize, usize)> = self
            .structures
            .iter()
            .filter_map(|s| match s {
                StructuredElement::Code { location, .. } => Some((location.start_char, location.end_char)),
                _ => None,
            })
            .collect();
        ranges.sort_by_key(|&(start, _)| start);
        ranges
    }
}

/// The end offset of the code-block range containing `pos` strictly inside
/// it (not at its boundary), if any, from an already-sorted range list.
pub fn enclosing_code_block_end(ranges: &[(usize, usize)], pos: usize) -> Option<usize> {
    ranges
        .iter()
        .find(|&&(start, end)| pos > start && pos < end)
        .map(|&(_, end)| end)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn section_path_walks_to_deepest_matching_child() {
        let mut root = Section::new("A", 1, 0, 100);
        let mut child = Section::new("A.1", 2, 10, 50);
        child.children.push(Section::new("A.1.a", 3, 20, 30));
        root.children.push(child);

        let path = root.path_to(25);
        assert_eq!(path, vec!["A".to_string(), "A.1".to_string(), "A.1.a".to_string()]);
    }

    #[test]
    fn section_path_outside_range_is_empty() {
        let root = Section::new("A", 1, 0, 10);
        assert!(root.path_to(50).is_empty());
    }

    #[test]
    fn quality_retention_caps_at_one() {
        let q = RefinementQuality::compute(true, 200, 100);
        assert_eq!(q.retention_score, 1.0);
    }
}

//! Raw extraction output (C1): value types a `Reader` produces from an
//! opaque source, before any cleanup or structural analysis.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Supported document formats, dispatched on by the reader registry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum DocumentFormat {
    Pdf,
    Docx,
    Xlsx,
    Pptx,
    Hwp,
    Html,
    Markdown,
    Txt,
    Bytes,
}

impl DocumentFormat {
    /// Map a file extension (case-insensitive, no leading dot) to a format.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "pdf" => Some(Self::Pdf),
            "docx" => Some(Self::Docx),
            "xlsx" => Some(Self::Xlsx),
            "pptx" => Some(Self::Pptx),
            "hwp" => Some(Self::Hwp),
            "html" | "htm" => Some(Self::Html),
            "md" | "markdown" => Some(Self::Markdown),
            "txt" => Some(Self::Txt),
            _ => None,
        }
    }
}

/// File-level metadata captured at extraction time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileInfo {
    pub name: String,
    pub extension: String,
    pub size: u64,
    pub created_at: Option<DateTime<Utc>>,
    pub modified_at: Option<DateTime<Utc>>,
}

impl FileInfo {
    pub fn in_memory(name: impl Into<String>, size: u64) -> Self {
        Self {
            name: name.into(),
            extension: String::new(),
            size,
            created_at: None,
            modified_at: None,
        }
    }
}

/// Cell alignment for a table column, carried through to the markdown
/// separator row the refiner emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnAlignment {
    Left,
    Right,
    Center,
    Justify,
    None,
}

/// A table extracted by a reader, not yet converted to markdown.
///
/// Invariant: when `has_header`, row 0 of `cells` is the header row.
/// A `confidence` below 0.7 means `needs_llm_assist` must be set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableData {
    pub cells: Vec<Vec<String>>,
    pub has_header: bool,
    pub column_alignments: Vec<ColumnAlignment>,
    pub confidence: f32,
    pub needs_llm_assist: bool,
}

impl TableData {
    pub fn new(cells: Vec<Vec<String>>, has_header: bool, confidence: f32) -> Self {
        let cols = cells.first().map(|r| r.len()).unwrap_or(0);
        Self {
            column_alignments: vec![ColumnAlignment::None; cols],
            needs_llm_assist: confidence < 0.7,
            cells,
            has_header,
            confidence,
        }
    }
}

/// Structural hints a reader may report about the source, keyed by name
/// (spec.md §3: `HasHeadings`, `HasTables`, `HasLists`, `HasImages`,
/// `TableCount`, `PageCount`).
pub type Hints = HashMap<String, serde_json::Value>;

pub mod hint_keys {
    pub const HAS_HEADINGS: &str = "HasHeadings";
    pub const HAS_TABLES: &str = "HasTables";
    pub const HAS_LISTS: &str = "HasLists";
    pub const HAS_IMAGES: &str = "HasImages";
    pub const TABLE_COUNT: &str = "TableCount";
    pub const PAGE_COUNT: &str = "PageCount";
    /// Per-page character offsets into `RawContent.text`, emitted by readers
    /// that know page boundaries (used by the `PageLevel` strategy).
    pub const PAGE_OFFSETS: &str = "PageOffsets";
}

/// The immutable output of the Extract stage: opaque bytes turned into text
/// plus whatever structural hints and embedded tables the reader found.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawContent {
    pub id: Uuid,
    pub file: FileInfo,
    pub text: String,
    pub hints: Hints,
    pub tables: Vec<TableData>,
    pub has_tables: bool,
    pub has_images: bool,
}

impl RawContent {
    pub fn new(file: FileInfo, text: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            file,
            text,
            hints: Hints::new(),
            tables: Vec::new(),
            has_tables: false,
            has_images: false,
        }
    }

    pub fn with_hint(mut self, key: &str, value: serde_json::Value) -> Self {
        self.hints.insert(key.to_string(), value);
        self
    }

    pub fn with_tables(mut self, tables: Vec<TableData>) -> Self {
        self.has_tables = !tables.is_empty();
        self.tables = tables;
        self
    }

    pub fn page_count(&self) -> Option<u32> {
        self.hints
            .get(hint_keys::PAGE_COUNT)
            .and_then(|v| v.as_u64())
            .map(|v| v as u32)
    }

    /// Per-page `(start_char, end_char)` offsets, when a reader reported them.
    pub fn page_offsets(&self) -> Option<Vec<(usize, usize)>> {
        self.hints.get(hint_keys::PAGE_OFFSETS).and_then(|v| {
            v.as_array().map(|arr| {
                arr.iter()
                    .filter_map(|pair| {
                        let p = pair.as_array()?;
                        let start = p.first()?.as_u64()? as usize;
                        let end = p.get(1)?.as_u64()? as usize;
                        Some((start, end))
                    })
                    .collect()
            })
        })
    }
}

//! Chunk value types (§3): the output of the Chunk stage (C5/C6) before and
//! after enrichment.

use crate::config::Strategy;
use crate::refine::DocumentMetadata;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Character (and, where known, page/section) location of a chunk within
/// its refined document.
///
/// Invariant: `0 <= start_char <= end_char <= len(refined.text)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceLocation {
    pub start_char: usize,
    pub end_char: usize,
    pub start_page: Option<u32>,
    pub end_page: Option<u32>,
    pub section: Option<String>,
    pub heading_path: Vec<String>,
}

impl SourceLocation {
    pub fn new(start_char: usize, end_char: usize, heading_path: Vec<String>) -> Self {
        Self {
            start_char,
            end_char,
            start_page: None,
            end_page: None,
            section: None,
            heading_path,
        }
    }
}

/// Provenance details about the source a chunk was drawn from, carried
/// through from `RawContent.file` and the page offsets a reader supplied.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceMetadataInfo {
    pub file_name: String,
    pub file_extension: String,
    pub strategy: Strategy,
}

/// Whether a chunk's content can be understood in isolation, or needs its
/// neighbors to make sense (set when a chunk starts or ends mid-sentence).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContextDependency {
    None,
    RequiresPrevious,
    RequiresNext,
    RequiresBoth,
}

/// A finished chunk ready for enrichment, as produced by the chunk builder
/// (C6) from a strategy's raw candidates.
///
/// Invariant: `index` is 0-based and contiguous within a document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentChunk {
    pub id: Uuid,
    pub raw_id: Uuid,
    pub parsed_id: Uuid,
    pub content: String,
    pub index: usize,
    pub location: SourceLocation,
    pub metadata: DocumentMetadata,
    pub quality: f32,
    pub importance: f32,
    pub density: f32,
    pub strategy: Strategy,
    pub tokens: usize,
    pub created_at: DateTime<Utc>,
    pub props: HashMap<String, serde_json::Value>,
    pub context_dependency: ContextDependency,
    pub source_info: SourceMetadataInfo,
}

/// Node kind within a hierarchical chunk set (C5 Hierarchical strategy).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HierarchicalNodeType {
    Root,
    Branch,
    Leaf,
}

/// A `DocumentChunk` augmented with parent/child links for multi-granularity
/// retrieval.
///
/// Invariants: `parent_id` is `Some` iff `level > 0`; `child_ids` is
/// consistent with reverse `parent_id` lookup; `level` is 0 at roots and
/// increases by exactly 1 on any parent -> child edge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HierarchicalDocumentChunk {
    pub chunk: DocumentChunk,
    pub parent_id: Option<Uuid>,
    pub child_ids: Vec<Uuid>,
    pub level: u32,
    pub node_type: HierarchicalNodeType,
    pub group_id: Option<Uuid>,
}

/// Derive `HierarchicalDocumentChunk`s from a flat chunk list produced by
/// the `Hierarchical` strategy, using each chunk's `heading_path` to infer
/// parent/child relationships (§3): a chunk at path `p` is the child of the
/// most recently seen chunk whose path is exactly `p` minus its last
/// element. `level` is the chunk's depth in the resulting parent/child tree
/// (0 at roots, parent's level + 1 otherwise), not the heading path length,
/// since a root can carry a non-empty path (e.g. a document whose only
/// heading is itself) while still having no parent.
pub fn build_hierarchy(chunks: &[DocumentChunk]) -> Vec<HierarchicalDocumentChunk> {
    let mut latest_by_path: HashMap<Vec<String>, Uuid> = HashMap::new();
    let mut parent_of: HashMap<Uuid, Uuid> = HashMap::new();

    for chunk in chunks {
        let path = &chunk.location.heading_path;
        if !path.is_empty() {
            let parent_path = path[..path.len() - 1].to_vec();
            if let Some(&parent_id) = latest_by_path.get(&parent_path) {
                parent_of.insert(chunk.id, parent_id);
            }
        }
        latest_by_path.insert(path.clone(), chunk.id);
    }

    let mut child_ids: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
    for chunk in chunks {
        if let Some(&parent_id) = parent_of.get(&chunk.id) {
            child_ids.entry(parent_id).or_default().push(chunk.id);
        }
    }

    let mut levels: HashMap<Uuid, u32> = HashMap::new();
    for chunk in chunks {
        if levels.contains_key(&chunk.id) {
            continue;
        }
        let mut stack = vec![chunk.id];
        let mut ancestor = chunk.id;
        while let Some(&parent_id) = parent_of.get(&ancestor) {
            if levels.contains_key(&parent_id) || stack.contains(&parent_id) {
                break;
            }
            stack.push(parent_id);
            ancestor = parent_id;
        }
        while let Some(id) = stack.pop() {
            let level = match parent_of.get(&id) {
                Some(parent_id) => levels.get(parent_id).copied().unwrap_or(0) + 1,
                None => 0,
            };
            levels.insert(id, level);
        }
    }

    chunks
        .iter()
        .map(|chunk| {
            let parent_id = parent_of.get(&chunk.id).copied();
            let children = child_ids.get(&chunk.id).cloned().unwrap_or_default();
            let node_type = match (parent_id.is_some(), children.is_empty()) {
                (false, _) => HierarchicalNodeType::Root,
                (true, true) => HierarchicalNodeType::Leaf,
                (true, false) => HierarchicalNodeType::Branch,
            };
            HierarchicalDocumentChunk {
                chunk: chunk.clone(),
                parent_id,
                child_ids: children,
                level: levels.get(&chunk.id).copied().unwrap_or(0),
                node_type,
                group_id: None,
            }
        })
        .collect()
}

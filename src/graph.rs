//! Graph builder (C8, §4.5): assembles the document-level graph of
//! sequential and hierarchical relationships between chunks, used for
//! multi-granularity retrieval and context expansion.

use crate::cancel::Ctx;
use crate::chunk_model::DocumentChunk;
use crate::config::EnrichOptions;
use crate::error::Result;
use crate::services::{cosine_similarity, Embedding, EmbeddingPurpose};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Directed-edge kind between two chunk nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeType {
    Sequential,
    ParentChild,
    SiblingContext,
    SemanticLink,
}

/// A chunk's position within the document's reading order and hierarchy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodePosition {
    pub sequence: usize,
    pub previous_id: Option<Uuid>,
    pub next_id: Option<Uuid>,
    pub depth: usize,
}

/// One node in the document graph, mirroring a `DocumentChunk` but carrying
/// only what retrieval-time graph traversal needs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkNode {
    pub chunk_id: Uuid,
    pub index: usize,
    pub summary: Option<String>,
    pub keywords: Vec<String>,
    pub section_path: Vec<String>,
    pub position: NodePosition,
}

/// A directed, weighted, labeled edge between two chunk nodes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkEdge {
    pub source_id: Uuid,
    pub target_id: Uuid,
    pub edge_type: EdgeType,
    pub weight: f32,
    pub label: String,
}

/// The document-level graph produced by the Graph stage: nodes for every
/// chunk plus `Sequential`/`ParentChild`/`SiblingContext`/(optional)
/// `SemanticLink` edges between them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentGraph {
    pub document_id: Uuid,
    pub nodes: Vec<ChunkNode>,
    pub edges: Vec<ChunkEdge>,
}

fn extract_keywords(chunk: &DocumentChunk) -> Vec<String> {
    chunk
        .props
        .get("technical_keywords")
        .and_then(|v| v.as_array())
        .map(|arr| arr.iter().filter_map(|v| v.as_str().map(|s| s.to_string())).collect())
        .unwrap_or_default()
}

fn build_nodes(chunks: &[DocumentChunk]) -> Vec<ChunkNode> {
    chunks
        .iter()
        .enumerate()
        .map(|(i, chunk)| ChunkNode {
            chunk_id: chunk.id,
            index: chunk.index,
            summary: None,
            keywords: extract_keywords(chunk),
            section_path: chunk.location.heading_path.clone(),
            position: NodePosition {
                sequence: i,
                previous_id: chunks.get(i.wrapping_sub(1)).filter(|_| i > 0).map(|c| c.id),
                next_id: chunks.get(i + 1).map(|c| c.id),
                depth: chunk.location.heading_path.len(),
            },
        })
        .collect()
}

/// One `Sequential` edge, weight 1.0, between every pair of consecutive
/// chunks in reading order.
fn sequential_edges(chunks: &[DocumentChunk]) -> Vec<ChunkEdge> {
    chunks
        .windows(2)
        .map(|pair| ChunkEdge {
            source_id: pair[0].id,
            target_id: pair[1].id,
            edge_type: EdgeType::Sequential,
            weight: 1.0,
            label: "next".to_string(),
        })
        .collect()
}

/// `ParentChild` and `SiblingContext` edges derived from heading-path
/// nesting: a chunk whose heading path is `p` is the child of the most
/// recent chunk whose heading path is exactly `p` minus its last element;
/// chunks sharing the same parent path are siblings of each other.
fn hierarchical_edges(chunks: &[DocumentChunk]) -> Vec<ChunkEdge> {
    let mut edges = Vec::new();
    let mut latest_by_path: HashMap<Vec<String>, Uuid> = HashMap::new();
    let mut children_by_parent_path: HashMap<Vec<String>, Vec<Uuid>> = HashMap::new();

    for chunk in chunks {
        let path = &chunk.location.heading_path;
        if !path.is_empty() {
            let parent_path = path[..path.len() - 1].to_vec();
            if let Some(&parent_id) = latest_by_path.get(&parent_path) {
                edges.push(ChunkEdge {
                    source_id: parent_id,
                    target_id: chunk.id,
                    edge_type: EdgeType::ParentChild,
                    weight: 1.0,
                    label: path.last().cloned().unwrap_or_default(),
                });
            }
            children_by_parent_path.entry(parent_path).or_default().push(chunk.id);
        }
        latest_by_path.insert(path.clone(), chunk.id);
    }

    for siblings in children_by_parent_path.values() {
        for pair in siblings.windows(2) {
            edges.push(ChunkEdge {
                source_id: pair[0],
                target_id: pair[1],
                edge_type: EdgeType::SiblingContext,
                weight: 0.5,
                label: "sibling".to_string(),
            });
        }
    }

    edges
}

/// Cosine-similarity-linked edges between chunks whose embeddings exceed
/// `options.semantic_link_threshold`, capped at `options.semantic_link_cap`
/// out-edges per node. Skipped entirely when no embedding service is
/// available or `options.enable_semantic_links` is `false`.
async fn semantic_link_edges(
    chunks: &[DocumentChunk],
    embedding: Option<&dyn Embedding>,
    options: &EnrichOptions,
    ctx: &Ctx,
) -> Vec<ChunkEdge> {
    let Some(embedding) = embedding else {
        return Vec::new();
    };
    if !options.enable_semantic_links || chunks.len() < 2 {
        return Vec::new();
    }

    let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
    let vectors = if embedding.supports_batch() {
        embedding.generate_batch(&texts, EmbeddingPurpose::SemanticLink, ctx).await
    } else {
        let mut out = Vec::with_capacity(texts.len());
        for text in &texts {
            match embedding.generate_one(text, EmbeddingPurpose::SemanticLink, ctx).await {
                Ok(v) => out.push(v),
                Err(err) => return { tracing::warn!(error = %err, "semantic link embedding failed"); Vec::new() },
            }
        }
        Ok(out)
    };
    let Ok(vectors) = vectors else {
        return Vec::new();
    };

    let mut edges = Vec::new();
    for i in 0..chunks.len() {
        if ctx.check().is_err() {
            break;
        }
        let mut candidates: Vec<(usize, f32)> = Vec::new();
        for j in 0..chunks.len() {
            if i == j {
                continue;
            }
            let similarity = cosine_similarity(&vectors[i], &vectors[j]);
            if similarity >= options.semantic_link_threshold {
                candidates.push((j, similarity));
            }
        }
        candidates.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        candidates.truncate(options.semantic_link_cap);
        for (j, similarity) in candidates {
            edges.push(ChunkEdge {
                source_id: chunks[i].id,
                target_id: chunks[j].id,
                edge_type: EdgeType::SemanticLink,
                weight: similarity,
                label: "semantic".to_string(),
            });
        }
    }
    edges
}

/// Run the Graph stage (C8): one node per chunk plus `Sequential`,
/// `ParentChild`, `SiblingContext`, and (optional) `SemanticLink` edges.
/// A document with no headings still produces a valid graph where every
/// edge is `Sequential` (§8 boundary behavior).
pub async fn build(
    document_id: Uuid,
    chunks: &[DocumentChunk],
    embedding: Option<&dyn Embedding>,
    options: &EnrichOptions,
    ctx: &Ctx,
) -> Result<DocumentGraph> {
    ctx.check()?;

    let nodes = build_nodes(chunks);
    let mut edges = sequential_edges(chunks);
    edges.extend(hierarchical_edges(chunks));
    edges.extend(semantic_link_edges(chunks, embedding, options, ctx).await);

    Ok(DocumentGraph { document_id, nodes, edges })
}

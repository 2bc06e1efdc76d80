//! Evidence fusion: edge merging, temporal filtering, PageRank scoring,
//! reciprocal rank fusion and context rendering.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::hash::Hash;

use serde::Serialize;
use tracing::debug;

use crate::error::AppError;
use crate::models::{ChunkHit, EdgeHit, ScoredEdge, TimestampRange};
use crate::store::{PageRankParams, PageRanker, Subgraph, SubgraphEdge};

/// Rendered when fusion produced nothing.
pub const NO_CONTEXT: &str = "No matching context found.";

/// Unions two edge lists by edge id. The first occurrence wins, so pass the
/// relation-vector hits first to keep their similarity.
pub fn merge_edges(first: Vec<EdgeHit>, second: Vec<EdgeHit>) -> Vec<EdgeHit> {
    let mut seen = HashSet::new();
    first
        .into_iter()
        .chain(second)
        .filter(|edge| seen.insert(edge.edge_id.clone()))
        .collect()
}

/// Keeps edges whose interval overlaps `window`.
pub fn filter_by_window(edges: Vec<EdgeHit>, window: &TimestampRange) -> Vec<EdgeHit> {
    edges
        .into_iter()
        .filter(|edge| edge.range().overlaps(window))
        .collect()
}

/// The subgraph made of exactly `edges` and their endpoints, seeded on every
/// endpoint.
pub fn induced_subgraph(edges: &[EdgeHit]) -> Subgraph {
    let mut nodes: Vec<String> = Vec::new();
    let mut seen = HashSet::new();
    for edge in edges {
        for id in [&edge.source_entity_id, &edge.target_entity_id] {
            if seen.insert(id.as_str()) {
                nodes.push(id.clone());
            }
        }
    }

    Subgraph {
        seeds: nodes.clone(),
        nodes,
        edges: edges
            .iter()
            .map(|edge| SubgraphEdge {
                edge_id: edge.edge_id.clone(),
                source: edge.source_entity_id.clone(),
                target: edge.target_entity_id.clone(),
            })
            .collect(),
    }
}

/// Scores each edge by the summed PageRank of its endpoints over the induced
/// subgraph, drops zero scores, sorts best first and keeps `max_edges`.
///
/// The ranker is not called when there are no edges.
pub async fn score_edges<P: PageRanker + ?Sized>(
    ranker: &P,
    edges: Vec<EdgeHit>,
    params: &PageRankParams,
    max_edges: usize,
) -> Result<Vec<ScoredEdge>, AppError> {
    let subgraph = induced_subgraph(&edges);
    if subgraph.is_empty() {
        return Ok(Vec::new());
    }

    let ranks = ranker.page_rank(&subgraph, params).await?;
    let rank = |id: &str| ranks.get(id).copied().unwrap_or(0.0);

    let mut scored: Vec<ScoredEdge> = edges
        .into_iter()
        .map(|hit| ScoredEdge {
            edge_score: rank(&hit.source_entity_id) + rank(&hit.target_entity_id),
            hit,
        })
        .filter(|edge| edge.edge_score > 0.0)
        .collect();

    scored.sort_by(|a, b| {
        b.edge_score
            .partial_cmp(&a.edge_score)
            .unwrap_or(Ordering::Equal)
    });
    scored.truncate(max_edges);

    debug!(
        nodes = subgraph.nodes.len(),
        scored = scored.len(),
        "Scored edges"
    );
    Ok(scored)
}

/// Chunk hits by similarity, best first, capped at `max_chunks`.
pub fn rank_chunks(mut hits: Vec<ChunkHit>, max_chunks: usize) -> Vec<ChunkHit> {
    hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
    hits.truncate(max_chunks);
    hits
}

/// Reciprocal rank fusion over ranked key lists.
///
/// Each key scores `sum(1 / (k + rank))` with 1-based ranks over the lists
/// containing it. Ties keep first-appearance order.
pub fn reciprocal_rank_fusion<K: Eq + Hash + Clone>(lists: &[Vec<K>], k: usize) -> Vec<(K, f64)> {
    let mut order: Vec<K> = Vec::new();
    let mut scores: HashMap<K, f64> = HashMap::new();

    for list in lists {
        for (index, key) in list.iter().enumerate() {
            let contribution = 1.0 / (k + index + 1) as f64;
            match scores.get_mut(key) {
                Some(score) => *score += contribution,
                None => {
                    scores.insert(key.clone(), contribution);
                    order.push(key.clone());
                }
            }
        }
    }

    let mut fused: Vec<(K, f64)> = order
        .into_iter()
        .map(|key| {
            let score = scores.get(&key).copied().unwrap_or(0.0);
            (key, score)
        })
        .collect();
    fused.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
    fused
}

/// Identity of a fused item; edges and chunks never collide.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum ItemKey {
    Edge(String),
    Chunk(String),
}

/// A piece of evidence after fusion.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FusedItem {
    Edge(ScoredEdge),
    Chunk(ChunkHit),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Fused {
    pub score: f64,
    #[serde(flatten)]
    pub item: FusedItem,
}

/// Fuses ranked edges and ranked chunks into one evidence list.
pub fn fuse(edges: &[ScoredEdge], chunks: &[ChunkHit], k: usize) -> Vec<Fused> {
    let edge_keys: Vec<ItemKey> = edges
        .iter()
        .map(|e| ItemKey::Edge(e.hit.edge_id.clone()))
        .collect();
    let chunk_keys: Vec<ItemKey> = chunks
        .iter()
        .map(|c| ItemKey::Chunk(c.chunk_id.clone()))
        .collect();

    let mut items: HashMap<ItemKey, FusedItem> = edges
        .iter()
        .map(|e| (ItemKey::Edge(e.hit.edge_id.clone()), FusedItem::Edge(e.clone())))
        .chain(
            chunks
                .iter()
                .map(|c| (ItemKey::Chunk(c.chunk_id.clone()), FusedItem::Chunk(c.clone()))),
        )
        .collect();

    reciprocal_rank_fusion(&[edge_keys, chunk_keys], k)
        .into_iter()
        .filter_map(|(key, score)| Some(Fused {
            score,
            item: items.remove(&key)?,
        }))
        .collect()
}

/// Renders fused evidence as prompt context, one block per item.
pub fn render_context(items: &[Fused]) -> String {
    let lines: Vec<String> = items
        .iter()
        .filter_map(|fused| match &fused.item {
            FusedItem::Chunk(chunk) => {
                let text = chunk.text.trim();
                (!text.is_empty()).then(|| format!("[chunk:{}] {}", chunk.chunk_id, text))
            }
            FusedItem::Edge(edge) => Some(format!(
                "[edge:{}] {}\nsource: {}",
                edge.hit.edge_id,
                edge.hit.relation_text.trim(),
                edge.hit.chunk_id.as_deref().unwrap_or("unknown")
            )),
        })
        .collect();

    if lines.is_empty() {
        NO_CONTEXT.to_string()
    } else {
        lines.join("\n")
    }
}

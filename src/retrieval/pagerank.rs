//! Personalized PageRank by power iteration over a small induced subgraph.

use std::collections::HashMap;

use crate::store::{PageRankParams, Subgraph};

/// Iteration stops early once the L1 change drops below this.
const TOLERANCE: f64 = 1e-7;

/// Computes personalized PageRank on `subgraph`, restarting uniformly on its
/// seeds. Edges are directed; a node without outgoing edges leaks its mass.
///
/// Returns an empty map for an empty subgraph or when no seed is a node.
pub fn personalized_page_rank(subgraph: &Subgraph, params: &PageRankParams) -> HashMap<String, f64> {
    if subgraph.is_empty() {
        return HashMap::new();
    }

    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut ids: Vec<&str> = Vec::new();
    for node in &subgraph.nodes {
        index.entry(node.as_str()).or_insert_with(|| {
            ids.push(node.as_str());
            ids.len() - 1
        });
    }

    let edges: Vec<(usize, usize)> = subgraph
        .edges
        .iter()
        .filter_map(|e| Some((*index.get(e.source.as_str())?, *index.get(e.target.as_str())?)))
        .collect();

    let mut seeds: Vec<usize> = subgraph
        .seeds
        .iter()
        .filter_map(|s| index.get(s.as_str()).copied())
        .collect();
    seeds.sort_unstable();
    seeds.dedup();
    if seeds.is_empty() {
        return HashMap::new();
    }

    let n = ids.len();
    let mut out_degree = vec![0usize; n];
    for &(source, _) in &edges {
        out_degree[source] += 1;
    }

    let mut restart = vec![0.0; n];
    let share = 1.0 / seeds.len() as f64;
    for &seed in &seeds {
        restart[seed] = share;
    }

    let damping = params.damping;
    let mut rank = restart.clone();
    for _ in 0..params.max_iterations {
        let mut next: Vec<f64> = restart.iter().map(|r| (1.0 - damping) * r).collect();
        for &(source, target) in &edges {
            next[target] += damping * rank[source] / out_degree[source] as f64;
        }
        let delta: f64 = next.iter().zip(&rank).map(|(a, b)| (a - b).abs()).sum();
        rank = next;
        if delta < TOLERANCE {
            break;
        }
    }

    ids.into_iter()
        .map(str::to_string)
        .zip(rank)
        .collect()
}

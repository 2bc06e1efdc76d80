//! Query-time evidence ranking.

mod fusion;
mod pagerank;

pub use fusion::{
    filter_by_window, fuse, induced_subgraph, merge_edges, rank_chunks, reciprocal_rank_fusion,
    render_context, score_edges, Fused, FusedItem, NO_CONTEXT,
};
pub use pagerank::personalized_page_rank;

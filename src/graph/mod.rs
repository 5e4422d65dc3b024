//! Memory-mapped bidirectional CSR graph cache.
//!
//! A cache directory holds five files: the forward and reverse offset arrays
//! (`i64`), the forward and reverse index arrays (`i32`) and the node list.
//! [`build_graph_cache`] writes them once; [`GraphCache`] maps them read-only
//! and answers neighbor queries in time proportional to the result size.

pub mod builder;
pub mod cache;
pub mod csr;
pub mod node_map;
pub mod paths;

pub use builder::{
    BuildOptions, PROGRESS_INTERVAL, build_graph_cache, build_graph_cache_at,
    try_build_graph_cache, try_build_graph_cache_at,
};
pub use cache::{GraphCache, SingleGraphCache};
pub use node_map::{MAX_NODES, NodeId, NodeIdMap};
pub use paths::GraphCachePaths;

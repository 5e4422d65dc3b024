//! Reproducible data directories with a memory-mapped graph cache.
//!
//! graphstow resolves a directory per logical module key (configurable via
//! environment variables, see [`config`]) and can ensure a cached graph index
//! is present in it. The graph index is a pair of CSR structures, forward and
//! reverse, persisted as flat native-endian arrays and memory-mapped on open,
//! so neighbor lookups never load the whole edge list.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use graphstow::{BuildOptions, Module};
//!
//! let module = Module::from_key("mytool", &[], true)?;
//! let edges = vec![("a", "b"), ("a", "c"), ("b", "d")];
//! let graph = module.ensure_graph(
//!     &["graph"],
//!     || edges.iter().map(|&(u, v)| (u.to_string(), v.to_string())),
//!     &BuildOptions::default(),
//!     false,
//! )?;
//! assert_eq!(graph.out_edges(&"a".to_string())?, vec!["b", "c"]);
//! # Ok::<(), graphstow::StowError>(())
//! ```
//!
//! Run Criterion benchmarks with `cargo bench` to inspect reports under `target/criterion`.

pub mod bench_utils;
pub mod cache;
pub mod cli;
pub mod config;
pub mod errors;
pub mod graph;
pub mod module;

pub use crate::cache::{Cached, CachedCollection, CachedJson};
pub use crate::config::{StowConfig, get_base, get_home};
pub use crate::errors::{StowError, StowResult};
pub use crate::graph::{
    BuildOptions, GraphCache, GraphCachePaths, NodeId, SingleGraphCache, build_graph_cache,
    try_build_graph_cache,
};
pub use crate::module::Module;

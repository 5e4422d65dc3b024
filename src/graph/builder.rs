//! Write side of the graph cache: the three-pass CSR build.
//!
//! 1. index nodes: assign dense ids, count edges
//! 2. count degrees into offset histograms, prefix-sum them
//! 3. scatter each edge into its slot of the forward and reverse indices
//!
//! Everything is written into a staging directory inside the target and
//! renamed into place once all five files are complete. A failed rename
//! restores whatever cache was there before.

use std::fmt::Debug;
use std::fs;
use std::hash::Hash;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::errors::{StowError, StowResult};
use crate::graph::cache::GraphCache;
use crate::graph::csr::{IndexWriter, OffsetsBuilder, write_offsets};
use crate::graph::node_map::{NodeIdMap, write_nodes};
use crate::graph::paths::GraphCachePaths;

/// Number of edges between two progress events.
pub const PROGRESS_INTERVAL: usize = 1_000_000;

const STAGING_PREFIX: &str = ".graphstow-build-";
const STAGED_DIR: &str = "next";
const PREVIOUS_DIR: &str = "previous";

/// Options for [`build_graph_cache`].
#[derive(Clone, Debug, Default)]
pub struct BuildOptions {
    /// Assign ids in sorted node order instead of first-encounter order
    pub sort_nodes: bool,
    /// Expected edge count, reported alongside progress on the first pass
    pub estimated_edges: Option<usize>,
    /// Emit `debug` progress events every [`PROGRESS_INTERVAL`] edges
    pub progress: bool,
}

impl BuildOptions {
    pub fn sorted() -> Self {
        Self {
            sort_nodes: true,
            ..Self::default()
        }
    }

    pub fn with_progress(mut self, estimated_edges: Option<usize>) -> Self {
        self.progress = true;
        self.estimated_edges = estimated_edges;
        self
    }
}

/// Build a graph cache in `directory` from a re-iterable edge source.
///
/// `edges` is called once per pass, three times in total, and must yield the
/// same edges each time. Wrap an in-memory collection as `|| edges.iter().cloned()`.
/// Sources that read from disk should use [`try_build_graph_cache`].
///
/// ```rust,no_run
/// use graphstow::graph::{BuildOptions, build_graph_cache};
///
/// let edges = vec![("a", "b"), ("a", "c"), ("b", "c")];
/// let graph = build_graph_cache(
///     || edges.iter().map(|&(u, v)| (u.to_string(), v.to_string())),
///     "/data/mygraph",
///     &BuildOptions::sorted(),
/// )?;
/// assert_eq!(graph.edge_count(), 3);
/// # Ok::<(), graphstow::StowError>(())
/// ```
pub fn build_graph_cache<X, F, I, P>(
    edges: F,
    directory: P,
    options: &BuildOptions,
) -> StowResult<GraphCache<X>>
where
    X: Eq + Hash + Clone + Ord + Debug + Serialize,
    F: FnMut() -> I,
    I: IntoIterator<Item = (X, X)>,
    P: AsRef<Path>,
{
    let paths = GraphCachePaths::from_directory(directory)?;
    build_graph_cache_at(edges, &paths, options)
}

/// Same as [`build_graph_cache`] for an already described cache location.
pub fn build_graph_cache_at<X, F, I>(
    mut edges: F,
    paths: &GraphCachePaths,
    options: &BuildOptions,
) -> StowResult<GraphCache<X>>
where
    X: Eq + Hash + Clone + Ord + Debug + Serialize,
    F: FnMut() -> I,
    I: IntoIterator<Item = (X, X)>,
{
    try_build_graph_cache_at(
        || Ok::<_, StowError>(edges().into_iter().map(Ok::<_, StowError>)),
        paths,
        options,
    )
}

/// Build from a fallible edge source, such as a reader over an edge file.
///
/// Opening the source and every yielded edge may fail; the first error aborts
/// the build and nothing is published.
pub fn try_build_graph_cache<X, F, I, P>(
    edges: F,
    directory: P,
    options: &BuildOptions,
) -> StowResult<GraphCache<X>>
where
    X: Eq + Hash + Clone + Ord + Debug + Serialize,
    F: FnMut() -> StowResult<I>,
    I: IntoIterator<Item = StowResult<(X, X)>>,
    P: AsRef<Path>,
{
    let paths = GraphCachePaths::from_directory(directory)?;
    try_build_graph_cache_at(edges, &paths, options)
}

pub fn try_build_graph_cache_at<X, F, I>(
    mut edges: F,
    paths: &GraphCachePaths,
    options: &BuildOptions,
) -> StowResult<GraphCache<X>>
where
    X: Eq + Hash + Clone + Ord + Debug + Serialize,
    F: FnMut() -> StowResult<I>,
    I: IntoIterator<Item = StowResult<(X, X)>>,
{
    if !paths.directory.is_dir() {
        return Err(StowError::not_a_directory(&paths.directory));
    }
    info!(directory = %paths.directory.display(), "building graph cache");

    let staging = tempfile::Builder::new()
        .prefix(STAGING_PREFIX)
        .tempdir_in(&paths.directory)?;
    let staged = GraphCachePaths::in_directory(staging.path().join(STAGED_DIR));
    fs::create_dir(&staged.directory)?;

    // Pass 1: nodes.
    let mut progress = Progress::new("indexing nodes", options, options.estimated_edges);
    let mut nodes = NodeIdMap::new();
    let mut edge_count = 0usize;
    for edge in edges()? {
        let (u, v) = edge?;
        nodes.insert(u)?;
        nodes.insert(v)?;
        edge_count += 1;
        progress.tick();
    }
    if options.sort_nodes {
        nodes = nodes.sorted();
    }
    write_nodes(&staged.nodes, nodes.nodes())?;
    debug!(nodes = nodes.len(), edges = edge_count, "indexed nodes");

    // Pass 2: degree histograms.
    let mut progress = Progress::new("constructing pointers", options, Some(edge_count));
    let mut forward_offsets = OffsetsBuilder::new(nodes.len());
    let mut reverse_offsets = OffsetsBuilder::new(nodes.len());
    let mut seen = 0usize;
    for edge in edges()? {
        let (u, v) = edge?;
        forward_offsets.increment(lookup(&nodes, &u)?);
        reverse_offsets.increment(lookup(&nodes, &v)?);
        seen += 1;
        progress.tick();
    }
    if seen != edge_count {
        return Err(changed_stream(edge_count, seen));
    }
    let forward_offsets = forward_offsets.finish();
    let reverse_offsets = reverse_offsets.finish();
    write_offsets(&staged.forward_indptr, &forward_offsets)?;
    write_offsets(&staged.reverse_indptr, &reverse_offsets)?;

    // Pass 3: scatter.
    let mut progress = Progress::new("filling edges", options, Some(edge_count));
    let mut forward = IndexWriter::create(&staged.forward_indices, &forward_offsets)?;
    let mut reverse = IndexWriter::create(&staged.reverse_indices, &reverse_offsets)?;
    for edge in edges()? {
        let (u, v) = edge?;
        let u = lookup(&nodes, &u)?;
        let v = lookup(&nodes, &v)?;
        forward.place(u, v)?;
        reverse.place(v, u)?;
        progress.tick();
    }
    forward.finish()?;
    reverse.finish()?;

    publish(&staged, paths, &staging.path().join(PREVIOUS_DIR))?;
    staging.close()?;

    info!(
        directory = %paths.directory.display(),
        nodes = nodes.len(),
        edges = edge_count,
        "graph cache built"
    );
    GraphCache::from_parts(paths.clone(), nodes)
}

/// Move the staged artifacts over `target`.
///
/// Existing artifacts are first moved into `backup`. If any rename fails the
/// new files are removed and the previous generation is moved back, so an
/// error never leaves two generations mixed in `target`.
fn publish(staged: &GraphCachePaths, target: &GraphCachePaths, backup: &Path) -> StowResult<()> {
    fs::create_dir(backup)?;
    let mut saved = Vec::new();
    let mut placed = Vec::new();
    if let Err(err) = swap_in(staged, target, backup, &mut saved, &mut placed) {
        warn!(
            directory = %target.directory.display(),
            error = %err,
            "publish failed, restoring previous graph cache"
        );
        for path in &placed {
            let _ = fs::remove_file(path);
        }
        for (kept, original) in &saved {
            let _ = fs::rename(kept, original);
        }
        return Err(err);
    }
    Ok(())
}

fn swap_in(
    staged: &GraphCachePaths,
    target: &GraphCachePaths,
    backup: &Path,
    saved: &mut Vec<(PathBuf, PathBuf)>,
    placed: &mut Vec<PathBuf>,
) -> StowResult<()> {
    for path in target.files() {
        let (true, Some(name)) = (path.is_file(), path.file_name()) else {
            continue;
        };
        let kept = backup.join(name);
        fs::rename(path, &kept)?;
        saved.push((kept, path.to_path_buf()));
    }
    for (from, to) in staged.files().into_iter().zip(target.files()) {
        fs::rename(from, to)?;
        placed.push(to.to_path_buf());
    }
    Ok(())
}

fn lookup<X: Eq + Hash + Clone + Debug>(nodes: &NodeIdMap<X>, node: &X) -> StowResult<u32> {
    nodes.id(node).ok_or_else(|| {
        StowError::invalid_input(format!(
            "node {node:?} was not seen on the first pass; the edge stream changed between passes"
        ))
    })
}

fn changed_stream(expected: usize, found: usize) -> StowError {
    StowError::invalid_input(format!(
        "edge stream yielded {found} edges after {expected} on the first pass"
    ))
}

struct Progress {
    pass: &'static str,
    enabled: bool,
    total: Option<usize>,
    seen: usize,
}

impl Progress {
    fn new(pass: &'static str, options: &BuildOptions, total: Option<usize>) -> Self {
        Self {
            pass,
            enabled: options.progress,
            total,
            seen: 0,
        }
    }

    fn tick(&mut self) {
        self.seen += 1;
        if self.enabled && self.seen % PROGRESS_INTERVAL == 0 {
            debug!(
                pass = self.pass,
                edges = self.seen,
                total = ?self.total,
                "graph cache build progress"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;

    #[test]
    fn test_staging_directory_is_removed() {
        let dir = tempfile::tempdir().unwrap();
        let edges = [(1u32, 2u32), (2, 3)];
        build_graph_cache(|| edges, dir.path(), &BuildOptions::default()).unwrap();
        let leftovers: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_name().to_string_lossy().starts_with(STAGING_PREFIX))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn test_changed_stream_fails_without_publishing() {
        let dir = tempfile::tempdir().unwrap();
        let calls = Cell::new(0);
        let result = build_graph_cache(
            || {
                calls.set(calls.get() + 1);
                if calls.get() == 1 {
                    vec![(1u32, 2u32), (2, 3)]
                } else {
                    vec![(1u32, 2u32)]
                }
            },
            dir.path(),
            &BuildOptions::default(),
        );
        assert!(matches!(result, Err(StowError::InvalidInput(_))));
        assert!(!GraphCachePaths::from_directory(dir.path()).unwrap().exists());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_unknown_node_on_later_pass_fails() {
        let dir = tempfile::tempdir().unwrap();
        let calls = Cell::new(0);
        let result = build_graph_cache(
            || {
                calls.set(calls.get() + 1);
                if calls.get() == 1 {
                    vec![(1u32, 2u32)]
                } else {
                    vec![(1u32, 9u32)]
                }
            },
            dir.path(),
            &BuildOptions::default(),
        );
        assert!(matches!(result, Err(StowError::InvalidInput(_))));
    }

    #[test]
    fn test_source_error_on_later_pass_keeps_previous_cache() {
        let dir = tempfile::tempdir().unwrap();
        build_graph_cache(|| [(1u32, 2u32)], dir.path(), &BuildOptions::default()).unwrap();

        let calls = Cell::new(0);
        let result = try_build_graph_cache(
            || {
                calls.set(calls.get() + 1);
                let fail = calls.get() == 3;
                Ok(vec![(1u32, 3u32), (3, 4)]
                    .into_iter()
                    .enumerate()
                    .map(move |(i, edge)| {
                        if fail && i == 1 {
                            Err(StowError::Io(std::io::Error::other("read failed")))
                        } else {
                            Ok(edge)
                        }
                    }))
            },
            dir.path(),
            &BuildOptions::default(),
        );
        assert!(matches!(result, Err(StowError::Io(_))));
        assert_eq!(calls.get(), 3);

        let graph: GraphCache<u32> = GraphCache::from_directory(dir.path()).unwrap();
        assert_eq!(graph.out_edges(&1).unwrap(), vec![2]);
        assert!(!graph.contains(&3));
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 5);
    }

    #[test]
    fn test_source_that_cannot_open_fails() {
        let dir = tempfile::tempdir().unwrap();
        let result: StowResult<GraphCache<u32>> = try_build_graph_cache(
            || Err::<Vec<StowResult<(u32, u32)>>, _>(StowError::invalid_input("no such file")),
            dir.path(),
            &BuildOptions::default(),
        );
        assert!(matches!(result, Err(StowError::InvalidInput(_))));
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_failed_publish_restores_previous_generation() {
        let dir = tempfile::tempdir().unwrap();
        build_graph_cache(|| [(1u32, 2u32), (2, 1)], dir.path(), &BuildOptions::default())
            .unwrap();
        let target = GraphCachePaths::from_directory(dir.path()).unwrap();
        let before: Vec<Vec<u8>> = target.files().iter().map(|p| fs::read(p).unwrap()).collect();

        // Only the first staged artifact exists, so the second rename fails.
        let scratch = tempfile::tempdir().unwrap();
        let staged = GraphCachePaths::in_directory(scratch.path().join("next"));
        fs::create_dir(&staged.directory).unwrap();
        fs::write(&staged.forward_indptr, [0u8; 16]).unwrap();

        let result = publish(&staged, &target, &scratch.path().join("previous"));
        assert!(matches!(result, Err(StowError::Io(_))));

        let after: Vec<Vec<u8>> = target.files().iter().map(|p| fs::read(p).unwrap()).collect();
        assert_eq!(before, after);
        let graph: GraphCache<u32> = GraphCache::open(target).unwrap();
        assert_eq!(graph.out_edges(&2).unwrap(), vec![1]);
    }
}

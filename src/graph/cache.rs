//! Read side of the graph cache: memory-mapped forward and reverse adjacency.

use std::fmt::Debug;
use std::hash::Hash;
use std::path::Path;

use serde::de::DeserializeOwned;

use crate::errors::{StowError, StowResult};
use crate::graph::csr::MappedArray;
use crate::graph::node_map::{NodeId, NodeIdMap, read_nodes};
use crate::graph::paths::GraphCachePaths;

/// One direction of the adjacency: an offsets array and an indices array.
#[derive(Debug)]
pub struct SingleGraphCache {
    indptr: MappedArray<i64>,
    indices: MappedArray<i32>,
}

impl SingleGraphCache {
    /// Map both arrays and check them against the expected node count.
    pub fn open(indptr_path: &Path, indices_path: &Path, node_count: usize) -> StowResult<Self> {
        let indptr = MappedArray::<i64>::open(indptr_path)?;
        let indices = MappedArray::<i32>::open(indices_path)?;

        if indptr.len() != node_count + 1 {
            return Err(StowError::corrupt(
                indptr_path,
                format!(
                    "expected {} offsets for {node_count} nodes, found {}",
                    node_count + 1,
                    indptr.len()
                ),
            ));
        }
        if indptr.get(0) != Some(0) {
            return Err(StowError::corrupt(indptr_path, "first offset is not zero"));
        }
        let last = indptr.get(node_count).unwrap_or_default();
        if usize::try_from(last).ok() != Some(indices.len()) {
            return Err(StowError::corrupt(
                indices_path,
                format!(
                    "offsets end at {last} but the file holds {} entries",
                    indices.len()
                ),
            ));
        }

        Ok(Self { indptr, indices })
    }

    pub fn node_count(&self) -> usize {
        self.indptr.len().saturating_sub(1)
    }

    pub fn edge_count(&self) -> usize {
        self.indices.len()
    }

    pub fn degree(&self, id: NodeId) -> usize {
        let (start, end) = self.bounds(id);
        end.saturating_sub(start)
    }

    /// Neighbor ids of `id` in scatter order. Unknown ids yield nothing.
    pub fn neighbor_ids(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        let (start, end) = self.bounds(id);
        self.indices.range(start, end).map(|value| value as NodeId)
    }

    fn bounds(&self, id: NodeId) -> (usize, usize) {
        let idx = id as usize;
        let offset = |i: usize| {
            self.indptr
                .get(i)
                .and_then(|value| usize::try_from(value).ok())
                .unwrap_or(0)
        };
        let end = offset(idx + 1);
        (offset(idx).min(end), end)
    }
}

/// Memory-mapped bidirectional graph over nodes of type `X`.
///
/// The node mapping lives in process memory; both adjacency directions stay
/// on disk and are paged in by the OS on demand.
///
/// ```rust,no_run
/// use graphstow::graph::GraphCache;
///
/// let graph: GraphCache<String> = GraphCache::from_directory("/data/mygraph")?;
/// for neighbor in graph.out_edges(&"a".to_string())? {
///     println!("{neighbor}");
/// }
/// # Ok::<(), graphstow::StowError>(())
/// ```
#[derive(Debug)]
pub struct GraphCache<X> {
    paths: GraphCachePaths,
    nodes: NodeIdMap<X>,
    forward: SingleGraphCache,
    reverse: SingleGraphCache,
}

impl<X> GraphCache<X>
where
    X: Eq + Hash + Clone + Debug + DeserializeOwned,
{
    /// Open a cache whose node list was persisted at build time.
    pub fn open(paths: GraphCachePaths) -> StowResult<Self> {
        let nodes = read_nodes(&paths.nodes)?;
        Self::open_with_nodes(paths, nodes)
    }

    pub fn from_directory<P: AsRef<Path>>(directory: P) -> StowResult<Self> {
        Self::open(GraphCachePaths::from_directory(directory)?)
    }
}

impl<X> GraphCache<X>
where
    X: Eq + Hash + Clone + Debug,
{
    /// Open a cache using a caller-supplied node list, position = node id.
    ///
    /// The list must match the one used at build time.
    pub fn open_with_nodes(paths: GraphCachePaths, nodes: Vec<X>) -> StowResult<Self> {
        Self::from_parts(paths, NodeIdMap::from_nodes(nodes)?)
    }

    pub(crate) fn from_parts(paths: GraphCachePaths, nodes: NodeIdMap<X>) -> StowResult<Self> {
        let node_count = nodes.len();
        let forward =
            SingleGraphCache::open(&paths.forward_indptr, &paths.forward_indices, node_count)?;
        let reverse =
            SingleGraphCache::open(&paths.reverse_indptr, &paths.reverse_indices, node_count)?;
        if forward.edge_count() != reverse.edge_count() {
            return Err(StowError::corrupt(
                &paths.reverse_indices,
                format!(
                    "forward index holds {} edges but reverse index holds {}",
                    forward.edge_count(),
                    reverse.edge_count()
                ),
            ));
        }
        Ok(Self {
            paths,
            nodes,
            forward,
            reverse,
        })
    }

    /// Nodes `v` such that `(node, v)` was an edge, in scatter order.
    pub fn out_edges(&self, node: &X) -> StowResult<Vec<X>> {
        self.resolve(&self.forward, self.require(node)?)
    }

    /// Nodes `u` such that `(u, node)` was an edge, in scatter order.
    pub fn in_edges(&self, node: &X) -> StowResult<Vec<X>> {
        self.resolve(&self.reverse, self.require(node)?)
    }

    /// Like [`GraphCache::out_edges`], but an unknown node has no edges.
    pub fn out_edges_or_empty(&self, node: &X) -> StowResult<Vec<X>> {
        match self.nodes.id(node) {
            Some(id) => self.resolve(&self.forward, id),
            None => Ok(Vec::new()),
        }
    }

    pub fn in_edges_or_empty(&self, node: &X) -> StowResult<Vec<X>> {
        match self.nodes.id(node) {
            Some(id) => self.resolve(&self.reverse, id),
            None => Ok(Vec::new()),
        }
    }

    pub fn out_degree(&self, node: &X) -> StowResult<usize> {
        Ok(self.forward.degree(self.require(node)?))
    }

    pub fn in_degree(&self, node: &X) -> StowResult<usize> {
        Ok(self.reverse.degree(self.require(node)?))
    }

    pub fn contains(&self, node: &X) -> bool {
        self.nodes.contains(node)
    }

    pub fn id_of(&self, node: &X) -> Option<NodeId> {
        self.nodes.id(node)
    }

    pub fn node_of(&self, id: NodeId) -> Option<&X> {
        self.nodes.node(id)
    }

    /// All nodes, indexed by id.
    pub fn nodes(&self) -> &[X] {
        self.nodes.nodes()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.forward.edge_count()
    }

    pub fn forward(&self) -> &SingleGraphCache {
        &self.forward
    }

    pub fn reverse(&self) -> &SingleGraphCache {
        &self.reverse
    }

    pub fn paths(&self) -> &GraphCachePaths {
        &self.paths
    }

    fn require(&self, node: &X) -> StowResult<NodeId> {
        self.nodes
            .id(node)
            .ok_or_else(|| StowError::node_not_found(format!("{node:?}")))
    }

    fn resolve(&self, side: &SingleGraphCache, id: NodeId) -> StowResult<Vec<X>> {
        let mut neighbors = Vec::with_capacity(side.degree(id));
        for neighbor in side.neighbor_ids(id) {
            let node = self.nodes.node(neighbor).ok_or_else(|| {
                StowError::corrupt(
                    &self.paths.directory,
                    format!("neighbor id {neighbor} of node id {id} has no node"),
                )
            })?;
            neighbors.push(node.clone());
        }
        Ok(neighbors)
    }
}

//! Dense node identifier assignment and the persisted node list.

use std::fmt::Debug;
use std::fs::File;
use std::hash::Hash;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use ahash::AHashMap;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::errors::{StowError, StowResult};

/// Dense node identifier. Stored on disk as a signed 32-bit integer.
pub type NodeId = u32;

/// Largest number of distinct nodes a cache can hold.
pub const MAX_NODES: usize = i32::MAX as usize;

/// Bijection between node values and ids in `[0, n)`.
#[derive(Clone, Debug)]
pub struct NodeIdMap<X> {
    nodes: Vec<X>,
    ids: AHashMap<X, NodeId>,
}

impl<X: Eq + Hash + Clone> Default for NodeIdMap<X> {
    fn default() -> Self {
        Self::new()
    }
}

impl<X: Eq + Hash + Clone> NodeIdMap<X> {
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            ids: AHashMap::new(),
        }
    }

    /// Build a mapping where position in `nodes` is the id.
    ///
    /// Fails on duplicate nodes since the mapping would not be a bijection.
    pub fn from_nodes(nodes: Vec<X>) -> StowResult<Self>
    where
        X: Debug,
    {
        if nodes.len() > MAX_NODES {
            return Err(too_many_nodes());
        }
        let mut ids = AHashMap::with_capacity(nodes.len());
        for (idx, node) in nodes.iter().enumerate() {
            if ids.insert(node.clone(), idx as NodeId).is_some() {
                return Err(StowError::invalid_input(format!(
                    "duplicate node in node list: {node:?}"
                )));
            }
        }
        Ok(Self { nodes, ids })
    }

    /// Return the id of `node`, assigning the next free one if unseen.
    pub fn insert(&mut self, node: X) -> StowResult<NodeId> {
        if let Some(&id) = self.ids.get(&node) {
            return Ok(id);
        }
        if self.nodes.len() >= MAX_NODES {
            return Err(too_many_nodes());
        }
        let id = self.nodes.len() as NodeId;
        self.nodes.push(node.clone());
        self.ids.insert(node, id);
        Ok(id)
    }

    /// Re-enumerate ids in sorted node order.
    pub fn sorted(mut self) -> Self
    where
        X: Ord,
    {
        self.nodes.sort_unstable();
        for (idx, node) in self.nodes.iter().enumerate() {
            if let Some(id) = self.ids.get_mut(node) {
                *id = idx as NodeId;
            }
        }
        self
    }

    pub fn id(&self, node: &X) -> Option<NodeId> {
        self.ids.get(node).copied()
    }

    pub fn node(&self, id: NodeId) -> Option<&X> {
        self.nodes.get(id as usize)
    }

    pub fn contains(&self, node: &X) -> bool {
        self.ids.contains_key(node)
    }

    pub fn nodes(&self) -> &[X] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

pub(crate) fn write_nodes<X: Serialize>(path: &Path, nodes: &[X]) -> StowResult<()> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    for node in nodes {
        serde_json::to_writer(&mut writer, node)?;
        writer.write_all(b"\n")?;
    }
    let file = writer.into_inner().map_err(|e| e.into_error())?;
    file.sync_all()?;
    Ok(())
}

pub(crate) fn read_nodes<X: DeserializeOwned>(path: &Path) -> StowResult<Vec<X>> {
    let reader = BufReader::new(File::open(path)?);
    let mut nodes = Vec::new();
    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        if line.is_empty() {
            continue;
        }
        let node = serde_json::from_str(&line).map_err(|e| {
            StowError::corrupt(path, format!("line {}: {e}", line_no + 1))
        })?;
        nodes.push(node);
    }
    Ok(nodes)
}

fn too_many_nodes() -> StowError {
    StowError::invalid_input(format!("graph exceeds {MAX_NODES} distinct nodes"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_assigns_dense_ids_in_encounter_order() {
        let mut map = NodeIdMap::new();
        assert_eq!(map.insert("b").unwrap(), 0);
        assert_eq!(map.insert("a").unwrap(), 1);
        assert_eq!(map.insert("b").unwrap(), 0);
        assert_eq!(map.len(), 2);
        assert_eq!(map.node(1), Some(&"a"));
        assert_eq!(map.id(&"c"), None);
    }

    #[test]
    fn test_sorted_reassigns_ids() {
        let mut map = NodeIdMap::new();
        for node in ["c", "a", "b"] {
            map.insert(node).unwrap();
        }
        let map = map.sorted();
        assert_eq!(map.nodes(), &["a", "b", "c"]);
        assert_eq!(map.id(&"a"), Some(0));
        assert_eq!(map.id(&"c"), Some(2));
    }

    #[test]
    fn test_from_nodes_rejects_duplicates() {
        let err = NodeIdMap::from_nodes(vec!["a", "b", "a"]).unwrap_err();
        assert!(matches!(err, StowError::InvalidInput(_)));
    }

    #[test]
    fn test_node_list_roundtrip_with_newlines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nodes.jsonl");
        let nodes = vec!["plain".to_string(), "two\nlines".to_string(), String::new()];
        write_nodes(&path, &nodes).unwrap();
        let read: Vec<String> = read_nodes(&path).unwrap();
        assert_eq!(read, nodes);
    }
}

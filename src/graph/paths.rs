//! File layout of a graph cache directory.

use std::path::{Path, PathBuf};

use crate::config::expand_user;
use crate::errors::{StowError, StowResult};

pub const NODES_FILE: &str = "nodes.jsonl";
pub const FORWARD_INDPTR_FILE: &str = "fwd_indptr.bin";
pub const FORWARD_INDICES_FILE: &str = "fwd_indices.bin";
pub const REVERSE_INDPTR_FILE: &str = "rev_indptr.bin";
pub const REVERSE_INDICES_FILE: &str = "rev_indices.bin";

/// Paths of the five artifacts making up a graph cache.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GraphCachePaths {
    pub directory: PathBuf,
    /// One JSON-encoded node per line, line number = node id
    pub nodes: PathBuf,
    pub forward_indptr: PathBuf,
    pub forward_indices: PathBuf,
    pub reverse_indptr: PathBuf,
    pub reverse_indices: PathBuf,
}

impl GraphCachePaths {
    /// Describe the cache inside `directory`, which must already exist.
    pub fn from_directory<P: AsRef<Path>>(directory: P) -> StowResult<Self> {
        let directory = expand_user(directory.as_ref())?;
        if !directory.is_dir() {
            return Err(StowError::not_a_directory(directory));
        }
        let directory = directory.canonicalize()?;
        Ok(Self::in_directory(directory))
    }

    pub(crate) fn in_directory(directory: PathBuf) -> Self {
        Self {
            nodes: directory.join(NODES_FILE),
            forward_indptr: directory.join(FORWARD_INDPTR_FILE),
            forward_indices: directory.join(FORWARD_INDICES_FILE),
            reverse_indptr: directory.join(REVERSE_INDPTR_FILE),
            reverse_indices: directory.join(REVERSE_INDICES_FILE),
            directory,
        }
    }

    /// True when every artifact is present as a regular file.
    pub fn exists(&self) -> bool {
        self.files().iter().all(|path| path.is_file())
    }

    /// Artifacts in publish order; the node list goes last.
    pub fn files(&self) -> [&Path; 5] {
        [
            &self.forward_indptr,
            &self.forward_indices,
            &self.reverse_indptr,
            &self.reverse_indices,
            &self.nodes,
        ]
    }
}

//! Module handles: a base directory plus helpers for joining subdirectories
//! and ensuring cached artifacts are present.

use std::fmt::Debug;
use std::fs::File;
use std::hash::Hash;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::cache::{CachedJson, write_atomically};
use crate::config::{StowConfig, mkdir, validate_version};
use crate::errors::{StowError, StowResult};
use crate::graph::{BuildOptions, GraphCache, GraphCachePaths, build_graph_cache_at};

/// A directory owned by one logical module key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Module {
    base: PathBuf,
}

impl Module {
    pub fn new<P: Into<PathBuf>>(base: P, ensure_exists: bool) -> StowResult<Self> {
        let base = base.into();
        mkdir(&base, ensure_exists)?;
        Ok(Self { base })
    }

    /// Module for `key` (and optional subkeys) resolved from the environment.
    pub fn from_key(key: &str, subkeys: &[&str], ensure_exists: bool) -> StowResult<Self> {
        Self::from_config(&StowConfig::from_env(), key, subkeys, ensure_exists)
    }

    pub fn from_config(
        config: &StowConfig,
        key: &str,
        subkeys: &[&str],
        ensure_exists: bool,
    ) -> StowResult<Self> {
        let base = config.base(key, false)?;
        Module::new(base, false)?.submodule(subkeys, ensure_exists)
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    pub fn submodule(&self, subkeys: &[&str], ensure_exists: bool) -> StowResult<Self> {
        let base = self.join(subkeys, false)?;
        Module::new(base, ensure_exists)
    }

    /// Subdirectory of this module. With no subkeys, the base itself.
    pub fn join(&self, subkeys: &[&str], ensure_exists: bool) -> StowResult<PathBuf> {
        let mut path = self.base.clone();
        path.extend(subkeys);
        mkdir(&path, ensure_exists)?;
        Ok(path)
    }

    /// File `name` inside the given subdirectory, which is created if asked.
    pub fn join_name(
        &self,
        subkeys: &[&str],
        name: &str,
        ensure_exists: bool,
    ) -> StowResult<PathBuf> {
        Ok(self.join(subkeys, ensure_exists)?.join(name))
    }

    /// Subdirectory with `version` prepended to the subkeys.
    pub fn join_versioned(
        &self,
        version: &str,
        subkeys: &[&str],
        ensure_exists: bool,
    ) -> StowResult<PathBuf> {
        validate_version(version)?;
        let mut keys = Vec::with_capacity(subkeys.len() + 1);
        keys.push(version);
        keys.extend_from_slice(subkeys);
        self.join(&keys, ensure_exists)
    }

    /// Path of `name` in `subkeys`, running `provider` to create the file when
    /// it is missing or `force` is set.
    ///
    /// The provider receives the target path; it must leave a regular file
    /// there or [`StowError::NotCreated`] is returned.
    pub fn ensure_custom<P>(
        &self,
        subkeys: &[&str],
        name: &str,
        force: bool,
        provider: P,
    ) -> StowResult<PathBuf>
    where
        P: FnOnce(&Path) -> StowResult<()>,
    {
        let path = self.join_name(subkeys, name, true)?;
        if path.is_file() && !force {
            return Ok(path);
        }
        debug!(path = %path.display(), force, "running provider");
        provider(&path)?;
        if !path.is_file() {
            return Err(StowError::NotCreated(path));
        }
        Ok(path)
    }

    pub fn load_json<T: DeserializeOwned>(&self, subkeys: &[&str], name: &str) -> StowResult<T> {
        let path = self.join_name(subkeys, name, false)?;
        Ok(serde_json::from_reader(BufReader::new(File::open(path)?))?)
    }

    pub fn dump_json<T: Serialize>(
        &self,
        subkeys: &[&str],
        name: &str,
        value: &T,
    ) -> StowResult<()> {
        let path = self.join_name(subkeys, name, true)?;
        write_atomically(&path, |writer| Ok(serde_json::to_writer(writer, value)?))
    }

    /// A JSON result cache for `name` in `subkeys`.
    pub fn cached_json<T>(&self, subkeys: &[&str], name: &str) -> StowResult<CachedJson<T>>
    where
        T: Serialize + DeserializeOwned,
    {
        Ok(CachedJson::new(self.join_name(subkeys, name, true)?))
    }

    /// Cache layout in the given subdirectory, creating the directory.
    pub fn graph_paths(&self, subkeys: &[&str]) -> StowResult<GraphCachePaths> {
        GraphCachePaths::from_directory(self.join(subkeys, true)?)
    }

    /// Open the graph cache in `subkeys`, building it first when it is
    /// missing or `force` is set.
    pub fn ensure_graph<X, F, I>(
        &self,
        subkeys: &[&str],
        edges: F,
        options: &BuildOptions,
        force: bool,
    ) -> StowResult<GraphCache<X>>
    where
        X: Eq + Hash + Clone + Ord + Debug + Serialize + DeserializeOwned,
        F: FnMut() -> I,
        I: IntoIterator<Item = (X, X)>,
    {
        let paths = self.graph_paths(subkeys)?;
        if paths.exists() {
            if !force {
                debug!(directory = %paths.directory.display(), "graph cache present");
                return GraphCache::open(paths);
            }
            warn!(
                directory = %paths.directory.display(),
                "forcing rebuild of existing graph cache"
            );
        }
        build_graph_cache_at(edges, &paths, options)
    }
}

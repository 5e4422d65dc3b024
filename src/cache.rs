//! File-backed result caches.
//!
//! A [`Cached`] wraps a path and a [`CacheFormat`]. [`Cached::get_or_compute`]
//! loads the file when it exists, otherwise runs the computation and writes its
//! result. A computation that fails writes nothing.

use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::errors::StowResult;

/// How a cached value is read from and written to its file.
pub trait CacheFormat {
    type Value;

    fn load(path: &Path) -> StowResult<Self::Value>;

    fn dump(path: &Path, value: &Self::Value) -> StowResult<()>;
}

/// Pretty-printed JSON of any serde type.
pub struct Json<T>(PhantomData<fn() -> T>);

impl<T: Serialize + DeserializeOwned> CacheFormat for Json<T> {
    type Value = T;

    fn load(path: &Path) -> StowResult<T> {
        Ok(serde_json::from_reader(BufReader::new(File::open(path)?))?)
    }

    fn dump(path: &Path, value: &T) -> StowResult<()> {
        write_atomically(path, |writer| Ok(serde_json::to_writer_pretty(writer, value)?))
    }
}

/// One string per line. Surrounding whitespace is stripped on load.
pub struct Collection;

impl CacheFormat for Collection {
    type Value = Vec<String>;

    fn load(path: &Path) -> StowResult<Vec<String>> {
        let reader = BufReader::new(File::open(path)?);
        reader
            .lines()
            .map(|line| -> StowResult<String> { Ok(line?.trim().to_string()) })
            .collect()
    }

    fn dump(path: &Path, value: &Vec<String>) -> StowResult<()> {
        write_atomically(path, |writer| {
            for line in value {
                writeln!(writer, "{line}")?;
            }
            Ok(())
        })
    }
}

pub type CachedJson<T> = Cached<Json<T>>;
pub type CachedCollection = Cached<Collection>;

/// A cache file at `path` in format `F`.
pub struct Cached<F> {
    path: PathBuf,
    force: bool,
    cache: bool,
    format: PhantomData<F>,
}

impl<F: CacheFormat> Cached<F> {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            path: path.into(),
            force: false,
            cache: true,
            format: PhantomData,
        }
    }

    /// Ignore an existing file and overwrite it with a fresh result.
    pub fn force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    /// With caching off the computation always runs and nothing is written.
    pub fn cache(mut self, cache: bool) -> Self {
        self.cache = cache;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get_or_compute<C>(&self, compute: C) -> StowResult<F::Value>
    where
        C: FnOnce() -> StowResult<F::Value>,
    {
        if !self.cache {
            return compute();
        }
        if self.path.is_file() && !self.force {
            return F::load(&self.path);
        }
        debug!(path = %self.path.display(), "no cache found");
        let value = compute()?;
        debug!(path = %self.path.display(), "writing cache");
        F::dump(&self.path, &value)?;
        Ok(value)
    }
}

/// Write through a temporary file in the same directory and rename it over
/// `path`, so readers never observe a half-written cache.
pub(crate) fn write_atomically<W>(path: &Path, write: W) -> StowResult<()>
where
    W: FnOnce(&mut BufWriter<&File>) -> StowResult<()>,
{
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent)?;
    let tmp = tempfile::NamedTempFile::new_in(parent)?;
    {
        let mut writer = BufWriter::new(tmp.as_file());
        write(&mut writer)?;
        writer.flush()?;
    }
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|err| err.error)?;
    Ok(())
}

//! Fixed-width CSR arrays: offset construction, the scatter writer and
//! read-only memory-mapped views.
//!
//! Offsets are `i64` and indices `i32`, both in native byte order with no
//! header. A node's segment is `indices[offsets[id]..offsets[id + 1]]`.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use memmap2::{Mmap, MmapMut};

use crate::errors::{StowError, StowResult};
use crate::graph::node_map::NodeId;

/// Fixed-width element of a mapped array.
pub trait Element: Copy {
    const WIDTH: usize;

    fn from_ne_slice(bytes: &[u8]) -> Self;
}

impl Element for i64 {
    const WIDTH: usize = 8;

    fn from_ne_slice(bytes: &[u8]) -> Self {
        let mut buf = [0u8; 8];
        buf.copy_from_slice(bytes);
        i64::from_ne_bytes(buf)
    }
}

impl Element for i32 {
    const WIDTH: usize = 4;

    fn from_ne_slice(bytes: &[u8]) -> Self {
        let mut buf = [0u8; 4];
        buf.copy_from_slice(bytes);
        i32::from_ne_bytes(buf)
    }
}

/// Degree histogram that becomes an offset array.
///
/// Counts are stored one slot to the right of the node id so that an
/// in-place prefix sum yields the offsets directly.
#[derive(Debug, Clone)]
pub struct OffsetsBuilder {
    counts: Vec<i64>,
}

impl OffsetsBuilder {
    pub fn new(node_count: usize) -> Self {
        Self {
            counts: vec![0; node_count + 1],
        }
    }

    pub fn increment(&mut self, id: NodeId) {
        self.counts[id as usize + 1] += 1;
    }

    pub fn finish(mut self) -> Vec<i64> {
        prefix_sum(&mut self.counts);
        self.counts
    }
}

pub fn prefix_sum(values: &mut [i64]) {
    let mut total = 0i64;
    for value in values.iter_mut() {
        total += *value;
        *value = total;
    }
}

pub fn write_offsets(path: &Path, offsets: &[i64]) -> StowResult<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    for offset in offsets {
        writer.write_all(&offset.to_ne_bytes())?;
    }
    let file = writer.into_inner().map_err(|e| e.into_error())?;
    file.sync_all()?;
    Ok(())
}

/// Scatter writer for an indices file, backed by a fresh writable mapping.
pub struct IndexWriter {
    path: PathBuf,
    file: File,
    map: Option<MmapMut>,
    cursors: Vec<i64>,
    ends: Vec<i64>,
}

impl IndexWriter {
    /// Create (truncating) the indices file sized to `offsets[n]` entries.
    pub fn create(path: &Path, offsets: &[i64]) -> StowResult<Self> {
        let (Some(&total), Some(node_count)) = (offsets.last(), offsets.len().checked_sub(1))
        else {
            return Err(StowError::invalid_input("offset array must not be empty"));
        };
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        let byte_len = total as u64 * i32::WIDTH as u64;
        file.set_len(byte_len)?;
        // Zero-length files cannot be mapped portably.
        let map = if byte_len == 0 {
            None
        } else {
            // SAFETY: the file was just created by us and is not shared until
            // the build publishes it.
            Some(unsafe { MmapMut::map_mut(&file)? })
        };

        Ok(Self {
            path: path.to_path_buf(),
            file,
            map,
            cursors: offsets[..node_count].to_vec(),
            ends: offsets[1..].to_vec(),
        })
    }

    /// Write `value` into the next free slot of `node`'s segment.
    pub fn place(&mut self, node: NodeId, value: NodeId) -> StowResult<()> {
        let idx = node as usize;
        let (Some(cursor), Some(&end)) = (self.cursors.get_mut(idx), self.ends.get(idx)) else {
            return Err(StowError::invalid_input(format!(
                "node id {node} outside the index"
            )));
        };
        if *cursor >= end {
            return Err(StowError::invalid_input(format!(
                "segment of node id {node} overflowed; the edge stream changed between passes"
            )));
        }
        let start = *cursor as usize * i32::WIDTH;
        *cursor += 1;
        match self.map.as_mut() {
            Some(map) => {
                map[start..start + i32::WIDTH].copy_from_slice(&(value as i32).to_ne_bytes());
                Ok(())
            }
            None => Err(StowError::invalid_input("scatter into an empty index")),
        }
    }

    /// Check every segment was filled and flush to disk.
    pub fn finish(self) -> StowResult<()> {
        if let Some((node, _)) = self
            .cursors
            .iter()
            .zip(&self.ends)
            .enumerate()
            .find(|(_, (cursor, end))| cursor != end)
        {
            return Err(StowError::invalid_input(format!(
                "segment of node id {node} underfilled in {}; edge stream changed between passes",
                self.path.display()
            )));
        }
        if let Some(map) = &self.map {
            map.flush()?;
        }
        self.file.sync_all()?;
        Ok(())
    }
}

/// Read-only memory-mapped array of fixed-width elements.
#[derive(Debug)]
pub struct MappedArray<T: Element> {
    map: Option<Mmap>,
    len: usize,
    _marker: PhantomData<T>,
}

impl<T: Element> MappedArray<T> {
    pub fn open(path: &Path) -> StowResult<Self> {
        let file = File::open(path)?;
        let byte_len = file.metadata()?.len() as usize;
        if byte_len % T::WIDTH != 0 {
            return Err(StowError::corrupt(
                path,
                format!("length {byte_len} is not a multiple of {}", T::WIDTH),
            ));
        }
        let map = if byte_len == 0 {
            None
        } else {
            // SAFETY: cache files are never mutated after publish; rebuilds
            // replace them by rename, leaving existing mappings intact.
            Some(unsafe { Mmap::map(&file)? })
        };
        Ok(Self {
            map,
            len: byte_len / T::WIDTH,
            _marker: PhantomData,
        })
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn get(&self, idx: usize) -> Option<T> {
        if idx >= self.len {
            return None;
        }
        let start = idx * T::WIDTH;
        Some(T::from_ne_slice(&self.bytes()[start..start + T::WIDTH]))
    }

    /// Elements in `start..end`, clamped to the array bounds.
    pub fn range(&self, start: usize, end: usize) -> impl Iterator<Item = T> + '_ {
        let end = end.min(self.len);
        let start = start.min(end);
        self.bytes()[start * T::WIDTH..end * T::WIDTH]
            .chunks_exact(T::WIDTH)
            .map(T::from_ne_slice)
    }

    fn bytes(&self) -> &[u8] {
        self.map.as_deref().unwrap_or(&[])
    }
}

//! Query result: the ordered offsets a filter accepted
//!
//! Offsets stay in memory up to a threshold; past it they spill into an
//! auxiliary file of fixed-width 8-byte big-endian entries, appended
//! sequentially and never migrated back. The spill file lives next to the
//! store file, is named with a fresh UUID, and is deleted when the result
//! is dropped — it is scratch space, not part of the document format.

use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::PathBuf;

use uuid::Uuid;

use crate::store::{StoreError, StoreResult};

/// Ordered list of accepted record offsets, backing a filtered view.
#[derive(Debug)]
pub struct QueryResult {
    offsets: Vec<u64>,
    spill: Option<SpillFile>,
    len: u64,
    seen: u64,
    threshold: usize,
    dir: PathBuf,
}

#[derive(Debug)]
struct SpillFile {
    path: PathBuf,
    file: File,
}

impl QueryResult {
    /// Creates an empty result. `dir` is where a spill file would go.
    pub(crate) fn new(dir: PathBuf, threshold: usize) -> Self {
        Self {
            offsets: Vec::new(),
            spill: None,
            len: 0,
            seen: 0,
            threshold,
            dir,
        }
    }

    /// Number of accepted records.
    pub fn len(&self) -> u64 {
        self.len
    }

    /// Returns true when no record was accepted.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of records the scan looked at, accepted or not.
    pub fn records_seen(&self) -> u64 {
        self.seen
    }

    /// Whether the offsets have spilled to the auxiliary file.
    pub fn is_spilled(&self) -> bool {
        self.spill.is_some()
    }

    /// Counts one scanned record.
    pub(crate) fn record_seen(&mut self) {
        self.seen += 1;
    }

    /// Appends an accepted offset.
    pub(crate) fn push(&mut self, offset: u64) -> StoreResult<()> {
        if let Some(spill) = &mut self.spill {
            spill.append(offset)?;
        } else {
            self.offsets.push(offset);
            if self.offsets.len() >= self.threshold {
                self.spill_out()?;
            }
        }
        self.len += 1;
        Ok(())
    }

    /// Returns the `index`-th accepted offset.
    pub(crate) fn get(&mut self, index: u64) -> StoreResult<u64> {
        if index >= self.len {
            return Err(StoreError::usage(format!(
                "query result index out of range: {}/{}",
                index, self.len
            )));
        }

        match &mut self.spill {
            Some(spill) => spill.read(index),
            None => Ok(self.offsets[index as usize]),
        }
    }

    fn spill_out(&mut self) -> StoreResult<()> {
        let path = self.dir.join(format!("query-{}", Uuid::new_v4()));
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(|e| {
                StoreError::access(format!("failed to create spill file {}", path.display()), e)
            })?;

        let mut spill = SpillFile { path, file };
        for offset in &self.offsets {
            spill.append(*offset)?;
        }

        self.offsets = Vec::new();
        self.spill = Some(spill);
        Ok(())
    }
}

impl SpillFile {
    fn append(&mut self, offset: u64) -> StoreResult<()> {
        self.file
            .seek(SeekFrom::End(0))
            .and_then(|_| self.file.write_all(&offset.to_be_bytes()))
            .map_err(|e| StoreError::access("failed to append to spill file", e))
    }

    fn read(&mut self, index: u64) -> StoreResult<u64> {
        let mut buf = [0u8; 8];
        self.file
            .seek(SeekFrom::Start(index * 8))
            .and_then(|_| self.file.read_exact(&mut buf))
            .map_err(|e| StoreError::access("failed to read from spill file", e))?;
        Ok(u64::from_be_bytes(buf))
    }
}

impl Drop for SpillFile {
    fn drop(&mut self) {
        // Scratch space; best-effort cleanup.
        let _ = fs::remove_file(&self.path);
    }
}

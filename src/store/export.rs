//! Compaction
//!
//! `export` rewrites a collection into a brand-new file containing only
//! live entries: a single forward pass that recursively copies nested
//! nodes, recomputing every length and count bottom-up. The result has no
//! tombstones and a single segment per node. A bound query result is
//! honored, so exporting a filtered view writes exactly the matching
//! records.

use std::io;
use std::path::Path;

use super::chain::{read_field, ChainItem, ChainWalker};
use super::errors::{StoreError, StoreResult};
use super::format::{
    DbFile, NodeTag, CHAIN_END, ENTRY_LIVE, TAG_COLLECTION, TAG_NULL, TAG_OBJECT, TAG_SCALAR,
};
use super::view::View;

fn wr<T>(result: io::Result<T>) -> StoreResult<T> {
    result.map_err(|e| StoreError::access("failed to write to export file", e))
}

impl<'s> View<'s> {
    /// Compacts this collection into a new file at `path`.
    pub fn export(&self, path: impl AsRef<Path>) -> StoreResult<()> {
        if self.tag != NodeTag::Collection {
            return Err(StoreError::usage(format!(
                "only collections can be exported (node is {})",
                self.tag.name()
            )));
        }

        let path = path.as_ref();
        let mut out = DbFile::create(path)
            .map_err(|e| StoreError::access(format!("failed to create {}", path.display()), e))?;

        wr(out.write_u8(TAG_COLLECTION))?;
        let count_offset = out.position();
        wr(out.write_i64(0))?;

        let mut copied: i64 = 0;
        for entry in self.entries() {
            let entry = entry?;
            copy_entry(&mut out, |out| self.copy_value(out, entry.payload_offset))?;
            copied += 1;
        }
        wr(out.write_u8(CHAIN_END))?;
        wr(out.write_i64(0))?;

        let end = out.position();
        wr(out.seek(count_offset))?;
        wr(out.write_i64(copied))?;
        wr(out.seek(end))?;

        wr(out.sync())?;
        Ok(())
    }

    /// Recursively copies the value node at `src_offset` into `out`,
    /// returning its re-encoded length (tag byte included).
    fn copy_value(&self, out: &mut DbFile, src_offset: u64) -> StoreResult<u64> {
        let tag = {
            let mut file = self.store.file.borrow_mut();
            file.seek(src_offset)
                .map_err(|e| StoreError::access("failed to seek to node tag", e))?;
            let byte = file
                .read_u8()
                .map_err(|e| StoreError::access("failed to read node tag", e))?;
            NodeTag::from_byte(byte).ok_or_else(|| {
                StoreError::corruption_at_offset(
                    src_offset,
                    format!("unrecognized node tag 0x{:02x}", byte),
                )
            })?
        };

        match tag {
            NodeTag::Null => {
                wr(out.write_u8(TAG_NULL))?;
                Ok(1)
            }
            NodeTag::Scalar => {
                let bytes = {
                    let mut file = self.store.file.borrow_mut();
                    file.seek(src_offset + 1)
                        .map_err(|e| StoreError::access("failed to seek to scalar text", e))?;
                    let len = file
                        .read_u16()
                        .map_err(|e| StoreError::access("failed to read scalar length", e))?;
                    let mut buf = vec![0u8; len as usize];
                    file.read_exact(&mut buf)
                        .map_err(|e| StoreError::access("failed to read scalar text", e))?;
                    buf
                };
                wr(out.write_u8(TAG_SCALAR))?;
                wr(out.write_u16(bytes.len() as u16))?;
                wr(out.write_all(&bytes))?;
                Ok(1 + 2 + bytes.len() as u64)
            }
            NodeTag::Object => {
                wr(out.write_u8(TAG_OBJECT))?;
                let mut total = 1;

                let mut walker = ChainWalker::new(src_offset + 1);
                loop {
                    let item = {
                        let mut file = self.store.file.borrow_mut();
                        walker.step(&mut file)?
                    };
                    match item {
                        ChainItem::Entry(entry) if entry.live => {
                            let field = {
                                let mut file = self.store.file.borrow_mut();
                                read_field(&mut file, &entry)?
                            };
                            total += copy_entry(out, |out| {
                                wr(out.write_i32(field.key.len() as i32))?;
                                wr(out.write_all(field.key.as_bytes()))?;
                                let value_len = self.copy_value(out, field.value_offset)?;
                                Ok(4 + field.key.len() as u64 + value_len)
                            })?;
                        }
                        ChainItem::Entry(_) => {}
                        ChainItem::End { .. } => break,
                    }
                }

                wr(out.write_u8(CHAIN_END))?;
                wr(out.write_i64(0))?;
                Ok(total + 9)
            }
            NodeTag::Collection => {
                wr(out.write_u8(TAG_COLLECTION))?;
                let count_offset = out.position();
                wr(out.write_i64(0))?;
                let mut total = 1 + 8;
                let mut copied: i64 = 0;

                let mut walker = ChainWalker::new(src_offset + 1 + 8);
                loop {
                    let item = {
                        let mut file = self.store.file.borrow_mut();
                        walker.step(&mut file)?
                    };
                    match item {
                        ChainItem::Entry(entry) if entry.live => {
                            total +=
                                copy_entry(out, |out| self.copy_value(out, entry.payload_offset))?;
                            copied += 1;
                        }
                        ChainItem::Entry(_) => {}
                        ChainItem::End { .. } => break,
                    }
                }

                wr(out.write_u8(CHAIN_END))?;
                wr(out.write_i64(0))?;

                let end = out.position();
                wr(out.seek(count_offset))?;
                wr(out.write_i64(copied))?;
                wr(out.seek(end))?;

                Ok(total + 9)
            }
        }
    }
}

/// Writes one live entry into the export file, backpatching its length.
fn copy_entry(
    out: &mut DbFile,
    payload: impl FnOnce(&mut DbFile) -> StoreResult<u64>,
) -> StoreResult<u64> {
    wr(out.write_u8(ENTRY_LIVE))?;

    let length_offset = out.position();
    wr(out.write_i64(0))?;

    let written = payload(out)?;
    let end = out.position();

    wr(out.seek(length_offset))?;
    wr(out.write_i64(written as i64))?;
    wr(out.seek(end))?;

    Ok(1 + 8 + written)
}

//! Segment chain traversal
//!
//! An Object or Collection body is a singly linked chain of segments. Each
//! segment holds entries and ends with either an end-of-chain sentinel or a
//! continuation pointer to the next segment (always appended at end of
//! file). Tombstoned entries keep their bytes; their recorded length lets a
//! walk skip them in O(1).

use super::errors::{StoreError, StoreResult};
use super::format::{
    DbFile, CHAIN_CONTINUE, CHAIN_END, ENTRY_LIVE, ENTRY_TOMBSTONE,
};

/// One chain slot, as read from disk.
#[derive(Debug, Clone, Copy)]
pub(crate) struct EntryHeader {
    /// Offset of the liveness byte.
    pub offset: u64,
    /// Whether the entry is live.
    pub live: bool,
    /// Recorded payload length.
    pub length: u64,
    /// Offset of the first payload byte.
    pub payload_offset: u64,
}

/// Result of one walk step.
pub(crate) enum ChainItem {
    Entry(EntryHeader),
    /// End of the chain; carries the offset of the terminator kind byte,
    /// which is where an append flips end-of-chain into a continuation.
    End { terminator_offset: u64 },
}

/// Forward walker over a segment chain.
///
/// The walker re-seeks on every step, so chain walks may nest freely (a
/// "within" filter scans an inner collection while the outer scan is
/// mid-chain) without trampling the shared cursor.
pub(crate) struct ChainWalker {
    next: u64,
}

impl ChainWalker {
    /// Starts a walk at the first slot of a chain.
    pub(crate) fn new(chain_start: u64) -> Self {
        Self { next: chain_start }
    }

    /// Reads the next slot, following continuation pointers.
    pub(crate) fn step(&mut self, file: &mut DbFile) -> StoreResult<ChainItem> {
        loop {
            let slot_offset = self.next;
            file.seek(slot_offset)
                .map_err(|e| StoreError::access("failed to seek to chain slot", e))?;

            let kind = file
                .read_u8()
                .map_err(|e| StoreError::access("failed to read chain byte", e))?;

            match kind {
                CHAIN_END => {
                    return Ok(ChainItem::End {
                        terminator_offset: slot_offset,
                    });
                }
                CHAIN_CONTINUE => {
                    let target = file
                        .read_i64()
                        .map_err(|e| StoreError::access("failed to read continuation", e))?;
                    if target <= 0 {
                        return Err(StoreError::corruption_at_offset(
                            slot_offset,
                            format!("invalid continuation target {}", target),
                        ));
                    }
                    self.next = target as u64;
                }
                ENTRY_LIVE | ENTRY_TOMBSTONE => {
                    let length = file
                        .read_i64()
                        .map_err(|e| StoreError::access("failed to read entry length", e))?;
                    if length < 0 {
                        return Err(StoreError::corruption_at_offset(
                            slot_offset,
                            format!("negative entry length {}", length),
                        ));
                    }
                    let header = EntryHeader {
                        offset: slot_offset,
                        live: kind == ENTRY_LIVE,
                        length: length as u64,
                        payload_offset: slot_offset + 1 + 8,
                    };
                    self.next = header.payload_offset + header.length;
                    return Ok(ChainItem::Entry(header));
                }
                other => {
                    return Err(StoreError::corruption_at_offset(
                        slot_offset,
                        format!("unrecognized chain byte 0x{:02x}", other),
                    ));
                }
            }
        }
    }

    /// Walks to the end-of-chain terminator, skipping every entry.
    pub(crate) fn find_terminator(mut self, file: &mut DbFile) -> StoreResult<u64> {
        loop {
            match self.step(file)? {
                ChainItem::Entry(_) => continue,
                ChainItem::End { terminator_offset } => return Ok(terminator_offset),
            }
        }
    }
}

/// An object entry's payload, split into key and value node.
#[derive(Debug, Clone)]
pub(crate) struct FieldEntry {
    pub key: String,
    /// Offset of the value node's tag byte.
    pub value_offset: u64,
    /// Length of the value node, tag byte included.
    pub value_length: u64,
}

/// Parses an object entry's payload into key and value-node extent.
pub(crate) fn read_field(file: &mut DbFile, entry: &EntryHeader) -> StoreResult<FieldEntry> {
    file.seek(entry.payload_offset)
        .map_err(|e| StoreError::access("failed to seek to field payload", e))?;

    let key_len = file
        .read_i32()
        .map_err(|e| StoreError::access("failed to read key length", e))?;
    if key_len <= 0 || (key_len as u64) + 4 > entry.length {
        return Err(StoreError::corruption_at_offset(
            entry.payload_offset,
            format!("invalid key length {}", key_len),
        ));
    }

    let mut key_bytes = vec![0u8; key_len as usize];
    file.read_exact(&mut key_bytes)
        .map_err(|e| StoreError::access("failed to read key bytes", e))?;
    let key = String::from_utf8(key_bytes).map_err(|_| {
        StoreError::corruption_at_offset(entry.payload_offset, "key is not valid UTF-8")
    })?;

    Ok(FieldEntry {
        key,
        value_offset: entry.payload_offset + 4 + key_len as u64,
        value_length: entry.length - 4 - key_len as u64,
    })
}

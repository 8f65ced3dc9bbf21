//! Mutating operations
//!
//! The file only ever grows: an append discovers the chain tail, flips its
//! end-of-chain sentinel into a continuation pointer aimed at end of file,
//! and writes a fresh segment there. Deletion flips a liveness byte.
//! Updates are a tombstone plus an appended replacement entry. Validation
//! happens before the first byte is written, so a rejected operation leaves
//! the file unchanged.

use std::io;

use crate::document::{validate_key, Document, Value};

use super::chain::ChainWalker;
use super::errors::{StoreError, StoreResult};
use super::format::{
    encode_text, DbFile, NodeTag, CHAIN_CONTINUE, CHAIN_END, ENTRY_LIVE, ENTRY_TOMBSTONE,
    MAX_SCALAR_BYTES, TAG_COLLECTION, TAG_NULL, TAG_OBJECT, TAG_SCALAR,
};
use super::view::View;

fn wr<T>(result: io::Result<T>) -> StoreResult<T> {
    result.map_err(|e| StoreError::access("failed to write to store file", e))
}

impl<'s> View<'s> {
    /// Inserts one document into this collection's tail segment.
    pub fn insert(&self, doc: &Document) -> StoreResult<()> {
        self.insert_many(std::slice::from_ref(doc))
    }

    /// Inserts documents into this collection, discovering the tail once.
    pub fn insert_many(&self, docs: &[Document]) -> StoreResult<()> {
        if self.result.is_some() {
            return Err(StoreError::usage(
                "cannot insert into a filtered view: query results are snapshots",
            ));
        }
        if self.tag != NodeTag::Collection {
            return Err(StoreError::usage(format!(
                "cannot insert into a {}",
                self.tag.name()
            )));
        }

        for doc in docs {
            validate_document(doc)?;
        }
        if docs.is_empty() {
            return Ok(());
        }

        let terminator = {
            let mut file = self.store.file.borrow_mut();
            ChainWalker::new(self.chain_start()).find_terminator(&mut file)?
        };

        {
            let mut file = self.store.file.borrow_mut();
            let target = file.len();

            wr(file.seek(terminator))?;
            wr(file.write_u8(CHAIN_CONTINUE))?;
            wr(file.write_i64(target as i64))?;

            wr(file.seek(target))?;
            for doc in docs {
                write_entry(&mut file, |file| write_object_value(file, doc))?;
            }
            wr(file.write_u8(CHAIN_END))?;
            wr(file.write_i64(0))?;
        }

        self.add_count(docs.len() as i64)?;
        self.store.sync_if_enabled()
    }

    /// Replaces the value stored under `key`.
    ///
    /// On an object: tombstones the old entry (if any) and appends the new
    /// one; returns 1. On a collection: applies the replacement to every
    /// element that is itself an object; returns how many were updated.
    pub fn set(&self, key: &str, value: &Value) -> StoreResult<u64> {
        validate_key(key)?;
        validate_value(value)?;

        match self.tag {
            NodeTag::Object => {
                self.set_field(key, value)?;
                self.store.sync_if_enabled()?;
                Ok(1)
            }
            NodeTag::Collection => {
                let mut updated = 0;
                for entry in self.entries() {
                    let entry = entry?;
                    let node = self.node_at(&entry)?;
                    if node.node_type() == NodeTag::Object {
                        node.set_field(key, value)?;
                        updated += 1;
                    }
                }
                self.store.sync_if_enabled()?;
                Ok(updated)
            }
            other => Err(StoreError::usage(format!(
                "set requires an object or a collection (node is {})",
                other.name()
            ))),
        }
    }

    /// Tombstones this node.
    ///
    /// On a collection: tombstones every live element (honoring a bound
    /// query result) and returns how many were removed. On an object: walks
    /// the parent's chain for the entry whose payload interval contains
    /// this node and tombstones that entry.
    pub fn remove(&self) -> StoreResult<u64> {
        match self.tag {
            NodeTag::Object => {
                let parent = self
                    .parent
                    .clone()
                    .ok_or_else(|| StoreError::usage("the root collection cannot be removed"))?;
                let removed = parent.remove_child(self.offset)?;
                self.store.sync_if_enabled()?;
                Ok(removed)
            }
            NodeTag::Collection => {
                let mut removed: u64 = 0;
                for entry in self.entries() {
                    let entry = entry?;
                    let mut file = self.store.file.borrow_mut();
                    wr(file.seek(entry.offset))?;
                    wr(file.write_u8(ENTRY_TOMBSTONE))?;
                    removed += 1;
                }
                self.add_count(-(removed as i64))?;
                self.store.sync_if_enabled()?;
                Ok(removed)
            }
            other => Err(StoreError::usage(format!(
                "can only remove objects and collections (node is {})",
                other.name()
            ))),
        }
    }

    /// Tombstones the entry stored under `key`. Objects only.
    pub fn remove_field(&self, key: &str) -> StoreResult<bool> {
        if self.tag != NodeTag::Object {
            return Err(StoreError::usage(format!(
                "cannot remove a key from a {}",
                self.tag.name()
            )));
        }

        match self.find_field(key)? {
            Some((entry, _)) => {
                {
                    let mut file = self.store.file.borrow_mut();
                    wr(file.seek(entry.offset))?;
                    wr(file.write_u8(ENTRY_TOMBSTONE))?;
                }
                self.store.sync_if_enabled()?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn set_field(&self, key: &str, value: &Value) -> StoreResult<()> {
        if let Some((entry, _)) = self.find_field(key)? {
            let mut file = self.store.file.borrow_mut();
            wr(file.seek(entry.offset))?;
            wr(file.write_u8(ENTRY_TOMBSTONE))?;
        }

        let terminator = {
            let mut file = self.store.file.borrow_mut();
            ChainWalker::new(self.chain_start()).find_terminator(&mut file)?
        };

        let mut file = self.store.file.borrow_mut();
        let target = file.len();

        wr(file.seek(terminator))?;
        wr(file.write_u8(CHAIN_CONTINUE))?;
        wr(file.write_i64(target as i64))?;

        wr(file.seek(target))?;
        write_field_entry(&mut file, key, value)?;
        wr(file.write_u8(CHAIN_END))?;
        wr(file.write_i64(0))?;

        Ok(())
    }

    /// Tombstones the entry of this collection/object whose payload holds
    /// the child node at `child_offset`.
    fn remove_child(&self, child_offset: u64) -> StoreResult<u64> {
        match self.tag {
            NodeTag::Collection => {
                // A collection entry is liveness + length + value node; the
                // child's body offset is one past the node tag.
                let entry_offset = child_offset - 1 - 8 - 1;
                {
                    let mut file = self.store.file.borrow_mut();
                    wr(file.seek(entry_offset))?;
                    wr(file.write_u8(ENTRY_TOMBSTONE))?;
                }
                self.add_count(-1)?;
                Ok(1)
            }
            NodeTag::Object => {
                for entry in self.entries() {
                    let entry = entry?;
                    let contains = entry.payload_offset <= child_offset
                        && child_offset < entry.payload_offset + entry.length;
                    if contains {
                        let mut file = self.store.file.borrow_mut();
                        wr(file.seek(entry.offset))?;
                        wr(file.write_u8(ENTRY_TOMBSTONE))?;
                        return Ok(1);
                    }
                }
                Ok(0)
            }
            other => Err(StoreError::usage(format!(
                "cannot remove a child from a {}",
                other.name()
            ))),
        }
    }

    /// Adjusts the collection's stored count.
    fn add_count(&self, delta: i64) -> StoreResult<()> {
        let mut file = self.store.file.borrow_mut();
        wr(file.seek(self.offset))?;
        let count = file
            .read_i64()
            .map_err(|e| StoreError::access("failed to read collection count", e))?;
        let updated = count + delta;
        if updated < 0 {
            return Err(StoreError::corruption_at_offset(
                self.offset,
                format!("collection count would become {}", updated),
            ));
        }
        wr(file.seek(self.offset))?;
        wr(file.write_i64(updated))?;
        Ok(())
    }
}

/// Validates a document before any byte is written.
fn validate_document(doc: &Document) -> StoreResult<()> {
    for (_, value) in doc {
        validate_value(value)?;
    }
    Ok(())
}

/// Validates a value tree: scalar texts must fit the 16-bit length header.
/// Keys are validated when the document is built.
fn validate_value(value: &Value) -> StoreResult<()> {
    match value {
        Value::Null => Ok(()),
        Value::Scalar(text) => {
            if encode_text(text).len() > MAX_SCALAR_BYTES {
                return Err(StoreError::validation(format!(
                    "scalar text exceeds {} encoded bytes",
                    MAX_SCALAR_BYTES
                )));
            }
            Ok(())
        }
        Value::Object(doc) => validate_document(doc),
        Value::Collection(items) => {
            for item in items {
                validate_value(item)?;
            }
            Ok(())
        }
    }
}

/// Writes one chain entry: liveness, backpatched length, payload.
fn write_entry(
    file: &mut DbFile,
    payload: impl FnOnce(&mut DbFile) -> StoreResult<u64>,
) -> StoreResult<u64> {
    wr(file.write_u8(ENTRY_LIVE))?;

    let length_offset = file.position();
    wr(file.write_i64(0))?;

    let written = payload(file)?;
    let end = file.position();

    wr(file.seek(length_offset))?;
    wr(file.write_i64(written as i64))?;
    wr(file.seek(end))?;

    Ok(1 + 8 + written)
}

/// Writes an object entry: key length, key bytes, value node.
fn write_field_entry(file: &mut DbFile, key: &str, value: &Value) -> StoreResult<u64> {
    write_entry(file, |file| {
        wr(file.write_i32(key.len() as i32))?;
        wr(file.write_all(key.as_bytes()))?;
        let value_len = write_value(file, value)?;
        Ok(4 + key.len() as u64 + value_len)
    })
}

/// Writes a value node at the current position; returns its encoded length
/// (tag byte included).
pub(crate) fn write_value(file: &mut DbFile, value: &Value) -> StoreResult<u64> {
    match value {
        Value::Null => {
            wr(file.write_u8(TAG_NULL))?;
            Ok(1)
        }
        Value::Scalar(text) => {
            let encoded = encode_text(text);
            if encoded.len() > MAX_SCALAR_BYTES {
                return Err(StoreError::validation(format!(
                    "scalar text exceeds {} encoded bytes",
                    MAX_SCALAR_BYTES
                )));
            }
            wr(file.write_u8(TAG_SCALAR))?;
            wr(file.write_u16(encoded.len() as u16))?;
            wr(file.write_all(&encoded))?;
            Ok(1 + 2 + encoded.len() as u64)
        }
        Value::Object(doc) => write_object_value(file, doc),
        Value::Collection(items) => {
            wr(file.write_u8(TAG_COLLECTION))?;
            wr(file.write_i64(items.len() as i64))?;
            let mut total = 1 + 8;
            for item in items {
                total += write_entry(file, |file| write_value(file, item))?;
            }
            wr(file.write_u8(CHAIN_END))?;
            wr(file.write_i64(0))?;
            Ok(total + 9)
        }
    }
}

/// Writes an object value node; returns its encoded length.
fn write_object_value(file: &mut DbFile, doc: &Document) -> StoreResult<u64> {
    wr(file.write_u8(TAG_OBJECT))?;
    let mut total = 1;
    for (key, value) in doc {
        total += write_field_entry(file, key, value)?;
    }
    wr(file.write_u8(CHAIN_END))?;
    wr(file.write_i64(0))?;
    Ok(total + 9)
}

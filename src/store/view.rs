//! Store handle and lazy views
//!
//! The `Store` owns the one random-access file handle; every `View` borrows
//! it (arena model). A view is a cheap navigable reference — type tag, body
//! offset, declared length — and never copies record bytes. Materialization
//! into a `Value` happens only on explicit request.
//!
//! Views created from a query result resolve positions through the bound
//! offset list instead of walking the chain.

use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use crate::document::{Document, Value};
use crate::filter::{FieldValue, Filter};
use crate::query::{QueryResult, Selection};

use super::chain::{read_field, ChainItem, ChainWalker, EntryHeader, FieldEntry};
use super::errors::{StoreError, StoreResult};
use super::format::{decode_text, DbFile, NodeTag, CHAIN_END, ENTRY_LIVE, TAG_COLLECTION};
use super::options::StoreOptions;

/// Fresh file layout: root tag, zero count, end-of-chain sentinel.
fn write_root_header(file: &mut DbFile) -> std::io::Result<()> {
    file.seek(0)?;
    file.write_u8(TAG_COLLECTION)?;
    file.write_i64(0)?;
    file.write_u8(CHAIN_END)?;
    file.write_i64(0)?;
    Ok(())
}

/// An open store file.
///
/// Single-threaded by design: all views share one mutable file cursor and
/// every operation seeks explicitly before touching the file. The handle is
/// released exactly once, on drop (or via [`Store::close`]).
#[derive(Debug)]
pub struct Store {
    pub(crate) path: PathBuf,
    pub(crate) dir: PathBuf,
    pub(crate) file: RefCell<DbFile>,
    pub(crate) options: StoreOptions,
}

impl Store {
    /// Opens a store file, creating an empty root collection if the file is
    /// new or empty.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Store> {
        Self::open_with(path, StoreOptions::default())
    }

    /// Opens a store file with explicit options.
    pub fn open_with(path: impl AsRef<Path>, options: StoreOptions) -> StoreResult<Store> {
        let path = path.as_ref().to_path_buf();
        let mut file = DbFile::open(&path)
            .map_err(|e| StoreError::access(format!("failed to open {}", path.display()), e))?;

        if file.len() == 0 {
            write_root_header(&mut file)
                .map_err(|e| StoreError::access("failed to initialize store file", e))?;
            if options.sync_writes {
                file.sync()
                    .map_err(|e| StoreError::access("failed to sync new store file", e))?;
            }
        } else {
            file.seek(0)
                .map_err(|e| StoreError::access("failed to seek to root tag", e))?;
            let tag = file
                .read_u8()
                .map_err(|e| StoreError::access("failed to read root tag", e))?;
            if tag != TAG_COLLECTION {
                return Err(StoreError::corruption_at_offset(
                    0,
                    format!("root tag is 0x{:02x}, expected a collection", tag),
                ));
            }
        }

        let dir = match path.parent() {
            Some(parent) if parent.as_os_str().is_empty() => PathBuf::from("."),
            Some(parent) => parent.to_path_buf(),
            None => PathBuf::from("."),
        };

        Ok(Store {
            path,
            dir,
            file: RefCell::new(file),
            options,
        })
    }

    /// Returns a view of the root collection.
    pub fn root(&self) -> View<'_> {
        let length = self.file.borrow().len().saturating_sub(1);
        View {
            store: self,
            tag: NodeTag::Collection,
            offset: 1,
            length,
            parent: None,
            result: None,
        }
    }

    /// Syncs and releases the file handle.
    ///
    /// Dropping the store releases the handle too; `close` exists to make
    /// the final sync observable as a result.
    pub fn close(self) -> StoreResult<()> {
        self.file
            .borrow_mut()
            .sync()
            .map_err(|e| StoreError::access("failed to sync store file on close", e))
    }

    /// Path of the store file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The options this store was opened with.
    pub fn options(&self) -> &StoreOptions {
        &self.options
    }

    /// Directory that holds the store file; query-result spill files live
    /// here too.
    pub(crate) fn dir(&self) -> &Path {
        &self.dir
    }

    pub(crate) fn sync_if_enabled(&self) -> StoreResult<()> {
        if self.options.sync_writes {
            self.file
                .borrow_mut()
                .sync()
                .map_err(|e| StoreError::access("failed to sync store file", e))?;
        }
        Ok(())
    }
}

/// A lazy, non-materializing handle into an open store.
#[derive(Clone, Debug)]
pub struct View<'s> {
    pub(crate) store: &'s Store,
    pub(crate) tag: NodeTag,
    /// Offset of the node body (the byte after the tag).
    pub(crate) offset: u64,
    /// Declared body length.
    pub(crate) length: u64,
    pub(crate) parent: Option<Rc<View<'s>>>,
    pub(crate) result: Option<Rc<RefCell<QueryResult>>>,
}

impl<'s> View<'s> {
    /// The resolved type tag of this node.
    pub fn node_type(&self) -> NodeTag {
        self.tag
    }

    /// Whether this view resolves positions through a query result.
    pub fn is_filtered(&self) -> bool {
        self.result.is_some()
    }

    /// How many records the scan behind this filtered view looked at;
    /// `None` for raw views.
    pub fn records_seen(&self) -> Option<u64> {
        self.result
            .as_ref()
            .map(|result| result.borrow().records_seen())
    }

    /// The store this view reads from.
    pub(crate) fn store(&self) -> &'s Store {
        self.store
    }

    /// Number of live elements. Collections only.
    pub fn count(&self) -> StoreResult<u64> {
        if self.tag != NodeTag::Collection {
            return Err(StoreError::usage(format!(
                "only collections have a count (node is {})",
                self.tag.name()
            )));
        }

        if let Some(result) = &self.result {
            return Ok(result.borrow().len());
        }

        let mut file = self.store.file.borrow_mut();
        file.seek(self.offset)
            .map_err(|e| StoreError::access("failed to seek to collection count", e))?;
        let count = file
            .read_i64()
            .map_err(|e| StoreError::access("failed to read collection count", e))?;
        if count < 0 {
            return Err(StoreError::corruption_at_offset(
                self.offset,
                format!("negative collection count {}", count),
            ));
        }
        Ok(count as u64)
    }

    /// Navigates to the element at `index`. Collections only.
    ///
    /// A raw collection is a linear scan from the chain head; a filtered
    /// view looks the offset up in its query result.
    pub fn element(&self, index: u64) -> StoreResult<View<'s>> {
        if self.tag != NodeTag::Collection {
            return Err(StoreError::usage(format!(
                "cannot index into a {}",
                self.tag.name()
            )));
        }

        let count = self.count()?;
        if index >= count {
            return Err(StoreError::usage(format!(
                "index out of range: {}/{}",
                index, count
            )));
        }

        let entry = if let Some(result) = &self.result {
            let offset = result.borrow_mut().get(index)?;
            let mut file = self.store.file.borrow_mut();
            file.seek(offset + 1)
                .map_err(|e| StoreError::access("failed to seek to entry length", e))?;
            let length = file
                .read_i64()
                .map_err(|e| StoreError::access("failed to read entry length", e))?;
            if length < 0 {
                return Err(StoreError::corruption_at_offset(
                    offset,
                    format!("negative entry length {}", length),
                ));
            }
            EntryHeader {
                offset,
                live: true,
                length: length as u64,
                payload_offset: offset + 1 + 8,
            }
        } else {
            match self.entries().nth(index as usize) {
                Some(entry) => entry?,
                None => {
                    return Err(StoreError::corruption(
                        "reached end of chain while entries remain",
                    ))
                }
            }
        };

        self.node_at(&entry)
    }

    /// Navigates to the value stored under `key`. Objects only. A missing
    /// key is not an error.
    pub fn field(&self, key: &str) -> StoreResult<Option<View<'s>>> {
        if self.tag != NodeTag::Object {
            return Err(StoreError::usage(format!(
                "cannot look up a key in a {}",
                self.tag.name()
            )));
        }

        match self.find_field(key)? {
            Some((_, field)) => Ok(Some(self.value_node(&field)?)),
            None => Ok(None),
        }
    }

    /// Materializes this object into a [`Document`]. Objects only.
    pub fn as_document(&self) -> StoreResult<Document> {
        if self.tag != NodeTag::Object {
            return Err(StoreError::usage(format!(
                "node is a {}, not an object",
                self.tag.name()
            )));
        }
        self.materialize_object(self.offset)
    }

    /// Materializes this collection into values. Collections only; honors a
    /// bound query result.
    pub fn as_collection(&self) -> StoreResult<Vec<Value>> {
        if self.tag != NodeTag::Collection {
            return Err(StoreError::usage(format!(
                "node is a {}, not a collection",
                self.tag.name()
            )));
        }

        let mut items = Vec::new();
        for entry in self.entries() {
            let entry = entry?;
            items.push(self.read_value_at(entry.payload_offset)?);
        }
        Ok(items)
    }

    /// Starts a "find all" query against this collection.
    pub fn find_all(&self) -> Selection<'s> {
        Selection::new(self.clone(), false)
    }

    /// Starts a "find one" query against this collection.
    pub fn find_one(&self) -> Selection<'s> {
        Selection::new(self.clone(), true)
    }

    // ------------------------------------------------------------------
    // Internal navigation
    // ------------------------------------------------------------------

    /// Offset of the first chain slot.
    pub(crate) fn chain_start(&self) -> u64 {
        match self.tag {
            // A collection body leads with its count.
            NodeTag::Collection => self.offset + 8,
            _ => self.offset,
        }
    }

    /// Iterates live entries, resolving through the bound query result when
    /// present.
    pub(crate) fn entries(&self) -> Entries<'_, 's> {
        let mode = match &self.result {
            Some(result) => EntriesMode::Result {
                result: Rc::clone(result),
                index: 0,
            },
            None => EntriesMode::Chain(ChainWalker::new(self.chain_start())),
        };
        Entries { view: self, mode }
    }

    /// Scans the object chain for a live entry with the given key.
    pub(crate) fn find_field(&self, key: &str) -> StoreResult<Option<(EntryHeader, FieldEntry)>> {
        let mut walker = ChainWalker::new(self.chain_start());
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
                    if field.key == key {
                        return Ok(Some((entry, field)));
                    }
                }
                ChainItem::Entry(_) => {}
                ChainItem::End { .. } => return Ok(None),
            }
        }
    }

    /// Builds a child view for an entry payload (a value node).
    pub(crate) fn node_at(&self, entry: &EntryHeader) -> StoreResult<View<'s>> {
        if entry.length == 0 {
            return Err(StoreError::corruption_at_offset(
                entry.offset,
                "empty entry payload",
            ));
        }
        let tag = self.read_tag(entry.payload_offset)?;
        Ok(View {
            store: self.store,
            tag,
            offset: entry.payload_offset + 1,
            length: entry.length - 1,
            parent: Some(Rc::new(self.clone())),
            result: None,
        })
    }

    /// Builds a child view for an object field's value node.
    pub(crate) fn value_node(&self, field: &FieldEntry) -> StoreResult<View<'s>> {
        if field.value_length == 0 {
            return Err(StoreError::corruption_at_offset(
                field.value_offset,
                "empty value node",
            ));
        }
        let tag = self.read_tag(field.value_offset)?;
        Ok(View {
            store: self.store,
            tag,
            offset: field.value_offset + 1,
            length: field.value_length - 1,
            parent: Some(Rc::new(self.clone())),
            result: None,
        })
    }

    fn read_tag(&self, offset: u64) -> StoreResult<NodeTag> {
        let mut file = self.store.file.borrow_mut();
        file.seek(offset)
            .map_err(|e| StoreError::access("failed to seek to node tag", e))?;
        let byte = file
            .read_u8()
            .map_err(|e| StoreError::access("failed to read node tag", e))?;
        NodeTag::from_byte(byte).ok_or_else(|| {
            StoreError::corruption_at_offset(offset, format!("unrecognized node tag 0x{:02x}", byte))
        })
    }

    // ------------------------------------------------------------------
    // Materialization
    // ------------------------------------------------------------------

    /// Reads the value node at `offset` fully into a [`Value`].
    pub(crate) fn read_value_at(&self, offset: u64) -> StoreResult<Value> {
        match self.read_tag(offset)? {
            NodeTag::Null => Ok(Value::Null),
            NodeTag::Scalar => Ok(Value::Scalar(self.read_scalar_text(offset + 1)?)),
            NodeTag::Object => Ok(Value::Object(self.materialize_object(offset + 1)?)),
            NodeTag::Collection => {
                let mut items = Vec::new();
                let mut walker = ChainWalker::new(offset + 1 + 8);
                loop {
                    let item = {
                        let mut file = self.store.file.borrow_mut();
                        walker.step(&mut file)?
                    };
                    match item {
                        ChainItem::Entry(entry) if entry.live => {
                            items.push(self.read_value_at(entry.payload_offset)?);
                        }
                        ChainItem::Entry(_) => {}
                        ChainItem::End { .. } => break,
                    }
                }
                Ok(Value::Collection(items))
            }
        }
    }

    fn materialize_object(&self, chain_start: u64) -> StoreResult<Document> {
        let mut doc = Document::new();
        let mut walker = ChainWalker::new(chain_start);
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
                    let value = self.read_value_at(field.value_offset)?;
                    doc.set(field.key.clone(), value).map_err(|_| {
                        StoreError::corruption_at_offset(
                            entry.payload_offset,
                            format!("stored key {:?} is invalid", field.key),
                        )
                    })?;
                }
                ChainItem::Entry(_) => {}
                ChainItem::End { .. } => break,
            }
        }
        Ok(doc)
    }

    fn read_scalar_text(&self, offset: u64) -> StoreResult<String> {
        let bytes = {
            let mut file = self.store.file.borrow_mut();
            file.seek(offset)
                .map_err(|e| StoreError::access("failed to seek to scalar text", e))?;
            let len = file
                .read_u16()
                .map_err(|e| StoreError::access("failed to read scalar length", e))?;
            let mut buf = vec![0u8; len as usize];
            file.read_exact(&mut buf)
                .map_err(|e| StoreError::access("failed to read scalar text", e))?;
            buf
        };
        decode_text(&bytes)
    }

    // ------------------------------------------------------------------
    // Field-path resolution and scanning
    // ------------------------------------------------------------------

    /// Resolves a dotted field path against this record.
    ///
    /// Returns `None` for the distinguished "key not found" case — a failed
    /// match at any path segment, or a non-object mid-path. The empty path
    /// designates the record itself.
    pub(crate) fn resolve_path(&self, path: &str) -> StoreResult<Option<FieldValue<'s>>> {
        if path.is_empty() {
            return self.self_value().map(Some);
        }

        let mut current = self.clone();
        for segment in path.split('.') {
            if current.tag != NodeTag::Object {
                return Ok(None);
            }
            match current.find_field(segment)? {
                Some((_, field)) => current = current.value_node(&field)?,
                None => return Ok(None),
            }
        }
        current.self_value().map(Some)
    }

    fn self_value(&self) -> StoreResult<FieldValue<'s>> {
        match self.tag {
            NodeTag::Null => Ok(FieldValue::Null),
            NodeTag::Scalar => Ok(FieldValue::Scalar(self.read_scalar_text(self.offset)?)),
            NodeTag::Object | NodeTag::Collection => Ok(FieldValue::Node(self.clone())),
        }
    }

    /// Drives a filter across this collection's live entries, appending
    /// accepted offsets to `out`. The record's fields are resolved one
    /// request at a time; the record is never materialized.
    pub(crate) fn scan(&self, filter: &mut dyn Filter, out: &mut QueryResult) -> StoreResult<()> {
        if self.tag != NodeTag::Collection {
            return Err(StoreError::usage(format!(
                "filters can only be applied to a collection (node is {})",
                self.tag.name()
            )));
        }

        for entry in self.entries() {
            let entry = entry?;

            if !filter.begin() {
                break;
            }
            out.record_seen();

            let record = self.node_at(&entry)?;
            let mut request = filter.consider(None, None)?;
            while let Some(path) = request {
                let value = record.resolve_path(&path)?.unwrap_or(FieldValue::Null);
                request = filter.consider(Some(&path), Some(value))?;
            }

            if filter.end(entry.offset) {
                out.push(entry.offset)?;
            }
        }

        Ok(())
    }

    /// Binds a freshly built query result, producing the filtered view.
    pub(crate) fn with_result(&self, result: QueryResult) -> View<'s> {
        View {
            store: self.store,
            tag: self.tag,
            offset: self.offset,
            length: self.length,
            parent: Some(Rc::new(self.clone())),
            result: Some(Rc::new(RefCell::new(result))),
        }
    }
}

enum EntriesMode {
    Chain(ChainWalker),
    Result {
        result: Rc<RefCell<QueryResult>>,
        index: u64,
    },
    Done,
}

/// Iterator over a view's live entries.
pub(crate) struct Entries<'v, 's> {
    view: &'v View<'s>,
    mode: EntriesMode,
}

impl<'v, 's> Iterator for Entries<'v, 's> {
    type Item = StoreResult<EntryHeader>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match &mut self.mode {
                EntriesMode::Done => return None,
                EntriesMode::Chain(walker) => {
                    let item = {
                        let mut file = self.view.store.file.borrow_mut();
                        walker.step(&mut file)
                    };
                    match item {
                        Ok(ChainItem::Entry(entry)) if entry.live => return Some(Ok(entry)),
                        Ok(ChainItem::Entry(_)) => continue,
                        Ok(ChainItem::End { .. }) => {
                            self.mode = EntriesMode::Done;
                            return None;
                        }
                        Err(e) => {
                            self.mode = EntriesMode::Done;
                            return Some(Err(e));
                        }
                    }
                }
                EntriesMode::Result { result, index } => {
                    let len = result.borrow().len();
                    if *index >= len {
                        self.mode = EntriesMode::Done;
                        return None;
                    }
                    let got = result.borrow_mut().get(*index);
                    let offset = match got {
                        Ok(offset) => offset,
                        Err(e) => {
                            self.mode = EntriesMode::Done;
                            return Some(Err(e));
                        }
                    };
                    *index += 1;

                    let read = (|| {
                        let mut file = self.view.store.file.borrow_mut();
                        file.seek(offset)
                            .map_err(|e| StoreError::access("failed to seek to entry", e))?;
                        let liveness = file
                            .read_u8()
                            .map_err(|e| StoreError::access("failed to read entry liveness", e))?;
                        let length = file
                            .read_i64()
                            .map_err(|e| StoreError::access("failed to read entry length", e))?;
                        if length < 0 {
                            return Err(StoreError::corruption_at_offset(
                                offset,
                                format!("negative entry length {}", length),
                            ));
                        }
                        Ok((liveness, length as u64))
                    })();

                    match read {
                        Ok((liveness, length)) if liveness == ENTRY_LIVE => {
                            return Some(Ok(EntryHeader {
                                offset,
                                live: true,
                                length,
                                payload_offset: offset + 1 + 8,
                            }));
                        }
                        // Tombstoned since the query ran: skip it.
                        Ok(_) => continue,
                        Err(e) => {
                            self.mode = EntriesMode::Done;
                            return Some(Err(e));
                        }
                    }
                }
            }
        }
    }
}

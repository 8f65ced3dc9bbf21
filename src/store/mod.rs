//! Binary document store for nestdb
//!
//! The store owns one random-access file holding a root collection of
//! documents and operates directly on the on-disk encoding.
//!
//! # Design Principles
//!
//! - Append-only growth: Object and Collection bodies are segment chains;
//!   appending flips the tail sentinel into a continuation pointer and
//!   writes a new segment at end of file
//! - Tombstone deletion: entries keep their bytes, scans skip them in O(1)
//!   via recorded lengths; space comes back only through `export`
//! - Lazy views: navigation yields cheap handles, materialization is
//!   explicit
//! - One shared cursor, explicit seek before every read and write
//! - Single-threaded, blocking, no internal locking

mod chain;
mod errors;
mod export;
mod format;
mod options;
mod view;
mod write;

pub use errors::{Severity, StoreError, StoreErrorCode, StoreResult};
pub use format::NodeTag;
pub use options::StoreOptions;
pub use view::{Store, View};

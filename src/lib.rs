//! nestdb - an embedded, single-file, hierarchical document store
//!
//! A file holds one root collection of JSON-like documents. Insertion,
//! deletion, field update and predicate queries run directly against the
//! on-disk encoding; records are never deserialized unless explicitly
//! materialized.

pub mod cli;
pub mod document;
pub mod filter;
pub mod observability;
pub mod query;
pub mod store;

//! Query surface for nestdb
//!
//! A query is one forward scan of a collection: the store drives the
//! filter tree per record, accepted byte offsets accumulate in a
//! [`QueryResult`], and the result binds a new view that behaves like a
//! sub-collection. Query results are point-in-time snapshots of offsets,
//! not live views.

mod builder;
mod result;

pub use builder::{CountSelection, ElementSelection, Selection};
pub use result::QueryResult;

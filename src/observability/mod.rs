//! Observability for nestdb
//!
//! Structured, synchronous logging and nothing else: no metrics pipeline,
//! no background threads, no buffering. One log line is one event, keys
//! are emitted in deterministic order, and output is plain JSON lines so
//! the demo driver's activity can be machine-read.

mod logger;

pub use logger::{Logger, Severity};

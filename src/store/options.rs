//! Store configuration
//!
//! One small knob set; no config files, no environment variables.

/// Configuration for an open store.
#[derive(Debug, Clone)]
pub struct StoreOptions {
    /// How many accepted offsets a query result keeps in memory before
    /// spilling to an auxiliary offset file.
    pub spill_threshold: usize,
    /// Whether mutating operations fsync before returning.
    pub sync_writes: bool,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            spill_threshold: 4 * 1024 * 1024,
            sync_writes: true,
        }
    }
}

impl StoreOptions {
    /// Create options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the query-result spill threshold.
    pub fn spill_threshold(mut self, entries: usize) -> Self {
        self.spill_threshold = entries;
        self
    }

    /// Disables fsync after mutating operations.
    pub fn without_sync(mut self) -> Self {
        self.sync_writes = false;
        self
    }
}

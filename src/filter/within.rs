//! Existence filter
//!
//! Matches when any element of a nested collection satisfies the child
//! filter. The child runs under a first-match wrapper inside a reentrant
//! scan of the nested collection, so the inner walk stops at the first
//! accepted element while the outer scan is still mid-chain.

use crate::query::QueryResult;
use crate::store::{NodeTag, StoreResult};

use super::{FieldValue, Filter, FirstMatchFilter};

/// Matches records with at least one qualifying element in a nested
/// collection.
pub struct WithinFilter {
    path: String,
    child: Box<dyn Filter>,
    matches: bool,
}

impl WithinFilter {
    pub fn new(path: impl Into<String>, child: Box<dyn Filter>) -> Self {
        Self {
            path: path.into(),
            child,
            matches: false,
        }
    }
}

impl Filter for WithinFilter {
    fn begin(&mut self) -> bool {
        self.matches = false;
        true
    }

    fn consider(
        &mut self,
        key: Option<&str>,
        value: Option<FieldValue<'_>>,
    ) -> StoreResult<Option<String>> {
        if key.is_none() {
            return Ok(Some(self.path.clone()));
        }

        if let Some(FieldValue::Node(node)) = value {
            if node.node_type() == NodeTag::Collection {
                // One-shot wrapper per record: the inner scan stops as soon
                // as any element qualifies.
                let mut first = FirstMatchFilter::new(&mut self.child);
                let mut inner = QueryResult::new(
                    node.store().dir().to_path_buf(),
                    node.store().options().spill_threshold,
                );
                node.scan(&mut first, &mut inner)?;
                self.matches = !inner.is_empty();
            }
        }

        Ok(None)
    }

    fn end(&mut self, _offset: u64) -> bool {
        self.matches
    }
}

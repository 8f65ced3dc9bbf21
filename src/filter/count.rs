//! Cardinality filter
//!
//! Matches when the field resolves to a nested collection whose element
//! count compares against a target. Anything that is not a collection
//! never matches.

use crate::store::{NodeTag, StoreResult};

use super::{CompareOp, FieldValue, Filter};

/// Compares the element count of a nested collection against a target.
pub struct CountFilter {
    path: String,
    op: CompareOp,
    target: i64,
    matches: bool,
}

impl CountFilter {
    pub fn new(path: impl Into<String>, op: CompareOp, target: i64) -> Self {
        Self {
            path: path.into(),
            op,
            target,
            matches: false,
        }
    }
}

impl Filter for CountFilter {
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
                let count = node.count()? as i64;
                self.matches = self.op.eval_i64(count, self.target);
            }
        }

        Ok(None)
    }

    fn end(&mut self, _offset: u64) -> bool {
        self.matches
    }
}

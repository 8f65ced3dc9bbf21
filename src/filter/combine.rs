//! Filter combinators: first-match, conjunction, disjunction
//!
//! AND and OR hold several child filters that may each request different
//! field paths. The combinator forwards requests child by child — every
//! child runs its full sub-protocol against the record, with paths
//! re-resolved per request — and combines the verdicts at the end.

use crate::store::StoreResult;

use super::{FieldValue, Filter};

/// Wraps a filter so only its first acceptance counts.
///
/// After the first accepted record, `begin` returns false, which aborts the
/// scan. Used for "find one" queries and inside existence filters.
pub struct FirstMatchFilter<F> {
    inner: F,
    satisfied: bool,
}

impl<F: Filter> FirstMatchFilter<F> {
    pub fn new(inner: F) -> Self {
        Self {
            inner,
            satisfied: false,
        }
    }
}

impl<F: Filter> Filter for FirstMatchFilter<F> {
    fn begin(&mut self) -> bool {
        !self.satisfied && self.inner.begin()
    }

    fn consider(
        &mut self,
        key: Option<&str>,
        value: Option<FieldValue<'_>>,
    ) -> StoreResult<Option<String>> {
        self.inner.consider(key, value)
    }

    fn end(&mut self, offset: u64) -> bool {
        let accepted = self.inner.end(offset);
        if accepted {
            self.satisfied = true;
        }
        accepted
    }
}

/// Matches when every child filter matches the record.
pub struct AndFilter {
    children: Vec<Box<dyn Filter>>,
    current: usize,
}

impl AndFilter {
    pub fn new(children: Vec<Box<dyn Filter>>) -> Self {
        Self {
            children,
            current: 0,
        }
    }
}

impl Filter for AndFilter {
    fn begin(&mut self) -> bool {
        self.current = 0;
        let mut proceed = true;
        for child in &mut self.children {
            proceed &= child.begin();
        }
        proceed
    }

    fn consider(
        &mut self,
        key: Option<&str>,
        value: Option<FieldValue<'_>>,
    ) -> StoreResult<Option<String>> {
        if key.is_none() {
            self.current = 0;
        } else if let Some(child) = self.children.get_mut(self.current) {
            // The answer belongs to the child that asked.
            if let Some(next) = child.consider(key, value)? {
                return Ok(Some(next));
            }
            self.current += 1;
        }

        // Advance to the next child that still needs a field.
        while let Some(child) = self.children.get_mut(self.current) {
            if let Some(next) = child.consider(None, None)? {
                return Ok(Some(next));
            }
            self.current += 1;
        }
        Ok(None)
    }

    fn end(&mut self, offset: u64) -> bool {
        let mut all = true;
        for child in &mut self.children {
            if !child.end(offset) {
                all = false;
            }
        }
        all
    }
}

/// Matches when any child filter matches the record.
pub struct OrFilter {
    children: Vec<Box<dyn Filter>>,
    current: usize,
}

impl OrFilter {
    pub fn new(children: Vec<Box<dyn Filter>>) -> Self {
        Self {
            children,
            current: 0,
        }
    }
}

impl Filter for OrFilter {
    fn begin(&mut self) -> bool {
        self.current = 0;
        let mut proceed = true;
        for child in &mut self.children {
            proceed &= child.begin();
        }
        proceed
    }

    fn consider(
        &mut self,
        key: Option<&str>,
        value: Option<FieldValue<'_>>,
    ) -> StoreResult<Option<String>> {
        if key.is_none() {
            self.current = 0;
        } else if let Some(child) = self.children.get_mut(self.current) {
            if let Some(next) = child.consider(key, value)? {
                return Ok(Some(next));
            }
            self.current += 1;
        }

        while let Some(child) = self.children.get_mut(self.current) {
            if let Some(next) = child.consider(None, None)? {
                return Ok(Some(next));
            }
            self.current += 1;
        }
        Ok(None)
    }

    fn end(&mut self, offset: u64) -> bool {
        let mut any = false;
        for child in &mut self.children {
            if child.end(offset) {
                any = true;
            }
        }
        any
    }
}

//! Fluent query builder
//!
//! Builds a filter tree with chained calls and commits it as one scan:
//!
//! ```ignore
//! let matched = store.root().find_all()
//!     .and()
//!         .gt("age", 18)
//!         .lt("age", 60)
//!     .close()
//!     .commit()?;
//! ```
//!
//! `within(key)` opens a scope over a nested collection and closes itself
//! as soon as its predicate is added; `and()` / `or()` scopes close with
//! `close()` (unclosed groups are closed by `commit`). Builder mistakes
//! are reported at `commit`, keeping the chain itself infallible.

use crate::filter::{
    AndFilter, CompareOp, ComparisonFilter, CountFilter, Filter, FirstMatchFilter, NotNullFilter,
    NullFilter, Operand, OrFilter, WithinFilter,
};
use crate::store::{StoreError, StoreResult, View};

use super::result::QueryResult;

enum Frame {
    Root(Option<Box<dyn Filter>>),
    And(Vec<Box<dyn Filter>>),
    Or(Vec<Box<dyn Filter>>),
    Within(String),
}

/// An in-progress query against a collection view.
pub struct Selection<'s> {
    view: View<'s>,
    only_one: bool,
    frames: Vec<Frame>,
    error: Option<StoreError>,
}

impl<'s> Selection<'s> {
    pub(crate) fn new(view: View<'s>, only_one: bool) -> Self {
        Self {
            view,
            only_one,
            frames: vec![Frame::Root(None)],
            error: None,
        }
    }

    /// Field equals the operand.
    pub fn eq(self, path: impl Into<String>, operand: impl Into<Operand>) -> Self {
        self.compare(path, CompareOp::Eq, operand)
    }

    /// Field does not equal the operand.
    pub fn ne(self, path: impl Into<String>, operand: impl Into<Operand>) -> Self {
        self.compare(path, CompareOp::Ne, operand)
    }

    /// Field is greater than the operand.
    pub fn gt(self, path: impl Into<String>, operand: impl Into<Operand>) -> Self {
        self.compare(path, CompareOp::Gt, operand)
    }

    /// Field is greater than or equal to the operand.
    pub fn ge(self, path: impl Into<String>, operand: impl Into<Operand>) -> Self {
        self.compare(path, CompareOp::Ge, operand)
    }

    /// Field is less than the operand.
    pub fn lt(self, path: impl Into<String>, operand: impl Into<Operand>) -> Self {
        self.compare(path, CompareOp::Lt, operand)
    }

    /// Field is less than or equal to the operand.
    pub fn le(self, path: impl Into<String>, operand: impl Into<Operand>) -> Self {
        self.compare(path, CompareOp::Le, operand)
    }

    /// Field is null or missing.
    pub fn is_null(self, path: impl Into<String>) -> Self {
        self.add(Box::new(NullFilter::new(path)))
    }

    /// Field is present and not null.
    pub fn is_not_null(self, path: impl Into<String>) -> Self {
        self.add(Box::new(NotNullFilter::new(path)))
    }

    /// Compares the element count of a nested collection.
    pub fn count(self, path: impl Into<String>) -> CountSelection<'s> {
        CountSelection {
            selection: self,
            path: path.into(),
        }
    }

    /// Compares the record itself; useful inside [`Selection::within`] for
    /// collections of scalars.
    pub fn element(self) -> ElementSelection<'s> {
        ElementSelection { selection: self }
    }

    /// Opens an existence scope over the nested collection at `path`. The
    /// scope closes itself once its predicate is added.
    pub fn within(mut self, path: impl Into<String>) -> Self {
        if self.error.is_none() {
            self.frames.push(Frame::Within(path.into()));
        }
        self
    }

    /// Opens a conjunction scope; every predicate added before `close`
    /// must match.
    pub fn and(mut self) -> Self {
        if self.error.is_none() {
            self.frames.push(Frame::And(Vec::new()));
        }
        self
    }

    /// Opens a disjunction scope; any predicate added before `close` may
    /// match.
    pub fn or(mut self) -> Self {
        if self.error.is_none() {
            self.frames.push(Frame::Or(Vec::new()));
        }
        self
    }

    /// Closes the innermost `and()` / `or()` scope.
    pub fn close(mut self) -> Self {
        if self.error.is_some() {
            return self;
        }
        match self.frames.pop() {
            Some(Frame::And(children)) => match build_group(children, AndFilter::new) {
                Ok(filter) => self.push_filter(filter),
                Err(e) => self.error = Some(e),
            },
            Some(Frame::Or(children)) => match build_group(children, OrFilter::new) {
                Ok(filter) => self.push_filter(filter),
                Err(e) => self.error = Some(e),
            },
            Some(frame @ Frame::Within(_)) => {
                self.frames.push(frame);
                self.error = Some(StoreError::validation(
                    "within(...) closes automatically when its predicate is added",
                ));
            }
            Some(frame @ Frame::Root(_)) => {
                self.frames.push(frame);
                self.error = Some(StoreError::validation("close() without an open group"));
            }
            None => unreachable!("selection always has a root frame"),
        }
        self
    }

    /// Runs the scan and returns the filtered view.
    pub fn commit(mut self) -> StoreResult<View<'s>> {
        if let Some(e) = self.error.take() {
            return Err(e);
        }

        // Close any groups left open.
        while self.frames.len() > 1 {
            let filter = match self.frames.pop() {
                Some(Frame::And(children)) => build_group(children, AndFilter::new)?,
                Some(Frame::Or(children)) => build_group(children, OrFilter::new)?,
                Some(Frame::Within(_)) => {
                    return Err(StoreError::validation(
                        "within(...) group has no predicate",
                    ))
                }
                _ => unreachable!("root frame is always at the bottom"),
            };
            self.push_filter(filter);
            if let Some(e) = self.error.take() {
                return Err(e);
            }
        }

        let filter = match self.frames.pop() {
            Some(Frame::Root(Some(filter))) => filter,
            Some(Frame::Root(None)) => {
                return Err(StoreError::validation("selection has no predicate"))
            }
            _ => unreachable!("root frame is always at the bottom"),
        };

        let mut filter: Box<dyn Filter> = if self.only_one {
            Box::new(FirstMatchFilter::new(filter))
        } else {
            filter
        };

        let store = self.view.store();
        let mut result = QueryResult::new(
            store.dir().to_path_buf(),
            store.options().spill_threshold,
        );
        self.view.scan(&mut *filter, &mut result)?;

        Ok(self.view.with_result(result))
    }

    fn compare(
        self,
        path: impl Into<String>,
        op: CompareOp,
        operand: impl Into<Operand>,
    ) -> Self {
        self.add(Box::new(ComparisonFilter::new(path, op, operand)))
    }

    fn add(mut self, filter: Box<dyn Filter>) -> Self {
        if self.error.is_none() {
            self.push_filter(filter);
        }
        self
    }

    fn push_filter(&mut self, mut filter: Box<dyn Filter>) {
        loop {
            match self.frames.last_mut() {
                Some(Frame::Within(_)) => {
                    let Some(Frame::Within(path)) = self.frames.pop() else {
                        unreachable!()
                    };
                    filter = Box::new(WithinFilter::new(path, filter));
                }
                Some(Frame::Root(slot)) => {
                    if slot.is_some() {
                        self.error = Some(StoreError::validation(
                            "selection already has a predicate; group with and()/or()",
                        ));
                    } else {
                        *slot = Some(filter);
                    }
                    return;
                }
                Some(Frame::And(children)) | Some(Frame::Or(children)) => {
                    children.push(filter);
                    return;
                }
                None => unreachable!("selection always has a root frame"),
            }
        }
    }
}

fn build_group<F: Filter + 'static>(
    children: Vec<Box<dyn Filter>>,
    build: impl FnOnce(Vec<Box<dyn Filter>>) -> F,
) -> StoreResult<Box<dyn Filter>> {
    if children.is_empty() {
        return Err(StoreError::validation("empty and()/or() group"));
    }
    Ok(Box::new(build(children)))
}

/// Cardinality comparison sub-builder, from [`Selection::count`].
pub struct CountSelection<'s> {
    selection: Selection<'s>,
    path: String,
}

impl<'s> CountSelection<'s> {
    pub fn eq(self, target: i64) -> Selection<'s> {
        self.finish(CompareOp::Eq, target)
    }

    pub fn ne(self, target: i64) -> Selection<'s> {
        self.finish(CompareOp::Ne, target)
    }

    pub fn gt(self, target: i64) -> Selection<'s> {
        self.finish(CompareOp::Gt, target)
    }

    pub fn ge(self, target: i64) -> Selection<'s> {
        self.finish(CompareOp::Ge, target)
    }

    pub fn lt(self, target: i64) -> Selection<'s> {
        self.finish(CompareOp::Lt, target)
    }

    pub fn le(self, target: i64) -> Selection<'s> {
        self.finish(CompareOp::Le, target)
    }

    fn finish(self, op: CompareOp, target: i64) -> Selection<'s> {
        let path = self.path;
        self.selection.add(Box::new(CountFilter::new(path, op, target)))
    }
}

/// Record-self comparison sub-builder, from [`Selection::element`].
pub struct ElementSelection<'s> {
    selection: Selection<'s>,
}

impl<'s> ElementSelection<'s> {
    pub fn eq(self, operand: impl Into<Operand>) -> Selection<'s> {
        self.finish(CompareOp::Eq, operand)
    }

    pub fn ne(self, operand: impl Into<Operand>) -> Selection<'s> {
        self.finish(CompareOp::Ne, operand)
    }

    pub fn gt(self, operand: impl Into<Operand>) -> Selection<'s> {
        self.finish(CompareOp::Gt, operand)
    }

    pub fn ge(self, operand: impl Into<Operand>) -> Selection<'s> {
        self.finish(CompareOp::Ge, operand)
    }

    pub fn lt(self, operand: impl Into<Operand>) -> Selection<'s> {
        self.finish(CompareOp::Lt, operand)
    }

    pub fn le(self, operand: impl Into<Operand>) -> Selection<'s> {
        self.finish(CompareOp::Le, operand)
    }

    fn finish(self, op: CompareOp, operand: impl Into<Operand>) -> Selection<'s> {
        // The empty path designates the record itself.
        self.selection
            .add(Box::new(ComparisonFilter::new("", op, operand)))
    }
}

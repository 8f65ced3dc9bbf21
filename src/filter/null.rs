//! Null and not-null filters
//!
//! "Null" covers both a stored null and a field that did not resolve; the
//! store surfaces not-found as a null value before the filter sees it.

use crate::store::StoreResult;

use super::{FieldValue, Filter};

/// Matches records whose field is null or missing.
pub struct NullFilter {
    path: String,
    matches: bool,
}

impl NullFilter {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            matches: false,
        }
    }
}

impl Filter for NullFilter {
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
        self.matches = matches!(value, Some(FieldValue::Null));
        Ok(None)
    }

    fn end(&mut self, _offset: u64) -> bool {
        self.matches
    }
}

/// Matches records whose field resolves to anything but null.
pub struct NotNullFilter {
    path: String,
    matches: bool,
}

impl NotNullFilter {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            matches: false,
        }
    }
}

impl Filter for NotNullFilter {
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
        self.matches = !matches!(value, Some(FieldValue::Null) | None);
        Ok(None)
    }

    fn end(&mut self, _offset: u64) -> bool {
        self.matches
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drive(filter: &mut dyn Filter, value: FieldValue<'_>) -> bool {
        assert!(filter.begin());
        let key = filter.consider(None, None).unwrap().unwrap();
        assert!(filter.consider(Some(&key), Some(value)).unwrap().is_none());
        filter.end(0)
    }

    #[test]
    fn test_null_filter() {
        let mut f = NullFilter::new("missing");
        assert!(drive(&mut f, FieldValue::Null));
        assert!(!drive(&mut f, FieldValue::Scalar("x".to_string())));
    }

    #[test]
    fn test_not_null_filter() {
        let mut f = NotNullFilter::new("name");
        assert!(!drive(&mut f, FieldValue::Null));
        assert!(drive(&mut f, FieldValue::Scalar("x".to_string())));
    }
}

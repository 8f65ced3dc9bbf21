//! Comparison filter
//!
//! Compares a field against an operand with one of the six operators. When
//! both the operand and the field value parse as numbers the comparison is
//! numeric; otherwise only equality and inequality apply, on the raw token
//! text. Nulls, missing fields and nested nodes never match.

use crate::store::StoreResult;

use super::{FieldValue, Filter};

/// The six comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Lt,
    Le,
    Eq,
    Ne,
    Ge,
    Gt,
}

impl CompareOp {
    pub(crate) fn eval_f64(self, field: f64, operand: f64) -> bool {
        match self {
            CompareOp::Lt => field < operand,
            CompareOp::Le => field <= operand,
            CompareOp::Eq => field == operand,
            CompareOp::Ne => field != operand,
            CompareOp::Ge => field >= operand,
            CompareOp::Gt => field > operand,
        }
    }

    pub(crate) fn eval_i64(self, field: i64, operand: i64) -> bool {
        match self {
            CompareOp::Lt => field < operand,
            CompareOp::Le => field <= operand,
            CompareOp::Eq => field == operand,
            CompareOp::Ne => field != operand,
            CompareOp::Ge => field >= operand,
            CompareOp::Gt => field > operand,
        }
    }
}

/// A comparison operand: token text, plus its numeric reading when it has
/// one.
#[derive(Debug, Clone)]
pub struct Operand {
    text: String,
    numeric: Option<f64>,
}

impl Operand {
    fn from_text(text: String) -> Self {
        let numeric = text.parse::<f64>().ok();
        Self { text, numeric }
    }
}

impl From<&str> for Operand {
    fn from(s: &str) -> Self {
        Operand::from_text(s.to_string())
    }
}

impl From<String> for Operand {
    fn from(s: String) -> Self {
        Operand::from_text(s)
    }
}

impl From<i64> for Operand {
    fn from(n: i64) -> Self {
        Self {
            text: n.to_string(),
            numeric: Some(n as f64),
        }
    }
}

impl From<u64> for Operand {
    fn from(n: u64) -> Self {
        Self {
            text: n.to_string(),
            numeric: Some(n as f64),
        }
    }
}

impl From<f64> for Operand {
    fn from(n: f64) -> Self {
        Self {
            text: n.to_string(),
            numeric: Some(n),
        }
    }
}

impl From<bool> for Operand {
    fn from(b: bool) -> Self {
        Operand::from_text(b.to_string())
    }
}

/// Compares one field path against a fixed operand.
pub struct ComparisonFilter {
    path: String,
    operand: Operand,
    op: CompareOp,
    matches: bool,
}

impl ComparisonFilter {
    pub fn new(path: impl Into<String>, op: CompareOp, operand: impl Into<Operand>) -> Self {
        Self {
            path: path.into(),
            operand: operand.into(),
            op,
            matches: false,
        }
    }
}

impl Filter for ComparisonFilter {
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

        self.matches = match value {
            Some(FieldValue::Scalar(text)) => {
                if let Some(operand) = self.operand.numeric {
                    if let Ok(field) = text.parse::<f64>() {
                        self.matches = self.op.eval_f64(field, operand);
                        return Ok(None);
                    }
                }
                match self.op {
                    CompareOp::Eq => text == self.operand.text,
                    CompareOp::Ne => text != self.operand.text,
                    _ => false,
                }
            }
            _ => false,
        };

        Ok(None)
    }

    fn end(&mut self, _offset: u64) -> bool {
        self.matches
    }
}

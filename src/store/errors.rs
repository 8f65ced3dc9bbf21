//! Store error types
//!
//! Error codes:
//! - NEST_USAGE_ERROR (ERROR severity) - operation applied to the wrong node type
//! - NEST_VALIDATION_ERROR (ERROR severity) - rejected before any mutation
//! - NEST_ACCESS_ERROR (ERROR severity) - underlying I/O failure
//! - NEST_FORMAT_CORRUPTION (FATAL severity) - unrecognized tag/sentinel, bad counts

use std::fmt;
use std::io;

use crate::document::DocumentError;

/// Severity levels for store errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Operation fails, the store stays usable
    Error,
    /// The file can no longer be trusted
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "ERROR"),
            Severity::Fatal => write!(f, "FATAL"),
        }
    }
}

/// Store-specific error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreErrorCode {
    /// Operation applied to a node of the wrong type (caller bug)
    NestUsageError,
    /// Invalid key or value, rejected before any mutation
    NestValidationError,
    /// Disk I/O failure
    NestAccessError,
    /// Unrecognized tag/sentinel byte or unrepresentable count
    NestFormatCorruption,
}

impl StoreErrorCode {
    /// Returns the string code.
    pub fn code(&self) -> &'static str {
        match self {
            StoreErrorCode::NestUsageError => "NEST_USAGE_ERROR",
            StoreErrorCode::NestValidationError => "NEST_VALIDATION_ERROR",
            StoreErrorCode::NestAccessError => "NEST_ACCESS_ERROR",
            StoreErrorCode::NestFormatCorruption => "NEST_FORMAT_CORRUPTION",
        }
    }

    /// Returns the severity level for this error.
    pub fn severity(&self) -> Severity {
        match self {
            StoreErrorCode::NestUsageError => Severity::Error,
            StoreErrorCode::NestValidationError => Severity::Error,
            StoreErrorCode::NestAccessError => Severity::Error,
            StoreErrorCode::NestFormatCorruption => Severity::Fatal,
        }
    }
}

impl fmt::Display for StoreErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Store error with full context.
#[derive(Debug)]
pub struct StoreError {
    /// Error code
    code: StoreErrorCode,
    /// Human-readable message
    message: String,
    /// Optional details about the error context
    details: Option<String>,
    /// Underlying IO error if applicable
    source: Option<io::Error>,
}

impl StoreError {
    /// Create a usage error (wrong node type for the requested operation).
    pub fn usage(message: impl Into<String>) -> Self {
        Self {
            code: StoreErrorCode::NestUsageError,
            message: message.into(),
            details: None,
            source: None,
        }
    }

    /// Create a validation error (rejected before any mutation).
    pub fn validation(message: impl Into<String>) -> Self {
        Self {
            code: StoreErrorCode::NestValidationError,
            message: message.into(),
            details: None,
            source: None,
        }
    }

    /// Create an access error wrapping the low-level I/O cause.
    pub fn access(message: impl Into<String>, source: io::Error) -> Self {
        Self {
            code: StoreErrorCode::NestAccessError,
            message: message.into(),
            details: None,
            source: Some(source),
        }
    }

    /// Create a format corruption error (FATAL).
    pub fn corruption(message: impl Into<String>) -> Self {
        Self {
            code: StoreErrorCode::NestFormatCorruption,
            message: message.into(),
            details: None,
            source: None,
        }
    }

    /// Create a format corruption error with byte offset context.
    pub fn corruption_at_offset(offset: u64, reason: impl Into<String>) -> Self {
        Self {
            code: StoreErrorCode::NestFormatCorruption,
            message: reason.into(),
            details: Some(format!("byte_offset: {}", offset)),
            source: None,
        }
    }

    /// Returns the error code.
    pub fn code(&self) -> StoreErrorCode {
        self.code
    }

    /// Returns the severity level.
    pub fn severity(&self) -> Severity {
        self.code.severity()
    }

    /// Returns the error message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns additional error details.
    pub fn details(&self) -> Option<&str> {
        self.details.as_deref()
    }

    /// Returns whether this error is fatal (the file can no longer be trusted).
    pub fn is_fatal(&self) -> bool {
        self.severity() == Severity::Fatal
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}: {}",
            self.code.severity(),
            self.code.code(),
            self.message
        )?;
        if let Some(ref details) = self.details {
            write!(f, " ({})", details)?;
        }
        Ok(())
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

impl From<DocumentError> for StoreError {
    fn from(e: DocumentError) -> Self {
        StoreError::validation(e.to_string())
    }
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

//! Structured error types shared across splice crates.

use std::collections::BTreeMap;
use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Structured payload attached to every [`SpliceError`] variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Stable machine readable error code.
    pub code: String,
    /// Human readable diagnostic message.
    pub message: String,
    /// Contextual key value pairs (identifiers, ranges, etc.).
    #[serde(default)]
    pub context: BTreeMap<String, String>,
    /// Optional hint that may help the caller resolve the issue.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl ErrorInfo {
    /// Creates a new error payload with the provided code and message.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            context: BTreeMap::new(),
            hint: None,
        }
    }

    /// Adds a context entry to the payload.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    /// Sets a human readable hint for remediation.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

/// Closed classification of [`SpliceError`] variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Identifier text did not match `prefix,start-end`.
    MalformedIdentifier,
    /// No Feed circuit contains the Distribution range.
    NoMatchingFeedCircuit,
    /// The candidate feed range overlaps another splice on the same Feed cable.
    FeedRangeConflict,
    /// Allocated spans would exceed the cable capacity.
    CapacityExceeded,
    /// The operation is not legal for the records involved.
    InvalidOperation,
    /// A referenced cable or circuit does not exist.
    NotFound,
    /// The storage collaborator failed or rejected a batch.
    Store,
    /// Encoding or decoding failed.
    Serde,
}

/// Canonical error type for the splice engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[serde(tag = "family", content = "detail")]
pub enum SpliceError {
    /// Identifier parse failures.
    #[error("malformed identifier: {0}")]
    MalformedIdentifier(ErrorInfo),
    /// Splice-on requests without a containing Feed circuit.
    #[error("no matching feed circuit: {0}")]
    NoMatchingFeedCircuit(ErrorInfo),
    /// Overlapping claims on the same Feed cable.
    #[error("feed range conflict: {0}")]
    FeedRangeConflict(ErrorInfo),
    /// Capacity checks raised at creation time.
    #[error("capacity exceeded: {0}")]
    CapacityExceeded(ErrorInfo),
    /// Requests that are structurally illegal.
    #[error("invalid operation: {0}")]
    InvalidOperation(ErrorInfo),
    /// Lookups of unknown records.
    #[error("not found: {0}")]
    NotFound(ErrorInfo),
    /// Storage collaborator errors.
    #[error("store error: {0}")]
    Store(ErrorInfo),
    /// Serialization and schema errors.
    #[error("serde error: {0}")]
    Serde(ErrorInfo),
}

impl Display for ErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (code: {})", self.message, self.code)?;
        if !self.context.is_empty() {
            write!(f, " | context: [")?;
            for (idx, (key, value)) in self.context.iter().enumerate() {
                if idx > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{key}={value}")?;
            }
            write!(f, "]")?;
        }
        if let Some(hint) = &self.hint {
            write!(f, " | hint: {hint}")?;
        }
        Ok(())
    }
}

impl SpliceError {
    /// Returns a reference to the payload describing the error.
    pub fn info(&self) -> &ErrorInfo {
        match self {
            SpliceError::MalformedIdentifier(info)
            | SpliceError::NoMatchingFeedCircuit(info)
            | SpliceError::FeedRangeConflict(info)
            | SpliceError::CapacityExceeded(info)
            | SpliceError::InvalidOperation(info)
            | SpliceError::NotFound(info)
            | SpliceError::Store(info)
            | SpliceError::Serde(info) => info,
        }
    }

    /// Returns the closed kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            SpliceError::MalformedIdentifier(_) => ErrorKind::MalformedIdentifier,
            SpliceError::NoMatchingFeedCircuit(_) => ErrorKind::NoMatchingFeedCircuit,
            SpliceError::FeedRangeConflict(_) => ErrorKind::FeedRangeConflict,
            SpliceError::CapacityExceeded(_) => ErrorKind::CapacityExceeded,
            SpliceError::InvalidOperation(_) => ErrorKind::InvalidOperation,
            SpliceError::NotFound(_) => ErrorKind::NotFound,
            SpliceError::Store(_) => ErrorKind::Store,
            SpliceError::Serde(_) => ErrorKind::Serde,
        }
    }

    /// Shorthand for a [`SpliceError::NotFound`] naming the missing record.
    pub fn not_found(what: &str, id: impl Into<String>) -> Self {
        SpliceError::NotFound(
            ErrorInfo::new(format!("{what}-not-found"), format!("unknown {what}"))
                .with_context("id", id),
        )
    }
}

//! Common error type definitions.

use strum::{AsRefStr, IntoStaticStr};
use thiserror::Error;

/// Type alias for boxed dynamic errors that can be sent across threads.
pub type BoxedError = Box<dyn std::error::Error + Send + Sync>;

/// Type alias for Results with our custom Error type.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Categories of errors raised by workflow operations.
///
/// `NotFound`, `InvalidOperation` and `InvalidReference` are recoverable:
/// the rejected operation leaves the model untouched. `OrderingViolation`
/// signals a broken internal invariant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, AsRefStr, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
    /// A stage, value, field or stored workflow does not exist.
    NotFound,
    /// The operation is not allowed for the target entity.
    InvalidOperation,
    /// A binding points outside the set of available references.
    InvalidReference,
    /// An ordered collection lost its dense `0..n-1` indexing.
    OrderingViolation,
    /// Serialization/deserialization error.
    Serialization,
    /// The persistence collaborator failed.
    Storage,
}

/// A structured error type for sieve operations.
#[derive(Debug, Error)]
#[error("{kind:?}{}", message.as_ref().map(|m| format!(": {}", m)).unwrap_or_default())]
pub struct Error {
    /// The kind of error that occurred.
    pub kind: ErrorKind,
    /// Optional error message.
    pub message: Option<String>,
    /// Optional source error.
    #[source]
    pub source: Option<BoxedError>,
}

impl Error {
    /// Creates a new error with the given kind.
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            message: None,
            source: None,
        }
    }

    /// Adds a message to this error.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Adds a source error to this error.
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Creates a new not found error.
    pub fn not_found() -> Self {
        Self::new(ErrorKind::NotFound)
    }

    /// Creates a new invalid operation error.
    pub fn invalid_operation() -> Self {
        Self::new(ErrorKind::InvalidOperation)
    }

    /// Creates a new invalid reference error.
    pub fn invalid_reference() -> Self {
        Self::new(ErrorKind::InvalidReference)
    }

    /// Creates a new ordering violation error.
    pub fn ordering_violation() -> Self {
        Self::new(ErrorKind::OrderingViolation)
    }

    /// Creates a new serialization error.
    pub fn serialization() -> Self {
        Self::new(ErrorKind::Serialization)
    }

    /// Creates a new storage error.
    pub fn storage() -> Self {
        Self::new(ErrorKind::Storage)
    }

    /// Returns the error kind.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the error kind as a string.
    pub fn kind_str(&self) -> &'static str {
        self.kind.into()
    }

    /// Returns true if the caller may keep working with the unchanged model.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self.kind,
            ErrorKind::NotFound | ErrorKind::InvalidOperation | ErrorKind::InvalidReference
        )
    }
}

impl From<serde_json::Error> for Error {
    fn from(error: serde_json::Error) -> Self {
        Self::serialization()
            .with_message(error.to_string())
            .with_source(error)
    }
}

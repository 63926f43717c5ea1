//! Error types for include resolution and definition loading.

use std::path::PathBuf;
use thiserror::Error;

/// Broad classification of a [`ResolveError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A declared include has no handler. Programming mistake in the validator.
    Configuration,
    /// The raw data does not have the shape a validator or handler needs.
    DataShape,
    /// A handler returned something other than a resource or a skip.
    TypeContract,
    /// A handler failed on its own (e.g. fetching related data).
    Handler,
}

/// Errors during a resolution pass.
///
/// Any error aborts the pass for the affected node and everything above it.
#[derive(Debug, Error)]
pub enum ResolveError {
    // Configuration errors
    #[error("{validator} declares include \"{include}\" but has no handler {handler}()")]
    MissingHandler {
        validator: String,
        include: String,
        handler: String,
    },

    // Data shape errors
    #[error("missing data for include \"{include}\" at {identifier}")]
    MissingIncludeData { include: String, identifier: String },

    #[error("unexpected data at {path}: expected {expected}, got {actual}")]
    UnexpectedShape {
        path: String,
        expected: &'static str,
        actual: String,
    },

    #[error("data at {path} failed validation with {} error(s)", errors.len())]
    SchemaViolation {
        path: String,
        errors: Vec<SchemaError>,
    },

    #[error("includes at {path} exceed the recursion limit of {limit}")]
    RecursionLimitExceeded { path: String, limit: usize },

    // Type contract errors
    #[error("invalid return value from {validator}::{handler}(): expected {expected}, received {actual}")]
    InvalidHandlerReturn {
        validator: String,
        handler: String,
        expected: &'static str,
        actual: String,
    },

    // Handler errors
    #[error("include \"{include}\" failed: {message}")]
    Handler { include: String, message: String },
}

impl ResolveError {
    /// Build a handler failure for `include`.
    pub fn handler(include: impl Into<String>, message: impl std::fmt::Display) -> Self {
        ResolveError::Handler {
            include: include.into(),
            message: message.to_string(),
        }
    }

    /// Returns the error kind.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ResolveError::MissingHandler { .. } => ErrorKind::Configuration,
            ResolveError::MissingIncludeData { .. }
            | ResolveError::UnexpectedShape { .. }
            | ResolveError::SchemaViolation { .. }
            | ResolveError::RecursionLimitExceeded { .. } => ErrorKind::DataShape,
            ResolveError::InvalidHandlerReturn { .. } => ErrorKind::TypeContract,
            ResolveError::Handler { .. } => ErrorKind::Handler,
        }
    }

    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self.kind() {
            ErrorKind::DataShape => 1,
            ErrorKind::Handler => 3,
            ErrorKind::Configuration | ErrorKind::TypeContract => 2,
        }
    }
}

/// Errors while loading data or building validator definitions.
#[derive(Debug, Error)]
pub enum LoadError {
    // IO errors (exit code 3)
    #[error("file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("cannot read {path}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // Parse errors (exit code 2)
    #[error("invalid JSON: {source}")]
    InvalidJson {
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid definitions: {source}")]
    InvalidDefinition {
        #[source]
        source: serde_json::Error,
    },

    // Definition errors (exit code 2)
    #[error("validator \"{validator}\" references unknown validator \"{target}\"")]
    UnknownValidator { validator: String, target: String },

    #[error("validator \"{validator}\" declares include \"{include}\" without a handler")]
    MissingHandler { validator: String, include: String },

    #[error("handler \"{include}\" on validator \"{validator}\" must set exactly one of item or collection")]
    AmbiguousHandler { validator: String, include: String },

    #[error("invalid schema for validator \"{validator}\": {message}")]
    InvalidSchema { validator: String, message: String },
}

impl LoadError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            LoadError::FileNotFound { .. } | LoadError::ReadError { .. } => 3,
            _ => 2,
        }
    }
}

/// Single schema violation with path context.
#[derive(Debug, Clone, serde::Serialize)]
pub struct SchemaError {
    /// JSON Pointer (RFC 6901) to the invalid field.
    pub path: String,
    /// Human-readable error message.
    pub message: String,
}

impl std::fmt::Display for SchemaError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

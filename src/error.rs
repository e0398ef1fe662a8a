//! Error types for document parsing, schema construction and store synchronization.

use std::path::PathBuf;

use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

/// Stable, machine-readable error classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorKind {
    MalformedDocument,
    Unsupported,
    UnsupportedVersion,
    TypeMismatch,
    UnknownType,
    UnknownEntity,
    MissingIdentifier,
    MultipleIdentifiers,
    NullInNonOptional,
    UnexpectedObject,
    Failed,
    WrongEntityInRelationship,
    ServerError,
    InvalidSchema,
    Store,
    Internal,
    Io,
}

impl ErrorKind {
    /// Returns the kebab-case name of this kind (e.g. "null-in-non-optional").
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::MalformedDocument => "malformed-document",
            ErrorKind::Unsupported => "unsupported",
            ErrorKind::UnsupportedVersion => "unsupported-version",
            ErrorKind::TypeMismatch => "type-mismatch",
            ErrorKind::UnknownType => "unknown-type",
            ErrorKind::UnknownEntity => "unknown-entity",
            ErrorKind::MissingIdentifier => "missing-identifier",
            ErrorKind::MultipleIdentifiers => "multiple-identifiers",
            ErrorKind::NullInNonOptional => "null-in-non-optional",
            ErrorKind::UnexpectedObject => "unexpected-object",
            ErrorKind::Failed => "failed",
            ErrorKind::WrongEntityInRelationship => "wrong-entity-in-relationship",
            ErrorKind::ServerError => "server-error",
            ErrorKind::InvalidSchema => "invalid-schema",
            ErrorKind::Store => "store",
            ErrorKind::Internal => "internal",
            ErrorKind::Io => "io",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors while loading or parsing a wire document.
#[derive(Debug, Error)]
pub enum DocumentError {
    // IO errors (exit code 3)
    #[error("file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("cannot read {path}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[cfg(feature = "remote")]
    #[error("failed to fetch {url}: {source}")]
    NetworkError {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    // Parse errors (exit code 2)
    #[error("invalid JSON: {source}")]
    InvalidJson {
        #[source]
        source: serde_json::Error,
    },

    #[error("malformed document: {message}")]
    Malformed { message: String },

    #[error("unsupported: {message}")]
    Unsupported { message: String },

    #[error("version '{version}' of JSON:API not supported")]
    UnsupportedVersion { version: String },
}

impl DocumentError {
    pub(crate) fn malformed(message: impl Into<String>) -> Self {
        DocumentError::Malformed {
            message: message.into(),
        }
    }

    pub(crate) fn unsupported(message: impl Into<String>) -> Self {
        DocumentError::Unsupported {
            message: message.into(),
        }
    }

    /// Returns the error kind.
    pub fn kind(&self) -> ErrorKind {
        match self {
            DocumentError::FileNotFound { .. } | DocumentError::ReadError { .. } => ErrorKind::Io,
            #[cfg(feature = "remote")]
            DocumentError::NetworkError { .. } => ErrorKind::Io,
            DocumentError::InvalidJson { .. } | DocumentError::Malformed { .. } => {
                ErrorKind::MalformedDocument
            }
            DocumentError::Unsupported { .. } => ErrorKind::Unsupported,
            DocumentError::UnsupportedVersion { .. } => ErrorKind::UnsupportedVersion,
        }
    }

    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self.kind() {
            ErrorKind::Io => 3,
            _ => 2,
        }
    }
}

/// Errors raised by a scalar codec.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CodecError {
    #[error("expected {expected}, got {actual}")]
    UnexpectedObject {
        expected: &'static str,
        actual: String,
    },

    #[error("{message}")]
    Failed { message: String },
}

impl CodecError {
    pub(crate) fn unexpected(expected: &'static str, actual: impl Into<String>) -> Self {
        CodecError::UnexpectedObject {
            expected,
            actual: actual.into(),
        }
    }

    pub(crate) fn failed(message: impl Into<String>) -> Self {
        CodecError::Failed {
            message: message.into(),
        }
    }

    /// Returns the error kind.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CodecError::UnexpectedObject { .. } => ErrorKind::UnexpectedObject,
            CodecError::Failed { .. } => ErrorKind::Failed,
        }
    }
}

/// Errors while building a schema registry or loading a model file.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("no remote id found for entity '{entity}'")]
    MissingIdentifier { entity: String },

    #[error("multiple remote ids ({}) for entity '{entity}'", names.join(", "))]
    MultipleIdentifiers { entity: String, names: Vec<String> },

    #[error("duplicate field '{field}' in entity '{entity}'")]
    DuplicateField { entity: String, field: String },

    #[error("entity '{entity}' is declared more than once")]
    DuplicateEntity { entity: String },

    #[error("remote type '{remote_name}' is used by both '{first}' and '{second}'")]
    DuplicateType {
        remote_name: String,
        first: String,
        second: String,
    },

    #[error("no codec named '{codec}' for attribute '{path}'")]
    UnknownCodec { path: String, codec: String },

    #[error("relationship '{path}' targets unknown entity '{target}'")]
    UnknownTarget { path: String, target: String },

    #[error("invalid model: {} violation(s)", violations.len())]
    InvalidModel { violations: Vec<Violation> },

    #[error("file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("cannot read {path}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON: {source}")]
    InvalidJson {
        #[source]
        source: serde_json::Error,
    },
}

impl SchemaError {
    /// Returns the error kind.
    pub fn kind(&self) -> ErrorKind {
        match self {
            SchemaError::MissingIdentifier { .. } => ErrorKind::MissingIdentifier,
            SchemaError::MultipleIdentifiers { .. } => ErrorKind::MultipleIdentifiers,
            SchemaError::UnknownTarget { .. } => ErrorKind::UnknownEntity,
            SchemaError::FileNotFound { .. } | SchemaError::ReadError { .. } => ErrorKind::Io,
            _ => ErrorKind::InvalidSchema,
        }
    }

    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self.kind() {
            ErrorKind::Io => 3,
            _ => 2,
        }
    }
}

/// Single model-file violation with path context.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Violation {
    /// JSON Pointer (RFC 6901) to the offending value.
    pub path: String,
    /// Human-readable error message.
    pub message: String,
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// Failure reported by a [`Store`](crate::Store) implementation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StoreError {
    #[error("unknown entity '{entity}'")]
    UnknownEntity { entity: String },

    #[error("unknown field '{field}' on entity '{entity}'")]
    UnknownField { entity: String, field: String },

    #[error("invalid record handle: {record}")]
    InvalidRecord { record: String },

    #[error("{message}")]
    Backend { message: String },
}

/// Error object passed through from the upstream API.
///
/// The whole object is kept; `message` is its `title` when present.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServerError {
    pub message: String,
    pub object: Map<String, Value>,
}

impl ServerError {
    pub(crate) fn from_object(object: Map<String, Value>) -> Self {
        let message = object
            .get("title")
            .and_then(Value::as_str)
            .unwrap_or("unspecified server error")
            .to_string();
        Self { message, object }
    }
}

impl std::fmt::Display for ServerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.object.get("status").and_then(Value::as_str) {
            Some(status) => write!(f, "[{}] {}", status, self.message),
            None => f.write_str(&self.message),
        }
    }
}

/// Errors while converting documents into change sets and applying them to a store.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Document(#[from] DocumentError),

    #[error("mismatch in type: found '{found}', expected '{expected}'")]
    TypeMismatch { found: String, expected: String },

    #[error("no entity found for remote type '{remote_type}'")]
    UnknownType { remote_type: String },

    #[error("no entity named '{entity}'")]
    UnknownEntity { entity: String },

    #[error("cannot set 'null' to non-optional attribute '{path}' ({kind})")]
    NullInNonOptional { path: String, kind: String },

    #[error("invalid value for '{path}': {source}")]
    Codec {
        path: String,
        #[source]
        source: CodecError,
    },

    #[error("{message} for relationship '{path}'")]
    WrongEntityInRelationship { path: String, message: String },

    #[error("resource of entity '{entity}' has no id")]
    NullIdentifier { entity: String },

    #[error("server returned {} error(s): {}", errors.len(), errors.first().map(ToString::to_string).unwrap_or_default())]
    Server { errors: Vec<ServerError> },

    #[error("multiple records of '{entity}' with id {id}")]
    DuplicateRecord { entity: String, id: String },

    #[error("no record of '{entity}' with id {id}")]
    MissingRecord { entity: String, id: String },

    #[error("record '{entity}' {id} was not resolved before apply")]
    Unresolved { entity: String, id: String },

    #[error("unexpected store value for '{path}': {message}")]
    UnexpectedField { path: String, message: String },

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl SyncError {
    /// Returns the error kind.
    pub fn kind(&self) -> ErrorKind {
        match self {
            SyncError::Document(e) => e.kind(),
            SyncError::TypeMismatch { .. } => ErrorKind::TypeMismatch,
            SyncError::UnknownType { .. } => ErrorKind::UnknownType,
            SyncError::UnknownEntity { .. } => ErrorKind::UnknownEntity,
            SyncError::NullInNonOptional { .. } => ErrorKind::NullInNonOptional,
            SyncError::Codec { source, .. } => source.kind(),
            SyncError::WrongEntityInRelationship { .. } => ErrorKind::WrongEntityInRelationship,
            SyncError::NullIdentifier { .. } => ErrorKind::MissingIdentifier,
            SyncError::Server { .. } => ErrorKind::ServerError,
            SyncError::DuplicateRecord { .. } | SyncError::MissingRecord { .. } => {
                ErrorKind::Store
            }
            SyncError::Unresolved { .. } | SyncError::UnexpectedField { .. } => {
                ErrorKind::Internal
            }
            SyncError::Store(_) => ErrorKind::Store,
        }
    }

    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            SyncError::Document(e) => e.exit_code(),
            _ => 1,
        }
    }
}

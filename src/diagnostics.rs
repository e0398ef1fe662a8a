//! Best-effort reporting of fields that do not line up with the schema.
//!
//! Diagnostics never change whether an operation succeeds. A registry without
//! a sink behaves exactly like one with a sink.

use std::fmt;
use std::sync::Mutex;

use serde::Serialize;
use tracing::{debug, warn};

/// Severity level for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Info,
}

/// A single diagnostic produced while deserializing a resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    /// One of `unknown-attribute`, `unknown-relationship`,
    /// `missing-attribute`, `missing-relationship`.
    pub code: String,
    /// Dotted path, e.g. `Pet.nickName`.
    pub path: String,
    pub message: String,
}

impl Diagnostic {
    pub(crate) fn unknown(kind: &str, entity: &str, remote_name: &str) -> Self {
        Self {
            severity: Severity::Warning,
            code: format!("unknown-{}", kind),
            path: format!("{}.{}", entity, remote_name),
            message: format!("{} '{}' is not part of the {} schema", kind, remote_name, entity),
        }
    }

    pub(crate) fn missing(kind: &str, entity: &str, name: &str, remote_name: &str) -> Self {
        Self {
            severity: Severity::Info,
            code: format!("missing-{}", kind),
            path: format!("{}.{}", entity, name),
            message: format!("{} '{}' was not present in the resource", kind, remote_name),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.code, self.path, self.message)
    }
}

/// Receiver for diagnostics.
pub trait DiagnosticSink: fmt::Debug + Send + Sync {
    fn report(&self, diagnostic: Diagnostic);
}

/// Forwards diagnostics to `tracing`.
///
/// Unknown fields are logged at `warn`, missing fields at `debug`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn report(&self, diagnostic: Diagnostic) {
        match diagnostic.severity {
            Severity::Warning => warn!(
                code = %diagnostic.code,
                path = %diagnostic.path,
                "{}",
                diagnostic.message
            ),
            Severity::Info => debug!(
                code = %diagnostic.code,
                path = %diagnostic.path,
                "{}",
                diagnostic.message
            ),
        }
    }
}

/// Collects diagnostics in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    diagnostics: Mutex<Vec<Diagnostic>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Diagnostics reported so far, in order.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        match self.diagnostics.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Diagnostics with the given code.
    pub fn with_code(&self, code: &str) -> Vec<Diagnostic> {
        self.diagnostics()
            .into_iter()
            .filter(|d| d.code == code)
            .collect()
    }
}

impl DiagnosticSink for MemorySink {
    fn report(&self, diagnostic: Diagnostic) {
        match self.diagnostics.lock() {
            Ok(mut guard) => guard.push(diagnostic),
            Err(poisoned) => poisoned.into_inner().push(diagnostic),
        }
    }
}

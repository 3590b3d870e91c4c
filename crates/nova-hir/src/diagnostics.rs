use nova_syntax::{FileId, Span};
use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// A semantic error found while resolving a program.
///
/// Messages never mention offsets, so the same problem produces the same
/// `(file, code, message)` key before and after an unrelated edit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub file: FileId,
    pub severity: Severity,
    pub code: &'static str,
    pub message: String,
    pub span: Span,
}

impl Diagnostic {
    pub fn error(file: FileId, code: &'static str, message: impl Into<String>, span: Span) -> Self {
        Self {
            file,
            severity: Severity::Error,
            code,
            message: message.into(),
            span,
        }
    }

    /// Identity used when comparing diagnostics across program snapshots.
    pub fn key(&self) -> (&FileId, &'static str, &str) {
        (&self.file, self.code, &self.message)
    }
}

pub const UNRESOLVED_NAME: &str = "unresolved-name";
pub const UNRESOLVED_FIELD: &str = "unresolved-field";
pub const UNRESOLVED_METHOD: &str = "unresolved-method";
pub const UNRESOLVED_CONSTRUCTOR: &str = "unresolved-constructor";
pub const ABSTRACT_INSTANTIATION: &str = "abstract-instantiation";
pub const MISSING_IMPLEMENTATION: &str = "missing-implementation";
pub const NO_DEFAULT_CONSTRUCTOR: &str = "no-default-constructor";
pub const STATIC_CONTEXT: &str = "static-context";

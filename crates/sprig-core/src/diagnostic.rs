use serde::Serialize;

use crate::{SourceLocation, Span};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: &'static str,
    pub message: String,
    pub span: Option<Span>,
}

impl Diagnostic {
    pub fn error(code: &'static str, message: impl Into<String>, span: Option<Span>) -> Self {
        Self {
            severity: Severity::Error,
            code,
            message: message.into(),
            span,
        }
    }
}

/// Diagnostic payload annotated with its owning source file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SourceDiagnostic {
    pub file: String,
    pub diagnostic: Diagnostic,
}

impl SourceDiagnostic {
    pub fn at(location: &SourceLocation, diagnostic: Diagnostic) -> Self {
        Self {
            file: location.file().to_string(),
            diagnostic,
        }
    }
}

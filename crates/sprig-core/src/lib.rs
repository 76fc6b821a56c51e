//! Core shared types for sprig.
//!
//! This crate is intentionally small: byte spans, source locations, a line index
//! for human-readable output, and the diagnostic payload used by analyses.

mod diagnostic;
mod location;
mod text;

pub use diagnostic::{Diagnostic, Severity, SourceDiagnostic};
pub use location::{SourceLocation, Span};
pub use text::{LineCol, LineIndex};

use std::fmt;
use std::sync::Arc;

use serde::Serialize;

/// A byte-span into a source string.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub const fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    /// Whether `offset` falls inside the span. The end offset is inclusive so a
    /// cursor placed right after an identifier still hits it.
    pub fn contains_offset(&self, offset: usize) -> bool {
        self.start <= offset && offset <= self.end
    }
}

impl fmt::Debug for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Span({}..{})", self.start, self.end)
    }
}

/// A span within a named source file.
///
/// Locations order by file path first and then by span, which gives index
/// consumers a stable declaration order across the whole workspace.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct SourceLocation {
    pub file: Arc<str>,
    pub span: Span,
}

impl SourceLocation {
    pub fn new(file: impl Into<Arc<str>>, span: Span) -> Self {
        Self {
            file: file.into(),
            span,
        }
    }

    /// The smallest location within `file`; useful as a range lower bound.
    pub fn file_start(file: impl Into<Arc<str>>) -> Self {
        Self::new(file, Span::new(0, 0))
    }

    pub fn file(&self) -> &str {
        &self.file
    }

    pub fn contains(&self, file: &str, offset: usize) -> bool {
        &*self.file == file && self.span.contains_offset(offset)
    }
}

impl fmt::Debug for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}..{}", self.file, self.span.start, self.span.end)
    }
}

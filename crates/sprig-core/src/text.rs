//! Offset to line/column conversion for reporting.

use serde::Serialize;

/// Zero-based line and UTF-8 byte column.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize)]
pub struct LineCol {
    pub line: u32,
    pub col: u32,
}

/// Pre-computed line start offsets for a particular text snapshot.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LineIndex {
    line_starts: Vec<usize>,
    line_ends: Vec<usize>,
    text_len: usize,
}

impl LineIndex {
    pub fn new(text: &str) -> Self {
        let bytes = text.as_bytes();
        let mut line_starts = vec![0];
        let mut line_ends = Vec::new();

        let mut i = 0;
        while i < bytes.len() {
            match bytes[i] {
                b'\n' => {
                    line_ends.push(i);
                    line_starts.push(i + 1);
                    i += 1;
                }
                b'\r' if bytes.get(i + 1) == Some(&b'\n') => {
                    line_ends.push(i);
                    line_starts.push(i + 2);
                    i += 2;
                }
                b'\r' => {
                    line_ends.push(i);
                    line_starts.push(i + 1);
                    i += 1;
                }
                _ => i += 1,
            }
        }
        line_ends.push(text.len());

        Self {
            line_starts,
            line_ends,
            text_len: text.len(),
        }
    }

    pub fn line_count(&self) -> u32 {
        self.line_starts.len() as u32
    }

    fn line_index(&self, offset: usize) -> usize {
        // Offsets past the end clamp to EOF.
        let offset = offset.min(self.text_len);
        match self.line_starts.binary_search(&offset) {
            Ok(line) => line,
            Err(insert) => insert.saturating_sub(1),
        }
    }

    /// Convert a byte offset to a line/column pair.
    pub fn line_col(&self, offset: usize) -> LineCol {
        let offset = offset.min(self.text_len);
        let line = self.line_index(offset);
        let col = offset.min(self.line_ends[line]) - self.line_starts[line];
        LineCol {
            line: line as u32,
            col: col as u32,
        }
    }

    /// Convert a line/column pair back to a byte offset.
    pub fn offset(&self, line_col: LineCol) -> Option<usize> {
        let start = *self.line_starts.get(line_col.line as usize)?;
        let end = *self.line_ends.get(line_col.line as usize)?;
        let offset = start + line_col.col as usize;
        (offset <= end).then_some(offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    #[test]
    fn handles_mixed_line_endings() {
        let text = "ab\r\ncd\ref\ngh";
        let index = LineIndex::new(text);
        assert_eq!(index.line_count(), 4);
        assert_eq!(index.line_col(0), LineCol { line: 0, col: 0 });
        assert_eq!(index.line_col(4), LineCol { line: 1, col: 0 });
        assert_eq!(index.line_col(8), LineCol { line: 2, col: 1 });
        assert_eq!(index.line_col(text.len()), LineCol { line: 3, col: 2 });
    }

    #[test]
    fn offset_rejects_columns_past_line_end() {
        let index = LineIndex::new("abc\nd");
        assert_eq!(index.offset(LineCol { line: 0, col: 3 }), Some(3));
        assert_eq!(index.offset(LineCol { line: 0, col: 4 }), None);
        assert_eq!(index.offset(LineCol { line: 2, col: 0 }), None);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(256))]

        #[test]
        fn line_col_round_trips_at_char_boundaries(text in "[ab\n\r ]{0,48}", pick in any::<prop::sample::Index>()) {
            let boundaries: Vec<usize> = text
                .char_indices()
                .map(|(i, _)| i)
                .chain(std::iter::once(text.len()))
                .collect();
            let offset = boundaries[pick.index(boundaries.len())];
            let index = LineIndex::new(&text);
            let line_col = index.line_col(offset);
            // Offsets between `\r` and `\n` collapse onto the line end.
            let expected = if offset > 0
                && text.as_bytes().get(offset - 1) == Some(&b'\r')
                && text.as_bytes().get(offset) == Some(&b'\n')
            {
                offset - 1
            } else {
                offset
            };
            prop_assert_eq!(index.offset(line_col), Some(expected));
        }
    }
}

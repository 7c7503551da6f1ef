//! Row layout for the compose buffer.
//!
//! The buffer is split on `\n` into logical lines and each logical line is
//! word-wrapped with `textwrap`. Every visual row keeps the byte range it
//! covers in the buffer, so caret placement and vertical movement work on
//! byte offsets without re-wrapping.

use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// Borders (2) + horizontal padding (2).
pub(super) const HORIZONTAL_OVERHEAD: u16 = 4;
/// Top + bottom borders.
pub(super) const VERTICAL_OVERHEAD: u16 = 2;
/// Rows shown before the box scrolls internally.
pub(super) const MAX_VISIBLE_ROWS: u16 = 5;
/// Distance from the block edge to the first text cell (border + padding).
pub(super) const TEXT_INSET: u16 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct Row {
    /// Byte offset of the first character on this row.
    pub start: usize,
    /// Byte offset one past the last character (never includes `\n`).
    pub end: usize,
}

pub(super) fn text_width(area_width: u16) -> u16 {
    area_width.saturating_sub(HORIZONTAL_OVERHEAD)
}

fn wrap_options(width: u16) -> textwrap::Options<'static> {
    textwrap::Options::new(usize::from(width))
        .break_words(true)
        .word_separator(textwrap::WordSeparator::AsciiSpace)
}

/// Visual rows of `text` at `width` columns. Always at least one row.
pub(super) fn rows(text: &str, width: u16) -> Vec<Row> {
    let mut rows = Vec::new();
    let mut line_start = 0;

    for logical in text.split('\n') {
        if width == 0 || logical.trim().is_empty() {
            rows.push(Row {
                start: line_start,
                end: line_start + logical.len(),
            });
        } else {
            let mut pos = 0;
            for piece in textwrap::wrap(logical, wrap_options(width)) {
                let found = logical[pos..]
                    .find(piece.as_ref())
                    .map_or(pos, |i| pos + i);
                let end = found + piece.len();
                rows.push(Row {
                    start: line_start + found,
                    end: line_start + end,
                });
                pos = end;
            }
            // Trailing whitespace stays on the final row so the caret can reach it.
            if let Some(last) = rows.last_mut() {
                last.end = line_start + logical.len();
            }
        }
        line_start += logical.len() + 1;
    }
    rows
}

/// Index of the row holding byte offset `caret`.
pub(super) fn caret_row(rows: &[Row], caret: usize) -> usize {
    rows.iter().rposition(|r| r.start <= caret).unwrap_or(0)
}

/// Display column of `caret` within its row.
pub(super) fn caret_column(text: &str, row: Row, caret: usize) -> u16 {
    let end = caret.clamp(row.start, text.len());
    text[row.start..end].width() as u16
}

/// Byte offset on `row` closest to display column `column`.
pub(super) fn offset_at_column(text: &str, row: Row, column: u16) -> usize {
    let mut used = 0u16;
    for (i, c) in text[row.start..row.end].char_indices() {
        let w = c.width().unwrap_or(0) as u16;
        if used + w > column {
            return row.start + i;
        }
        used += w;
    }
    row.end
}

pub(super) fn prev_boundary(text: &str, pos: usize) -> usize {
    text[..pos].char_indices().next_back().map_or(0, |(i, _)| i)
}

pub(super) fn next_boundary(text: &str, pos: usize) -> usize {
    text[pos..]
        .chars()
        .next()
        .map_or(text.len(), |c| pos + c.len_utf8())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spans<'a>(text: &'a str, width: u16) -> Vec<&'a str> {
        rows(text, width)
            .into_iter()
            .map(|r| &text[r.start..r.end])
            .collect()
    }

    #[test]
    fn empty_buffer_has_one_row() {
        assert_eq!(rows("", 20), vec![Row { start: 0, end: 0 }]);
    }

    #[test]
    fn trailing_newline_opens_a_new_row() {
        assert_eq!(spans("hello\n", 20), vec!["hello", ""]);
    }

    #[test]
    fn long_lines_wrap_at_words() {
        assert_eq!(spans("hello world", 7), vec!["hello ", "world"]);
        assert_eq!(spans("abcdefghij", 4), vec!["abcd", "efgh", "ij"]);
    }

    #[test]
    fn caret_lands_on_following_row_after_newline() {
        let text = "ab\ncd";
        let rows = rows(text, 20);
        assert_eq!(caret_row(&rows, 2), 0);
        assert_eq!(caret_row(&rows, 3), 1);
        assert_eq!(caret_column(text, rows[1], 4), 1);
    }

    #[test]
    fn wide_characters_count_double() {
        let text = "用户x";
        let row = rows(text, 20)[0];
        assert_eq!(caret_column(text, row, text.len()), 5);
        assert_eq!(offset_at_column(text, row, 2), "用".len());
        assert_eq!(offset_at_column(text, row, 3), "用".len());
    }

    #[test]
    fn boundaries_respect_multibyte_chars() {
        let s = "a用b";
        assert_eq!(next_boundary(s, 1), 4);
        assert_eq!(prev_boundary(s, 4), 1);
        assert_eq!(prev_boundary(s, 0), 0);
        assert_eq!(next_boundary(s, s.len()), s.len());
    }
}

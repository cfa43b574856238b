//! Wrapping math and boundary helpers for the composer box.
//!
//! Stateless: nothing here knows about `ComposerBox` or `CursorState`.

use std::ops::Range;

/// Border (2) + padding (2) consumed horizontally by the bordered block
pub(super) const HORIZONTAL_OVERHEAD: u16 = 4;
/// Top + bottom borders consumed vertically
pub(super) const VERTICAL_OVERHEAD: u16 = 2;
/// Content lines shown before the box starts scrolling internally
pub(super) const MAX_VISIBLE_LINES: u16 = 6;
/// Rows between the top edge and the first content row (the border)
pub(super) const BORDER_OFFSET: u16 = 1;
/// Columns between the left edge and the first content column (border + padding)
pub(super) const CONTENT_OFFSET: u16 = 2;

pub(super) fn wrap_options(inner_width: u16) -> textwrap::Options<'static> {
    textwrap::Options::new(inner_width as usize)
        .break_words(true)
        .word_separator(textwrap::WordSeparator::AsciiSpace)
}

/// Width left for text once borders and padding are taken; 0 when too narrow.
pub(super) fn inner_width(content_width: u16) -> u16 {
    content_width.saturating_sub(HORIZONTAL_OVERHEAD)
}

/// Byte ranges of the visual rows `text` occupies at `width`.
///
/// Logical lines are split on `\n` (the newline itself belongs to no row)
/// and each is soft-wrapped. A row runs up to where the next one starts, so
/// the whitespace textwrap trims at a wrap point stays on the earlier row.
/// An empty line, including the one after a trailing newline, still gets a
/// row: the cursor can sit there.
pub(super) fn visual_rows(text: &str, width: u16) -> Vec<Range<usize>> {
    let mut rows = Vec::new();
    let mut line_start = 0;
    for line in text.split('\n') {
        let line_end = line_start + line.len();
        if width == 0 || line.is_empty() {
            rows.push(line_start..line_end);
        } else {
            let mut starts = vec![line_start];
            let mut search = 0;
            for (i, segment) in textwrap::wrap(line, wrap_options(width)).iter().enumerate() {
                let at = line[search..]
                    .find(segment.as_ref())
                    .map_or(search, |found| search + found);
                if i > 0 {
                    starts.push(line_start + at);
                }
                search = at + segment.len();
            }
            let ends = starts.iter().skip(1).copied().chain([line_end]);
            rows.extend(starts.iter().zip(ends).map(|(&s, e)| s..e));
        }
        line_start = line_end + 1;
    }
    rows
}

/// Number of visual rows, at least 1.
pub(super) fn row_count(text: &str, width: u16) -> u16 {
    u16::try_from(visual_rows(text, width).len().max(1)).unwrap_or(u16::MAX)
}

pub(super) fn prev_char_boundary(text: &str, pos: usize) -> usize {
    text[..pos]
        .char_indices()
        .next_back()
        .map_or(0, |(i, _)| i)
}

pub(super) fn next_char_boundary(text: &str, pos: usize) -> usize {
    text[pos..]
        .char_indices()
        .nth(1)
        .map_or(text.len(), |(i, _)| pos + i)
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// readline `backward-word`: skip separators, then the word before them.
pub(super) fn prev_word_boundary(text: &str, pos: usize) -> usize {
    let mut boundary = pos;
    let mut seen_word = false;
    for (i, c) in text[..pos].char_indices().rev() {
        if is_word_char(c) {
            seen_word = true;
        } else if seen_word {
            break;
        }
        boundary = i;
    }
    boundary
}

/// readline `forward-word`: skip separators, then the word after them.
pub(super) fn next_word_boundary(text: &str, pos: usize) -> usize {
    let mut seen_word = false;
    for (i, c) in text[pos..].char_indices() {
        if is_word_char(c) {
            seen_word = true;
        } else if seen_word {
            return pos + i;
        }
    }
    text.len()
}

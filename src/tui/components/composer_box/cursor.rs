//! Cursor position tracking and navigation for the composer box.
//!
//! `CursorState` owns the cursor byte offset, the internal scroll offset and
//! the width seen at the last render. The text itself stays in `ComposerBox`
//! and is passed in explicitly.

use ratatui::layout::Rect;
use unicode_width::UnicodeWidthStr;

use super::text_wrap::{
    BORDER_OFFSET, CONTENT_OFFSET, MAX_VISIBLE_LINES, inner_width, visual_rows,
};

pub(super) struct CursorState {
    /// Byte offset into the buffer (0..=buffer.len())
    pub pos: usize,
    /// First visible row when the text overflows the box
    pub scroll_offset: u16,
    /// Box width from the last render, used for vertical movement between frames
    pub last_content_width: u16,
}

impl CursorState {
    const DEFAULT_WIDTH: u16 = 80;

    pub fn new() -> Self {
        Self {
            pos: 0,
            scroll_offset: 0,
            last_content_width: Self::DEFAULT_WIDTH,
        }
    }

    pub fn reset(&mut self) {
        self.pos = 0;
        self.scroll_offset = 0;
    }

    /// Visual (row, display column) of the cursor.
    pub fn locate(&self, buffer: &str, content_width: u16) -> (usize, usize) {
        let rows = visual_rows(buffer, inner_width(content_width));
        let row = rows
            .partition_point(|r| r.start <= self.pos)
            .saturating_sub(1);
        let col = rows
            .get(row)
            .map_or(0, |r| buffer[r.start..self.pos.max(r.start)].width());
        (row, col)
    }

    /// Move one visual row up (`direction < 0`) or down, keeping the display
    /// column where the target row is long enough.
    ///
    /// Returns `false` when already on the first or last row.
    pub fn move_vertically(&mut self, buffer: &str, direction: i16, content_width: u16) -> bool {
        let width = inner_width(content_width);
        if width == 0 || buffer.is_empty() {
            return false;
        }

        let rows = visual_rows(buffer, width);
        let (row, col) = self.locate(buffer, content_width);
        let target = if direction < 0 {
            match row.checked_sub(1) {
                Some(target) => target,
                None => return false,
            }
        } else if row + 1 < rows.len() {
            row + 1
        } else {
            return false;
        };

        let span = rows[target].clone();
        let mut pos = span.start;
        let mut walked = 0;
        for (i, c) in buffer[span.clone()].char_indices() {
            let next = walked + c.to_string().width();
            if next > col {
                break;
            }
            walked = next;
            pos = span.start + i + c.len_utf8();
        }
        self.pos = pos;
        true
    }

    /// Keep the cursor row inside the visible window.
    pub fn update_scroll_offset(&mut self, buffer: &str, content_width: u16) {
        let total =
            u16::try_from(visual_rows(buffer, inner_width(content_width)).len()).unwrap_or(u16::MAX);
        if total <= MAX_VISIBLE_LINES {
            self.scroll_offset = 0;
            return;
        }

        let (row, _) = self.locate(buffer, content_width);
        let row = u16::try_from(row).unwrap_or(u16::MAX);
        if row < self.scroll_offset {
            self.scroll_offset = row;
        } else if row >= self.scroll_offset.saturating_add(MAX_VISIBLE_LINES) {
            self.scroll_offset = row.saturating_add(1) - MAX_VISIBLE_LINES;
        }
        self.scroll_offset = self.scroll_offset.min(total - MAX_VISIBLE_LINES);
    }

    /// Terminal (column, row) of the cursor inside `area`.
    pub fn screen_pos(&self, buffer: &str, area: Rect) -> (u16, u16) {
        let (row, col) = self.locate(buffer, area.width);
        let max_col = inner_width(area.width);
        let col = u16::try_from(col).unwrap_or(u16::MAX).min(max_col);
        let visible_row = u16::try_from(row)
            .unwrap_or(u16::MAX)
            .saturating_sub(self.scroll_offset);
        (
            area.x + CONTENT_OFFSET + col,
            area.y + BORDER_OFFSET + visible_row,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(pos: usize) -> CursorState {
        CursorState {
            pos,
            ..CursorState::new()
        }
    }

    #[test]
    fn locate_on_wrapped_rows() {
        // inner width 5: "hello " | "world"
        let buffer = "hello world";
        assert_eq!(at(3).locate(buffer, 9), (0, 3));
        assert_eq!(at(6).locate(buffer, 9), (1, 0));
        assert_eq!(at(11).locate(buffer, 9), (1, 5));
    }

    #[test]
    fn locate_after_trailing_newline() {
        assert_eq!(at(6).locate("hello\n", 80), (1, 0));
    }

    #[test]
    fn locate_uses_display_width() {
        // '你' is two columns wide
        assert_eq!(at(3).locate("你好", 80), (0, 2));
    }

    #[test]
    fn vertical_movement_keeps_column() {
        let buffer = "abcdef\nxy\nlonger line";
        let mut cursor = at(4); // "abcd|ef"
        assert!(cursor.move_vertically(buffer, 1, 80));
        assert_eq!(cursor.pos, 9); // clamped to end of "xy"
        assert!(cursor.move_vertically(buffer, 1, 80));
        assert_eq!(cursor.pos, 12); // column 2 of "longer line"
        assert!(!cursor.move_vertically(buffer, 1, 80));
        assert!(cursor.move_vertically(buffer, -1, 80));
        assert!(cursor.move_vertically(buffer, -1, 80));
        assert_eq!(cursor.pos, 2);
        assert!(!cursor.move_vertically(buffer, -1, 80));
    }

    #[test]
    fn scroll_follows_cursor() {
        let buffer = "1\n2\n3\n4\n5\n6\n7\n8";
        let mut cursor = at(buffer.len());
        cursor.update_scroll_offset(buffer, 80);
        assert_eq!(cursor.scroll_offset, 2);

        cursor.pos = 0;
        cursor.update_scroll_offset(buffer, 80);
        assert_eq!(cursor.scroll_offset, 0);
    }

    #[test]
    fn scroll_clamps_past_u16_rows() {
        let buffer = "a\n".repeat(70_000);
        let mut cursor = at(buffer.len());
        cursor.update_scroll_offset(&buffer, 80);
        assert_eq!(cursor.scroll_offset, u16::MAX - MAX_VISIBLE_LINES);
    }

    #[test]
    fn screen_position_accounts_for_border_and_padding() {
        let area = Rect::new(10, 5, 40, 4);
        assert_eq!(at(2).screen_pos("hi", area), (14, 6));
    }
}

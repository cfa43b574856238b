//! # ComposerBox Component
//!
//! The text area of the composer.
//!
//! ## Responsibilities
//!
//! - Capture typing, paste and line breaks
//! - Cursor movement by character, word and visual row
//! - Report every edit upward as `ComposerInput::Changed`
//! - Report Enter upward; whether it submits is decided in core
//!
//! ## State Management
//!
//! The buffer mirrors `Composer::draft`. Edits flow up as `Changed` and land
//! in core through `Action::TextChanged`. Changes that start in core (a reset
//! after submit, decoded document text appended to the draft) flow back
//! through [`ComposerBox::sync`] before each frame.

mod cursor;
mod text_wrap;

use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{
    Block, BorderType, Padding, Paragraph, Scrollbar, ScrollbarOrientation, ScrollbarState,
};

use crate::tui::component::{Component, EventHandler};
use crate::tui::event::TuiEvent;

use cursor::CursorState;
use text_wrap::{
    MAX_VISIBLE_LINES, VERTICAL_OVERHEAD, inner_width, next_char_boundary, next_word_boundary,
    prev_char_boundary, prev_word_boundary, row_count, visual_rows,
};

/// High-level events emitted by the ComposerBox
#[derive(Debug, Clone, PartialEq)]
pub enum ComposerInput {
    /// The text changed; carries the full new text.
    Changed(String),
    /// Enter without Shift.
    Enter,
    /// Only the cursor moved.
    Moved,
}

/// Text input component.
///
/// # Props
///
/// - `recording`: shows the recording marker in the title
/// - `loading`: a reply is streaming; Enter will queue
pub struct ComposerBox {
    buffer: String,
    pub recording: bool,
    pub loading: bool,
    cursor: CursorState,
}

impl Default for ComposerBox {
    fn default() -> Self {
        Self::new()
    }
}

impl ComposerBox {
    pub fn new() -> Self {
        Self {
            buffer: String::new(),
            recording: false,
            loading: false,
            cursor: CursorState::new(),
        }
    }

    pub fn text(&self) -> &str {
        &self.buffer
    }

    /// Adopt `draft` if it differs from the buffer. The cursor goes to the end.
    pub fn sync(&mut self, draft: &str) {
        if self.buffer == draft {
            return;
        }
        self.buffer.clear();
        self.buffer.push_str(draft);
        if self.buffer.is_empty() {
            self.cursor.reset();
        } else {
            self.cursor.pos = self.buffer.len();
        }
    }

    /// Height for the current text, between one row and `MAX_VISIBLE_LINES`
    /// rows plus borders.
    pub fn calculate_height(&self, content_width: u16) -> u16 {
        let rows = row_count(&self.buffer, inner_width(content_width));
        rows.min(MAX_VISIBLE_LINES) + VERTICAL_OVERHEAD
    }

    fn insert(&mut self, text: &str) -> ComposerInput {
        self.buffer.insert_str(self.cursor.pos, text);
        self.cursor.pos += text.len();
        ComposerInput::Changed(self.buffer.clone())
    }

    fn move_to(&mut self, pos: usize) -> Option<ComposerInput> {
        (pos != self.cursor.pos).then(|| {
            self.cursor.pos = pos;
            ComposerInput::Moved
        })
    }

    fn title(&self) -> Line<'static> {
        let hint = Style::new().fg(Color::DarkGray);
        let mut spans = vec![Span::raw(" Message ")];
        if self.recording {
            spans.push(Span::styled(
                "● REC ",
                Style::new().fg(Color::Red).add_modifier(Modifier::BOLD),
            ));
        }
        let keys = if self.loading {
            "Enter queue · Esc stop "
        } else {
            "Enter send · Shift+Enter newline · Ctrl+O attach · Ctrl+R record "
        };
        spans.push(Span::styled(keys, hint));
        Line::from(spans)
    }

    fn render_scrollbar(&self, frame: &mut Frame, area: Rect, total_rows: u16) {
        if total_rows <= MAX_VISIBLE_LINES {
            return;
        }

        // content_length is the maximum scroll position, not the row count
        let max_scroll = total_rows.saturating_sub(MAX_VISIBLE_LINES);
        let mut state = ScrollbarState::default()
            .content_length(max_scroll as usize)
            .position(self.cursor.scroll_offset as usize);

        let scrollbar_area = Rect {
            x: area.x + area.width.saturating_sub(1),
            y: area.y + 1,
            width: 1,
            height: area.height.saturating_sub(2),
        };
        frame.render_stateful_widget(
            Scrollbar::new(ScrollbarOrientation::VerticalRight),
            scrollbar_area,
            &mut state,
        );
    }
}

impl Component for ComposerBox {
    fn render(&mut self, frame: &mut Frame, area: Rect) {
        self.cursor.last_content_width = area.width;
        self.cursor.update_scroll_offset(&self.buffer, area.width);

        let rows = visual_rows(&self.buffer, inner_width(area.width));
        let visible: Vec<Line> = rows
            .iter()
            .skip(self.cursor.scroll_offset as usize)
            .take(MAX_VISIBLE_LINES as usize)
            .map(|r| Line::raw(&self.buffer[r.clone()]))
            .collect();

        let border = if self.recording {
            Style::new().fg(Color::Red)
        } else {
            Style::new().fg(Color::Green)
        };
        let block = Block::bordered()
            .border_type(BorderType::Rounded)
            .border_style(border)
            .title(self.title())
            .padding(Padding::horizontal(1));

        frame.render_widget(
            Paragraph::new(visible)
                .block(block)
                .style(Style::new().fg(Color::Green)),
            area,
        );
        self.render_scrollbar(frame, area, u16::try_from(rows.len()).unwrap_or(u16::MAX));

        frame.set_cursor_position(self.cursor.screen_pos(&self.buffer, area));
    }
}

impl EventHandler for ComposerBox {
    type Event = ComposerInput;

    fn handle_event(&mut self, event: &TuiEvent) -> Option<Self::Event> {
        let pos = self.cursor.pos;
        match event {
            TuiEvent::InputChar(c) => Some(self.insert(c.encode_utf8(&mut [0; 4]))),
            TuiEvent::Newline => Some(self.insert("\n")),
            TuiEvent::Paste(text) => {
                // Terminals paste CRLF on some platforms
                let text = text.replace("\r\n", "\n").replace('\r', "\n");
                Some(self.insert(&text))
            }
            TuiEvent::Backspace if pos > 0 => {
                let prev = prev_char_boundary(&self.buffer, pos);
                self.buffer.drain(prev..pos);
                self.cursor.pos = prev;
                Some(ComposerInput::Changed(self.buffer.clone()))
            }
            TuiEvent::Delete if pos < self.buffer.len() => {
                let next = next_char_boundary(&self.buffer, pos);
                self.buffer.drain(pos..next);
                Some(ComposerInput::Changed(self.buffer.clone()))
            }
            TuiEvent::CursorLeft if pos > 0 => self.move_to(prev_char_boundary(&self.buffer, pos)),
            TuiEvent::CursorRight if pos < self.buffer.len() => {
                self.move_to(next_char_boundary(&self.buffer, pos))
            }
            TuiEvent::WordLeft => self.move_to(prev_word_boundary(&self.buffer, pos)),
            TuiEvent::WordRight => self.move_to(next_word_boundary(&self.buffer, pos)),
            TuiEvent::CursorHome => {
                let line_start = self.buffer[..pos].rfind('\n').map_or(0, |i| i + 1);
                self.move_to(line_start)
            }
            TuiEvent::CursorEnd => {
                let line_end = self.buffer[pos..]
                    .find('\n')
                    .map_or(self.buffer.len(), |i| pos + i);
                self.move_to(line_end)
            }
            TuiEvent::CursorUp => {
                let width = self.cursor.last_content_width;
                self.cursor
                    .move_vertically(&self.buffer, -1, width)
                    .then_some(ComposerInput::Moved)
            }
            TuiEvent::CursorDown => {
                let width = self.cursor.last_content_width;
                self.cursor
                    .move_vertically(&self.buffer, 1, width)
                    .then_some(ComposerInput::Moved)
            }
            TuiEvent::Submit => Some(ComposerInput::Enter),
            _ => None,
        }
    }
}

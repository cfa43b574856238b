//! # AttachPrompt Component
//!
//! Ctrl+O overlay asking for a file path, for terminals that cannot drop
//! files onto the window. Enter hands the path up; Esc dismisses.

use std::path::PathBuf;

use ratatui::Frame;
use ratatui::layout::{Constraint, Flex, Layout, Rect};
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, BorderType, Clear, Padding, Paragraph};
use unicode_width::UnicodeWidthStr;

use crate::tui::component::{Component, EventHandler};
use crate::tui::event::TuiEvent;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttachPromptEvent {
    Submit(PathBuf),
    Cancel,
}

#[derive(Debug, Default)]
pub struct AttachPrompt {
    buffer: String,
    /// Shown under the input after a failed attempt.
    pub error: Option<String>,
}

impl AttachPrompt {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn input(&self) -> &str {
        &self.buffer
    }
}

/// `~/x` → `$HOME/x`. Surrounding quotes from a copied path are dropped.
fn expand_path(raw: &str) -> PathBuf {
    let raw = raw.trim().trim_matches(|c| c == '"' || c == '\'');
    match (raw.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(raw),
    }
}

impl EventHandler for AttachPrompt {
    type Event = AttachPromptEvent;

    fn handle_event(&mut self, event: &TuiEvent) -> Option<Self::Event> {
        match event {
            TuiEvent::InputChar(c) => {
                self.buffer.push(*c);
                None
            }
            TuiEvent::Paste(text) => {
                self.buffer.push_str(text.trim_end_matches(['\r', '\n']));
                None
            }
            TuiEvent::Backspace => {
                self.buffer.pop();
                None
            }
            TuiEvent::Submit if !self.buffer.trim().is_empty() => {
                Some(AttachPromptEvent::Submit(expand_path(&self.buffer)))
            }
            TuiEvent::Escape => Some(AttachPromptEvent::Cancel),
            _ => None,
        }
    }
}

impl Component for AttachPrompt {
    fn render(&mut self, frame: &mut Frame, area: Rect) {
        let height = if self.error.is_some() { 4 } else { 3 };
        let [row] = Layout::vertical([Constraint::Length(height)])
            .flex(Flex::Center)
            .areas(area);
        let [popup] = Layout::horizontal([Constraint::Percentage(70)])
            .flex(Flex::Center)
            .areas(row);

        let block = Block::bordered()
            .border_type(BorderType::Rounded)
            .border_style(Style::new().fg(Color::Magenta))
            .title(" Attach file · Enter attach · Esc cancel ")
            .padding(Padding::horizontal(1));
        let inner = block.inner(popup);

        let mut lines = vec![Line::from(vec![
            Span::styled("Path: ", Style::new().fg(Color::DarkGray)),
            Span::raw(self.buffer.clone()),
        ])];
        if let Some(error) = &self.error {
            lines.push(Line::styled(error.clone(), Style::new().fg(Color::Red)));
        }

        frame.render_widget(Clear, popup);
        frame.render_widget(Paragraph::new(lines).block(block), popup);

        let cursor_x = inner.x + ("Path: ".width() + self.buffer.width()) as u16;
        frame.set_cursor_position((cursor_x.min(inner.right().saturating_sub(1)), inner.y));
    }
}

//! # TitleBar Component
//!
//! One line at the top of the screen:
//!
//! ```text
//! Quill (model: gpt-4o-mini) | Waiting for response… | ● REC | ↓ New
//! ```
//!
//! Stateless and props-only. Sections after the model appear only when they
//! have something to say, in that order, so on narrow terminals the model
//! and status survive truncation.

use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};

use crate::tui::component::Component;

pub struct TitleBar<'a> {
    pub model_name: &'a str,
    pub status_message: &'a str,
    pub recording: bool,
    /// Content below the current scroll position
    pub has_unseen_content: bool,
}

impl<'a> TitleBar<'a> {
    pub fn new(
        model_name: &'a str,
        status_message: &'a str,
        recording: bool,
        has_unseen_content: bool,
    ) -> Self {
        Self {
            model_name,
            status_message,
            recording,
            has_unseen_content,
        }
    }

    fn line(&self) -> Line<'static> {
        let separator = || Span::styled(" | ", Style::new().fg(Color::DarkGray));
        let mut spans = vec![Span::raw(format!("Quill (model: {})", self.model_name))];

        if !self.status_message.is_empty() {
            spans.push(separator());
            spans.push(Span::raw(self.status_message.to_string()));
        }
        if self.recording {
            spans.push(separator());
            spans.push(Span::styled(
                "● REC",
                Style::new().fg(Color::Red).add_modifier(Modifier::BOLD),
            ));
        }
        if self.has_unseen_content {
            spans.push(separator());
            spans.push(Span::styled("↓ New", Style::new().fg(Color::Cyan)));
        }
        Line::from(spans)
    }
}

impl Component for TitleBar<'_> {
    fn render(&mut self, frame: &mut Frame, area: Rect) {
        frame.render_widget(self.line(), area);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;

    fn screen(mut title_bar: TitleBar) -> String {
        let mut terminal = Terminal::new(TestBackend::new(100, 1)).unwrap();
        terminal.draw(|f| title_bar.render(f, f.area())).unwrap();
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|c| c.symbol())
            .collect()
    }

    #[test]
    fn shows_every_section_in_order() {
        let text = screen(TitleBar::new("gpt-4o", "Recording…", true, true));
        let model = text.find("Quill (model: gpt-4o)").unwrap();
        let status = text.find("Recording…").unwrap();
        let rec = text.find("● REC").unwrap();
        let new = text.find("↓ New").unwrap();
        assert!(model < status && status < rec && rec < new);
    }

    #[test]
    fn status_only() {
        let text = screen(TitleBar::new("gpt-4o", "Ready", false, false));
        assert!(text.contains("| Ready"));
        assert!(!text.contains("REC"));
        assert!(!text.contains("↓ New"));
    }

    #[test]
    fn bare_model_has_no_separators() {
        let text = screen(TitleBar::new("gpt-4o", "", false, false));
        assert!(text.contains("Quill (model: gpt-4o)"));
        assert!(!text.contains('|'));
    }
}

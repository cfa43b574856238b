//! Three-dot typing indicator drawn under the last message while a response
//! is pending.

use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Widget;

use crate::tui::conversation::RoleIcon;

pub const TYPING_HEIGHT: u16 = 1;
const DOTS: usize = 3;

#[derive(Clone, Copy)]
pub struct TypingIndicator {
    pub frame: usize,
}

impl TypingIndicator {
    pub fn new(frame: usize) -> Self {
        Self { frame }
    }

    fn line(self) -> Line<'static> {
        let lit = self.frame % DOTS;
        let mut spans = vec![Span::styled(
            format!(" {} ", RoleIcon::Bot.glyph()),
            Style::new().fg(Color::Blue),
        )];
        spans.extend((0..DOTS).map(|i| {
            let style = if i == lit {
                Style::new().fg(Color::Blue).add_modifier(Modifier::BOLD)
            } else {
                Style::new().fg(Color::DarkGray)
            };
            Span::styled("● ", style)
        }));
        Line::from(spans)
    }
}

impl Widget for TypingIndicator {
    fn render(self, area: Rect, buf: &mut Buffer) {
        self.line().render(area, buf);
    }
}

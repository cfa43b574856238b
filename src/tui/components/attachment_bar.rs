//! # AttachmentBar Component
//!
//! Strip between the conversation and the composer box showing what the
//! next submission will carry:
//!
//! ```text
//! ▣ photo.png · image/png · 12.0 KB                 Ctrl+X remove
//! ≡ notes.txt · 1.1 KB · in draft
//! │ first line of the document
//! │ …
//! ● REC  recording… Ctrl+R to stop
//! ```
//!
//! Zero rows tall when there is nothing to show.

use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::composer::Attachment;
use crate::tui::component::Component;
use crate::tui::components::human_size;

/// Text documents show at most this many lines of preview.
pub const PREVIEW_LINES: usize = 6;

const CHIP: Style = Style::new().fg(Color::Magenta).add_modifier(Modifier::BOLD);
const DIM: Style = Style::new().fg(Color::DarkGray);
const REMOVE_HINT: &str = "Ctrl+X remove";

pub struct AttachmentBar<'a> {
    pub attachment: Option<&'a Attachment>,
    pub recording: bool,
}

impl<'a> AttachmentBar<'a> {
    pub fn new(attachment: Option<&'a Attachment>, recording: bool) -> Self {
        Self {
            attachment,
            recording,
        }
    }

    pub fn height(&self) -> u16 {
        let preview = match self.attachment {
            Some(Attachment::TextDocument { text, .. }) => preview_len(text),
            _ => 0,
        };
        let chip = usize::from(self.attachment.is_some());
        (chip + preview + usize::from(self.recording)) as u16
    }

    fn lines(&self, width: u16) -> Vec<Line<'static>> {
        let mut lines = Vec::new();
        if let Some(attachment) = self.attachment {
            lines.push(chip_line(attachment, width));
            if let Attachment::TextDocument { text, .. } = attachment {
                lines.extend(preview(text, width));
            }
        }
        if self.recording {
            lines.push(Line::from(vec![
                Span::styled(
                    "● REC",
                    Style::new().fg(Color::Red).add_modifier(Modifier::BOLD),
                ),
                Span::styled("  recording… Ctrl+R to stop", DIM),
            ]));
        }
        lines
    }
}

fn chip_line(attachment: &Attachment, width: u16) -> Line<'static> {
    let size = human_size(attachment.size());
    let (icon, detail) = match attachment {
        Attachment::Image { mime_type, .. } => ("▣", format!(" · {mime_type} · {size}")),
        Attachment::Audio { mime_type, .. } => ("♪", format!(" · {mime_type} · {size}")),
        Attachment::TextDocument { .. } => ("≡", format!(" · {size} · in draft")),
    };

    let name = format!("{icon} {}", attachment.file_name());
    let used = name.width() + detail.width() + REMOVE_HINT.width();
    let gap = (width as usize).saturating_sub(used).max(1);
    Line::from(vec![
        Span::styled(name, CHIP),
        Span::styled(detail, DIM),
        Span::raw(" ".repeat(gap)),
        Span::styled(REMOVE_HINT, DIM),
    ])
}

fn preview_len(text: &str) -> usize {
    text.lines().count().min(PREVIEW_LINES)
}

fn preview(text: &str, width: u16) -> Vec<Line<'static>> {
    let total = text.lines().count();
    let room = (width as usize).saturating_sub(2);
    let mut lines: Vec<Line<'static>> = text
        .lines()
        .take(PREVIEW_LINES)
        .map(|l| {
            Line::from(vec![
                Span::styled("│ ", DIM),
                Span::raw(truncate_to_width(l, room)),
            ])
        })
        .collect();

    if total > PREVIEW_LINES
        && let Some(last) = lines.last_mut()
    {
        *last = Line::from(vec![
            Span::styled("│ ", DIM),
            Span::styled(format!("… {} more lines", total - PREVIEW_LINES + 1), DIM),
        ]);
    }
    lines
}

/// Cut `s` to at most `max` display columns, marking the cut with `…`.
fn truncate_to_width(s: &str, max: usize) -> String {
    if s.width() <= max {
        return s.to_string();
    }
    let mut out = String::new();
    let mut used = 0;
    for c in s.chars() {
        let w = c.width().unwrap_or(0);
        if used + w + 1 > max {
            break;
        }
        out.push(c);
        used += w;
    }
    out.push('…');
    out
}

impl Component for AttachmentBar<'_> {
    fn render(&mut self, frame: &mut Frame, area: Rect) {
        frame.render_widget(Paragraph::new(self.lines(area.width)), area);
    }
}

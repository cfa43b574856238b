use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, BorderType, Padding, Paragraph, Widget, Wrap};

use crate::tui::component::Component;
use crate::tui::components::human_size;
use crate::tui::conversation::{ContentBlock, MessageNode, role_color};

/// Horizontal padding (per side) between the border and text content.
const CONTENT_PAD_H: u16 = 1;
/// Total horizontal space consumed by borders (1 left + 1 right) and padding.
pub(crate) const HORIZONTAL_OVERHEAD: u16 = 2 + CONTENT_PAD_H * 2;
/// Total vertical space consumed by borders (1 top + 1 bottom).
pub(crate) const VERTICAL_OVERHEAD: u16 = 2;

/// Pulse intensity above which the border of a streaming message turns bold.
const PULSE_BOLD_THRESHOLD: f32 = 0.6;
/// Pulse intensity above which the border loses its dim modifier.
const PULSE_NORMAL_THRESHOLD: f32 = 0.2;

const MEDIA_STYLE: Style = Style::new().fg(Color::Magenta).add_modifier(Modifier::BOLD);

/// Paints one [`MessageNode`] as a rounded card.
///
/// Transient: built per visible node by `MessageList`. The role icon sits in
/// the title, markdown lines fill the body and media blocks become one-line
/// chips underneath, in block order.
#[derive(Clone, Copy)]
pub struct MessageView<'a> {
    pub node: &'a MessageNode,
    /// Current pulse intensity (0.0 to 1.0) while this message is streaming
    pub pulse_intensity: f32,
}

impl<'a> MessageView<'a> {
    pub fn new(node: &'a MessageNode, pulse_intensity: f32) -> Self {
        Self {
            node,
            pulse_intensity,
        }
    }

    /// Height of the card at `width`, borders included.
    ///
    /// Measured with the same `Paragraph` that `render` draws, so the
    /// prediction and the painted result cannot drift apart.
    pub fn calculate_height(node: &MessageNode, width: u16) -> u16 {
        let content_width = width.saturating_sub(HORIZONTAL_OVERHEAD);
        if content_width == 0 {
            // Terminal too narrow for borders + padding; still occupy a row.
            return 1;
        }
        if node.blocks.is_empty() {
            return VERTICAL_OVERHEAD;
        }

        let lines = u16::try_from(body(node).line_count(content_width)).unwrap_or(u16::MAX);
        lines.max(1).saturating_add(VERTICAL_OVERHEAD)
    }
}

fn title(node: &MessageNode) -> String {
    match node.icon {
        Some(icon) => format!(" {} {} ", icon.glyph(), node.role.label()),
        None => format!(" {} ", node.role.label()),
    }
}

fn body(node: &MessageNode) -> Paragraph<'static> {
    let mut lines: Vec<Line<'static>> = Vec::new();
    for block in &node.blocks {
        match block {
            ContentBlock::Markdown(text) => lines.extend(text.lines.iter().cloned()),
            ContentBlock::Image { src } => lines.push(media_chip("▣ image", src)),
            ContentBlock::Audio { src, mime_type } => {
                lines.push(media_chip(&format!("♪ {mime_type}"), src));
            }
        }
    }
    Paragraph::new(Text::from(lines)).wrap(Wrap { trim: false })
}

fn media_chip(label: &str, src: &str) -> Line<'static> {
    Line::from(vec![
        Span::styled(format!("[{label}"), MEDIA_STYLE),
        Span::styled(
            format!(" · {}]", human_size(data_uri_size(src))),
            Style::new().fg(Color::DarkGray),
        ),
    ])
}

/// Decoded size of a base64 `data:` URI payload.
fn data_uri_size(src: &str) -> usize {
    let payload = src.split_once(',').map_or(src, |(_, p)| p);
    let padding = payload.bytes().rev().take_while(|&b| b == b'=').count();
    (payload.len() / 4 * 3).saturating_sub(padding)
}

impl Widget for MessageView<'_> {
    fn render(self, area: Rect, buf: &mut ratatui::buffer::Buffer) {
        let mut border_style = Style::new()
            .fg(role_color(self.node.role))
            .add_modifier(Modifier::DIM);

        // Three-phase breathing while streaming: DIM → normal → BOLD
        if self.pulse_intensity > PULSE_BOLD_THRESHOLD {
            border_style = border_style
                .remove_modifier(Modifier::DIM)
                .add_modifier(Modifier::BOLD);
        } else if self.pulse_intensity > PULSE_NORMAL_THRESHOLD {
            border_style = border_style.remove_modifier(Modifier::DIM);
        }

        let block = Block::bordered()
            .title(title(self.node))
            .border_type(BorderType::Rounded)
            .border_style(border_style)
            .title_style(border_style)
            .padding(Padding::horizontal(CONTENT_PAD_H));

        let inner_area = block.inner(area);
        block.render(area, buf);
        body(self.node).render(inner_area, buf);
    }
}

impl Component for MessageView<'_> {
    fn render(&mut self, frame: &mut Frame, area: Rect) {
        frame.render_widget(*self, area);
    }
}

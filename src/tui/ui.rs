use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::Line;
use ratatui::widgets::Paragraph;

use crate::core::state::App;
use crate::inference::{Message, Role};
use crate::tui::TuiState;
use crate::tui::component::Component;
use crate::tui::components::{AttachmentBar, MessageList, TitleBar};

/// Messages handed to the renderer.
///
/// The empty assistant placeholder of a pending request is left out so the
/// typing indicator sits right under the user's message until text arrives.
pub fn visible_messages(app: &App) -> &[Message] {
    let messages = app.conversation.messages();
    match messages.split_last() {
        Some((last, rest))
            if app.is_loading() && last.role == Role::Assistant && last.content.is_empty() =>
        {
            rest
        }
        _ => messages,
    }
}

pub fn draw_ui(frame: &mut Frame, app: &App, tui: &mut TuiState, spinner_frame: usize) {
    use Constraint::{Length, Min};

    let area = frame.area();
    let recording = app.composer.is_recording();
    let loading = app.is_loading();

    let mut attachment_bar = AttachmentBar::new(app.composer.attachment(), recording);
    let bar_height = attachment_bar.height().min(area.height / 3);
    let input_height = tui.composer_box.calculate_height(area.width);

    let [title_area, main_area, bar_area, input_area] = Layout::vertical([
        Length(1),
        Min(0),
        Length(bar_height),
        Length(input_height),
    ])
    .areas(area);

    let tree = tui.renderer.render(visible_messages(app), loading);
    if tree.is_empty() {
        draw_welcome(frame, main_area);
    } else {
        MessageList::new(
            &mut tui.message_list,
            &tree,
            loading,
            tui.pulse_value,
            spinner_frame,
        )
        .render(frame, main_area);
    }

    TitleBar::new(
        &app.model_name,
        &app.status_message,
        recording,
        tui.message_list.has_unseen_content(),
    )
    .render(frame, title_area);

    if bar_height > 0 {
        attachment_bar.render(frame, bar_area);
    }

    tui.composer_box.recording = recording;
    tui.composer_box.loading = loading;
    tui.composer_box.render(frame, input_area);

    // Drawn last so its cursor wins
    if let Some(prompt) = tui.attach_prompt.as_mut() {
        prompt.render(frame, area);
    }
}

fn draw_welcome(frame: &mut Frame, area: Rect) {
    let hint = Style::new().fg(Color::DarkGray);
    let lines = vec![
        Line::styled("quill", Style::new().fg(Color::Green).add_modifier(Modifier::BOLD)),
        Line::raw(""),
        Line::styled("Type a message and press Enter", hint),
        Line::styled("Drop a file on the window or press Ctrl+O to attach one", hint),
        Line::styled("Ctrl+R records a voice note, Ctrl+R again sends it", hint),
    ];
    let top = area.height.saturating_sub(lines.len() as u16) / 2;
    let [_, centered] =
        Layout::vertical([Constraint::Length(top), Constraint::Min(0)]).areas(area);
    frame.render_widget(
        Paragraph::new(lines).alignment(Alignment::Center),
        centered,
    );
}

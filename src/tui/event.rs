use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers, MouseEventKind};

/// TUI-specific input events
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TuiEvent {
    // Core actions (passed to core::update)
    ForceQuit,
    /// Enter. Whether it submits is the composer's call.
    Submit,
    /// Shift+Enter or Ctrl+J.
    Newline,
    /// Ctrl+S, the explicit send affordance.
    Send,
    ToggleRecording,
    ClearAttachment,

    // TUI-local events (handled directly in TUI)
    OpenAttachPrompt,
    Escape,
    InputChar(char),
    Paste(String), // Bracketed paste, also how terminals deliver dropped files
    Backspace,
    Delete,
    CursorLeft,
    CursorRight,
    WordLeft,
    WordRight,
    CursorUp,
    CursorDown,
    CursorHome,
    CursorEnd,
    ScrollUp,
    ScrollDown,
    ScrollPageUp,
    ScrollPageDown,
    Resize,
}

/// Poll for an event without blocking (returns immediately)
pub fn poll_event_immediate() -> Option<TuiEvent> {
    poll_event_timeout(Duration::ZERO)
}

pub fn poll_event_timeout(timeout: Duration) -> Option<TuiEvent> {
    if !event::poll(timeout).ok()? {
        return None;
    }
    match event::read().ok()? {
        // REPORT_EVENT_TYPES delivers releases too; only presses and repeats count
        Event::Key(key) if key.kind == KeyEventKind::Release => None,
        Event::Key(key) => {
            log::debug!("Key event: {:?} with modifiers {:?}", key.code, key.modifiers);
            translate_key(key.modifiers, key.code)
        }
        Event::Mouse(mouse) => match mouse.kind {
            MouseEventKind::ScrollUp => Some(TuiEvent::ScrollUp),
            MouseEventKind::ScrollDown => Some(TuiEvent::ScrollDown),
            _ => None,
        },
        Event::Paste(data) => Some(TuiEvent::Paste(data)),
        Event::Resize(..) => Some(TuiEvent::Resize),
        _ => None,
    }
}

fn translate_key(modifiers: KeyModifiers, code: KeyCode) -> Option<TuiEvent> {
    let ctrl = modifiers.contains(KeyModifiers::CONTROL);
    let alt = modifiers.contains(KeyModifiers::ALT);
    let event = match code {
        KeyCode::Char('c') if ctrl => TuiEvent::ForceQuit,
        KeyCode::Char('s') if ctrl => TuiEvent::Send,
        KeyCode::Char('r') if ctrl => TuiEvent::ToggleRecording,
        KeyCode::Char('o') if ctrl => TuiEvent::OpenAttachPrompt,
        KeyCode::Char('x') if ctrl => TuiEvent::ClearAttachment,
        // Ctrl+J is ASCII LF; terminals without the kitty protocol send it for Ctrl+Enter
        KeyCode::Char('j') if ctrl => TuiEvent::Newline,
        KeyCode::Char('b') if alt => TuiEvent::WordLeft,
        KeyCode::Char('f') if alt => TuiEvent::WordRight,
        KeyCode::Char(_) if ctrl || alt => return None,
        KeyCode::Char(c) => TuiEvent::InputChar(c),
        KeyCode::Enter if modifiers.contains(KeyModifiers::SHIFT) => TuiEvent::Newline,
        KeyCode::Enter => TuiEvent::Submit,
        KeyCode::Esc => TuiEvent::Escape,
        KeyCode::Backspace => TuiEvent::Backspace,
        KeyCode::Delete => TuiEvent::Delete,
        KeyCode::Left if ctrl || alt => TuiEvent::WordLeft,
        KeyCode::Right if ctrl || alt => TuiEvent::WordRight,
        KeyCode::Left => TuiEvent::CursorLeft,
        KeyCode::Right => TuiEvent::CursorRight,
        KeyCode::Up => TuiEvent::CursorUp,
        KeyCode::Down => TuiEvent::CursorDown,
        KeyCode::Home => TuiEvent::CursorHome,
        KeyCode::End => TuiEvent::CursorEnd,
        KeyCode::PageUp => TuiEvent::ScrollPageUp,
        KeyCode::PageDown => TuiEvent::ScrollPageDown,
        _ => return None,
    };
    Some(event)
}

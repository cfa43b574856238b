//! # TUI Components
//!
//! ## Stateless (props only)
//!
//! - `TitleBar`: model, status, recording marker, "↓ New"
//! - `MessageView`: one rendered message card
//! - `TypingIndicator`: animated dots while a reply is pending
//! - `AttachmentBar`: the pending attachment and text preview
//!
//! ## Stateful (event-driven)
//!
//! - `ComposerBox`: the draft text area
//! - `MessageList`: scrollable conversation with layout caching
//! - `AttachPrompt`: Ctrl+O path entry overlay
//!
//! Components take their data as props (struct fields) rather than reading
//! `App` directly, so each one can be drawn into a `TestBackend` on its own:
//!
//! ```rust,ignore
//! TitleBar::new(&app.model_name, &app.status_message, recording, unseen)
//!     .render(frame, title_area);
//! ```
//!
//! ```text
//! components/
//! ├── mod.rs
//! ├── title_bar.rs
//! ├── message.rs         (MessageView)
//! ├── message_list.rs    (MessageList + LayoutCache)
//! ├── typing.rs
//! ├── attachment_bar.rs
//! ├── attach_prompt.rs
//! └── composer_box/      (text area, cursor, wrapping)
//! ```

pub mod attach_prompt;
pub mod attachment_bar;
pub mod composer_box;
pub mod message;
pub mod message_list;
pub mod title_bar;
pub mod typing;

pub use attach_prompt::{AttachPrompt, AttachPromptEvent};
pub use attachment_bar::AttachmentBar;
pub use composer_box::{ComposerBox, ComposerInput};
pub use message_list::{MessageList, MessageListState};
pub use title_bar::TitleBar;

/// `512 B`, `2.0 KB`, `1.5 MB`.
pub fn human_size(bytes: usize) -> String {
    const KB: f64 = 1024.0;
    let b = bytes as f64;
    if bytes < 1024 {
        format!("{bytes} B")
    } else if b < KB * KB {
        format!("{:.1} KB", b / KB)
    } else {
        format!("{:.1} MB", b / (KB * KB))
    }
}

#[cfg(test)]
mod tests {
    use super::human_size;

    #[test]
    fn sizes() {
        assert_eq!(human_size(0), "0 B");
        assert_eq!(human_size(1023), "1023 B");
        assert_eq!(human_size(1536), "1.5 KB");
        assert_eq!(human_size(3 * 1024 * 1024), "3.0 MB");
    }
}

//! # Actions
//!
//! Everything that can happen in Quill becomes an `Action`.
//! User presses Enter? That's `Action::Enter { shift: false }`.
//! A text file finished decoding? That's `Action::Composer(ComposerMsg::TextDecoded { .. })`.
//!
//! The `update()` function takes the current state and an action, mutates
//! the state, and returns an [`Effect`] describing the I/O the caller must
//! perform. No side effects here.
//!
//! ```text
//! State + Action  →  update()  →  New State + Effect
//! ```

use std::time::Duration;

use log::debug;

use crate::composer::{
    CaptureOutcome, ComposerEffect, ComposerMsg, DecodeRequest, DroppedFile, KeyOutcome,
    KeyPress, RecorderCommand,
};
use crate::core::state::App;

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// The composer's text area changed.
    TextChanged(String),
    Enter { shift: bool },
    /// The explicit send affordance (Ctrl+S).
    SendButton,
    FilesDropped(Vec<DroppedFile>),
    ClearAttachment,
    ToggleRecording,
    Composer(ComposerMsg),
    ResponseChunk { request: u64, text: String },
    ResponseDone { request: u64 },
    CancelGeneration,
    Quit,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    None,
    /// Stream a completion for the conversation's current request.
    SpawnRequest,
    /// Decode a text file off the UI loop.
    SpawnDecode(DecodeRequest),
    /// Deliver `ComposerMsg::AutoSubmit` after the delay.
    ScheduleAutoSubmit(Duration),
    Recorder(RecorderCommand),
    Quit,
}

pub fn update(app: &mut App, action: Action) -> Effect {
    let effect = match action {
        Action::TextChanged(text) => {
            app.composer.on_text_change(text);
            Effect::None
        }
        Action::Enter { shift } => match app.composer.on_key(KeyPress::Enter { shift }) {
            KeyOutcome::Submit => {
                app.composer.submit(&mut app.conversation);
                Effect::None
            }
            KeyOutcome::PassThrough => Effect::None,
        },
        Action::SendButton => {
            let loading = app.conversation.is_loading();
            app.composer.on_form_submit(loading, &mut app.conversation);
            Effect::None
        }
        Action::FilesDropped(files) => match app.composer.on_files(files) {
            CaptureOutcome::DecodeRequested(request) => Effect::SpawnDecode(request),
            CaptureOutcome::Stored => {
                if let Some(attachment) = app.composer.attachment() {
                    app.status_message = format!("Attached {}", attachment.file_name());
                }
                Effect::None
            }
            CaptureOutcome::Ignored(_) | CaptureOutcome::Empty => Effect::None,
        },
        Action::ClearAttachment => {
            app.composer.clear_attachment();
            Effect::None
        }
        Action::ToggleRecording => Effect::Recorder(app.composer.toggle_recording()),
        Action::Composer(msg) => match app.composer.apply(msg, &mut app.conversation) {
            Ok(ComposerEffect::ScheduleAutoSubmit(delay)) => {
                app.status_message = "Sending voice note…".to_string();
                Effect::ScheduleAutoSubmit(delay)
            }
            Ok(ComposerEffect::DraftExtended { .. }) => {
                if let Some(attachment) = app.composer.attachment() {
                    app.status_message = format!("Inserted {}", attachment.file_name());
                }
                Effect::None
            }
            Ok(ComposerEffect::None | ComposerEffect::Submitted) => {
                if app.composer.is_recording() {
                    app.status_message = "Recording… Ctrl+R to stop".to_string();
                }
                Effect::None
            }
            Err(e) => {
                // Attachment and recorder failures stay out of the UI.
                debug!("Composer error: {e}");
                Effect::None
            }
        },
        Action::ResponseChunk { request, text } => {
            app.conversation.append_chunk(request, &text);
            Effect::None
        }
        Action::ResponseDone { request } => {
            app.conversation.finish(request);
            if !app.conversation.is_loading() {
                app.status_message = "Ready".to_string();
            }
            Effect::None
        }
        Action::CancelGeneration => {
            app.conversation.cancel();
            app.status_message = "Cancelled".to_string();
            Effect::None
        }
        Action::Quit => Effect::Quit,
    };

    // Any path above may have started a request (submit, auto-submit, queue).
    if effect == Effect::None && app.conversation.take_request() {
        app.status_message = "Waiting for response…".to_string();
        return Effect::SpawnRequest;
    }
    effect
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::composer::{AudioClip, DecodeTicket};
    use crate::inference::Role;
    use crate::test_support::test_app;

    #[test]
    fn enter_submits_and_spawns_request() {
        let mut app = test_app();
        update(&mut app, Action::TextChanged("hello".into()));
        let effect = update(&mut app, Action::Enter { shift: false });
        assert_eq!(effect, Effect::SpawnRequest);
        assert!(app.is_loading());
        assert_eq!(app.conversation.messages()[0].content, "hello");
        assert_eq!(app.composer.draft(), "");
    }

    #[test]
    fn shift_enter_does_not_submit() {
        let mut app = test_app();
        update(&mut app, Action::TextChanged("hello".into()));
        assert_eq!(update(&mut app, Action::Enter { shift: true }), Effect::None);
        assert!(app.conversation.messages().is_empty());
    }

    #[test]
    fn enter_while_loading_queues_instead_of_spawning() {
        let mut app = test_app();
        update(&mut app, Action::TextChanged("one".into()));
        update(&mut app, Action::Enter { shift: false });
        update(&mut app, Action::TextChanged("two".into()));
        assert_eq!(update(&mut app, Action::Enter { shift: false }), Effect::None);
        assert_eq!(app.conversation.queued_len(), 1);
        assert_eq!(app.composer.draft(), "");

        let request = app.conversation.request_id();
        let effect = update(&mut app, Action::ResponseDone { request });
        assert_eq!(effect, Effect::SpawnRequest);
    }

    #[test]
    fn send_button_is_ignored_while_loading() {
        let mut app = test_app();
        update(&mut app, Action::TextChanged("one".into()));
        update(&mut app, Action::SendButton);
        update(&mut app, Action::TextChanged("two".into()));
        assert_eq!(update(&mut app, Action::SendButton), Effect::None);
        assert_eq!(app.composer.draft(), "two");
        assert_eq!(app.conversation.queued_len(), 0);
    }

    #[test]
    fn text_drop_requests_decode() {
        let mut app = test_app();
        let file = DroppedFile::new("a.txt", "text/plain", b"abc".to_vec());
        let effect = update(&mut app, Action::FilesDropped(vec![file.clone()]));
        assert_eq!(
            effect,
            Effect::SpawnDecode(DecodeRequest {
                ticket: DecodeTicket { generation: 0 },
                file,
            })
        );
    }

    #[test]
    fn toggle_recording_follows_composer_flag() {
        let mut app = test_app();
        assert_eq!(
            update(&mut app, Action::ToggleRecording),
            Effect::Recorder(RecorderCommand::Start)
        );
        update(
            &mut app,
            Action::Composer(ComposerMsg::RecordingStarted(Ok(()))),
        );
        assert_eq!(
            update(&mut app, Action::ToggleRecording),
            Effect::Recorder(RecorderCommand::Stop)
        );
    }

    #[test]
    fn finished_recording_auto_submits_once() {
        let mut app = test_app();
        let clip = AudioClip::new(vec![1, 2, 3]);
        let effect = update(
            &mut app,
            Action::Composer(ComposerMsg::RecordingStopped(Ok(clip))),
        );
        assert_eq!(effect, Effect::ScheduleAutoSubmit(Duration::from_millis(100)));

        let effect = update(&mut app, Action::Composer(ComposerMsg::AutoSubmit));
        assert_eq!(effect, Effect::SpawnRequest);
        let user = &app.conversation.messages()[0];
        assert_eq!(user.role, Role::User);
        assert_eq!(user.media.audio.as_deref(), Some("AQID"));

        // A second timer firing finds nothing left to send.
        assert_eq!(
            update(&mut app, Action::Composer(ComposerMsg::AutoSubmit)),
            Effect::None
        );
        assert_eq!(app.conversation.messages().len(), 2);
    }

    #[test]
    fn streamed_chunks_and_cancel() {
        let mut app = test_app();
        update(&mut app, Action::TextChanged("hi".into()));
        update(&mut app, Action::Enter { shift: false });
        let request = app.conversation.request_id();
        update(
            &mut app,
            Action::ResponseChunk {
                request,
                text: "Hello".into(),
            },
        );
        assert_eq!(app.conversation.messages()[1].content, "Hello");

        update(&mut app, Action::CancelGeneration);
        assert!(!app.is_loading());
        assert_eq!(app.status_message, "Cancelled");
    }

    #[test]
    fn clear_attachment_drops_the_pending_image() {
        let mut app = test_app();
        update(
            &mut app,
            Action::FilesDropped(vec![DroppedFile::new("a.png", "image/png", vec![1])]),
        );
        assert!(app.composer.attachment().is_some());

        assert_eq!(update(&mut app, Action::ClearAttachment), Effect::None);
        assert!(app.composer.attachment().is_none());
        assert_eq!(app.composer.live_previews(), 0);
    }

    #[test]
    fn quit() {
        let mut app = test_app();
        assert_eq!(update(&mut app, Action::Quit), Effect::Quit);
    }
}

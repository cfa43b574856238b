//! # Composer
//!
//! The draft, the pending attachment and the recorder flag, plus the policy
//! that turns them into a [`SubmissionBundle`].
//!
//! Every field has one mutation entry point. Work that finishes off the UI
//! loop (text decoding, the recorder actor, the auto-submit timer) comes back
//! as a [`ComposerMsg`] and is folded in by [`Composer::apply`] in arrival
//! order. When a decode and a recording race, whichever finishes last owns
//! the attachment slot.
//!
//! ## Modules
//!
//! - [`attachment`]: `AttachmentCapture`, the one-slot attachment state machine
//! - [`recorder`]: `Recorder` and its actor handle
//! - [`device`]: `CommandCapture`, an external-process capture device
//! - [`bundle`]: `SubmissionBundle`
//! - [`preview`]: preview handle bookkeeping

pub mod attachment;
pub mod bundle;
pub mod device;
pub mod preview;
pub mod recorder;

use std::fmt;
use std::time::Duration;

use log::{debug, info, warn};

pub use attachment::{
    AttachmentCapture, Attachment, AttachmentError, CaptureOutcome, DecodeRequest, DecodeTicket,
    DroppedFile,
};
pub use bundle::SubmissionBundle;
pub use recorder::{AudioClip, RecorderCommand, RecorderError};

pub const DEFAULT_AUTO_SUBMIT_DELAY: Duration = Duration::from_millis(100);

/// Receives finished submissions.
pub trait SubmitHandler {
    fn submit(&mut self, bundle: SubmissionBundle);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComposerError {
    Recorder(RecorderError),
    Attachment(AttachmentError),
}

impl fmt::Display for ComposerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComposerError::Recorder(e) => write!(f, "recorder: {e}"),
            ComposerError::Attachment(e) => write!(f, "attachment: {e}"),
        }
    }
}

impl std::error::Error for ComposerError {}

impl From<RecorderError> for ComposerError {
    fn from(e: RecorderError) -> Self {
        ComposerError::Recorder(e)
    }
}

impl From<AttachmentError> for ComposerError {
    fn from(e: AttachmentError) -> Self {
        ComposerError::Attachment(e)
    }
}

/// Completions of asynchronous composer work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComposerMsg {
    TextDecoded {
        ticket: DecodeTicket,
        file_name: String,
        bytes: Vec<u8>,
        result: Result<String, AttachmentError>,
    },
    RecordingStarted(Result<(), RecorderError>),
    RecordingStopped(Result<AudioClip, RecorderError>),
    /// The post-recording timer fired.
    AutoSubmit,
}

/// What the caller must do after [`Composer::apply`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComposerEffect {
    None,
    /// Decoded text was appended to the draft. `stale` means the decode was
    /// started before the most recent reset.
    DraftExtended { stale: bool },
    /// Deliver `ComposerMsg::AutoSubmit` after this delay.
    ScheduleAutoSubmit(Duration),
    Submitted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyPress {
    Enter { shift: bool },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyOutcome {
    /// The caller should call [`Composer::submit`].
    Submit,
    /// Let the text area handle the key (Shift+Enter inserts a newline).
    PassThrough,
}

#[derive(Debug)]
pub struct Composer {
    draft: String,
    capture: AttachmentCapture,
    recording: bool,
    generation: u64,
    auto_submit_delay: Duration,
}

impl Default for Composer {
    fn default() -> Self {
        Self::new(DEFAULT_AUTO_SUBMIT_DELAY)
    }
}

impl Composer {
    pub fn new(auto_submit_delay: Duration) -> Self {
        Self {
            draft: String::new(),
            capture: AttachmentCapture::new(),
            recording: false,
            generation: 0,
            auto_submit_delay,
        }
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    pub fn attachment(&self) -> Option<&Attachment> {
        self.capture.current()
    }

    pub fn is_recording(&self) -> bool {
        self.recording
    }

    pub fn live_previews(&self) -> usize {
        self.capture.live_previews()
    }

    pub fn on_text_change(&mut self, text: impl Into<String>) {
        self.draft = text.into();
    }

    pub fn on_key(&self, key: KeyPress) -> KeyOutcome {
        match key {
            KeyPress::Enter { shift: false } => KeyOutcome::Submit,
            KeyPress::Enter { shift: true } => KeyOutcome::PassThrough,
        }
    }

    /// Assembles the bundle, hands it to `handler` and resets.
    ///
    /// Returns false, leaving everything as is, when there is neither text
    /// nor an attachment to send.
    pub fn submit(&mut self, handler: &mut dyn SubmitHandler) -> bool {
        let bundle = SubmissionBundle::new(self.draft.clone(), self.capture.current().cloned());
        if bundle.is_blank() {
            debug!("Ignoring blank submission");
            return false;
        }
        info!(
            "Submitting: {} chars, {} attachment(s)",
            bundle.text.len(),
            bundle.attachments.len()
        );
        handler.submit(bundle);
        self.reset();
        true
    }

    /// The explicit send button, disabled while a response is loading.
    pub fn on_form_submit(&mut self, loading: bool, handler: &mut dyn SubmitHandler) -> bool {
        if loading {
            debug!("Send ignored while loading");
            return false;
        }
        self.submit(handler)
    }

    /// Clears the draft and the attachment. Decodes already in flight are
    /// not cancelled; they will land as stale.
    pub fn reset(&mut self) {
        self.draft.clear();
        self.capture.clear();
        self.generation += 1;
    }

    pub fn on_files(&mut self, files: Vec<DroppedFile>) -> CaptureOutcome {
        let ticket = DecodeTicket {
            generation: self.generation,
        };
        self.capture.submit_files(files, ticket)
    }

    pub fn clear_attachment(&mut self) {
        self.capture.clear();
    }

    pub fn toggle_recording(&self) -> RecorderCommand {
        if self.recording {
            RecorderCommand::Stop
        } else {
            RecorderCommand::Start
        }
    }

    /// Folds an asynchronous completion into the composer.
    ///
    /// Errors leave the draft and attachment untouched; they are returned so
    /// callers and tests can observe them, and are never shown in the UI.
    pub fn apply(
        &mut self,
        msg: ComposerMsg,
        handler: &mut dyn SubmitHandler,
    ) -> Result<ComposerEffect, ComposerError> {
        match msg {
            ComposerMsg::TextDecoded {
                ticket,
                file_name,
                bytes,
                result,
            } => {
                let text = result.inspect_err(|e| warn!("Text attachment dropped: {e}"))?;
                let stale = ticket.generation != self.generation;
                if stale {
                    debug!("Decode of {file_name} finished after a reset");
                }
                self.draft.push(' ');
                self.draft.push_str(&text);
                self.capture.store(Attachment::TextDocument {
                    text,
                    bytes,
                    file_name,
                });
                Ok(ComposerEffect::DraftExtended { stale })
            }
            ComposerMsg::RecordingStarted(Ok(())) => {
                self.recording = true;
                Ok(ComposerEffect::None)
            }
            ComposerMsg::RecordingStarted(Err(e)) => {
                // A rejected second start means the first one is still live.
                self.recording = e == RecorderError::AlreadyRecording;
                warn!("Recording not started: {e}");
                Err(e.into())
            }
            ComposerMsg::RecordingStopped(result) => {
                self.recording = false;
                let clip = result.inspect_err(|e| warn!("Recording discarded: {e}"))?;
                self.capture.store(clip.into_attachment());
                Ok(ComposerEffect::ScheduleAutoSubmit(self.auto_submit_delay))
            }
            ComposerMsg::AutoSubmit => Ok(if self.submit(handler) {
                ComposerEffect::Submitted
            } else {
                ComposerEffect::None
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::RecordingHandler;

    fn png() -> DroppedFile {
        DroppedFile::new("cat.png", "image/png", vec![1, 2, 3])
    }

    fn decoded(ticket: DecodeTicket, text: &str) -> ComposerMsg {
        ComposerMsg::TextDecoded {
            ticket,
            file_name: "notes.txt".into(),
            bytes: text.as_bytes().to_vec(),
            result: Ok(text.to_string()),
        }
    }

    fn request_decode(composer: &mut Composer, text: &str) -> DecodeRequest {
        let file = DroppedFile::new("notes.txt", "text/plain", text.as_bytes().to_vec());
        match composer.on_files(vec![file]) {
            CaptureOutcome::DecodeRequested(request) => request,
            other => panic!("expected decode request, got {other:?}"),
        }
    }

    #[test]
    fn enter_submits_shift_enter_passes_through() {
        let composer = Composer::default();
        assert_eq!(composer.on_key(KeyPress::Enter { shift: false }), KeyOutcome::Submit);
        assert_eq!(
            composer.on_key(KeyPress::Enter { shift: true }),
            KeyOutcome::PassThrough
        );
    }

    #[test]
    fn text_only_submission() {
        let mut composer = Composer::default();
        let mut handler = RecordingHandler::default();
        composer.on_text_change("hello");

        assert!(composer.submit(&mut handler));
        assert_eq!(
            handler.bundles,
            vec![SubmissionBundle {
                text: "hello".into(),
                attachments: vec![],
            }]
        );
        assert_eq!(composer.draft(), "");
    }

    #[test]
    fn blank_submission_is_a_no_op() {
        let mut composer = Composer::default();
        let mut handler = RecordingHandler::default();
        composer.on_text_change("   ");
        assert!(!composer.submit(&mut handler));
        assert!(handler.bundles.is_empty());
        assert_eq!(composer.draft(), "   ");
    }

    #[test]
    fn image_submission_resets_and_revokes_preview() {
        let mut composer = Composer::default();
        let mut handler = RecordingHandler::default();
        composer.on_files(vec![png()]);
        composer.on_text_change("look");

        assert!(composer.submit(&mut handler));
        assert_eq!(handler.bundles[0].attachments.len(), 1);
        assert!(composer.attachment().is_none());
        assert_eq!(composer.live_previews(), 0);
    }

    #[test]
    fn clearing_an_image_like_attachment_releases_its_preview() {
        for (name, mime) in [
            ("a.jpg", "image/jpeg"),
            ("a.png", "image/png"),
            ("a.pdf", "application/pdf"),
        ] {
            let mut composer = Composer::default();
            composer.on_text_change("draft");
            let outcome = composer.on_files(vec![DroppedFile::new(name, mime, vec![1, 2])]);
            assert_eq!(outcome, CaptureOutcome::Stored, "{mime}");
            assert_eq!(composer.live_previews(), 1, "{mime}");

            composer.clear_attachment();
            assert!(composer.attachment().is_none(), "{mime}");
            assert_eq!(composer.live_previews(), 0, "{mime}");
            assert_eq!(composer.draft(), "draft", "{mime}");
        }
    }

    #[test]
    fn clearing_a_text_document_keeps_the_spliced_text() {
        for (name, mime, body) in [
            ("a.txt", "text/plain", "plain body"),
            ("a.json", "application/json", r#"{"k":1}"#),
        ] {
            let mut composer = Composer::default();
            let mut handler = RecordingHandler::default();
            composer.on_text_change("see");
            let file = DroppedFile::new(name, mime, body.as_bytes().to_vec());
            let CaptureOutcome::DecodeRequested(request) = composer.on_files(vec![file]) else {
                panic!("{mime} should be decoded");
            };
            composer.apply(request.decode(), &mut handler).unwrap();
            assert!(composer.attachment().is_some(), "{mime}");

            composer.clear_attachment();
            assert!(composer.attachment().is_none(), "{mime}");
            assert_eq!(composer.live_previews(), 0, "{mime}");
            assert_eq!(composer.draft(), format!("see {body}"), "{mime}");

            // The spliced text still goes out, without an attachment
            assert!(composer.submit(&mut handler));
            assert_eq!(handler.bundles[0].text, format!("see {body}"));
            assert!(handler.bundles[0].attachments.is_empty());
        }
    }

    #[test]
    fn send_button_is_disabled_while_loading() {
        let mut composer = Composer::default();
        let mut handler = RecordingHandler::default();
        composer.on_text_change("hi");
        assert!(!composer.on_form_submit(true, &mut handler));
        assert!(handler.bundles.is_empty());
        assert!(composer.on_form_submit(false, &mut handler));
        assert_eq!(handler.bundles.len(), 1);
    }

    #[test]
    fn decoded_text_is_appended_with_a_space() {
        let mut composer = Composer::default();
        let mut handler = RecordingHandler::default();
        composer.on_text_change("summarize");
        let request = request_decode(&mut composer, "abc");

        let effect = composer.apply(request.decode(), &mut handler).unwrap();
        assert_eq!(effect, ComposerEffect::DraftExtended { stale: false });
        assert_eq!(composer.draft(), "summarize abc");
        assert!(matches!(
            composer.attachment(),
            Some(Attachment::TextDocument { .. })
        ));

        composer.submit(&mut handler);
        assert_eq!(handler.bundles[0].text, "summarize abc");
        assert!(handler.bundles[0].attachments.is_empty());
    }

    #[test]
    fn decode_after_reset_still_extends_draft() {
        let mut composer = Composer::default();
        let mut handler = RecordingHandler::default();
        let request = request_decode(&mut composer, "late");
        composer.reset();

        let effect = composer.apply(request.decode(), &mut handler).unwrap();
        assert_eq!(effect, ComposerEffect::DraftExtended { stale: true });
        assert_eq!(composer.draft(), " late");
    }

    #[test]
    fn decode_failure_is_silent_no_op() {
        let mut composer = Composer::default();
        let mut handler = RecordingHandler::default();
        composer.on_text_change("keep");
        let msg = ComposerMsg::TextDecoded {
            ticket: DecodeTicket { generation: 0 },
            file_name: "bad.txt".into(),
            bytes: vec![0xff],
            result: Err(AttachmentError::Decode("invalid utf-8".into())),
        };

        let err = composer.apply(msg, &mut handler).unwrap_err();
        assert!(matches!(err, ComposerError::Attachment(AttachmentError::Decode(_))));
        assert_eq!(composer.draft(), "keep");
        assert!(composer.attachment().is_none());
    }

    #[test]
    fn recording_replaces_pending_image_and_schedules_auto_submit() {
        let mut composer = Composer::new(Duration::from_millis(250));
        let mut handler = RecordingHandler::default();
        composer.on_files(vec![png()]);

        assert_eq!(composer.toggle_recording(), RecorderCommand::Start);
        composer
            .apply(ComposerMsg::RecordingStarted(Ok(())), &mut handler)
            .unwrap();
        assert!(composer.is_recording());
        assert_eq!(composer.toggle_recording(), RecorderCommand::Stop);

        let clip = AudioClip::new(vec![9, 9]);
        let effect = composer
            .apply(ComposerMsg::RecordingStopped(Ok(clip)), &mut handler)
            .unwrap();
        assert_eq!(
            effect,
            ComposerEffect::ScheduleAutoSubmit(Duration::from_millis(250))
        );
        assert!(!composer.is_recording());
        assert!(matches!(composer.attachment(), Some(Attachment::Audio { .. })));
        assert_eq!(composer.live_previews(), 0);
    }

    #[test]
    fn auto_submit_sends_audio_once() {
        let mut composer = Composer::default();
        let mut handler = RecordingHandler::default();
        composer
            .apply(
                ComposerMsg::RecordingStopped(Ok(AudioClip::new(vec![1]))),
                &mut handler,
            )
            .unwrap();

        let effect = composer.apply(ComposerMsg::AutoSubmit, &mut handler).unwrap();
        assert_eq!(effect, ComposerEffect::Submitted);
        assert_eq!(handler.bundles.len(), 1);
        assert_eq!(handler.bundles[0].text, "");
        assert!(matches!(
            handler.bundles[0].attachments.as_slice(),
            [Attachment::Audio { mime_type, .. }] if mime_type == "audio/mp3"
        ));
        assert!(composer.attachment().is_none());
    }

    #[test]
    fn rejected_second_start_keeps_recording() {
        let mut composer = Composer::default();
        let mut handler = RecordingHandler::default();
        composer
            .apply(ComposerMsg::RecordingStarted(Ok(())), &mut handler)
            .unwrap();
        let err = composer
            .apply(
                ComposerMsg::RecordingStarted(Err(RecorderError::AlreadyRecording)),
                &mut handler,
            )
            .unwrap_err();
        assert_eq!(err, ComposerError::Recorder(RecorderError::AlreadyRecording));
        assert!(composer.is_recording());
    }

    #[test]
    fn denied_start_reverts_silently() {
        let mut composer = Composer::default();
        let mut handler = RecordingHandler::default();
        let result = composer.apply(
            ComposerMsg::RecordingStarted(Err(RecorderError::PermissionDenied)),
            &mut handler,
        );
        assert!(result.is_err());
        assert!(!composer.is_recording());
        assert!(composer.attachment().is_none());
    }

    #[test]
    fn encoding_failure_attaches_nothing() {
        let mut composer = Composer::default();
        let mut handler = RecordingHandler::default();
        composer
            .apply(ComposerMsg::RecordingStarted(Ok(())), &mut handler)
            .unwrap();
        let result = composer.apply(
            ComposerMsg::RecordingStopped(Err(RecorderError::Encoding("x".into()))),
            &mut handler,
        );
        assert!(result.is_err());
        assert!(!composer.is_recording());
        assert!(composer.attachment().is_none());
    }

    #[test]
    fn decode_landing_after_recording_wins_the_slot() {
        let mut composer = Composer::default();
        let mut handler = RecordingHandler::default();
        let request = request_decode(&mut composer, "doc");
        composer
            .apply(
                ComposerMsg::RecordingStopped(Ok(AudioClip::new(vec![1]))),
                &mut handler,
            )
            .unwrap();
        composer
            .apply(decoded(request.ticket, "doc"), &mut handler)
            .unwrap();
        assert!(matches!(
            composer.attachment(),
            Some(Attachment::TextDocument { .. })
        ));
    }
}

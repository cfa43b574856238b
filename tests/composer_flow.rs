//! End-to-end composer scenarios: drop a file, type, record, submit.

use std::time::Duration;

use async_trait::async_trait;
use quill::composer::recorder::{CaptureDevice, Recorder, RecorderError};
use quill::composer::{
    Attachment, CaptureOutcome, Composer, ComposerEffect, ComposerMsg, DroppedFile,
    SubmissionBundle, SubmitHandler,
};
use quill::core::conversation::Conversation;
use quill::inference::Role;
use tokio_test::{assert_err, assert_ok};

#[derive(Default)]
struct Outbox(Vec<SubmissionBundle>);

impl SubmitHandler for Outbox {
    fn submit(&mut self, bundle: SubmissionBundle) {
        self.0.push(bundle);
    }
}

/// Microphone stand-in that always yields the same bytes.
struct CannedMic(Vec<u8>);

#[async_trait]
impl CaptureDevice for CannedMic {
    async fn start(&mut self) -> Result<(), RecorderError> {
        Ok(())
    }

    async fn stop(&mut self) -> Result<Vec<u8>, RecorderError> {
        Ok(self.0.clone())
    }
}

fn decode_text(composer: &mut Composer, name: &str, body: &str) -> ComposerMsg {
    let file = DroppedFile::new(name, "text/plain", body.as_bytes().to_vec());
    match composer.on_files(vec![file]) {
        CaptureOutcome::DecodeRequested(request) => request.decode(),
        other => panic!("expected a decode request, got {other:?}"),
    }
}

#[test]
fn image_rides_along_with_typed_text() {
    let mut composer = Composer::new(Duration::ZERO);
    let mut outbox = Outbox::default();

    composer.on_text_change("what breed is this?");
    let png = DroppedFile::new("dog.png", "image/png", vec![7; 16]);
    assert_eq!(composer.on_files(vec![png]), CaptureOutcome::Stored);
    assert_eq!(composer.live_previews(), 1);

    assert!(composer.submit(&mut outbox));
    let bundle = &outbox.0[0];
    assert_eq!(bundle.text, "what breed is this?");
    assert!(matches!(
        bundle.attachments.as_slice(),
        [Attachment::Image { file_name, .. }] if file_name == "dog.png"
    ));
    assert_eq!(composer.live_previews(), 0, "preview revoked on submit");
    assert!(composer.attachment().is_none());
}

#[test]
fn text_file_is_spliced_into_the_draft_not_attached() {
    let mut composer = Composer::new(Duration::ZERO);
    let mut outbox = Outbox::default();

    composer.on_text_change("summarize:");
    let decoded = decode_text(&mut composer, "notes.md", "first\nsecond");
    assert_eq!(
        composer.apply(decoded, &mut outbox),
        Ok(ComposerEffect::DraftExtended { stale: false })
    );
    assert_eq!(composer.draft(), "summarize: first\nsecond");

    assert!(composer.submit(&mut outbox));
    assert_eq!(outbox.0[0].text, "summarize: first\nsecond");
    assert!(outbox.0[0].attachments.is_empty());
}

#[test]
fn second_drop_replaces_the_first() {
    let mut composer = Composer::new(Duration::ZERO);
    composer.on_files(vec![DroppedFile::new("a.png", "image/png", vec![1])]);
    composer.on_files(vec![DroppedFile::new("b.jpg", "image/jpeg", vec![2])]);

    assert_eq!(composer.attachment().map(Attachment::file_name), Some("b.jpg"));
    assert_eq!(composer.live_previews(), 1);
}

#[test]
fn unsupported_drop_leaves_state_alone() {
    let mut composer = Composer::new(Duration::ZERO);
    composer.on_text_change("keep me");
    let zip = DroppedFile::new("x.zip", "application/zip", vec![0; 4]);

    assert!(matches!(composer.on_files(vec![zip]), CaptureOutcome::Ignored(_)));
    assert_eq!(composer.draft(), "keep me");
    assert!(composer.attachment().is_none());
}

#[test]
fn blank_submission_is_not_sent() {
    let mut composer = Composer::new(Duration::ZERO);
    let mut outbox = Outbox::default();
    composer.on_text_change("   ");

    assert!(!composer.submit(&mut outbox));
    assert!(outbox.0.is_empty());
}

#[tokio::test]
async fn voice_note_is_submitted_after_recording_stops() {
    let mut recorder = Recorder::new(Box::new(|| {
        Box::new(CannedMic(b"ID3 audio".to_vec())) as Box<dyn CaptureDevice>
    }));
    let mut composer = Composer::new(Duration::from_millis(100));
    let mut conversation = Conversation::new();

    assert_ok!(recorder.start().await);
    composer
        .apply(ComposerMsg::RecordingStarted(Ok(())), &mut conversation)
        .unwrap();
    assert!(composer.is_recording());

    let clip = assert_ok!(recorder.stop().await);
    assert_eq!(clip.bytes, b"ID3 audio");
    let effect = composer
        .apply(ComposerMsg::RecordingStopped(Ok(clip)), &mut conversation)
        .unwrap();
    assert_eq!(effect, ComposerEffect::ScheduleAutoSubmit(Duration::from_millis(100)));
    assert!(!composer.is_recording());

    let effect = composer
        .apply(ComposerMsg::AutoSubmit, &mut conversation)
        .unwrap();
    assert_eq!(effect, ComposerEffect::Submitted);

    let user = &conversation.messages()[0];
    assert_eq!(user.role, Role::User);
    assert!(user.media.audio.is_some());
    assert!(conversation.is_loading());
}

#[tokio::test]
async fn stopping_an_idle_recorder_is_an_error() {
    let mut recorder = Recorder::new(Box::new(|| {
        Box::new(CannedMic(vec![1])) as Box<dyn CaptureDevice>
    }));
    let err = assert_err!(recorder.stop().await);
    assert_eq!(err, RecorderError::NotRecording);
}

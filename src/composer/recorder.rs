//! # Recorder
//!
//! Microphone capture as a two-state machine:
//!
//! ```text
//!          start() ok
//!   Idle ─────────────► Recording
//!    ▲                     │
//!    └──── stop() ─────────┘  emits AudioClip (or RecorderError)
//! ```
//!
//! The capture device is built lazily by a factory on the first `start` and
//! lives until `shutdown`. `RecorderHandle` runs a `Recorder` inside a tokio
//! task so exactly one owner ever touches the microphone; results are sent
//! back to the UI loop as [`ComposerMsg`]s.

use std::fmt;
use std::time::Instant;

use async_trait::async_trait;
use log::{debug, info, warn};
use tokio::sync::mpsc::{UnboundedSender, unbounded_channel};

use super::ComposerMsg;
use super::attachment::Attachment;
use crate::inference::types::AUDIO_MIME_TYPE;

pub const RECORDING_FILE_NAME: &str = "recording.mp3";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecorderError {
    /// The OS refused access to the microphone.
    PermissionDenied,
    /// No capture device could be opened.
    Unavailable(String),
    /// `start` was called while already recording.
    AlreadyRecording,
    /// `stop` was called while idle.
    NotRecording,
    /// The device stopped but produced no usable audio.
    Encoding(String),
}

impl fmt::Display for RecorderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecorderError::PermissionDenied => write!(f, "microphone permission denied"),
            RecorderError::Unavailable(msg) => write!(f, "microphone unavailable: {msg}"),
            RecorderError::AlreadyRecording => write!(f, "already recording"),
            RecorderError::NotRecording => write!(f, "not recording"),
            RecorderError::Encoding(msg) => write!(f, "audio encoding failed: {msg}"),
        }
    }
}

impl std::error::Error for RecorderError {}

/// A source of encoded audio.
#[async_trait]
pub trait CaptureDevice: Send {
    /// Begins capturing. Called only while the recorder is idle.
    async fn start(&mut self) -> Result<(), RecorderError>;

    /// Ends capturing and returns the encoded audio.
    async fn stop(&mut self) -> Result<Vec<u8>, RecorderError>;
}

pub type DeviceFactory = Box<dyn Fn() -> Box<dyn CaptureDevice> + Send>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordingState {
    Idle,
    Recording { started_at: Instant },
}

/// Finished recording.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioClip {
    pub bytes: Vec<u8>,
    pub mime_type: &'static str,
    pub file_name: &'static str,
}

impl AudioClip {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            mime_type: AUDIO_MIME_TYPE,
            file_name: RECORDING_FILE_NAME,
        }
    }

    pub fn into_attachment(self) -> Attachment {
        Attachment::Audio {
            bytes: self.bytes,
            mime_type: self.mime_type.to_string(),
        }
    }
}

pub struct Recorder {
    factory: DeviceFactory,
    device: Option<Box<dyn CaptureDevice>>,
    state: RecordingState,
}

impl Recorder {
    pub fn new(factory: DeviceFactory) -> Self {
        Self {
            factory,
            device: None,
            state: RecordingState::Idle,
        }
    }

    pub fn state(&self) -> RecordingState {
        self.state
    }

    pub fn is_recording(&self) -> bool {
        matches!(self.state, RecordingState::Recording { .. })
    }

    pub async fn start(&mut self) -> Result<(), RecorderError> {
        if self.is_recording() {
            return Err(RecorderError::AlreadyRecording);
        }

        let device = match &mut self.device {
            Some(device) => device,
            slot @ None => slot.insert((self.factory)()),
        };
        device.start().await?;

        self.state = RecordingState::Recording {
            started_at: Instant::now(),
        };
        info!("Recording started");
        Ok(())
    }

    pub async fn stop(&mut self) -> Result<AudioClip, RecorderError> {
        let RecordingState::Recording { started_at } = self.state else {
            return Err(RecorderError::NotRecording);
        };
        self.state = RecordingState::Idle;

        let device = self
            .device
            .as_mut()
            .ok_or_else(|| RecorderError::Unavailable("device was released".into()))?;
        let bytes = device.stop().await?;
        if bytes.is_empty() {
            return Err(RecorderError::Encoding("no audio captured".into()));
        }

        info!(
            "Recording stopped after {:.1}s: {} bytes",
            started_at.elapsed().as_secs_f32(),
            bytes.len()
        );
        Ok(AudioClip::new(bytes))
    }

    /// Releases the capture device. Any recording in progress is abandoned.
    pub fn shutdown(&mut self) {
        if self.is_recording() {
            warn!("Recorder shut down while recording; discarding audio");
        }
        self.state = RecordingState::Idle;
        if self.device.take().is_some() {
            debug!("Capture device released");
        }
    }
}

// ============================================================================
// Actor
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecorderCommand {
    Start,
    Stop,
    Shutdown,
}

/// Handle to a recorder running on its own task.
pub struct RecorderHandle {
    commands: UnboundedSender<RecorderCommand>,
}

impl RecorderHandle {
    /// Moves `recorder` onto a tokio task. Every command's result is passed
    /// to `notify`. Must be called from within a tokio runtime.
    pub fn spawn<F>(mut recorder: Recorder, notify: F) -> Self
    where
        F: Fn(ComposerMsg) + Send + 'static,
    {
        let (commands, mut rx) = unbounded_channel();
        tokio::spawn(async move {
            while let Some(command) = rx.recv().await {
                debug!("Recorder command: {command:?}");
                match command {
                    RecorderCommand::Start => {
                        let result = recorder.start().await;
                        notify(ComposerMsg::RecordingStarted(result));
                    }
                    RecorderCommand::Stop => {
                        let result = recorder.stop().await;
                        notify(ComposerMsg::RecordingStopped(result));
                    }
                    RecorderCommand::Shutdown => break,
                }
            }
            recorder.shutdown();
        });
        Self { commands }
    }

    /// Returns false if the recorder task has already exited.
    pub fn send(&self, command: RecorderCommand) -> bool {
        self.commands.send(command).is_ok()
    }
}

impl Drop for RecorderHandle {
    fn drop(&mut self) {
        let _ = self.commands.send(RecorderCommand::Shutdown);
    }
}

//! Microphone capture through an external encoder process.
//!
//! The configured command (by default `ffmpeg` reading the system's default
//! input) must write MP3 to stdout and stop cleanly when it reads `q` on stdin.

use std::io::ErrorKind;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, info, warn};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;

use super::recorder::{CaptureDevice, RecorderError};

pub struct CommandCapture {
    argv: Vec<String>,
    stop_timeout: Duration,
    running: Option<Running>,
}

struct Running {
    child: Child,
    reader: JoinHandle<std::io::Result<Vec<u8>>>,
}

impl CommandCapture {
    pub fn new(argv: Vec<String>, stop_timeout: Duration) -> Self {
        Self {
            argv,
            stop_timeout,
            running: None,
        }
    }
}

fn spawn_error(program: &str, err: std::io::Error) -> RecorderError {
    match err.kind() {
        ErrorKind::PermissionDenied => RecorderError::PermissionDenied,
        _ => RecorderError::Unavailable(format!("{program}: {err}")),
    }
}

#[async_trait]
impl CaptureDevice for CommandCapture {
    async fn start(&mut self) -> Result<(), RecorderError> {
        let Some((program, args)) = self.argv.split_first() else {
            return Err(RecorderError::Unavailable("no recorder command configured".into()));
        };

        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| spawn_error(program, e))?;

        let Some(mut stdout) = child.stdout.take() else {
            return Err(RecorderError::Unavailable("recorder has no stdout".into()));
        };
        let reader = tokio::spawn(async move {
            let mut bytes = Vec::new();
            stdout.read_to_end(&mut bytes).await?;
            Ok(bytes)
        });

        info!("Recorder process started: {}", self.argv.join(" "));
        self.running = Some(Running { child, reader });
        Ok(())
    }

    async fn stop(&mut self) -> Result<Vec<u8>, RecorderError> {
        let Some(Running { mut child, reader }) = self.running.take() else {
            return Err(RecorderError::NotRecording);
        };

        if let Some(mut stdin) = child.stdin.take() {
            if let Err(e) = stdin.write_all(b"q").await {
                debug!("Recorder stdin closed early: {e}");
            }
        }

        let status = match tokio::time::timeout(self.stop_timeout, child.wait()).await {
            Ok(status) => status.map_err(|e| RecorderError::Encoding(e.to_string()))?,
            Err(_) => {
                warn!("Recorder did not exit within {:?}; killing", self.stop_timeout);
                let _ = child.kill().await;
                return Err(RecorderError::Encoding("recorder timed out".into()));
            }
        };

        let bytes = reader
            .await
            .map_err(|e| RecorderError::Encoding(e.to_string()))?
            .map_err(|e| RecorderError::Encoding(e.to_string()))?;

        // ffmpeg exits 255 when interrupted but still flushes a valid file.
        if !status.success() && bytes.is_empty() {
            return Err(RecorderError::Encoding(format!("recorder exited with {status}")));
        }
        debug!("Recorder process exited with {status}, {} bytes", bytes.len());
        Ok(bytes)
    }
}

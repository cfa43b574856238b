//! Test utilities shared across the crate.
//!
//! This module is only compiled during tests (`#[cfg(test)]`).

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::mpsc::Sender;

use crate::composer::recorder::{CaptureDevice, DeviceFactory, RecorderError};
use crate::composer::{SubmissionBundle, SubmitHandler};
use crate::inference::{CompletionProvider, CompletionRequest, ProviderError, StreamChunk};

/// A no-op provider for tests that don't need real API calls.
pub struct NoopProvider;

#[async_trait]
impl CompletionProvider for NoopProvider {
    fn name(&self) -> &str {
        "noop"
    }

    async fn stream_completion(
        &self,
        _request: CompletionRequest<'_>,
        _sender: Sender<StreamChunk>,
    ) -> Result<(), ProviderError> {
        Ok(())
    }
}

/// Creates a test App with a NoopProvider.
pub fn test_app() -> crate::core::state::App {
    crate::core::state::App::new(Arc::new(NoopProvider), "test-model".to_string())
}

/// Collects every bundle it is handed.
#[derive(Debug, Default)]
pub struct RecordingHandler {
    pub bundles: Vec<SubmissionBundle>,
}

impl SubmitHandler for RecordingHandler {
    fn submit(&mut self, bundle: SubmissionBundle) {
        self.bundles.push(bundle);
    }
}

/// What a [`FakeDevice`] and its clones have been through.
#[derive(Debug, Default)]
pub struct FakeDeviceLog {
    pub built: usize,
    pub starts: usize,
    pub stops: usize,
    pub dropped: usize,
}

/// Capture device with scripted results.
#[derive(Clone)]
pub struct FakeDevice {
    output: Vec<u8>,
    start_error: Option<RecorderError>,
    log: Arc<Mutex<FakeDeviceLog>>,
}

impl FakeDevice {
    pub fn producing(output: Vec<u8>) -> Self {
        Self {
            output,
            start_error: None,
            log: Arc::default(),
        }
    }

    pub fn failing_start(error: RecorderError) -> Self {
        Self {
            output: Vec::new(),
            start_error: Some(error),
            log: Arc::default(),
        }
    }

    pub fn log(&self) -> Arc<Mutex<FakeDeviceLog>> {
        Arc::clone(&self.log)
    }
}

#[async_trait]
impl CaptureDevice for FakeDevice {
    async fn start(&mut self) -> Result<(), RecorderError> {
        if let Some(err) = self.start_error.clone() {
            return Err(err);
        }
        self.log.lock().unwrap().starts += 1;
        Ok(())
    }

    async fn stop(&mut self) -> Result<Vec<u8>, RecorderError> {
        self.log.lock().unwrap().stops += 1;
        Ok(self.output.clone())
    }
}

impl Drop for FakeDevice {
    fn drop(&mut self) {
        if let Ok(mut log) = self.log.lock() {
            log.dropped += 1;
        }
    }
}

/// A factory handing out clones of `device`, counting each build.
pub fn fake_factory(device: FakeDevice) -> DeviceFactory {
    Box::new(move || {
        device.log.lock().unwrap().built += 1;
        Box::new(device.clone())
    })
}

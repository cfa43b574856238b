//! # Attachment Capture
//!
//! Owns the single pending non-text attachment of the composer.
//!
//! ```text
//! drop / paste / Ctrl+O ──► submit_files(files)
//!                               │
//!        ┌──────────────────────┼───────────────────────┐
//!        ▼                      ▼                       ▼
//!  image/jpeg|png, pdf    text/plain, json         anything else
//!  store Image + preview  DecodeRequested          Ignored (debug log)
//!                               │
//!                     decode off the UI loop
//!                               ▼
//!                  ComposerMsg::TextDecoded ──► Composer::apply
//! ```
//!
//! Only the first file of a gesture is considered. Storing anything replaces
//! what was pending and revokes its preview handle.

use std::fmt;
use std::path::{Path, PathBuf};

use log::debug;

use super::ComposerMsg;
use super::preview::PreviewRegistry;

/// MIME types the composer accepts. Everything else is dropped silently.
pub const ACCEPTED_MIME_TYPES: [&str; 5] = [
    "image/jpeg",
    "image/png",
    "application/pdf",
    "text/plain",
    "application/json",
];

const IMAGE_LIKE: [&str; 3] = ["image/jpeg", "image/png", "application/pdf"];
const TEXT_LIKE: [&str; 2] = ["text/plain", "application/json"];

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttachmentError {
    /// The declared MIME type is not on the allow-list.
    Unsupported(String),
    /// A text document was not valid UTF-8.
    Decode(String),
    /// The file could not be read from disk.
    Io(String),
}

impl fmt::Display for AttachmentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttachmentError::Unsupported(mime) => write!(f, "unsupported file type: {mime}"),
            AttachmentError::Decode(msg) => write!(f, "could not decode text file: {msg}"),
            AttachmentError::Io(msg) => write!(f, "could not read file: {msg}"),
        }
    }
}

impl std::error::Error for AttachmentError {}

// ============================================================================
// Dropped Files
// ============================================================================

/// A file handed to the composer by a drop, paste or the attach prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DroppedFile {
    pub name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl DroppedFile {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            bytes,
        }
    }

    /// Reads a file from disk, declaring its MIME type from the extension.
    pub fn from_path(path: &Path) -> Result<Self, AttachmentError> {
        let bytes = std::fs::read(path).map_err(|e| AttachmentError::Io(e.to_string()))?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self::new(name, mime_for_path(path), bytes))
    }
}

/// Declared MIME type for a path, by extension.
pub fn mime_for_path(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "pdf" => "application/pdf",
        "txt" | "text" | "md" => "text/plain",
        "json" => "application/json",
        _ => "application/octet-stream",
    }
}

/// Interprets pasted text as a list of dropped file paths.
///
/// Terminals deliver a file drop as a bracketed paste of its path(s), either
/// quoted (`'/tmp/a b.png'`) or with backslash-escaped spaces. Returns `None`
/// unless every token names an existing file, so ordinary pasted text is never
/// mistaken for a drop.
pub fn parse_dropped_paths(text: &str) -> Option<Vec<PathBuf>> {
    let tokens = split_shell_words(text.trim())?;
    if tokens.is_empty() {
        return None;
    }

    let paths: Vec<PathBuf> = tokens
        .into_iter()
        .map(|t| PathBuf::from(t.strip_prefix("file://").unwrap_or(&t)))
        .collect();

    paths.iter().all(|p| p.is_file()).then_some(paths)
}

/// Splits on unquoted whitespace, honoring quotes and backslash escapes.
/// Returns `None` on an unterminated quote.
fn split_shell_words(text: &str) -> Option<Vec<String>> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut quote: Option<char> = None;
    let mut chars = text.chars();

    while let Some(c) = chars.next() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), c) => current.push(c),
            (None, '\'' | '"') => {
                quote = Some(c);
                in_word = true;
            }
            (None, '\\') => {
                if let Some(next) = chars.next() {
                    current.push(next);
                    in_word = true;
                }
            }
            (None, c) if c.is_whitespace() => {
                if in_word {
                    words.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            (None, c) => {
                current.push(c);
                in_word = true;
            }
        }
    }

    if quote.is_some() {
        return None;
    }
    if in_word {
        words.push(current);
    }
    Some(words)
}

// ============================================================================
// Attachments
// ============================================================================

/// The pending attachment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attachment {
    /// Image-like binary: JPEG, PNG or PDF.
    Image {
        preview_uri: String,
        bytes: Vec<u8>,
        mime_type: String,
        file_name: String,
    },
    /// A finished microphone recording.
    Audio { bytes: Vec<u8>, mime_type: String },
    /// A decoded text document. Its text already lives in the draft.
    TextDocument {
        text: String,
        bytes: Vec<u8>,
        file_name: String,
    },
}

impl Attachment {
    pub fn file_name(&self) -> &str {
        match self {
            Attachment::Image { file_name, .. } | Attachment::TextDocument { file_name, .. } => {
                file_name
            }
            Attachment::Audio { .. } => super::recorder::RECORDING_FILE_NAME,
        }
    }

    pub fn size(&self) -> usize {
        match self {
            Attachment::Image { bytes, .. }
            | Attachment::Audio { bytes, .. }
            | Attachment::TextDocument { bytes, .. } => bytes.len(),
        }
    }

    pub fn preview_uri(&self) -> Option<&str> {
        match self {
            Attachment::Image { preview_uri, .. } => Some(preview_uri),
            _ => None,
        }
    }

    /// Whether this attachment travels in a submission bundle.
    pub fn is_submittable(&self) -> bool {
        !matches!(self, Attachment::TextDocument { .. })
    }
}

// ============================================================================
// Decoding
// ============================================================================

/// Identifies which composer generation a decode was started in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeTicket {
    pub generation: u64,
}

/// A text file waiting to be decoded off the UI loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeRequest {
    pub ticket: DecodeTicket,
    pub file: DroppedFile,
}

impl DecodeRequest {
    /// Decodes the file as strict UTF-8. Blocking; run it on a worker.
    pub fn decode(self) -> ComposerMsg {
        let DroppedFile { name, bytes, .. } = self.file;
        let result = std::str::from_utf8(&bytes)
            .map(str::to_owned)
            .map_err(|e| AttachmentError::Decode(format!("{name}: {e}")));
        ComposerMsg::TextDecoded {
            ticket: self.ticket,
            file_name: name,
            bytes,
            result,
        }
    }
}

// ============================================================================
// Capture
// ============================================================================

#[derive(Debug, PartialEq, Eq)]
pub enum CaptureOutcome {
    /// An image-like file was stored synchronously.
    Stored,
    /// A text file needs decoding before it can be stored.
    DecodeRequested(DecodeRequest),
    /// The gesture carried nothing usable.
    Ignored(AttachmentError),
    /// The gesture carried no files at all.
    Empty,
}

#[derive(Debug, Default)]
pub struct AttachmentCapture {
    current: Option<Attachment>,
    previews: PreviewRegistry,
}

impl AttachmentCapture {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handles one drop/paste gesture. Files after the first are discarded.
    pub fn submit_files(&mut self, files: Vec<DroppedFile>, ticket: DecodeTicket) -> CaptureOutcome {
        let extra = files.len().saturating_sub(1);
        let Some(file) = files.into_iter().next() else {
            return CaptureOutcome::Empty;
        };
        if extra > 0 {
            debug!("Dropping {extra} extra file(s); only {} is kept", file.name);
        }

        let mime = file.mime_type.as_str();
        if IMAGE_LIKE.contains(&mime) {
            let preview_uri = self.previews.create();
            self.store(Attachment::Image {
                preview_uri,
                bytes: file.bytes,
                mime_type: file.mime_type,
                file_name: file.name,
            });
            CaptureOutcome::Stored
        } else if TEXT_LIKE.contains(&mime) {
            CaptureOutcome::DecodeRequested(DecodeRequest { ticket, file })
        } else {
            debug!("Ignoring {} with unsupported type {}", file.name, mime);
            CaptureOutcome::Ignored(AttachmentError::Unsupported(file.mime_type))
        }
    }

    /// Replaces the pending attachment. The previous preview, if any, is revoked.
    pub fn store(&mut self, attachment: Attachment) {
        if let Some(old) = self.current.take() {
            self.release(&old);
        }
        debug!(
            "Attachment stored: {} ({} bytes)",
            attachment.file_name(),
            attachment.size()
        );
        self.current = Some(attachment);
    }

    /// Drops the pending attachment and revokes its preview.
    pub fn clear(&mut self) {
        if let Some(old) = self.current.take() {
            self.release(&old);
        }
    }

    pub fn current(&self) -> Option<&Attachment> {
        self.current.as_ref()
    }

    /// Number of preview handles not yet revoked.
    pub fn live_previews(&self) -> usize {
        self.previews.live_count()
    }

    fn release(&mut self, attachment: &Attachment) {
        if let Some(uri) = attachment.preview_uri() {
            self.previews.revoke(uri);
        }
    }
}

use serde::{Deserialize, Serialize};

/// Media embedding tags. Every image is tagged JPEG and every audio clip MP3,
/// whatever the source encoding was.
pub const IMAGE_DATA_URI_PREFIX: &str = "data:image/jpeg;base64,";
pub const AUDIO_DATA_URI_PREFIX: &str = "data:audio/mp3;base64,";
pub const AUDIO_MIME_TYPE: &str = "audio/mp3";

/// Who authored a message.
///
/// Messages come from an external conversation source, so roles this client
/// does not know about deserialize to `Unknown` instead of failing.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone, Copy, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
    #[serde(other)]
    Unknown,
}

impl Role {
    pub fn label(self) -> &'static str {
        match self {
            Role::User => "you",
            Role::Assistant => "assistant",
            Role::System => "system",
            Role::Unknown => "?",
        }
    }
}

/// Inline media carried by a message, base64-encoded without a data-URI prefix.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct MessageMedia {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio: Option<String>,
}

impl MessageMedia {
    pub fn is_empty(&self) -> bool {
        self.image.is_none() && self.audio.is_none()
    }
}

/// One entry in the conversation.
///
/// `id` is stable for the lifetime of the message. Only the last assistant
/// message ever has its `content` extended (while a response streams in).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
pub struct Message {
    pub id: String,
    pub role: Role,
    pub content: String,
    #[serde(default)]
    pub media: MessageMedia,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            role,
            content: content.into(),
            media: MessageMedia::default(),
        }
    }

    pub fn with_media(mut self, media: MessageMedia) -> Self {
        self.media = media;
        self
    }
}

/// A fragment of streamed output from the backend.
#[derive(Debug, PartialEq)]
pub enum StreamChunk {
    Content(String),
    /// The backend signalled the end of the response.
    Completed,
}

//! OpenAI-compatible provider using the streaming Chat Completions API.
//!
//! Works against any server that speaks `/chat/completions` with SSE
//! (`data: {...}` lines terminated by `data: [DONE]`). Media is sent as
//! multi-part content:
//! - images as `image_url` parts carrying a `data:image/jpeg;base64,…` URI
//! - audio as `input_audio` parts (`format: "mp3"`)

use async_trait::async_trait;
use futures::StreamExt;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::Sender;

use crate::inference::types::IMAGE_DATA_URI_PREFIX;
use crate::inference::{
    CompletionProvider, CompletionRequest, Message, ProviderError, Role, StreamChunk,
};

// ============================================================================
// Chat Completions Wire Types
// ============================================================================

#[derive(Serialize, Debug)]
struct ChatRequest {
    model: String,
    messages: Vec<WireMessage>,
    stream: bool,
}

#[derive(Serialize, Debug, PartialEq)]
struct WireMessage {
    role: &'static str,
    content: WireContent,
}

/// Plain text when the message has no media, content parts otherwise.
#[derive(Serialize, Debug, PartialEq)]
#[serde(untagged)]
enum WireContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Serialize, Debug, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
    InputAudio { input_audio: InputAudio },
}

#[derive(Serialize, Debug, PartialEq)]
struct ImageUrl {
    url: String,
}

#[derive(Serialize, Debug, PartialEq)]
struct InputAudio {
    data: String,
    format: &'static str,
}

#[derive(Deserialize, Debug)]
struct ChunkEvent {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
}

#[derive(Deserialize, Debug)]
struct ChunkChoice {
    #[serde(default)]
    delta: ChunkDelta,
}

#[derive(Deserialize, Debug, Default)]
struct ChunkDelta {
    content: Option<String>,
}

// ============================================================================
// Translation Layer
// ============================================================================

fn wire_role(role: Role) -> Option<&'static str> {
    match role {
        Role::User => Some("user"),
        Role::Assistant => Some("assistant"),
        Role::System => Some("system"),
        Role::Unknown => None,
    }
}

/// Converts the conversation into Chat Completions messages.
///
/// Messages with an unknown role are dropped; the system prompt, if any, goes first.
fn to_wire_messages(messages: &[Message], system_prompt: Option<&str>) -> Vec<WireMessage> {
    let system = system_prompt.map(|prompt| WireMessage {
        role: "system",
        content: WireContent::Text(prompt.to_string()),
    });

    let history = messages.iter().filter_map(|msg| {
        let role = wire_role(msg.role)?;
        if msg.media.is_empty() {
            return Some(WireMessage {
                role,
                content: WireContent::Text(msg.content.clone()),
            });
        }

        let mut parts = Vec::new();
        if !msg.content.is_empty() {
            parts.push(ContentPart::Text {
                text: msg.content.clone(),
            });
        }
        if let Some(image) = &msg.media.image {
            parts.push(ContentPart::ImageUrl {
                image_url: ImageUrl {
                    url: format!("{IMAGE_DATA_URI_PREFIX}{image}"),
                },
            });
        }
        if let Some(audio) = &msg.media.audio {
            parts.push(ContentPart::InputAudio {
                input_audio: InputAudio {
                    data: audio.clone(),
                    format: "mp3",
                },
            });
        }
        Some(WireMessage {
            role,
            content: WireContent::Parts(parts),
        })
    });

    system.into_iter().chain(history).collect()
}

/// Raw SSE bytes waiting to be split into lines.
///
/// A line is decoded only once its `\n` has arrived, so a multi-byte
/// character split across two network reads stays intact.
#[derive(Debug, Default)]
struct LineBuffer {
    bytes: Vec<u8>,
}

impl LineBuffer {
    fn extend(&mut self, chunk: &[u8]) {
        self.bytes.extend_from_slice(chunk);
    }

    /// The next complete line, trimmed, or `None` until more bytes arrive.
    fn next_line(&mut self) -> Option<Result<String, ProviderError>> {
        let pos = self.bytes.iter().position(|&b| b == b'\n')?;
        let line: Vec<u8> = self.bytes.drain(..=pos).collect();
        Some(
            std::str::from_utf8(&line)
                .map(|text| text.trim().to_string())
                .map_err(|e| ProviderError::Parse(format!("invalid UTF-8 in stream: {e}"))),
        )
    }
}

// ============================================================================
// Provider Implementation
// ============================================================================

pub struct OpenAiCompatProvider {
    api_key: Option<String>,
    base_url: String,
    client: reqwest::Client,
}

impl OpenAiCompatProvider {
    pub fn new(api_key: Option<String>, base_url: String) -> Self {
        Self {
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl CompletionProvider for OpenAiCompatProvider {
    fn name(&self) -> &str {
        "openai-compatible"
    }

    async fn stream_completion(
        &self,
        request: CompletionRequest<'_>,
        sender: Sender<StreamChunk>,
    ) -> Result<(), ProviderError> {
        if request.model.is_empty() {
            return Err(ProviderError::Config("no model configured".to_string()));
        }

        let body = ChatRequest {
            model: request.model.to_string(),
            messages: to_wire_messages(request.messages, request.system_prompt),
            stream: true,
        };

        info!(
            "Chat completions request: model={}, message_count={}",
            request.model,
            body.messages.len()
        );

        let mut builder = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .json(&body);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        debug!("Chat completions response status: {}", response.status());

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let err_body = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            warn!("Chat completions API error: {} - {}", status, err_body);
            return Err(ProviderError::Api {
                status,
                message: err_body,
            });
        }

        let mut stream = response.bytes_stream();
        let mut lines = LineBuffer::default();
        let mut chunk_count = 0usize;
        let mut total_content_len = 0usize;

        while let Some(bytes) = stream.next().await {
            let bytes = bytes.map_err(|e| ProviderError::Network(e.to_string()))?;
            lines.extend(&bytes);

            while let Some(line) = lines.next_line() {
                let line = line?;

                let Some(data) = line.strip_prefix("data:").map(str::trim) else {
                    continue;
                };

                if data == "[DONE]" {
                    info!(
                        "Stream complete: {} chunks, {} total content bytes",
                        chunk_count, total_content_len
                    );
                    sender
                        .send(StreamChunk::Completed)
                        .await
                        .map_err(|_| ProviderError::ChannelClosed)?;
                    return Ok(());
                }

                let event: ChunkEvent = serde_json::from_str(data)
                    .map_err(|e| ProviderError::Parse(format!("{e}: {data}")))?;

                for choice in event.choices {
                    let Some(delta) = choice.delta.content.filter(|d| !d.is_empty()) else {
                        continue;
                    };
                    chunk_count += 1;
                    total_content_len += delta.len();
                    if sender.send(StreamChunk::Content(delta)).await.is_err() {
                        warn!("Content chunk send failed: receiver dropped");
                        return Err(ProviderError::ChannelClosed);
                    }
                }
            }
        }

        info!(
            "Stream ended without [DONE]: {} chunks, {} total content bytes",
            chunk_count, total_content_len
        );
        Ok(())
    }
}

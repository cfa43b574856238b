//! # Conversation
//!
//! The submit collaborator behind the composer and the message source behind
//! the conversation view.
//!
//! ```text
//! SubmissionBundle ──► submit() ──► [user msg, empty assistant msg] ──► request #n
//!                        │                         ▲
//!                   (loading?)                     │ append_chunk(n, …)
//!                        ▼                         │
//!                      queue ───── finish(n) ──────┘ next bundle, request #n+1
//! ```
//!
//! Every request carries a number so fragments from an aborted stream that
//! were already in flight can be told apart from the live one.

use std::collections::VecDeque;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use log::{debug, info};

use crate::composer::{Attachment, SubmissionBundle, SubmitHandler};
use crate::inference::{Message, MessageMedia, Role};

#[derive(Debug, Default)]
pub struct Conversation {
    messages: Vec<Message>,
    is_loading: bool,
    queued: VecDeque<SubmissionBundle>,
    request_id: u64,
    needs_request: bool,
}

/// Builds the user message for a bundle. Media bytes are base64-encoded.
pub fn user_message(bundle: SubmissionBundle) -> Message {
    let mut media = MessageMedia::default();
    for attachment in &bundle.attachments {
        match attachment {
            Attachment::Image { bytes, .. } => media.image = Some(STANDARD.encode(bytes)),
            Attachment::Audio { bytes, .. } => media.audio = Some(STANDARD.encode(bytes)),
            Attachment::TextDocument { .. } => {}
        }
    }
    Message::new(Role::User, bundle.text).with_media(media)
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    pub fn queued_len(&self) -> usize {
        self.queued.len()
    }

    /// Number of the request currently streaming, or last streamed.
    pub fn request_id(&self) -> u64 {
        self.request_id
    }

    /// Returns true once after a new request has started.
    pub fn take_request(&mut self) -> bool {
        std::mem::take(&mut self.needs_request)
    }

    /// History to send for the current request, without the assistant
    /// message being filled in.
    pub fn request_messages(&self) -> &[Message] {
        match self.messages.split_last() {
            Some((last, rest)) if self.is_loading && last.role == Role::Assistant => rest,
            _ => &self.messages,
        }
    }

    fn begin(&mut self, bundle: SubmissionBundle) {
        self.messages.push(user_message(bundle));
        self.messages.push(Message::new(Role::Assistant, ""));
        self.is_loading = true;
        self.request_id += 1;
        self.needs_request = true;
        info!("Request #{} started", self.request_id);
    }

    fn is_current(&self, request: u64) -> bool {
        let current = self.is_loading && request == self.request_id;
        if !current {
            debug!("Ignoring output of stale request #{request}");
        }
        current
    }

    /// Extends the assistant message of the current request.
    pub fn append_chunk(&mut self, request: u64, text: &str) {
        if !self.is_current(request) {
            return;
        }
        if let Some(last) = self.messages.last_mut()
            && last.role == Role::Assistant
        {
            last.content.push_str(text);
        }
    }

    /// Ends the current request and starts the next queued one, if any.
    pub fn finish(&mut self, request: u64) {
        if !self.is_current(request) {
            return;
        }
        self.is_loading = false;
        info!("Request #{request} finished");
        if let Some(next) = self.queued.pop_front() {
            self.begin(next);
        }
    }

    /// Stops the current response and drops anything queued behind it.
    /// A response that produced nothing is removed.
    pub fn cancel(&mut self) {
        if !self.is_loading {
            return;
        }
        self.is_loading = false;
        self.needs_request = false;
        let dropped = self.queued.len();
        self.queued.clear();
        if self
            .messages
            .last()
            .is_some_and(|m| m.role == Role::Assistant && m.content.is_empty())
        {
            self.messages.pop();
        }
        info!(
            "Request #{} cancelled, {} queued submission(s) dropped",
            self.request_id, dropped
        );
    }
}

impl SubmitHandler for Conversation {
    fn submit(&mut self, bundle: SubmissionBundle) {
        if self.is_loading {
            info!("Response in flight; queueing submission");
            self.queued.push_back(bundle);
            return;
        }
        self.begin(bundle);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(t: &str) -> SubmissionBundle {
        SubmissionBundle {
            text: t.into(),
            attachments: vec![],
        }
    }

    #[test]
    fn submit_appends_user_and_assistant() {
        let mut conversation = Conversation::new();
        conversation.submit(text("hi"));
        assert!(conversation.is_loading());
        assert!(conversation.take_request());
        assert!(!conversation.take_request());

        let messages = conversation.messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::User);
        assert_eq!(messages[0].content, "hi");
        assert_eq!(messages[1].role, Role::Assistant);
        assert_eq!(conversation.request_messages().len(), 1);
    }

    #[test]
    fn chunks_extend_last_assistant_message() {
        let mut conversation = Conversation::new();
        conversation.submit(text("hi"));
        let id = conversation.request_id();
        conversation.append_chunk(id, "Hel");
        conversation.append_chunk(id, "lo…");
        conversation.finish(id);

        assert!(!conversation.is_loading());
        assert_eq!(conversation.messages()[1].content, "Hello…");
        assert_eq!(conversation.request_messages().len(), 2);
    }

    #[test]
    fn chunks_are_appended_verbatim() {
        let mut conversation = Conversation::new();
        conversation.submit(text("show me"));
        let id = conversation.request_id();
        let fragments = ["“Quoted” — ", "```rust\n", "let s = \"it’s…\";\n", "```"];
        for fragment in fragments {
            conversation.append_chunk(id, fragment);
        }

        assert_eq!(conversation.messages()[1].content, fragments.concat());
    }

    #[test]
    fn media_is_base64_encoded() {
        let bundle = SubmissionBundle {
            text: "look".into(),
            attachments: vec![
                Attachment::Image {
                    preview_uri: "blob:quill/x".into(),
                    bytes: b"img".to_vec(),
                    mime_type: "image/png".into(),
                    file_name: "a.png".into(),
                },
                Attachment::Audio {
                    bytes: b"snd".to_vec(),
                    mime_type: "audio/mp3".into(),
                },
            ],
        };
        let message = user_message(bundle);
        assert_eq!(message.media.image.as_deref(), Some("aW1n"));
        assert_eq!(message.media.audio.as_deref(), Some("c25k"));
    }

    #[test]
    fn submissions_while_loading_are_queued() {
        let mut conversation = Conversation::new();
        conversation.submit(text("first"));
        conversation.take_request();
        conversation.submit(text("second"));
        assert_eq!(conversation.queued_len(), 1);
        assert_eq!(conversation.messages().len(), 2);

        let first = conversation.request_id();
        conversation.finish(first);
        assert!(conversation.is_loading());
        assert!(conversation.take_request());
        assert_eq!(conversation.request_id(), first + 1);
        assert_eq!(conversation.messages()[2].content, "second");
    }

    #[test]
    fn stale_chunks_are_ignored() {
        let mut conversation = Conversation::new();
        conversation.submit(text("one"));
        let stale = conversation.request_id();
        conversation.cancel();
        conversation.submit(text("two"));

        conversation.append_chunk(stale, "late");
        conversation.finish(stale);
        assert!(conversation.is_loading());
        assert_eq!(conversation.messages().last().unwrap().content, "");
    }

    #[test]
    fn cancel_drops_empty_reply_and_queue() {
        let mut conversation = Conversation::new();
        conversation.submit(text("one"));
        conversation.submit(text("two"));
        conversation.cancel();

        assert!(!conversation.is_loading());
        assert_eq!(conversation.queued_len(), 0);
        assert_eq!(conversation.messages().len(), 1);
    }

    #[test]
    fn cancel_keeps_partial_reply() {
        let mut conversation = Conversation::new();
        conversation.submit(text("one"));
        conversation.append_chunk(conversation.request_id(), "partial");
        conversation.cancel();
        assert_eq!(conversation.messages().len(), 2);
    }
}

//! # Conversation Rendering
//!
//! A pure mapping from `(messages, typing)` to a [`RenderTree`]:
//!
//! ```text
//! [Message]  ──►  RenderTree
//!                 ├── Message(MessageNode { id, icon, blocks })
//!                 ├── Message(...)
//!                 └── TypingIndicator          (only when typing)
//! ```
//!
//! Each message becomes a node with its blocks in a fixed order: markdown
//! text, then the image, then the audio clip. Media is addressed by
//! `data:` URIs. An empty conversation renders nothing at all, not even the
//! typing indicator.
//!
//! [`ConversationRenderer`] memoizes nodes by message id and a fingerprint
//! of the content, so while a response streams only the growing message is
//! re-parsed. The memo never changes the output: equal inputs always give
//! deep-equal trees.

use std::collections::hash_map::DefaultHasher;
use std::collections::{HashMap, HashSet};
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use ratatui::style::Color;
use ratatui::text::Text;

use crate::inference::types::{AUDIO_DATA_URI_PREFIX, AUDIO_MIME_TYPE, IMAGE_DATA_URI_PREFIX};
use crate::inference::{Message, Role};
use crate::tui::markdown;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleIcon {
    Person,
    Bot,
    Code,
}

impl RoleIcon {
    pub fn for_role(role: Role) -> Option<Self> {
        match role {
            Role::User => Some(RoleIcon::Person),
            Role::Assistant => Some(RoleIcon::Bot),
            Role::System => Some(RoleIcon::Code),
            Role::Unknown => None,
        }
    }

    pub fn glyph(self) -> &'static str {
        match self {
            RoleIcon::Person => "👤",
            RoleIcon::Bot => "🤖",
            RoleIcon::Code => "⚙",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ContentBlock {
    Markdown(Text<'static>),
    Image { src: String },
    Audio { src: String, mime_type: &'static str },
}

#[derive(Debug, Clone, PartialEq)]
pub struct MessageNode {
    pub id: String,
    pub role: Role,
    pub icon: Option<RoleIcon>,
    pub blocks: Vec<ContentBlock>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RenderNode {
    Message(Arc<MessageNode>),
    TypingIndicator,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct RenderTree {
    pub nodes: Vec<RenderNode>,
}

impl RenderTree {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Message nodes only; the typing indicator is not counted.
    pub fn message_count(&self) -> usize {
        self.messages().count()
    }

    pub fn messages(&self) -> impl Iterator<Item = &MessageNode> {
        self.nodes.iter().filter_map(|node| match node {
            RenderNode::Message(message) => Some(message.as_ref()),
            RenderNode::TypingIndicator => None,
        })
    }

    pub fn has_typing_indicator(&self) -> bool {
        self.nodes
            .iter()
            .any(|node| matches!(node, RenderNode::TypingIndicator))
    }
}

/// Foreground color markdown text is drawn with, per role.
pub fn role_color(role: Role) -> Color {
    match role {
        Role::User => Color::Green,
        Role::Assistant => Color::Blue,
        Role::System => Color::Yellow,
        Role::Unknown => Color::DarkGray,
    }
}

/// Builds the node for one message.
pub fn render_message(message: &Message) -> MessageNode {
    let mut blocks = Vec::with_capacity(3);
    if !message.content.is_empty() {
        blocks.push(ContentBlock::Markdown(markdown::render(
            &message.content,
            role_color(message.role),
        )));
    }
    if let Some(image) = &message.media.image {
        blocks.push(ContentBlock::Image {
            src: format!("{IMAGE_DATA_URI_PREFIX}{image}"),
        });
    }
    if let Some(audio) = &message.media.audio {
        blocks.push(ContentBlock::Audio {
            src: format!("{AUDIO_DATA_URI_PREFIX}{audio}"),
            mime_type: AUDIO_MIME_TYPE,
        });
    }

    MessageNode {
        id: message.id.clone(),
        role: message.role,
        icon: RoleIcon::for_role(message.role),
        blocks,
    }
}

/// Renders without memoization.
pub fn render_conversation(messages: &[Message], typing: bool) -> RenderTree {
    assemble(messages, typing, |m| Arc::new(render_message(m)))
}

fn assemble(
    messages: &[Message],
    typing: bool,
    mut node_for: impl FnMut(&Message) -> Arc<MessageNode>,
) -> RenderTree {
    if messages.is_empty() {
        return RenderTree::default();
    }

    let mut nodes: Vec<RenderNode> = messages
        .iter()
        .map(|m| RenderNode::Message(node_for(m)))
        .collect();
    if typing {
        nodes.push(RenderNode::TypingIndicator);
    }
    RenderTree { nodes }
}

/// Only content grows once a message exists; media is fixed at creation,
/// so its length stands in for the payload.
fn fingerprint(message: &Message) -> u64 {
    let mut hasher = DefaultHasher::new();
    message.role.hash(&mut hasher);
    message.content.hash(&mut hasher);
    message.media.image.as_ref().map(String::len).hash(&mut hasher);
    message.media.audio.as_ref().map(String::len).hash(&mut hasher);
    hasher.finish()
}

/// Memoizing renderer. Keeps one node per live message id.
#[derive(Default)]
pub struct ConversationRenderer {
    memo: HashMap<String, (u64, Arc<MessageNode>)>,
}

impl ConversationRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn render(&mut self, messages: &[Message], typing: bool) -> RenderTree {
        let memo = &mut self.memo;
        let tree = assemble(messages, typing, |message| {
            let print = fingerprint(message);
            match memo.get(&message.id) {
                Some((cached, node)) if *cached == print => Arc::clone(node),
                _ => {
                    let node = Arc::new(render_message(message));
                    memo.insert(message.id.clone(), (print, Arc::clone(&node)));
                    node
                }
            }
        });

        if self.memo.len() > messages.len() {
            let live: HashSet<&str> = messages.iter().map(|m| m.id.as_str()).collect();
            self.memo.retain(|id, _| live.contains(id.as_str()));
        }
        tree
    }

    pub fn cached(&self) -> usize {
        self.memo.len()
    }
}

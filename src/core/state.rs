//! # Application State
//!
//! Core business state for Quill. This module contains domain logic only -
//! no TUI-specific types. Presentation state lives in the `tui` module.
//!
//! ```text
//! App
//! ├── provider: Arc<dyn CompletionProvider>  // LLM backend
//! ├── conversation: Conversation    // messages, loading flag, queue
//! ├── composer: Composer            // draft, attachment, recording flag
//! ├── status_message: String        // status bar text
//! ├── model_name: String            // current model
//! └── system_prompt: Option<String> // prepended to every request
//! ```
//!
//! State changes only happen through `update(state, action)` in action.rs.

use std::sync::Arc;

use crate::composer::Composer;
use crate::core::config::ResolvedConfig;
use crate::core::conversation::Conversation;
use crate::inference::CompletionProvider;

pub struct App {
    pub provider: Arc<dyn CompletionProvider>,
    pub conversation: Conversation,
    pub composer: Composer,
    pub status_message: String,
    pub model_name: String,
    pub system_prompt: Option<String>,
}

impl App {
    pub fn new(provider: Arc<dyn CompletionProvider>, model_name: String) -> Self {
        Self {
            provider,
            conversation: Conversation::new(),
            composer: Composer::default(),
            status_message: String::from("Welcome to Quill!"),
            model_name,
            system_prompt: None,
        }
    }

    pub fn from_config(provider: Arc<dyn CompletionProvider>, config: &ResolvedConfig) -> Self {
        Self {
            composer: Composer::new(config.auto_submit_delay),
            system_prompt: Some(config.system_prompt.clone()),
            ..Self::new(provider, config.model_name.clone())
        }
    }

    pub fn is_loading(&self) -> bool {
        self.conversation.is_loading()
    }
}

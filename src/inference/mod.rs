pub mod provider;
pub mod providers;
pub mod types;

pub use provider::{CompletionProvider, CompletionRequest, ProviderError};
pub use providers::OpenAiCompatProvider;
pub use types::{Message, MessageMedia, Role, StreamChunk};

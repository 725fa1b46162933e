pub mod completion_client;
pub mod error;

pub use completion_client::{CompletionClient, CHAT_COMPLETION_PATH, DEFAULT_BASE_URL};
pub use error::CompletionError;

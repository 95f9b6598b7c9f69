//! Capability ports for the external language-completion service.

pub mod openai;
pub mod traits;

pub use openai::OpenAiClient;
pub use traits::CompletionPort;

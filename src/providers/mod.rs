// Upstream API clients

pub mod anthropic;
pub mod openai;
pub mod paradigm;

pub use anthropic::AnthropicClient;
pub use openai::OpenAiClient;
pub use paradigm::{ParadigmClient, PollSettings};

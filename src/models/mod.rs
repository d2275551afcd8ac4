// Data models for API formats

pub mod anthropic;
pub mod openai;
pub mod paradigm;
pub mod workflow;

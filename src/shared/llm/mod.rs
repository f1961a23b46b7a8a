//! LLM integration: client seam, tolerant JSON parsing and structured generation.

pub mod client;
pub mod parser;
pub mod response;
pub mod structured;

pub use client::{LlmClient, LlmError, OpenAiLlmClient};
pub use response::LlmOutput;
pub use structured::StructuredGenerator;

//! LLM module — chat-completion response client
//!
//! Wraps an OpenAI-compatible `/chat/completions` endpoint (Ollama by
//! default). Each call is independent: a fixed system instruction plus the
//! caller's prompt, one request, first choice's text back.

pub mod client;
pub mod types;

pub use client::{GenerateError, ResponseClient, SYSTEM_PROMPT};
pub use types::{ChatCompletionRequest, ChatCompletionResponse, ChatMessage, ChatRole};

//! OpenAI-compatible output shape.
//!
//! The assembled list is already in OpenAI's chat-completions shape, so this
//! is an identity passthrough. It also covers the many OpenAI-compatible
//! endpoints (OpenRouter, Ollama, vLLM, …).

use loreweave_core::message::ChatMessage;
use serde::{Deserialize, Serialize};

/// One message in OpenAI wire format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenAiMessage {
    pub role: String,
    pub content: String,
}

/// Identity conversion into OpenAI message format.
pub fn convert(messages: &[ChatMessage]) -> Vec<OpenAiMessage> {
    messages
        .iter()
        .map(|m| OpenAiMessage {
            role: m.role.as_str().to_string(),
            content: m.content.clone(),
        })
        .collect()
}

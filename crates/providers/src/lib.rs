//! Provider payload shaping.
//!
//! Reshapes one assembled message list into provider-specific payloads:
//!
//! - **OpenAI**: identity passthrough — system messages stay inline
//! - **Claude**: system contents lift into a top-level `system` field; the
//!   remainder is normalized to a user-first, strictly alternating sequence
//! - **Gemini**: system contents join into `systemInstruction`; assistant
//!   maps to `"model"`; no alternation enforcement
//!
//! Only payload shaping lives here — the wire protocol to the provider is
//! the platform's concern.

pub mod claude;
pub mod compat;
pub mod gemini;
pub mod openai;

use loreweave_core::message::ChatMessage;
use serde::{Deserialize, Serialize};

pub use claude::{ClaudeMessage, ClaudePayload};
pub use gemini::{GeminiContent, GeminiPart, GeminiPayload, SystemInstruction};
pub use openai::OpenAiMessage;

/// Which provider shape to emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    OpenAi,
    Claude,
    Gemini,
}

/// A provider-shaped payload.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ProviderPayload {
    OpenAi(Vec<OpenAiMessage>),
    Claude(ClaudePayload),
    Gemini(GeminiPayload),
}

/// Convert an assembled message list into the requested provider shape.
pub fn convert(format: OutputFormat, messages: &[ChatMessage]) -> ProviderPayload {
    match format {
        OutputFormat::OpenAi => ProviderPayload::OpenAi(openai::convert(messages)),
        OutputFormat::Claude => ProviderPayload::Claude(claude::convert(messages)),
        OutputFormat::Gemini => ProviderPayload::Gemini(gemini::convert(messages)),
    }
}

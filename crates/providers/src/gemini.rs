//! Gemini (Google generateContent) output shape.
//!
//! System contents join into `systemInstruction.parts[0].text` (the field is
//! omitted when there are none); assistant turns map to role `"model"`. No
//! alternation enforcement — Gemini accepts free-form content order.

use loreweave_core::message::{ChatMessage, ChatRole};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeminiPart {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemInstruction {
    pub parts: Vec<GeminiPart>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeminiContent {
    /// `"user"` or `"model"`
    pub role: String,
    pub parts: Vec<GeminiPart>,
}

/// A Gemini generateContent payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<SystemInstruction>,

    pub contents: Vec<GeminiContent>,
}

/// Convert an assembled message list into Gemini's shape.
pub fn convert(messages: &[ChatMessage]) -> GeminiPayload {
    let mut system_parts: Vec<&str> = Vec::new();
    let mut contents: Vec<GeminiContent> = Vec::new();

    for msg in messages {
        match msg.role {
            ChatRole::System => system_parts.push(&msg.content),
            ChatRole::User | ChatRole::Assistant => contents.push(GeminiContent {
                role: match msg.role {
                    ChatRole::Assistant => "model".to_string(),
                    _ => "user".to_string(),
                },
                parts: vec![GeminiPart {
                    text: msg.content.clone(),
                }],
            }),
        }
    }

    let system_instruction = if system_parts.is_empty() {
        None
    } else {
        Some(SystemInstruction {
            parts: vec![GeminiPart {
                text: system_parts.join("\n\n"),
            }],
        })
    };

    GeminiPayload {
        system_instruction,
        contents,
    }
}

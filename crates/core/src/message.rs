//! Chat message value objects.
//!
//! Messages are the output shape of the assembly pipeline: a role plus text.
//! Platform concerns (ids, timestamps, tool calls) stay outside the compiler;
//! only what a provider payload needs flows through here.

use serde::{Deserialize, Serialize};

/// The role a piece of text assumes in the final message sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    /// Fixed instructions, lore, and other trusted scaffolding
    System,
    /// The end user
    User,
    /// The model's prior turns
    Assistant,
}

impl ChatRole {
    /// Parse a role string leniently. Unknown values degrade to `System`
    /// rather than failing — upstream records carry free-form role strings.
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "user" => Self::User,
            "assistant" | "model" => Self::Assistant,
            _ => Self::System,
        }
    }

    /// The canonical wire name for this role.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// A single message in the assembled sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Who speaks this text
    pub role: ChatRole,

    /// The text content
    pub content: String,
}

impl ChatMessage {
    /// Create a new system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    /// Create a new user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    /// Create a new assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

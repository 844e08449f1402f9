//! Claude (Anthropic Messages API) output shape.
//!
//! Claude takes the system prompt as a top-level field, not in the message
//! list, and requires a user-first, strictly alternating user/assistant
//! sequence.

use loreweave_core::message::{ChatMessage, ChatRole};
use serde::{Deserialize, Serialize};

use crate::compat::{ensure_alternating_pattern, ensure_starts_with_user, merge_same_role_messages};

/// One message in Claude wire format. Role is `"user"` or `"assistant"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaudeMessage {
    pub role: String,
    pub content: String,
}

/// A Claude Messages API payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaudePayload {
    /// Joined system contents, absent when there were none
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,

    pub messages: Vec<ClaudeMessage>,
}

/// Convert an assembled message list into Claude's shape.
///
/// System contents are extracted and joined into the `system` field; the
/// remainder runs through the compatibility normalizers, and any system
/// entries those synthesize are stripped at the end.
pub fn convert(messages: &[ChatMessage]) -> ClaudePayload {
    let mut system_parts: Vec<&str> = Vec::new();
    let mut rest: Vec<ChatMessage> = Vec::new();
    for msg in messages {
        match msg.role {
            ChatRole::System => system_parts.push(&msg.content),
            _ => rest.push(msg.clone()),
        }
    }
    let system = if system_parts.is_empty() {
        None
    } else {
        Some(system_parts.join("\n\n"))
    };

    let rest = ensure_starts_with_user(rest);
    let rest = merge_same_role_messages(rest);
    let rest = ensure_alternating_pattern(rest);

    let messages = rest
        .into_iter()
        .filter(|m| m.role != ChatRole::System)
        .map(|m| ClaudeMessage {
            role: m.role.as_str().to_string(),
            content: m.content,
        })
        .collect();

    ClaudePayload { system, messages }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_lifts_and_users_merge() {
        let payload = convert(&[
            ChatMessage::system("S"),
            ChatMessage::user("A"),
            ChatMessage::user("B"),
            ChatMessage::assistant("C"),
        ]);
        assert_eq!(payload.system.as_deref(), Some("S"));
        assert_eq!(payload.messages.len(), 2);
        assert_eq!(payload.messages[0].role, "user");
        assert_eq!(payload.messages[0].content, "A\n\nB");
        assert_eq!(payload.messages[1].role, "assistant");
        assert_eq!(payload.messages[1].content, "C");
    }

    #[test]
    fn no_system_field_when_no_system_messages() {
        let payload = convert(&[ChatMessage::user("hi")]);
        assert!(payload.system.is_none());
        let json = serde_json::to_string(&payload).unwrap();
        assert!(!json.contains("system"));
    }

    #[test]
    fn multiple_system_messages_join() {
        let payload = convert(&[
            ChatMessage::system("S1"),
            ChatMessage::user("hi"),
            ChatMessage::system("S2"),
        ]);
        assert_eq!(payload.system.as_deref(), Some("S1\n\nS2"));
    }

    #[test]
    fn synthesized_system_entries_are_stripped() {
        // Assistant-first remainder folds into a synthetic system message,
        // which must not survive into the Claude message list.
        let payload = convert(&[ChatMessage::assistant("greeting"), ChatMessage::user("hi")]);
        assert!(payload.messages.iter().all(|m| m.role != "system"));
        assert_eq!(payload.messages.len(), 1);
        assert_eq!(payload.messages[0].content, "hi");
    }
}

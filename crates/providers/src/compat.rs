//! Provider-compatibility helpers.
//!
//! Some providers reject message lists the assembler happily produces:
//! consecutive same-role messages, assistant-first sequences, broken
//! alternation. These helpers normalize a list without ever dropping
//! content — at worst the output still violates alternation and the
//! provider gets to complain.

use loreweave_core::message::{ChatMessage, ChatRole};

/// Merge consecutive same-role messages, joining contents with a blank line.
pub fn merge_same_role_messages(messages: Vec<ChatMessage>) -> Vec<ChatMessage> {
    let mut merged: Vec<ChatMessage> = Vec::with_capacity(messages.len());
    for msg in messages {
        match merged.last_mut() {
            Some(last) if last.role == msg.role => {
                last.content.push_str("\n\n");
                last.content.push_str(&msg.content);
            }
            _ => merged.push(msg),
        }
    }
    merged
}

/// Ensure the sequence starts with a user message by folding all leading
/// non-user messages into one synthetic leading system message.
pub fn ensure_starts_with_user(messages: Vec<ChatMessage>) -> Vec<ChatMessage> {
    let first_user = messages.iter().position(|m| m.role == ChatRole::User);
    match first_user {
        Some(0) => messages,
        None if messages.is_empty() => messages,
        boundary => {
            let split = boundary.unwrap_or(messages.len());
            let folded: Vec<String> = messages[..split]
                .iter()
                .map(|m| m.content.clone())
                .collect();
            let mut out = Vec::with_capacity(messages.len() - split + 1);
            out.push(ChatMessage::system(folded.join("\n\n")));
            out.extend(messages.into_iter().skip(split));
            out
        }
    }
}

/// Enforce strict user/assistant alternation.
///
/// System messages pass through without touching the expectation. A message
/// matching the expected role flips it. A wrong-role message merges into the
/// previous message when that one has the same role; otherwise it is
/// appended as-is — content is never dropped, even if alternation ends up
/// violated.
pub fn ensure_alternating_pattern(messages: Vec<ChatMessage>) -> Vec<ChatMessage> {
    let mut out: Vec<ChatMessage> = Vec::with_capacity(messages.len());
    let mut expected = ChatRole::User;

    for msg in messages {
        if msg.role == ChatRole::System {
            out.push(msg);
            continue;
        }
        if msg.role == expected {
            expected = if expected == ChatRole::User {
                ChatRole::Assistant
            } else {
                ChatRole::User
            };
            out.push(msg);
            continue;
        }
        match out.last_mut() {
            Some(last) if last.role == msg.role => {
                last.content.push_str("\n\n");
                last.content.push_str(&msg.content);
            }
            _ => out.push(msg),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_joins_consecutive_same_role() {
        let merged = merge_same_role_messages(vec![
            ChatMessage::user("A"),
            ChatMessage::user("B"),
            ChatMessage::assistant("C"),
        ]);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].content, "A\n\nB");
        assert_eq!(merged[1].content, "C");
    }

    #[test]
    fn starts_with_user_is_untouched() {
        let msgs = vec![ChatMessage::user("hi"), ChatMessage::assistant("hello")];
        let out = ensure_starts_with_user(msgs.clone());
        assert_eq!(out, msgs);
    }

    #[test]
    fn leading_non_user_folds_into_system() {
        let out = ensure_starts_with_user(vec![
            ChatMessage::assistant("greeting"),
            ChatMessage::system("note"),
            ChatMessage::user("hi"),
        ]);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].role, ChatRole::System);
        assert_eq!(out[0].content, "greeting\n\nnote");
        assert_eq!(out[1].content, "hi");
    }

    #[test]
    fn no_user_at_all_folds_everything() {
        let out = ensure_starts_with_user(vec![
            ChatMessage::assistant("a"),
            ChatMessage::assistant("b"),
        ]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].role, ChatRole::System);
        assert_eq!(out[0].content, "a\n\nb");
    }

    #[test]
    fn alternation_passes_well_formed_sequences() {
        let msgs = vec![
            ChatMessage::user("u1"),
            ChatMessage::assistant("a1"),
            ChatMessage::user("u2"),
        ];
        assert_eq!(ensure_alternating_pattern(msgs.clone()), msgs);
    }

    #[test]
    fn alternation_merges_wrong_role_into_previous() {
        let out = ensure_alternating_pattern(vec![
            ChatMessage::user("u1"),
            ChatMessage::assistant("a1"),
            ChatMessage::assistant("a2"),
        ]);
        assert_eq!(out.len(), 2);
        assert_eq!(out[1].content, "a1\n\na2");
    }

    #[test]
    fn alternation_never_drops_content() {
        // Assistant first: appended as-is, alternation violated but intact.
        let out = ensure_alternating_pattern(vec![
            ChatMessage::assistant("orphan"),
            ChatMessage::user("u1"),
        ]);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].content, "orphan");
        assert_eq!(out[1].content, "u1");
    }

    #[test]
    fn system_messages_pass_through_alternation() {
        let out = ensure_alternating_pattern(vec![
            ChatMessage::user("u1"),
            ChatMessage::system("note"),
            ChatMessage::assistant("a1"),
        ]);
        assert_eq!(out.len(), 3);
        assert_eq!(out[1].role, ChatRole::System);
    }
}

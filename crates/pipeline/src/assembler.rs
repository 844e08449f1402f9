//! Message assembly — budgeted buckets in, one ordered message list out.
//!
//! Buckets flatten in fixed order: system prompts, before-char, char def,
//! after-char, example block, history (with depth injections spliced in),
//! author's note, latest input. Depth injections are processed deepest
//! first against the growing history list, which keeps every insertion
//! index valid; an injection at depth 0 lands just before the newest
//! history message.

use loreweave_core::component::PromptComponent;
use loreweave_core::message::ChatMessage;
use tracing::trace;

use crate::grouper::PositionBuckets;

/// Flatten budgeted buckets into the final message list.
pub fn assemble(buckets: &PositionBuckets) -> Vec<ChatMessage> {
    let mut messages: Vec<ChatMessage> = Vec::new();

    let head = [
        &buckets.system_prompts,
        &buckets.before_char,
        &buckets.char_def,
        &buckets.after_char,
        &buckets.example_top,
        &buckets.examples,
        &buckets.example_bottom,
    ];
    for bucket in head {
        messages.extend(bucket.iter().map(to_message));
    }

    messages.extend(splice_history(&buckets.history, &buckets.depth_injections));

    for bucket in [&buckets.an_top, &buckets.an_bottom, &buckets.latest_input] {
        messages.extend(bucket.iter().map(to_message));
    }

    trace!(messages = messages.len(), "messages assembled");
    messages
}

/// Splice depth injections into the history sequence.
///
/// Injections are processed by depth descending (grouper order reversed by
/// depth, ties ascending by order); each insertion index is computed against
/// the current list, so earlier (deeper) insertions stay put as later ones
/// land behind them.
fn splice_history(
    history: &[PromptComponent],
    injections: &[PromptComponent],
) -> Vec<ChatMessage> {
    let mut spliced: Vec<ChatMessage> = history.iter().map(to_message).collect();

    let mut by_depth: Vec<&PromptComponent> = injections.iter().collect();
    by_depth.sort_by(|a, b| b.depth.cmp(&a.depth).then(a.order.cmp(&b.order)));

    for injection in by_depth {
        let len = spliced.len() as i64;
        let index = (len - 1 - injection.depth as i64).clamp(0, len) as usize;
        spliced.insert(index, to_message(injection));
    }
    spliced
}

fn to_message(component: &PromptComponent) -> ChatMessage {
    ChatMessage {
        role: component.role,
        content: component.content.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grouper::group;
    use loreweave_core::component::Position;
    use loreweave_core::message::ChatRole;

    fn component(id: &str, content: &str, position: Position, order: i32) -> PromptComponent {
        PromptComponent::new(id, content, position).with_order(order)
    }

    fn history3() -> Vec<PromptComponent> {
        vec![
            component("history-0", "h0", Position::History, 0),
            component("history-1", "h1", Position::History, 1),
            component("history-2", "h2", Position::History, 2),
        ]
    }

    #[test]
    fn flatten_order_is_fixed() {
        let buckets = group(vec![
            component("input", "latest", Position::LatestInput, 0),
            component("an", "note", Position::AnTop, 0),
            component("sys", "system", Position::SystemPrompts, 0),
            component("hist", "turn", Position::History, 0),
            component("char", "definition", Position::CharDef, 0),
        ]);
        let assembled = assemble(&buckets);
        let contents: Vec<&str> = assembled
            .iter()
            .map(|m| m.content.as_str())
            .collect();
        assert_eq!(contents, vec!["system", "definition", "turn", "note", "latest"]);
    }

    #[test]
    fn depth_splicing_matches_reference_layout() {
        let mut d0 = component("d0", "D0", Position::DepthInjection, 0);
        d0.depth = 0;
        let mut d1 = component("d1", "D1", Position::DepthInjection, 0);
        d1.depth = 1;

        let mut input = history3();
        input.push(d0);
        input.push(d1);
        let assembled = assemble(&group(input));
        let contents: Vec<&str> = assembled
            .iter()
            .map(|m| m.content.as_str())
            .collect();
        assert_eq!(contents, vec!["h0", "D1", "h1", "D0", "h2"]);
    }

    #[test]
    fn oversized_depth_clamps_to_front() {
        let mut deep = component("deep", "DEEP", Position::DepthInjection, 0);
        deep.depth = 99;
        let mut input = history3();
        input.push(deep);
        let assembled = assemble(&group(input));
        let contents: Vec<&str> = assembled
            .iter()
            .map(|m| m.content.as_str())
            .collect();
        assert_eq!(contents, vec!["DEEP", "h0", "h1", "h2"]);
    }

    #[test]
    fn injection_into_empty_history_still_lands() {
        let mut d0 = component("d0", "D0", Position::DepthInjection, 0);
        d0.depth = 0;
        let assembled = assemble(&group(vec![d0]));
        let contents: Vec<&str> = assembled
            .iter()
            .map(|m| m.content.as_str())
            .collect();
        assert_eq!(contents, vec!["D0"]);
    }

    #[test]
    fn same_depth_injections_keep_order() {
        let mut a = component("a", "A", Position::DepthInjection, 1);
        a.depth = 1;
        let mut b = component("b", "B", Position::DepthInjection, 2);
        b.depth = 1;
        let mut input = history3();
        input.push(b);
        input.push(a);
        let assembled = assemble(&group(input));
        let contents: Vec<&str> = assembled
            .iter()
            .map(|m| m.content.as_str())
            .collect();
        assert_eq!(contents, vec!["h0", "A", "B", "h1", "h2"]);
    }

    #[test]
    fn roles_flow_through() {
        let buckets = group(vec![
            component("sys", "s", Position::SystemPrompts, 0),
            component("input", "u", Position::LatestInput, 0).with_role(ChatRole::User),
        ]);
        let messages = assemble(&buckets);
        assert_eq!(messages[0].role, ChatRole::System);
        assert_eq!(messages[1].role, ChatRole::User);
    }
}

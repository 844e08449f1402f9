//! Component collection — raw sources in, uniform components out.
//!
//! Pure, side-effect-free mappers. Each collector takes one kind of source
//! (fixed content items, history turns, activated lore, live input) and
//! produces `PromptComponent`s with position, ordering, and token estimates
//! stamped on. Position classification for content items is a best-effort
//! substring match that never fails — unmatched ids land with the fixed
//! instructions.

use std::sync::Arc;

use loreweave_core::component::{Position, PromptComponent};
use loreweave_core::message::{ChatMessage, ChatRole};
use loreweave_core::source::ContentItem;
use loreweave_core::token::EstimateCache;
use loreweave_core::worldbook::LorePosition;
use loreweave_worldbook::ActivatedEntry;
use tracing::trace;

/// Substring vocabulary for classifying content-item ids. First hit wins;
/// "before"/"after" precede "char" so `after_char` doesn't misfile.
const POSITION_VOCABULARY: &[(&str, Position)] = &[
    ("before", Position::BeforeChar),
    ("after", Position::AfterChar),
    ("post", Position::AfterChar),
    ("mes_example", Position::Examples),
    ("example", Position::Examples),
    ("author", Position::AnTop),
    ("note", Position::AnTop),
    ("history", Position::History),
    ("input", Position::LatestInput),
    ("char", Position::CharDef),
    ("description", Position::CharDef),
    ("personality", Position::CharDef),
    ("scenario", Position::CharDef),
];

/// Turns raw sources into uniform components.
pub struct ComponentCollector {
    cache: Arc<EstimateCache>,
}

impl ComponentCollector {
    pub fn new(cache: Arc<EstimateCache>) -> Self {
        Self { cache }
    }

    /// Enabled content items become required components with a heuristically
    /// classified position.
    pub fn collect_content_items(&self, items: &[ContentItem]) -> Vec<PromptComponent> {
        items
            .iter()
            .filter(|item| item.is_enabled)
            .map(|item| {
                let position = classify_position(&item.id);
                trace!(id = %item.id, ?position, "content item classified");
                let mut c = PromptComponent::new(
                    format!("content-{}", item.id),
                    item.content.clone(),
                    position,
                )
                .with_role(ChatRole::parse(&item.role))
                .with_order(item.order)
                .required();
                c.tokens = self.cache.estimate(&c.content);
                c
            })
            .collect()
    }

    /// History turns (oldest → newest) become non-required components
    /// ordered by turn index.
    pub fn collect_history(&self, history: &[ChatMessage]) -> Vec<PromptComponent> {
        history
            .iter()
            .enumerate()
            .map(|(i, turn)| {
                let mut c = PromptComponent::new(
                    format!("history-{i}"),
                    turn.content.clone(),
                    Position::History,
                )
                .with_role(turn.role)
                .with_order(i as i32);
                c.tokens = self.cache.estimate(&c.content);
                c
            })
            .collect()
    }

    /// Activated world-book entries become components carrying the lore
    /// flags the budget allocation keys on.
    pub fn collect_world_book(&self, activated: &[ActivatedEntry]) -> Vec<PromptComponent> {
        activated
            .iter()
            .map(|a| {
                let mut c = PromptComponent::new(
                    format!("worldbook-{}", a.entry.uid),
                    a.entry.content.clone(),
                    lore_bucket(a.entry.position),
                )
                .with_order(a.entry.order)
                .with_depth(a.entry.depth);
                c.constant = a.entry.constant;
                c.ignore_budget = a.entry.ignore_budget;
                c.match_count = a.match_count;
                c.activation_order = a.activation_order;
                c.tokens = self.cache.estimate(&c.content);
                c
            })
            .collect()
    }

    /// Live user input becomes one required latest-input component at
    /// order 0.
    pub fn collect_user_input(&self, input: &str) -> PromptComponent {
        let mut c = PromptComponent::new("latest-input", input, Position::LatestInput)
            .with_role(ChatRole::User)
            .with_order(0)
            .required();
        c.tokens = self.cache.estimate(&c.content);
        c
    }
}

fn classify_position(id: &str) -> Position {
    let id = id.to_lowercase();
    POSITION_VOCABULARY
        .iter()
        .find(|(needle, _)| id.contains(needle))
        .map(|(_, position)| *position)
        // Unmatched ids are fixed instructions — system-positioned.
        .unwrap_or(Position::SystemPrompts)
}

fn lore_bucket(position: LorePosition) -> Position {
    match position {
        LorePosition::BeforeChar => Position::BeforeChar,
        LorePosition::AfterChar => Position::AfterChar,
        LorePosition::AnTop => Position::AnTop,
        LorePosition::AnBottom => Position::AnBottom,
        LorePosition::AtDepth => Position::DepthInjection,
        LorePosition::EmTop => Position::ExampleTop,
        LorePosition::EmBottom => Position::ExampleBottom,
        // Outlet content is consumed via the grouped output; as a component
        // it rides in the default bucket.
        LorePosition::Outlet => Position::AfterChar,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use loreweave_core::worldbook::WorldBookEntry;

    fn collector() -> ComponentCollector {
        ComponentCollector::new(Arc::new(EstimateCache::default()))
    }

    #[test]
    fn disabled_items_are_skipped() {
        let mut item = ContentItem::new("main", "text");
        item.is_enabled = false;
        assert!(collector().collect_content_items(&[item]).is_empty());
    }

    #[test]
    fn content_items_are_required_with_tokens() {
        let out = collector().collect_content_items(&[ContentItem::new("main", "Some rules.")]);
        assert_eq!(out.len(), 1);
        assert!(out[0].required);
        assert!(out[0].tokens > 0);
        assert_eq!(out[0].position, Position::SystemPrompts);
    }

    #[test]
    fn position_classification_vocabulary() {
        assert_eq!(classify_position("char_description"), Position::CharDef);
        assert_eq!(classify_position("before_char"), Position::BeforeChar);
        assert_eq!(classify_position("after_char"), Position::AfterChar);
        assert_eq!(classify_position("mes_example"), Position::Examples);
        assert_eq!(classify_position("authors_note"), Position::AnTop);
        assert_eq!(classify_position("main_prompt"), Position::SystemPrompts);
        // Soft classification: anything unknown is a fixed instruction.
        assert_eq!(classify_position("xyzzy"), Position::SystemPrompts);
    }

    #[test]
    fn history_keeps_turn_order() {
        let out = collector().collect_history(&[
            ChatMessage::user("first"),
            ChatMessage::assistant("second"),
        ]);
        assert_eq!(out.len(), 2);
        assert!(!out[0].required);
        assert_eq!(out[0].order, 0);
        assert_eq!(out[1].order, 1);
        assert_eq!(out[0].role, ChatRole::User);
        assert_eq!(out[1].role, ChatRole::Assistant);
        assert_eq!(out[0].position, Position::History);
    }

    #[test]
    fn world_book_components_carry_flags_and_prefix() {
        let mut entry = WorldBookEntry::new("dragons", "Dragons", "Dragons breathe fire.");
        entry.ignore_budget = true;
        entry.constant = true;
        entry.order = 7;
        let activated = ActivatedEntry {
            entry,
            match_count: 3,
            activation_order: 1,
            tokens: 0,
            via_sticky: false,
        };
        let out = collector().collect_world_book(&[activated]);
        assert_eq!(out[0].id, "worldbook-dragons");
        assert!(out[0].ignore_budget);
        assert!(out[0].constant);
        assert_eq!(out[0].match_count, 3);
        assert_eq!(out[0].activation_order, 1);
        assert_eq!(out[0].order, 7);
        assert_eq!(out[0].position, Position::BeforeChar);
    }

    #[test]
    fn at_depth_lore_maps_to_depth_injection() {
        let mut entry = WorldBookEntry::new("whisper", "Whisper", "A voice from below.");
        entry.position = LorePosition::AtDepth;
        entry.depth = 2;
        let activated = ActivatedEntry {
            entry,
            match_count: 1,
            activation_order: 0,
            tokens: 0,
            via_sticky: false,
        };
        let out = collector().collect_world_book(&[activated]);
        assert_eq!(out[0].position, Position::DepthInjection);
        assert_eq!(out[0].depth, 2);
    }

    #[test]
    fn user_input_is_required_at_order_zero() {
        let c = collector().collect_user_input("Continue the story");
        assert!(c.required);
        assert_eq!(c.order, 0);
        assert_eq!(c.role, ChatRole::User);
        assert_eq!(c.position, Position::LatestInput);
    }
}

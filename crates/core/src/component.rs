//! Prompt components — the unit of text flowing through the assembly pipeline.
//!
//! A component is a piece of text plus placement metadata. Components are
//! created fresh per build call and never mutated in place; every transform
//! copies. The `position` decides which of the twelve buckets the grouper
//! files it into.

use serde::{Deserialize, Serialize};

use crate::alloc::BudgetCandidate;
use crate::message::ChatRole;

/// Default ordering weight. Smaller sorts earlier within a bucket.
pub const DEFAULT_ORDER: i32 = 100;

/// One of the twelve placement buckets in the final message sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Position {
    SystemPrompts,
    BeforeChar,
    CharDef,
    AfterChar,
    ExampleTop,
    Examples,
    ExampleBottom,
    History,
    DepthInjection,
    AnTop,
    AnBottom,
    LatestInput,
}

impl Position {
    /// All buckets in assembly order.
    pub const ALL: [Position; 12] = [
        Position::SystemPrompts,
        Position::BeforeChar,
        Position::CharDef,
        Position::AfterChar,
        Position::ExampleTop,
        Position::Examples,
        Position::ExampleBottom,
        Position::History,
        Position::DepthInjection,
        Position::AnTop,
        Position::AnBottom,
        Position::LatestInput,
    ];

    /// Parse a position string leniently. Unknown values degrade to
    /// `AfterChar` rather than failing.
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "system_prompts" | "system" => Self::SystemPrompts,
            "before_char" | "before" => Self::BeforeChar,
            "char_def" | "char" => Self::CharDef,
            "after_char" | "after" => Self::AfterChar,
            "example_top" => Self::ExampleTop,
            "examples" | "example" => Self::Examples,
            "example_bottom" => Self::ExampleBottom,
            "history" => Self::History,
            "depth_injection" | "at_depth" => Self::DepthInjection,
            "an_top" => Self::AnTop,
            "an_bottom" => Self::AnBottom,
            "latest_input" | "input" => Self::LatestInput,
            _ => Self::AfterChar,
        }
    }
}

/// A unit of text plus placement metadata flowing through the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptComponent {
    /// Identifier, unique within one build pass. World-book components carry
    /// the `worldbook-` prefix, which the budget partition keys on.
    pub id: String,

    /// The text content
    pub content: String,

    /// Role the content assumes in the final message list
    pub role: ChatRole,

    /// Placement bucket
    pub position: Position,

    /// Ordering weight within the bucket (smaller = earlier)
    pub order: i32,

    /// Injection depth, only meaningful for `DepthInjection`
    #[serde(default)]
    pub depth: u32,

    /// Estimated token cost (computed at collection time)
    #[serde(default)]
    pub tokens: u32,

    /// Required components always survive budget filtering
    #[serde(default)]
    pub required: bool,

    /// Mirrors the source lore entry's `constant` flag
    #[serde(default)]
    pub constant: bool,

    /// Exempt from budget accounting (but not from ordering)
    #[serde(default)]
    pub ignore_budget: bool,

    /// Keyword occurrence count from the activation scan
    #[serde(default)]
    pub match_count: u32,

    /// Sequence number in which the scan activated the source entry
    #[serde(default)]
    pub activation_order: u32,
}

impl PromptComponent {
    /// Create a component with default metadata.
    pub fn new(id: impl Into<String>, content: impl Into<String>, position: Position) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            role: ChatRole::System,
            position,
            order: DEFAULT_ORDER,
            depth: 0,
            tokens: 0,
            required: false,
            constant: false,
            ignore_budget: false,
            match_count: 0,
            activation_order: 0,
        }
    }

    pub fn with_role(mut self, role: ChatRole) -> Self {
        self.role = role;
        self
    }

    pub fn with_order(mut self, order: i32) -> Self {
        self.order = order;
        self
    }

    pub fn with_depth(mut self, depth: u32) -> Self {
        self.depth = depth;
        self
    }

    pub fn with_tokens(mut self, tokens: u32) -> Self {
        self.tokens = tokens;
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }
}

impl BudgetCandidate for PromptComponent {
    fn tokens(&self) -> u32 {
        self.tokens
    }

    fn order(&self) -> i32 {
        self.order
    }

    fn activation_order(&self) -> u32 {
        self.activation_order
    }

    fn match_count(&self) -> u32 {
        self.match_count
    }

    fn constant(&self) -> bool {
        self.constant
    }
}

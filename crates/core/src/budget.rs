//! Token-budget configuration and statistics.
//!
//! A `TokenBudget` is request-scoped configuration, validated upstream and
//! deserializable from the platform's TOML/JSON config the same way the rest
//! of the stack loads settings. `TokenStats` is the ephemeral per-build
//! report.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::alloc::AllocationStrategy;

fn default_total() -> u32 {
    4096
}

fn default_protected_history() -> usize {
    5
}

fn default_safety_margin() -> u32 {
    100
}

fn default_max_expand_times() -> u32 {
    3
}

/// Optional per-category token caps. `None` means "no cap".
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CategoryCaps {
    /// Cap on world-book content (the advanced path derives its own
    /// world-book budget; this cap only constrains the legacy path)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub world_book: Option<u32>,

    /// Cap on history content
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub history: Option<u32>,

    /// Cap on example content (legacy trim default: 500)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub examples: Option<u32>,
}

/// Request-scoped token budget configuration. Not persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenBudget {
    /// Total token budget for the assembled context
    #[serde(default = "default_total")]
    pub total: u32,

    /// Optional per-category caps
    #[serde(default)]
    pub caps: CategoryCaps,

    /// World-book budget as a fraction of allocatable tokens
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub world_book_ratio: Option<f32>,

    /// Fixed world-book budget; takes precedence over the ratio
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub world_book_fixed: Option<u32>,

    /// Lower clamp on the derived world-book budget
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub world_book_min: Option<u32>,

    /// Upper clamp on the derived world-book budget
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub world_book_max: Option<u32>,

    /// How many trailing history entries the legacy trim always keeps
    #[serde(default = "default_protected_history")]
    pub protected_history_count: usize,

    /// Strategy for the world-book allocation
    #[serde(default)]
    pub budget_priority: AllocationStrategy,

    /// Tokens held back from the allocatable pool
    #[serde(default = "default_safety_margin")]
    pub safety_margin: u32,

    /// Retry over-budget builds with a grown budget
    #[serde(default)]
    pub allow_budget_expand: bool,

    /// Maximum number of ×1.10 expansion attempts
    #[serde(default = "default_max_expand_times")]
    pub max_expand_times: u32,

    /// Expansion also triggers while fewer world-book components survive
    #[serde(default)]
    pub min_activations: u32,
}

impl TokenBudget {
    /// A budget with the given total and default knobs.
    pub fn new(total: u32) -> Self {
        Self {
            total,
            ..Self::default()
        }
    }
}

impl Default for TokenBudget {
    fn default() -> Self {
        Self {
            total: default_total(),
            caps: CategoryCaps::default(),
            world_book_ratio: None,
            world_book_fixed: None,
            world_book_min: None,
            world_book_max: None,
            protected_history_count: default_protected_history(),
            budget_priority: AllocationStrategy::default(),
            safety_margin: default_safety_margin(),
            allow_budget_expand: false,
            max_expand_times: default_max_expand_times(),
            min_activations: 0,
        }
    }
}

/// Ephemeral per-build token statistics.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenStats {
    /// Tokens in the final (filtered) component set
    pub total_tokens: u32,

    /// The budget total this pass ran against (post-expansion if any)
    pub budget_total: u32,

    /// The final set still exceeds the budget. Not an error — the result is
    /// returned anyway.
    pub over_budget: bool,

    /// Token sums per position bucket
    #[serde(default)]
    pub per_bucket: BTreeMap<String, u32>,

    /// Derived world-book budget
    pub world_book_budget: u32,

    /// Tokens the world-book allocation actually used
    pub world_book_used: u32,

    /// World-book components that survived allocation
    pub world_book_activated: u32,

    /// Components in the residual "other" partition. Reported but never
    /// merged back into the output.
    pub other_excluded: u32,

    /// How many ×1.10 expansion rounds ran
    pub expansions: u32,

    /// The expanded total after the final round (equals the configured total
    /// when no expansion ran)
    pub expanded_total: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let b = TokenBudget::default();
        assert_eq!(b.total, 4096);
        assert_eq!(b.protected_history_count, 5);
        assert_eq!(b.safety_margin, 100);
        assert_eq!(b.max_expand_times, 3);
        assert!(!b.allow_budget_expand);
        assert_eq!(b.budget_priority, AllocationStrategy::Order);
    }

    #[test]
    fn deserializes_from_toml_with_defaults() {
        let b: TokenBudget = toml::from_str(
            r#"
            total = 8192
            world_book_ratio = 0.3
            allow_budget_expand = true
            "#,
        )
        .unwrap();
        assert_eq!(b.total, 8192);
        assert_eq!(b.world_book_ratio, Some(0.3));
        assert!(b.allow_budget_expand);
        // Serde defaults fill the rest.
        assert_eq!(b.safety_margin, 100);
        assert_eq!(b.protected_history_count, 5);
    }

    #[test]
    fn stats_serialize() {
        let stats = TokenStats {
            total_tokens: 10,
            budget_total: 100,
            ..TokenStats::default()
        };
        let json = serde_json::to_string(&stats).unwrap();
        assert!(json.contains("\"over_budget\":false"));
    }
}

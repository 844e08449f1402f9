//! Token budget enforcement — the advanced and legacy variants.
//!
//! **Advanced**: derives a world-book budget from the allocatable pool,
//! partitions every component by priority (required > ignore-budget >
//! world-book > other), greedily allocates the world-book set under a
//! selectable strategy, and reassembles the buckets from the survivors.
//! The residual "other" partition is computed and reported but never merged
//! back into the reassembled buckets. Optionally retries with a 10%-grown
//! budget when the result is over budget or under the activation floor.
//!
//! **Legacy**: the compatibility path — a no-op under budget, otherwise a
//! fixed trim order (world book by ratio, history to the protected tail,
//! examples front-greedy).

use std::collections::{BTreeMap, HashSet};

use loreweave_core::alloc::allocate;
use loreweave_core::budget::{TokenBudget, TokenStats};
use loreweave_core::component::{Position, PromptComponent};
use tracing::{debug, trace};

use crate::grouper::PositionBuckets;

/// Identifier prefix marking world-book components.
const WORLD_BOOK_PREFIX: &str = "worldbook";

/// World-book share of the allocatable pool when neither a fixed value nor
/// a ratio is configured.
const DEFAULT_WORLD_BOOK_RATIO: f32 = 0.25;

/// Examples budget for the legacy trim.
const DEFAULT_EXAMPLES_BUDGET: u32 = 500;

/// A budget pass result: the filtered buckets plus the stats report.
#[derive(Debug, Clone)]
pub struct BudgetOutcome {
    pub buckets: PositionBuckets,
    pub stats: TokenStats,
}

/// Both budget algorithms behind one door. Stateless.
pub struct BudgetManager;

impl BudgetManager {
    /// The advanced algorithm, with bounded ×1.10 expansion when enabled.
    pub fn apply_advanced(buckets: PositionBuckets, budget: &TokenBudget) -> BudgetOutcome {
        let mut current_total = budget.total;
        let mut expansions = 0u32;
        loop {
            let (filtered, mut stats) = Self::advanced_pass(&buckets, budget, current_total);
            let success = !stats.over_budget
                && stats.world_book_activated >= budget.min_activations;
            if success || !budget.allow_budget_expand || expansions >= budget.max_expand_times {
                stats.expansions = expansions;
                stats.expanded_total = current_total;
                if expansions > 0 {
                    debug!(expansions, total = current_total, "budget expansion finished");
                }
                return BudgetOutcome {
                    buckets: filtered,
                    stats,
                };
            }
            // Re-run against the original, unfiltered buckets with a grown
            // total.
            expansions += 1;
            current_total = (current_total as f64 * 1.10).ceil() as u32;
        }
    }

    fn advanced_pass(
        original: &PositionBuckets,
        cfg: &TokenBudget,
        total: u32,
    ) -> (PositionBuckets, TokenStats) {
        // (a) derive the world-book budget from the allocatable pool.
        let fixed = bucket_tokens(&original.system_prompts)
            + bucket_tokens(&original.char_def)
            + bucket_tokens(&original.latest_input);
        let allocatable = total.saturating_sub(fixed).saturating_sub(cfg.safety_margin);
        let mut wb_budget = match cfg.world_book_fixed {
            Some(fixed_budget) => fixed_budget,
            None => {
                let ratio = cfg.world_book_ratio.unwrap_or(DEFAULT_WORLD_BOOK_RATIO);
                (allocatable as f64 * ratio as f64) as u32
            }
        };
        if let Some(min) = cfg.world_book_min {
            wb_budget = wb_budget.max(min);
        }
        if let Some(max) = cfg.world_book_max {
            wb_budget = wb_budget.min(max);
        }

        // (b) partition every component by priority:
        // required > ignore-budget > world-book > other.
        let mut keep_ids: HashSet<&str> = HashSet::new();
        let mut world_book: Vec<&PromptComponent> = Vec::new();
        let mut other_excluded = 0u32;
        for c in original.iter_all() {
            if c.required || c.ignore_budget {
                keep_ids.insert(c.id.as_str());
            } else if c.id.starts_with(WORLD_BOOK_PREFIX) {
                world_book.push(c);
            } else {
                // Residual partition: counted, reported, never reassembled.
                other_excluded += 1;
            }
        }
        trace!(other_excluded, "residual components left out of reassembly");

        // (c) greedy world-book allocation under the configured strategy.
        for i in allocate(&world_book, wb_budget, cfg.budget_priority) {
            keep_ids.insert(world_book[i].id.as_str());
        }

        // (d) reassemble: filter the original buckets down to the keep set,
        // preserving per-bucket order.
        let mut filtered = original.clone();
        filtered.retain(|c| keep_ids.contains(c.id.as_str()));

        // (e) stats.
        let stats = Self::stats(&filtered, total, wb_budget, other_excluded);
        (filtered, stats)
    }

    /// The legacy compatibility path. No expansion, fixed trim order.
    pub fn apply_legacy(mut buckets: PositionBuckets, budget: &TokenBudget) -> BudgetOutcome {
        let total_tokens: u32 = buckets.iter_all().map(|c| c.tokens).sum();
        if total_tokens <= budget.total {
            let stats = Self::stats(&buckets, budget.total, 0, 0);
            return BudgetOutcome { buckets, stats };
        }

        // World book: constants are kept unconditionally; non-constants fill
        // what remains of floor(total × ratio) in ascending order.
        let ratio = budget.world_book_ratio.unwrap_or(DEFAULT_WORLD_BOOK_RATIO);
        let wb_budget = (budget.total as f64 * ratio as f64).floor() as u32;
        let mut keep_wb: HashSet<String> = HashSet::new();
        let mut constant_tokens = 0u32;
        let mut non_constant: Vec<&PromptComponent> = Vec::new();
        for c in buckets
            .iter_all()
            .filter(|c| c.id.starts_with(WORLD_BOOK_PREFIX))
        {
            if c.constant {
                constant_tokens += c.tokens;
                keep_wb.insert(c.id.clone());
            } else {
                non_constant.push(c);
            }
        }
        non_constant.sort_by_key(|c| c.order);
        let mut used = constant_tokens;
        for c in non_constant {
            if used + c.tokens <= wb_budget {
                used += c.tokens;
                keep_wb.insert(c.id.clone());
            }
        }

        // History: keep only the protected tail, drop everything older.
        let drop_front = buckets
            .history
            .len()
            .saturating_sub(budget.protected_history_count);
        buckets.history.drain(..drop_front);

        // Examples: front-greedy until the examples budget is exceeded.
        let examples_budget = budget.caps.examples.unwrap_or(DEFAULT_EXAMPLES_BUDGET);
        let mut example_used = 0u32;
        let mut kept = 0usize;
        for c in &buckets.examples {
            if example_used + c.tokens <= examples_budget {
                example_used += c.tokens;
                kept += 1;
            } else {
                break;
            }
        }
        buckets.examples.truncate(kept);

        buckets.retain(|c| !c.id.starts_with(WORLD_BOOK_PREFIX) || keep_wb.contains(&c.id));

        debug!(wb_budget, kept_world_book = keep_wb.len(), "legacy trim applied");
        let stats = Self::stats(&buckets, budget.total, wb_budget, 0);
        BudgetOutcome { buckets, stats }
    }

    fn stats(
        buckets: &PositionBuckets,
        total: u32,
        wb_budget: u32,
        other_excluded: u32,
    ) -> TokenStats {
        let mut per_bucket = BTreeMap::new();
        for position in Position::ALL {
            let sum = bucket_tokens(buckets.bucket(position));
            if sum > 0 {
                per_bucket.insert(bucket_name(position).to_string(), sum);
            }
        }
        let total_tokens: u32 = buckets.iter_all().map(|c| c.tokens).sum();
        let mut world_book_used = 0u32;
        let mut world_book_activated = 0u32;
        for c in buckets.iter_all() {
            if c.id.starts_with(WORLD_BOOK_PREFIX) {
                world_book_used += c.tokens;
                world_book_activated += 1;
            }
        }

        TokenStats {
            total_tokens,
            budget_total: total,
            over_budget: total_tokens > total,
            per_bucket,
            world_book_budget: wb_budget,
            world_book_used,
            world_book_activated,
            other_excluded,
            expansions: 0,
            expanded_total: total,
        }
    }
}

fn bucket_tokens(bucket: &[PromptComponent]) -> u32 {
    bucket.iter().map(|c| c.tokens).sum()
}

fn bucket_name(position: Position) -> &'static str {
    match position {
        Position::SystemPrompts => "system_prompts",
        Position::BeforeChar => "before_char",
        Position::CharDef => "char_def",
        Position::AfterChar => "after_char",
        Position::ExampleTop => "example_top",
        Position::Examples => "examples",
        Position::ExampleBottom => "example_bottom",
        Position::History => "history",
        Position::DepthInjection => "depth_injections",
        Position::AnTop => "an_top",
        Position::AnBottom => "an_bottom",
        Position::LatestInput => "latest_input",
    }
}

//! Greedy token-budget allocation.
//!
//! One allocator serves both the pipeline's budget manager and the scanner's
//! post-scan budget filter — the two paths must run the identical algorithm.
//! Items are visited in strategy order and added while the running total
//! stays within budget; an item that would overflow is skipped and the walk
//! continues, so smaller later items still get in.

use serde::{Deserialize, Serialize};

/// How the world-book allocation orders its candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AllocationStrategy {
    /// Ascending `order` (smaller first)
    #[default]
    Order,
    /// Ascending activation sequence from the scan
    ActivationOrder,
    /// Descending match-count-per-token
    TokenEfficiency,
    /// Descending relevance score
    Relevance,
}

/// Anything the greedy allocator can rank and cost.
pub trait BudgetCandidate {
    fn tokens(&self) -> u32;
    fn order(&self) -> i32;
    fn activation_order(&self) -> u32;
    fn match_count(&self) -> u32;
    fn constant(&self) -> bool;
}

impl<T: BudgetCandidate + ?Sized> BudgetCandidate for &T {
    fn tokens(&self) -> u32 {
        (**self).tokens()
    }
    fn order(&self) -> i32 {
        (**self).order()
    }
    fn activation_order(&self) -> u32 {
        (**self).activation_order()
    }
    fn match_count(&self) -> u32 {
        (**self).match_count()
    }
    fn constant(&self) -> bool {
        (**self).constant()
    }
}

/// Relevance score: match count, plus 5 for constant entries, plus 15 for
/// entries ordered ahead of the default band (order < 50).
pub fn relevance_score<T: BudgetCandidate>(item: &T) -> u32 {
    let mut score = item.match_count();
    if item.constant() {
        score += 5;
    }
    if item.order() < 50 {
        score += 15;
    }
    score
}

/// Greedily allocate `budget` tokens across `items` under `strategy`.
///
/// Returns the indices of selected items, sorted back into original order so
/// callers can filter their source collections without reordering them. Ties
/// in the strategy sort keep original order (stable sort).
pub fn allocate<T: BudgetCandidate>(
    items: &[T],
    budget: u32,
    strategy: AllocationStrategy,
) -> Vec<usize> {
    let mut ranked: Vec<usize> = (0..items.len()).collect();
    match strategy {
        AllocationStrategy::Order => ranked.sort_by_key(|&i| items[i].order()),
        AllocationStrategy::ActivationOrder => {
            ranked.sort_by_key(|&i| items[i].activation_order());
        }
        AllocationStrategy::TokenEfficiency => {
            let efficiency = |i: usize| {
                items[i].match_count() as f64 / items[i].tokens().max(1) as f64
            };
            ranked.sort_by(|&a, &b| {
                efficiency(b)
                    .partial_cmp(&efficiency(a))
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
        }
        AllocationStrategy::Relevance => {
            ranked.sort_by_key(|&i| std::cmp::Reverse(relevance_score(&items[i])));
        }
    }

    let mut used: u64 = 0;
    let mut selected = Vec::new();
    for i in ranked {
        let cost = items[i].tokens() as u64;
        if used + cost <= budget as u64 {
            used += cost;
            selected.push(i);
        }
        // Overflowing items are skipped, not terminal — keep scanning.
    }

    selected.sort_unstable();
    selected
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Item {
        tokens: u32,
        order: i32,
        activation_order: u32,
        match_count: u32,
        constant: bool,
    }

    impl Item {
        fn new(tokens: u32, order: i32) -> Self {
            Self {
                tokens,
                order,
                activation_order: 0,
                match_count: 0,
                constant: false,
            }
        }
    }

    impl BudgetCandidate for Item {
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

    #[test]
    fn selection_never_exceeds_budget() {
        let items = vec![Item::new(40, 1), Item::new(40, 2), Item::new(40, 3)];
        let picked = allocate(&items, 100, AllocationStrategy::Order);
        let total: u32 = picked.iter().map(|&i| items[i].tokens).sum();
        assert!(total <= 100);
        assert_eq!(picked, vec![0, 1]);
    }

    #[test]
    fn overflowing_item_is_skipped_not_terminal() {
        // 60 fits, 50 would overflow, 30 still fits afterwards.
        let items = vec![Item::new(60, 1), Item::new(50, 2), Item::new(30, 3)];
        let picked = allocate(&items, 100, AllocationStrategy::Order);
        assert_eq!(picked, vec![0, 2]);
    }

    #[test]
    fn relevance_prefers_constant_and_low_order() {
        let mut a = Item::new(10, 100);
        a.match_count = 1;
        let mut b = Item::new(10, 10);
        b.match_count = 1;
        b.constant = true;
        // b scores 1 + 5 + 15 = 21, a scores 1.
        assert_eq!(relevance_score(&b), 21);
        assert_eq!(relevance_score(&a), 1);
        let picked = allocate(&[a, b], 10, AllocationStrategy::Relevance);
        assert_eq!(picked, vec![1]);
    }

    #[test]
    fn token_efficiency_prefers_dense_matches() {
        let mut cheap_hit = Item::new(10, 1);
        cheap_hit.match_count = 5;
        let mut pricey_hit = Item::new(100, 2);
        pricey_hit.match_count = 5;
        let picked = allocate(&[pricey_hit, cheap_hit], 10, AllocationStrategy::TokenEfficiency);
        assert_eq!(picked, vec![1]);
    }

    #[test]
    fn zero_budget_selects_nothing_costly() {
        let items = vec![Item::new(1, 1)];
        assert!(allocate(&items, 0, AllocationStrategy::Order).is_empty());
    }
}

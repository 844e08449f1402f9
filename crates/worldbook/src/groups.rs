//! Inclusion groups — mutually exclusive entry sets.
//!
//! Entries sharing a non-empty `group` compete; at most one survives per
//! scan. The winner is decided in priority order: a sticky-activated
//! candidate, then the lowest-order `group_override` candidate, then the
//! best scorer when the group opts into scoring, then a weighted-random
//! pick. The random source is injected so tests can seed it.

use loreweave_core::alloc::BudgetCandidate;
use loreweave_core::worldbook::WorldBookEntry;
use rand::{Rng, RngCore};
use std::collections::{BTreeMap, HashSet};
use tracing::debug;

/// One activated entry plus its scan metadata.
#[derive(Debug, Clone)]
pub struct ActivatedEntry {
    pub entry: WorldBookEntry,
    /// Keyword occurrence count (0 for constant/sticky/fallback activations)
    pub match_count: u32,
    /// Sequence number in which the scan activated this entry
    pub activation_order: u32,
    /// Estimated token cost of the content
    pub tokens: u32,
    /// Activated by a running sticky timer rather than a keyword hit
    pub via_sticky: bool,
}

impl BudgetCandidate for ActivatedEntry {
    fn tokens(&self) -> u32 {
        self.tokens
    }

    fn order(&self) -> i32 {
        self.entry.order
    }

    fn activation_order(&self) -> u32 {
        self.activation_order
    }

    fn match_count(&self) -> u32 {
        self.match_count
    }

    fn constant(&self) -> bool {
        self.entry.constant
    }
}

/// Resolve inclusion groups down to one winner each.
///
/// Ungrouped entries pass through untouched. Output preserves the input's
/// encounter order.
pub fn filter_inclusion_groups(
    activated: Vec<ActivatedEntry>,
    rng: &mut dyn RngCore,
) -> Vec<ActivatedEntry> {
    // BTreeMap keeps group resolution order deterministic for a seeded RNG.
    let mut groups: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
    for (i, a) in activated.iter().enumerate() {
        if !a.entry.group.is_empty() {
            groups.entry(a.entry.group.as_str()).or_default().push(i);
        }
    }

    let mut winners: HashSet<usize> = HashSet::new();
    for (name, members) in &groups {
        let winner = pick_winner(&activated, members, rng);
        debug!(
            group = %name,
            winner = %activated[winner].entry.uid,
            candidates = members.len(),
            "inclusion group resolved"
        );
        winners.insert(winner);
    }

    activated
        .into_iter()
        .enumerate()
        .filter(|(i, a)| a.entry.group.is_empty() || winners.contains(i))
        .map(|(_, a)| a)
        .collect()
}

fn pick_winner(activated: &[ActivatedEntry], members: &[usize], rng: &mut dyn RngCore) -> usize {
    if members.len() == 1 {
        return members[0];
    }

    // Sticky candidates hold their slot.
    if let Some(&sticky) = members.iter().find(|&&i| activated[i].via_sticky) {
        return sticky;
    }

    // Explicit override: lowest order wins among overrides.
    if let Some(&winner) = members
        .iter()
        .filter(|&&i| activated[i].entry.group_override)
        .min_by_key(|&&i| activated[i].entry.order)
    {
        return winner;
    }

    // Scoring: highest match_count × group_weight.
    if members.iter().any(|&i| activated[i].entry.use_group_scoring) {
        return members
            .iter()
            .copied()
            .max_by_key(|&i| activated[i].match_count as u64 * activated[i].entry.group_weight as u64)
            .unwrap_or(members[0]);
    }

    // Weighted random by group_weight.
    let total: u64 = members
        .iter()
        .map(|&i| activated[i].entry.group_weight as u64)
        .sum();
    if total == 0 {
        return members[0];
    }
    let mut roll = rng.random_range(0..total);
    for &i in members {
        let weight = activated[i].entry.group_weight as u64;
        if roll < weight {
            return i;
        }
        roll -= weight;
    }
    members[members.len() - 1]
}

//! The world-book scanner — one activation result per build call.
//!
//! Orchestrates the scan (non-recursive or recursive chain activation), the
//! per-entry timers, and the post-scan pipeline: inclusion groups, token
//! budget, minimum-activation fallback, final ordering. Timer store calls
//! are awaited sequentially, entry by entry — a later entry's write is never
//! visible to an earlier entry's read within the same scan.

use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex};

use loreweave_core::alloc::{allocate, AllocationStrategy};
use loreweave_core::error::Result;
use loreweave_core::timers::{ActivationState, TimedEffects, TimerKey};
use loreweave_core::token::EstimateCache;
use loreweave_core::worldbook::{LorePosition, WorldBookEntry};
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::groups::{filter_inclusion_groups, ActivatedEntry};
use crate::scan::ScanBuffer;

/// History entries a recursion round scans, regardless of configured depth.
const RECURSION_HISTORY_WINDOW: usize = 4;

fn default_scan_depth() -> usize {
    4
}

fn default_max_recursion_depth() -> u32 {
    2
}

/// Per-scan configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanConfig {
    /// How many recent history entries the non-recursive scan text includes
    #[serde(default = "default_scan_depth")]
    pub scan_depth: usize,

    /// Run recursion rounds so activated content can chain-activate
    #[serde(default)]
    pub recursive: bool,

    /// Hard ceiling on recursion rounds
    #[serde(default = "default_max_recursion_depth")]
    pub max_recursion_depth: u32,

    /// Fallback fill target, ignoring keywords
    #[serde(default)]
    pub min_activations: u32,

    /// Token budget over the activated set (ignore_budget entries exempt)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_budget: Option<u32>,

    /// Allocation strategy for the budget filter
    #[serde(default)]
    pub strategy: AllocationStrategy,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            scan_depth: default_scan_depth(),
            recursive: false,
            max_recursion_depth: default_max_recursion_depth(),
            min_activations: 0,
            token_budget: None,
            strategy: AllocationStrategy::default(),
        }
    }
}

/// Inputs for one scan.
#[derive(Debug, Clone)]
pub struct ScanParams {
    pub session_id: String,
    pub prompt_id: String,
    pub entries: Vec<WorldBookEntry>,
    pub current_message: String,
    /// Most-recent-first history contents
    pub history: Vec<String>,
    /// Index of the current message within the conversation
    pub message_index: u32,
    pub config: ScanConfig,
}

/// Activated content grouped by placement, ready for splicing.
///
/// Seven of the eight groups concatenate in reverse encounter order (the
/// last-discovered entry is prepended); the `outlet` group appends in
/// encounter order. Downstream templates depend on both behaviors.
#[derive(Debug, Clone, Default, Serialize)]
pub struct GroupedOutput {
    pub before: String,
    pub after: String,
    pub an_top: String,
    pub an_bottom: String,
    pub em_top: String,
    pub em_bottom: String,
    /// AtDepth content keyed by depth
    pub at_depth: BTreeMap<u32, String>,
    /// Outlet content keyed by entry name, append order
    pub outlet: BTreeMap<String, String>,
}

/// One scan's outcome: the final ordered entry set plus its grouped view.
#[derive(Debug, Clone)]
pub struct ScanResult {
    pub activated: Vec<ActivatedEntry>,
    pub grouped: GroupedOutput,
}

/// Per-entry verdict for one scan round.
enum Evaluation {
    Hit(ActivatedEntry),
    /// Suppressed by a running cooldown; stays suppressed for this scan.
    Cooling,
    Miss,
}

/// The scanner. Holds the timer store, the token estimator cache, and the
/// injected random source for group selection.
pub struct WorldBookScanner {
    store: Arc<dyn TimedEffects>,
    cache: Arc<EstimateCache>,
    rng: Mutex<Box<dyn RngCore + Send>>,
}

impl WorldBookScanner {
    pub fn new(store: Arc<dyn TimedEffects>, cache: Arc<EstimateCache>) -> Self {
        Self::with_rng(store, cache, Box::new(StdRng::from_os_rng()))
    }

    /// Construct with an explicit random source (seeded in tests).
    pub fn with_rng(
        store: Arc<dyn TimedEffects>,
        cache: Arc<EstimateCache>,
        rng: Box<dyn RngCore + Send>,
    ) -> Self {
        Self {
            store,
            cache,
            rng: Mutex::new(rng),
        }
    }

    /// Run one scan and the full post-scan pipeline.
    pub async fn scan(&self, params: &ScanParams) -> Result<ScanResult> {
        let cfg = &params.config;
        let mut activated: Vec<ActivatedEntry> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();
        // Entries a cooldown already suppressed this scan. Timers are
        // turn-counted: one scan decrements a cooldown exactly once, no
        // matter how many recursion rounds re-visit the entry.
        let mut cooling: HashSet<String> = HashSet::new();

        if cfg.recursive {
            for round in 0..cfg.max_recursion_depth {
                let feed: Vec<String> = activated
                    .iter()
                    .filter(|a| !a.entry.exclude_recursion)
                    .map(|a| a.entry.content.clone())
                    .collect();
                let buffer = ScanBuffer::with_feed(
                    &params.current_message,
                    &params.history,
                    RECURSION_HISTORY_WINDOW,
                    feed,
                );

                let before = activated.len();
                for entry in &params.entries {
                    if entry.disable
                        || seen.contains(&entry.uid)
                        || cooling.contains(&entry.uid)
                    {
                        continue;
                    }
                    // Constants fire only in round 0; prevent_recursion
                    // entries are never reachable through recursion.
                    if round > 0 && (entry.constant || entry.prevent_recursion) {
                        continue;
                    }
                    if round < entry.delay_until_recursion {
                        continue;
                    }
                    match self
                        .evaluate(entry, &buffer, params, activated.len() as u32)
                        .await?
                    {
                        Evaluation::Hit(hit) => {
                            seen.insert(entry.uid.clone());
                            activated.push(hit);
                        }
                        Evaluation::Cooling => {
                            cooling.insert(entry.uid.clone());
                        }
                        Evaluation::Miss => {}
                    }
                }

                let new = activated.len() - before;
                debug!(round, new, "recursion round complete");
                if new == 0 {
                    break;
                }
            }
        } else {
            let buffer =
                ScanBuffer::new(&params.current_message, &params.history, cfg.scan_depth);
            for entry in &params.entries {
                if entry.disable || seen.contains(&entry.uid) {
                    continue;
                }
                if let Evaluation::Hit(hit) = self
                    .evaluate(entry, &buffer, params, activated.len() as u32)
                    .await?
                {
                    seen.insert(entry.uid.clone());
                    activated.push(hit);
                }
            }
        }

        // Post-scan pipeline, always in this order.
        {
            let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
            activated = filter_inclusion_groups(activated, rng.as_mut());
        }

        if let Some(budget) = cfg.token_budget {
            activated = filter_budget(activated, budget, cfg.strategy);
        }

        if (activated.len() as u32) < cfg.min_activations {
            self.fill_minimum(&mut activated, params);
        }

        activated.sort_by_key(|a| a.entry.order);

        debug!(activated = activated.len(), "scan complete");
        let grouped = build_output(&activated);
        Ok(ScanResult { activated, grouped })
    }

    /// Timer-aware activation check for one entry:
    /// constant → sticky → cooldown → delay → keywords.
    async fn evaluate(
        &self,
        entry: &WorldBookEntry,
        buffer: &ScanBuffer,
        params: &ScanParams,
        activation_order: u32,
    ) -> Result<Evaluation> {
        if entry.constant {
            return Ok(Evaluation::Hit(self.hit(entry, 0, activation_order, false)));
        }

        let key = TimerKey::new(&params.session_id, &params.prompt_id, &entry.uid);
        if let Some(state) = self.store.get(&key).await? {
            if state.sticky_remaining > 0 {
                self.store.decrement_sticky(&key).await?;
                return Ok(Evaluation::Hit(self.hit(entry, 0, activation_order, true)));
            }
            if state.cooldown_remaining > 0 {
                self.store.decrement_cooldown(&key).await?;
                return Ok(Evaluation::Cooling);
            }
        }

        if params.message_index < entry.delay {
            return Ok(Evaluation::Miss);
        }

        let count = buffer.match_count(entry);
        if count == 0 {
            return Ok(Evaluation::Miss);
        }
        self.store
            .set_activation_state(
                &key,
                ActivationState::activated(params.message_index, entry.sticky, entry.cooldown),
            )
            .await?;
        Ok(Evaluation::Hit(self.hit(entry, count, activation_order, false)))
    }

    fn hit(
        &self,
        entry: &WorldBookEntry,
        match_count: u32,
        activation_order: u32,
        via_sticky: bool,
    ) -> ActivatedEntry {
        ActivatedEntry {
            tokens: self.cache.estimate(&entry.content),
            entry: entry.clone(),
            match_count,
            activation_order,
            via_sticky,
        }
    }

    /// Fallback fill: pull not-yet-active, non-disabled entries, constants
    /// first, then ascending order, keywords ignored entirely.
    fn fill_minimum(&self, activated: &mut Vec<ActivatedEntry>, params: &ScanParams) {
        let active: HashSet<&str> = activated.iter().map(|a| a.entry.uid.as_str()).collect();
        let mut candidates: Vec<&WorldBookEntry> = params
            .entries
            .iter()
            .filter(|e| !e.disable && !active.contains(e.uid.as_str()))
            .collect();
        candidates.sort_by_key(|e| (!e.constant, e.order));

        let mut next_order = activated
            .iter()
            .map(|a| a.activation_order)
            .max()
            .map_or(0, |m| m + 1);
        for entry in candidates {
            if activated.len() as u32 >= params.config.min_activations {
                break;
            }
            activated.push(ActivatedEntry {
                tokens: self.cache.estimate(&entry.content),
                entry: entry.clone(),
                match_count: 0,
                activation_order: next_order,
                via_sticky: false,
            });
            next_order += 1;
        }
    }
}

/// Token-budget filter over the activated set. `ignore_budget` entries are
/// always kept; the rest go through the shared greedy allocator.
fn filter_budget(
    activated: Vec<ActivatedEntry>,
    budget: u32,
    strategy: AllocationStrategy,
) -> Vec<ActivatedEntry> {
    let mut keep = vec![false; activated.len()];
    let mut constrained: Vec<usize> = Vec::new();
    for (i, a) in activated.iter().enumerate() {
        if a.entry.ignore_budget {
            keep[i] = true;
        } else {
            constrained.push(i);
        }
    }

    let candidates: Vec<&ActivatedEntry> = constrained.iter().map(|&i| &activated[i]).collect();
    for selected in allocate(&candidates, budget, strategy) {
        keep[constrained[selected]] = true;
    }

    activated
        .into_iter()
        .zip(keep)
        .filter_map(|(a, k)| k.then_some(a))
        .collect()
}

/// Group activated content by placement into the 8 outlets.
pub fn build_output(activated: &[ActivatedEntry]) -> GroupedOutput {
    let mut out = GroupedOutput::default();
    for a in activated {
        let content = a.entry.content.as_str();
        match a.entry.position {
            LorePosition::BeforeChar => prepend(&mut out.before, content),
            LorePosition::AfterChar => prepend(&mut out.after, content),
            LorePosition::AnTop => prepend(&mut out.an_top, content),
            LorePosition::AnBottom => prepend(&mut out.an_bottom, content),
            LorePosition::EmTop => prepend(&mut out.em_top, content),
            LorePosition::EmBottom => prepend(&mut out.em_bottom, content),
            LorePosition::AtDepth => {
                prepend(out.at_depth.entry(a.entry.depth).or_default(), content);
            }
            LorePosition::Outlet => {
                append(out.outlet.entry(a.entry.name.clone()).or_default(), content);
            }
        }
    }
    out
}

fn prepend(slot: &mut String, content: &str) {
    if slot.is_empty() {
        slot.push_str(content);
    } else {
        *slot = format!("{content}\n{slot}");
    }
}

fn append(slot: &mut String, content: &str) {
    if slot.is_empty() {
        slot.push_str(content);
    } else {
        slot.push('\n');
        slot.push_str(content);
    }
}

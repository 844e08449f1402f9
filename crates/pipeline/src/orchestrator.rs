//! The orchestrator — one `build()` call from raw sources to provider payload.
//!
//! `PromptEngine` is the composition root: it owns the guard, the scanner,
//! the collector, and the shared estimate cache, all built explicitly in the
//! factory — collaborators (content library, timer store) are passed in by
//! trait. Stage boundaries emit tracing events; logging never affects
//! control flow.

use std::collections::BTreeMap;
use std::sync::Arc;

use loreweave_core::budget::{TokenBudget, TokenStats};
use loreweave_core::error::Result;
use loreweave_core::message::ChatMessage;
use loreweave_core::source::PromptLibrary;
use loreweave_core::timers::TimedEffects;
use loreweave_core::token::EstimateCache;
use loreweave_guard::{GuardedText, InjectionGuard, RiskAssessment};
use loreweave_providers::{convert, OutputFormat, ProviderPayload};
use loreweave_worldbook::{
    GroupedOutput, ScanConfig, ScanParams, ScanResult, WorldBookScanner,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::assembler::assemble;
use crate::budget::BudgetManager;
use crate::collector::ComponentCollector;
use crate::grouper::group;

/// Which budget variant a build runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetMode {
    /// Compatibility path: no-op under budget, fixed trim order above it.
    #[default]
    Legacy,
    /// Priority partition + strategy allocation + optional expansion.
    Advanced,
}

fn default_guard_input() -> bool {
    true
}

/// Options for one build call. Validated upstream; deserializable from the
/// platform's config the same way the budget is.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildOptions {
    pub session_id: String,

    /// Index of the current message within the conversation
    #[serde(default)]
    pub message_index: u32,

    #[serde(default)]
    pub format: OutputFormat,

    #[serde(default)]
    pub budget: TokenBudget,

    #[serde(default)]
    pub budget_mode: BudgetMode,

    #[serde(default)]
    pub scan: ScanConfig,

    /// Run user input through the injection guard
    #[serde(default = "default_guard_input")]
    pub guard_input: bool,

    /// Wrap guarded input in literal boundary fences with this label
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub boundary: Option<String>,

    /// Attach the debug block to the outcome
    #[serde(default)]
    pub debug: bool,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            session_id: String::new(),
            message_index: 0,
            format: OutputFormat::default(),
            budget: TokenBudget::default(),
            budget_mode: BudgetMode::default(),
            scan: ScanConfig::default(),
            guard_input: true,
            boundary: None,
            debug: false,
        }
    }
}

/// Optional per-build debug block.
#[derive(Debug, Clone)]
pub struct BuildDebug {
    /// Guard verdict for the user input, when the guard ran
    pub risk: Option<RiskAssessment>,
    /// Uids of activated world-book entries, final order
    pub activated_entries: Vec<String>,
    /// The scanner's grouped-output view
    pub grouped: GroupedOutput,
}

/// The result of one build call.
#[derive(Debug, Clone)]
pub struct BuildOutcome {
    pub result: ProviderPayload,
    pub stats: TokenStats,
    pub debug: Option<BuildDebug>,
}

/// The engine: guard → scan → collect → group → budget → assemble → convert.
pub struct PromptEngine {
    library: Arc<dyn PromptLibrary>,
    collector: ComponentCollector,
    scanner: WorldBookScanner,
    guard: InjectionGuard,
}

impl PromptEngine {
    /// Factory: builds the guard, scanner, and shared estimate cache and
    /// wires them together. No ambient lookups — everything the engine
    /// touches goes through what is passed here.
    pub fn new(library: Arc<dyn PromptLibrary>, store: Arc<dyn TimedEffects>) -> Self {
        Self::with_cache(library, store, Arc::new(EstimateCache::default()))
    }

    /// Factory with an explicit cache (shared across engines, or sized for
    /// tests).
    pub fn with_cache(
        library: Arc<dyn PromptLibrary>,
        store: Arc<dyn TimedEffects>,
        cache: Arc<EstimateCache>,
    ) -> Self {
        Self {
            library,
            collector: ComponentCollector::new(cache.clone()),
            scanner: WorldBookScanner::new(store, cache),
            guard: InjectionGuard::new(),
        }
    }

    /// Build one provider-shaped prompt.
    ///
    /// `history` is oldest → newest. Fails only on a missing or banned
    /// source, or a failing timer store; an over-budget result is returned
    /// with `stats.over_budget` set.
    pub async fn build(
        &self,
        source_id: &str,
        options: &BuildOptions,
        user_input: Option<&str>,
        history: &[ChatMessage],
    ) -> Result<BuildOutcome> {
        let definition = self.library.fetch(source_id)?;
        debug!(
            source_id,
            items = definition.items.len(),
            lore = definition.world_book.len(),
            "source resolved"
        );

        let mut risk = None;
        let input_text = match user_input {
            Some(text) if options.guard_input => {
                let guarded = self
                    .guard
                    .protect_user_input(text, options.boundary.as_deref());
                risk = Some(guarded.risk.clone());
                Some(guarded.protected)
            }
            Some(text) => Some(text.to_string()),
            None => None,
        };

        let scan_result = self
            .scanner
            .scan(&ScanParams {
                session_id: options.session_id.clone(),
                prompt_id: definition.id.clone(),
                entries: definition.world_book.clone(),
                current_message: input_text.clone().unwrap_or_default(),
                history: history.iter().rev().map(|m| m.content.clone()).collect(),
                message_index: options.message_index,
                config: options.scan.clone(),
            })
            .await?;
        debug!(activated = scan_result.activated.len(), "world book scanned");

        let mut components = self.collector.collect_content_items(&definition.items);
        components.extend(self.collector.collect_history(history));
        components.extend(self.collector.collect_world_book(&scan_result.activated));
        if let Some(text) = &input_text {
            components.push(self.collector.collect_user_input(text));
        }
        debug!(components = components.len(), "components collected");

        let buckets = group(components);

        let outcome = match options.budget_mode {
            BudgetMode::Legacy => BudgetManager::apply_legacy(buckets, &options.budget),
            BudgetMode::Advanced => BudgetManager::apply_advanced(buckets, &options.budget),
        };
        debug!(
            total_tokens = outcome.stats.total_tokens,
            over_budget = outcome.stats.over_budget,
            "budget applied"
        );

        let messages = assemble(&outcome.buckets);
        let result = convert(options.format, &messages);

        let debug_block = options.debug.then(|| BuildDebug {
            risk,
            activated_entries: scan_result
                .activated
                .iter()
                .map(|a| a.entry.uid.clone())
                .collect(),
            grouped: scan_result.grouped.clone(),
        });

        Ok(BuildOutcome {
            result,
            stats: outcome.stats,
            debug: debug_block,
        })
    }

    /// Run a world-book scan on its own.
    pub async fn scan(&self, params: &ScanParams) -> Result<ScanResult> {
        self.scanner.scan(params).await
    }

    /// Protect live user input (see `InjectionGuard::protect_user_input`).
    pub fn protect_user_input(&self, text: &str, boundary: Option<&str>) -> GuardedText {
        self.guard.protect_user_input(text, boundary)
    }

    /// Protect parameter values; boundary marking is forced off.
    pub fn protect_parameters(
        &self,
        params: &BTreeMap<String, String>,
    ) -> BTreeMap<String, GuardedText> {
        self.guard.protect_parameters(params)
    }
}

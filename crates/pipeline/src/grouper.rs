//! Position grouping — single-pass fan-out into the twelve buckets.
//!
//! Every bucket except `depth_injections` is stable-sorted ascending by
//! `order`, so ties keep their original order — required for history and
//! example chronology. Depth injections sort by depth first, then order.

use loreweave_core::component::{Position, PromptComponent};
use tracing::trace;

/// The twelve position buckets, in assembly order.
#[derive(Debug, Clone, Default)]
pub struct PositionBuckets {
    pub system_prompts: Vec<PromptComponent>,
    pub before_char: Vec<PromptComponent>,
    pub char_def: Vec<PromptComponent>,
    pub after_char: Vec<PromptComponent>,
    pub example_top: Vec<PromptComponent>,
    pub examples: Vec<PromptComponent>,
    pub example_bottom: Vec<PromptComponent>,
    pub history: Vec<PromptComponent>,
    pub depth_injections: Vec<PromptComponent>,
    pub an_top: Vec<PromptComponent>,
    pub an_bottom: Vec<PromptComponent>,
    pub latest_input: Vec<PromptComponent>,
}

impl PositionBuckets {
    pub fn bucket(&self, position: Position) -> &Vec<PromptComponent> {
        match position {
            Position::SystemPrompts => &self.system_prompts,
            Position::BeforeChar => &self.before_char,
            Position::CharDef => &self.char_def,
            Position::AfterChar => &self.after_char,
            Position::ExampleTop => &self.example_top,
            Position::Examples => &self.examples,
            Position::ExampleBottom => &self.example_bottom,
            Position::History => &self.history,
            Position::DepthInjection => &self.depth_injections,
            Position::AnTop => &self.an_top,
            Position::AnBottom => &self.an_bottom,
            Position::LatestInput => &self.latest_input,
        }
    }

    fn bucket_mut(&mut self, position: Position) -> &mut Vec<PromptComponent> {
        match position {
            Position::SystemPrompts => &mut self.system_prompts,
            Position::BeforeChar => &mut self.before_char,
            Position::CharDef => &mut self.char_def,
            Position::AfterChar => &mut self.after_char,
            Position::ExampleTop => &mut self.example_top,
            Position::Examples => &mut self.examples,
            Position::ExampleBottom => &mut self.example_bottom,
            Position::History => &mut self.history,
            Position::DepthInjection => &mut self.depth_injections,
            Position::AnTop => &mut self.an_top,
            Position::AnBottom => &mut self.an_bottom,
            Position::LatestInput => &mut self.latest_input,
        }
    }

    /// All components across all buckets, in assembly order.
    pub fn iter_all(&self) -> impl Iterator<Item = &PromptComponent> {
        Position::ALL.iter().flat_map(|p| self.bucket(*p).iter())
    }

    /// Total component count.
    pub fn len(&self) -> usize {
        Position::ALL.iter().map(|p| self.bucket(*p).len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Rebuild each bucket keeping only components `predicate` accepts,
    /// preserving per-bucket order.
    pub fn retain(&mut self, mut predicate: impl FnMut(&PromptComponent) -> bool) {
        for position in Position::ALL {
            self.bucket_mut(position).retain(|c| predicate(c));
        }
    }
}

/// Fan components out into their buckets and sort each one.
pub fn group(components: Vec<PromptComponent>) -> PositionBuckets {
    let mut buckets = PositionBuckets::default();
    for component in components {
        buckets.bucket_mut(component.position).push(component);
    }

    for position in Position::ALL {
        if position == Position::DepthInjection {
            continue;
        }
        // Stable: ties keep original order.
        buckets.bucket_mut(position).sort_by_key(|c| c.order);
    }
    buckets
        .depth_injections
        .sort_by_key(|c| (c.depth, c.order));

    trace!(components = buckets.len(), "components grouped");
    buckets
}

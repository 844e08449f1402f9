//! World-book activation engine.
//!
//! Scans recent conversation text against lore entry keywords and produces
//! the set of active entries for one build call:
//!
//! 1. **Scan** — keyword/regex matching over a bounded text window, with
//!    per-entry sticky/cooldown/delay timers; optionally recursive, so newly
//!    activated content can chain-activate further entries
//! 2. **Inclusion groups** — mutually exclusive entry sets, one winner each
//! 3. **Budget filter** — greedy token allocation over the activated set
//! 4. **Minimum activations** — fallback fill ignoring keywords
//!
//! The result carries both the ordered entry list and a grouped-output view
//! keyed by placement.

pub mod groups;
pub mod scan;
pub mod scanner;
pub mod store;

pub use groups::{filter_inclusion_groups, ActivatedEntry};
pub use scan::ScanBuffer;
pub use scanner::{GroupedOutput, ScanConfig, ScanParams, ScanResult, WorldBookScanner};
pub use store::InMemoryTimedEffects;

//! The prompt assembly pipeline — the core of the Loreweave context compiler.
//!
//! One build call flows through six stages:
//!
//! 1. **Guard** — untrusted user input is risk-assessed and sanitized
//! 2. **Scan** — the world book activates entries against recent text
//! 3. **Collect** — raw sources become uniform prompt components
//! 4. **Group** — components fan out into the twelve position buckets
//! 5. **Budget** — token estimation and trimming/allocation under budget
//! 6. **Assemble & convert** — one ordered message list, provider-shaped
//!
//! All stages are synchronous and pure over in-memory data; only the timer
//! store suspends, inside the scan.

pub mod assembler;
pub mod budget;
pub mod collector;
pub mod grouper;
pub mod library;
pub mod orchestrator;

pub use assembler::assemble;
pub use budget::{BudgetManager, BudgetOutcome};
pub use collector::ComponentCollector;
pub use grouper::{group, PositionBuckets};
pub use library::InMemoryLibrary;
pub use orchestrator::{BudgetMode, BuildDebug, BuildOptions, BuildOutcome, PromptEngine};

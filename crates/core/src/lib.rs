//! # Loreweave Core
//!
//! Domain types, traits, and error definitions for the Loreweave context
//! compiler. This crate has **zero framework dependencies** — it defines the
//! value objects and seams that all other crates implement against.
//!
//! ## Design Philosophy
//!
//! The compiler's collaborators (timer store, prompt library) are defined as
//! traits here. Implementations live in their respective crates. This enables:
//! - Swapping implementations via composition
//! - Easy testing with in-memory implementations
//! - Clean dependency graph (all crates depend inward on core)

pub mod alloc;
pub mod budget;
pub mod component;
pub mod error;
pub mod message;
pub mod source;
pub mod timers;
pub mod token;
pub mod worldbook;

// Re-export key types at crate root for ergonomics
pub use alloc::{allocate, AllocationStrategy, BudgetCandidate};
pub use budget::{CategoryCaps, TokenBudget, TokenStats};
pub use component::{Position, PromptComponent, DEFAULT_ORDER};
pub use error::{Error, Result};
pub use message::{ChatMessage, ChatRole};
pub use source::{ContentItem, PromptDefinition, PromptLibrary};
pub use timers::{ActivationState, TimedEffects, TimerError, TimerKey};
pub use token::{estimate_tokens_precise, EstimateCache};
pub use worldbook::{LorePosition, SelectiveLogic, WorldBookEntry};

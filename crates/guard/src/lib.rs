//! Injection defense for Loreweave.
//!
//! Any externally supplied text — user input, parameter values — passes
//! through here before it becomes a prompt component:
//!
//! - **Detector**: scores text against seven fixed pattern categories
//!   (instruction override, role switching, fake system tags, parameter
//!   escapes, delimiter confusion, direct and indirect prompt leakage)
//! - **Sanitizer**: tiered neutralization keyed to the risk level
//! - **Guard**: the facade combining both, with a creative-content
//!   heuristic to avoid mangling narrative prose
//!
//! Detection and sanitization never fail on arbitrary text.

pub mod detector;
pub mod guard;
pub mod sanitizer;

pub use detector::{DetectedPattern, InjectionDetector, PatternCategory, RiskAssessment, RiskLevel};
pub use guard::{GuardedText, InjectionGuard};
pub use sanitizer::Sanitizer;

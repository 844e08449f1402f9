//! Error types for the Loreweave domain.
//!
//! Uses `thiserror` for ergonomic error definitions. Only genuinely
//! exceptional conditions are errors: a missing or banned content source, or
//! a failing timer store. Budget infeasibility is *not* an error — the
//! over-budget result is still returned with `over_budget` set in the stats.

use thiserror::Error;

use crate::timers::TimerError;

/// The top-level error type for all Loreweave operations.
#[derive(Debug, Error)]
pub enum Error {
    /// A referenced content source or entry set does not exist.
    #[error("Not found: {resource}")]
    NotFound { resource: String },

    /// The caller may not use this content source (e.g. banned).
    #[error("Forbidden: {reason}")]
    Forbidden { reason: String },

    /// The timer store failed.
    #[error("Timer store error: {0}")]
    Timer(#[from] TimerError),

    /// Serialization of a payload failed.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Convenience constructor for a missing resource.
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    /// Convenience constructor for a forbidden resource.
    pub fn forbidden(reason: impl Into<String>) -> Self {
        Self::Forbidden {
            reason: reason.into(),
        }
    }
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_displays_resource() {
        let err = Error::not_found("prompt preset 42");
        assert!(err.to_string().contains("prompt preset 42"));
    }

    #[test]
    fn timer_error_converts() {
        let err: Error = TimerError::Storage("lock poisoned".into()).into();
        assert!(err.to_string().contains("lock poisoned"));
    }
}

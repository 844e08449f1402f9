//! Timed-effects store — per-entry sticky/cooldown/delay state.
//!
//! Activation state is keyed by (session, prompt, entry) and persists across
//! build calls; everything else in the compiler is request-scoped. The store
//! is the only suspending collaborator: the scanner awaits it sequentially so
//! a later entry's write is never visible to an earlier entry's read within
//! one scan. Two concurrent scans for the same session may race on counters —
//! callers needing strict ordering serialize scans per session.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from a timed-effects store.
#[derive(Debug, Clone, Error)]
pub enum TimerError {
    #[error("Storage error: {0}")]
    Storage(String),
}

/// The (session, prompt, entry) coordinate of one activation record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimerKey {
    pub session_id: String,
    pub prompt_id: String,
    pub entry_uid: String,
}

impl TimerKey {
    pub fn new(
        session_id: impl Into<String>,
        prompt_id: impl Into<String>,
        entry_uid: impl Into<String>,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            prompt_id: prompt_id.into(),
            entry_uid: entry_uid.into(),
        }
    }
}

/// Persisted activation state for one entry.
///
/// Created lazily on first activation. Counters are *overwritten* (not added
/// to) on re-activation and decremented one at a time by explicit calls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivationState {
    pub last_activated_at: DateTime<Utc>,
    pub last_activated_message_index: u32,
    pub sticky_remaining: u32,
    pub cooldown_remaining: u32,
}

impl ActivationState {
    /// State for an activation happening now.
    pub fn activated(message_index: u32, sticky: u32, cooldown: u32) -> Self {
        Self {
            last_activated_at: Utc::now(),
            last_activated_message_index: message_index,
            sticky_remaining: sticky,
            cooldown_remaining: cooldown,
        }
    }
}

/// The timed-effects store trait.
///
/// Missing state means "no sticky/cooldown in effect" — never an error.
/// Implementations: in-memory (loreweave-worldbook); the platform supplies
/// its own persistent one.
#[async_trait]
pub trait TimedEffects: Send + Sync {
    /// Read the activation state for a key, if any. Pure read.
    async fn get(&self, key: &TimerKey) -> Result<Option<ActivationState>, TimerError>;

    /// Create-or-overwrite the activation state for a key. Overwrites the
    /// sticky/cooldown remaining counts; never adds to them.
    async fn set_activation_state(
        &self,
        key: &TimerKey,
        state: ActivationState,
    ) -> Result<(), TimerError>;

    /// Lower the sticky counter by one, floor 0. No-op on missing state.
    async fn decrement_sticky(&self, key: &TimerKey) -> Result<(), TimerError>;

    /// Lower the cooldown counter by one, floor 0. No-op on missing state.
    async fn decrement_cooldown(&self, key: &TimerKey) -> Result<(), TimerError>;

    /// Drop all state for a session.
    async fn clear_session(&self, session_id: &str) -> Result<(), TimerError>;

    /// Whether a sticky period is in force. Pure read.
    async fn is_sticky(&self, key: &TimerKey) -> Result<bool, TimerError> {
        Ok(self
            .get(key)
            .await?
            .is_some_and(|s| s.sticky_remaining > 0))
    }

    /// Whether a cooldown period is in force. Pure read.
    async fn is_cooldown(&self, key: &TimerKey) -> Result<bool, TimerError> {
        Ok(self
            .get(key)
            .await?
            .is_some_and(|s| s.cooldown_remaining > 0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn activated_state_carries_counters() {
        let s = ActivationState::activated(7, 3, 2);
        assert_eq!(s.last_activated_message_index, 7);
        assert_eq!(s.sticky_remaining, 3);
        assert_eq!(s.cooldown_remaining, 2);
    }

    #[test]
    fn timer_key_equality() {
        let a = TimerKey::new("s", "p", "e");
        let b = TimerKey::new("s", "p", "e");
        assert_eq!(a, b);
    }
}

//! In-memory timed-effects store — useful for testing and ephemeral sessions.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use loreweave_core::timers::{ActivationState, TimedEffects, TimerError, TimerKey};
use tokio::sync::RwLock;

/// An in-memory store that keeps activation state in a HashMap.
/// Platforms with durable sessions supply their own implementation.
pub struct InMemoryTimedEffects {
    entries: Arc<RwLock<HashMap<TimerKey, ActivationState>>>,
}

impl InMemoryTimedEffects {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl Default for InMemoryTimedEffects {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TimedEffects for InMemoryTimedEffects {
    async fn get(&self, key: &TimerKey) -> Result<Option<ActivationState>, TimerError> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set_activation_state(
        &self,
        key: &TimerKey,
        state: ActivationState,
    ) -> Result<(), TimerError> {
        self.entries.write().await.insert(key.clone(), state);
        Ok(())
    }

    async fn decrement_sticky(&self, key: &TimerKey) -> Result<(), TimerError> {
        if let Some(state) = self.entries.write().await.get_mut(key) {
            state.sticky_remaining = state.sticky_remaining.saturating_sub(1);
        }
        Ok(())
    }

    async fn decrement_cooldown(&self, key: &TimerKey) -> Result<(), TimerError> {
        if let Some(state) = self.entries.write().await.get_mut(key) {
            state.cooldown_remaining = state.cooldown_remaining.saturating_sub(1);
        }
        Ok(())
    }

    async fn clear_session(&self, session_id: &str) -> Result<(), TimerError> {
        self.entries
            .write()
            .await
            .retain(|k, _| k.session_id != session_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(uid: &str) -> TimerKey {
        TimerKey::new("session-1", "prompt-1", uid)
    }

    #[tokio::test]
    async fn missing_state_reads_as_none() {
        let store = InMemoryTimedEffects::new();
        assert!(store.get(&key("e1")).await.unwrap().is_none());
        assert!(!store.is_sticky(&key("e1")).await.unwrap());
        assert!(!store.is_cooldown(&key("e1")).await.unwrap());
    }

    #[tokio::test]
    async fn set_overwrites_counters() {
        let store = InMemoryTimedEffects::new();
        store
            .set_activation_state(&key("e1"), ActivationState::activated(1, 3, 0))
            .await
            .unwrap();
        // Re-activation overwrites, never accumulates.
        store
            .set_activation_state(&key("e1"), ActivationState::activated(2, 2, 4))
            .await
            .unwrap();
        let state = store.get(&key("e1")).await.unwrap().unwrap();
        assert_eq!(state.sticky_remaining, 2);
        assert_eq!(state.cooldown_remaining, 4);
        assert_eq!(state.last_activated_message_index, 2);
    }

    #[tokio::test]
    async fn decrement_floors_at_zero_and_ignores_missing() {
        let store = InMemoryTimedEffects::new();
        // Missing state: no-op, no error.
        store.decrement_sticky(&key("ghost")).await.unwrap();

        store
            .set_activation_state(&key("e1"), ActivationState::activated(0, 1, 0))
            .await
            .unwrap();
        store.decrement_sticky(&key("e1")).await.unwrap();
        store.decrement_sticky(&key("e1")).await.unwrap();
        let state = store.get(&key("e1")).await.unwrap().unwrap();
        assert_eq!(state.sticky_remaining, 0);
    }

    #[tokio::test]
    async fn clear_session_drops_only_that_session() {
        let store = InMemoryTimedEffects::new();
        store
            .set_activation_state(&key("e1"), ActivationState::activated(0, 1, 0))
            .await
            .unwrap();
        let other = TimerKey::new("session-2", "prompt-1", "e1");
        store
            .set_activation_state(&other, ActivationState::activated(0, 1, 0))
            .await
            .unwrap();

        store.clear_session("session-1").await.unwrap();
        assert!(store.get(&key("e1")).await.unwrap().is_none());
        assert!(store.get(&other).await.unwrap().is_some());
    }
}

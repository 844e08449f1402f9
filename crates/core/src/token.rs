//! Token estimation.
//!
//! The compiler never talks to a real tokenizer — an approximate cost model
//! is enough for budgeting. Two estimators are provided:
//!
//! - **char-class**: ASCII alphanumerics cost 1/4 token each, everything else
//!   1/1.5. Slower, better on mixed-script text.
//! - **fast**: total length / 3.35, memoized in a bounded FIFO cache. Used on
//!   the hot path where the same fragments are re-estimated every build.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

/// Default capacity of the fast-estimator cache.
pub const DEFAULT_CACHE_CAPACITY: usize = 1000;

/// Character-class token estimate.
///
/// ASCII alphanumerics cost 1/4 token each, everything else 1/1.5 token each.
/// Summed and ceiling-rounded.
pub fn estimate_tokens_precise(text: &str) -> u32 {
    if text.is_empty() {
        return 0;
    }
    let mut cost = 0.0f64;
    for c in text.chars() {
        if c.is_ascii_alphanumeric() {
            cost += 1.0 / 4.0;
        } else {
            cost += 1.0 / 1.5;
        }
    }
    cost.ceil() as u32
}

struct CacheInner {
    map: HashMap<String, u32>,
    // Insertion order, oldest first. Oldest key evicted on overflow.
    queue: VecDeque<String>,
}

/// Bounded memoization cache for the fast estimator.
///
/// Capacity is injected at construction; eviction is FIFO (oldest inserted
/// key goes first). Eviction is approximate under concurrent use — the cache
/// trades linearizability for a plain mutex.
pub struct EstimateCache {
    capacity: usize,
    inner: Mutex<CacheInner>,
}

impl EstimateCache {
    /// Create a cache with the given capacity.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            inner: Mutex::new(CacheInner {
                map: HashMap::new(),
                queue: VecDeque::new(),
            }),
        }
    }

    /// Fast token estimate: ceil(length / 3.35), memoized.
    ///
    /// A 335-character ASCII string estimates to exactly 100 tokens.
    pub fn estimate(&self, text: &str) -> u32 {
        if text.is_empty() {
            return 0;
        }
        let key = Self::key(text);
        {
            let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
            if let Some(&cached) = inner.map.get(&key) {
                return cached;
            }
        }

        let len = text.chars().count() as f64;
        let estimate = (len / 3.35).ceil() as u32;

        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        if inner.map.insert(key.clone(), estimate).is_none() {
            inner.queue.push_back(key);
            if inner.map.len() > self.capacity {
                if let Some(oldest) = inner.queue.pop_front() {
                    inner.map.remove(&oldest);
                }
            }
        }
        estimate
    }

    /// Number of memoized entries.
    pub fn len(&self) -> usize {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // Key: length plus the first 50 characters. Cheap and collision-safe
    // enough for same-length same-prefix fragments.
    fn key(text: &str) -> String {
        let prefix: String = text.chars().take(50).collect();
        format!("{}_{}", text.chars().count(), prefix)
    }
}

impl Default for EstimateCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_string_is_zero() {
        assert_eq!(estimate_tokens_precise(""), 0);
        assert_eq!(EstimateCache::default().estimate(""), 0);
    }

    #[test]
    fn precise_ascii_costs_quarter_token_each() {
        // 8 alphanumerics -> 2.0 tokens
        assert_eq!(estimate_tokens_precise("abcd1234"), 2);
    }

    #[test]
    fn precise_non_ascii_costs_more() {
        // 3 CJK chars -> 3 / 1.5 = 2.0 tokens
        assert_eq!(estimate_tokens_precise("龍火山"), 2);
        // Mixed: 4 ascii (1.0) + 1 space (0.667) -> ceil(1.667) = 2
        assert_eq!(estimate_tokens_precise("abcd "), 2);
    }

    #[test]
    fn fast_estimator_335_ascii_chars_is_100() {
        let cache = EstimateCache::default();
        let text = "a".repeat(335);
        assert_eq!(cache.estimate(&text), 100);
    }

    #[test]
    fn fast_estimator_is_deterministic_and_memoized() {
        let cache = EstimateCache::default();
        let text = "The quick brown fox jumps over the lazy dog.";
        let first = cache.estimate(text);
        let second = cache.estimate(text);
        assert_eq!(first, second);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn fifo_cache_evicts_oldest_on_overflow() {
        let cache = EstimateCache::new(2);
        cache.estimate("first");
        cache.estimate("second");
        cache.estimate("third!");
        assert_eq!(cache.len(), 2);
        // "first" was evicted; re-estimating reinserts it and evicts "second".
        cache.estimate("first");
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn cache_capacity_is_injected() {
        let cache = EstimateCache::new(1);
        cache.estimate("one");
        cache.estimate("two");
        assert_eq!(cache.len(), 1);
    }
}

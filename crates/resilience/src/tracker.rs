//! Keyed in-flight and retry-attempt tracking.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

#[derive(Debug, Default)]
struct TrackerState {
    loading: HashMap<String, bool>,
    attempts: HashMap<String, u32>,
}

/// Explicitly-owned call state, keyed by logical operation name.
///
/// The tracker is injected into call sites (one instance per client)
/// instead of living in a process-wide global. The loading flag is
/// advisory: it does not by itself prevent two concurrent calls under the
/// same key. A caller that wants single-flight behaviour checks
/// [`CallTracker::is_loading`] before issuing a new call.
#[derive(Debug, Clone, Default)]
pub struct CallTracker {
    state: Arc<Mutex<TrackerState>>,
}

impl CallTracker {
    /// Creates a new empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks an operation key as loading or idle.
    pub fn set_loading(&self, key: &str, loading: bool) {
        let mut state = self.state.lock().unwrap();
        if loading {
            state.loading.insert(key.to_string(), true);
        } else {
            state.loading.remove(key);
        }
    }

    /// Returns true if the operation key is currently loading.
    pub fn is_loading(&self, key: &str) -> bool {
        self.state
            .lock()
            .unwrap()
            .loading
            .get(key)
            .copied()
            .unwrap_or(false)
    }

    /// Returns true if any operation key is currently loading.
    pub fn any_loading(&self) -> bool {
        self.state.lock().unwrap().loading.values().any(|v| *v)
    }

    /// Returns the number of retry attempts recorded for a key.
    pub fn attempts(&self, key: &str) -> u32 {
        self.state
            .lock()
            .unwrap()
            .attempts
            .get(key)
            .copied()
            .unwrap_or(0)
    }

    /// Records one more retry attempt for a key and returns the new count.
    pub(crate) fn record_attempt(&self, key: &str) -> u32 {
        let mut state = self.state.lock().unwrap();
        let count = state.attempts.entry(key.to_string()).or_insert(0);
        *count += 1;
        *count
    }

    /// Resets both the loading flag and the attempt counter for a key, so
    /// the next call under the same key starts a fresh budget.
    pub fn clear(&self, key: &str) {
        let mut state = self.state.lock().unwrap();
        state.loading.remove(key);
        state.attempts.remove(key);
    }

    /// Resets all tracked state.
    pub fn clear_all(&self) {
        let mut state = self.state.lock().unwrap();
        state.loading.clear();
        state.attempts.clear();
    }
}

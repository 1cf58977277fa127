//! Per-client write tracking for read-your-writes.
//!
//! Maps each client id to the greatest write counter this server has
//! locally applied for that client. Entries start at 0 and only ever move
//! forward; updates from propagation take the max so redelivery is
//! harmless. Kept under its own lock, separate from the article store.

use std::collections::HashMap;
use tokio::sync::Mutex;

#[derive(Debug, Default)]
pub struct SessionMap {
    counters: Mutex<HashMap<String, u64>>,
}

impl SessionMap {
    pub fn new() -> Self {
        SessionMap::default()
    }

    /// Record that `write_counter` for `client_id` has been applied
    /// locally. Monotonic: a stale counter never moves the entry back.
    pub async fn observe(&self, client_id: &str, write_counter: u64) {
        let mut counters = self.counters.lock().await;
        let entry = counters.entry(client_id.to_owned()).or_insert(0);
        *entry = (*entry).max(write_counter);
    }

    pub async fn last_counter(&self, client_id: &str) -> u64 {
        let counters = self.counters.lock().await;
        counters.get(client_id).copied().unwrap_or(0)
    }

    /// The counters in `[stored+1 ..= declared]` that this server has not
    /// yet applied for `client_id`. Empty when the server is caught up.
    pub async fn missing_counters(&self, client_id: &str, declared: u64) -> Vec<u64> {
        let stored = self.last_counter(client_id).await;
        (stored + 1..=declared).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn counters_start_at_zero() {
        let sessions = SessionMap::new();
        assert_eq!(sessions.last_counter("nobody").await, 0);
    }

    #[tokio::test]
    async fn observe_is_monotonic() {
        let sessions = SessionMap::new();
        sessions.observe("c", 3).await;
        sessions.observe("c", 1).await;
        assert_eq!(sessions.last_counter("c").await, 3);
        sessions.observe("c", 4).await;
        assert_eq!(sessions.last_counter("c").await, 4);
    }

    #[tokio::test]
    async fn missing_counters_spans_the_gap() {
        let sessions = SessionMap::new();
        sessions.observe("c", 1).await;
        assert_eq!(sessions.missing_counters("c", 4).await, vec![2, 3, 4]);
        assert!(sessions.missing_counters("c", 1).await.is_empty());
        // A declaration behind the stored counter needs nothing.
        assert!(sessions.missing_counters("c", 0).await.is_empty());
    }
}

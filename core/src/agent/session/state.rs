//! Session state
//!
//! Mutable key/value store scoped to one top-level run. Cloning the handle
//! shares the underlying map. Writes are last-write-wins per key; there is no
//! cross-key isolation between concurrent writers, so parallel siblings
//! should write to distinct keys.

use parking_lot::RwLock;
use serde_json::{Map, Value};
use std::sync::Arc;

#[derive(Debug, Clone, Default)]
pub struct SessionState {
    inner: Arc<RwLock<Map<String, Value>>>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_map(map: Map<String, Value>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(map)),
        }
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.inner.read().get(key).cloned()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.inner.read().contains_key(key)
    }

    /// Write a key, returning the previous value
    pub fn insert(&self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.inner.write().insert(key.into(), value)
    }

    pub fn remove(&self, key: &str) -> Option<Value> {
        self.inner.write().remove(key)
    }

    /// Point-in-time copy
    pub fn snapshot(&self) -> Map<String, Value> {
        self.inner.read().clone()
    }

    pub fn keys(&self) -> Vec<String> {
        self.inner.read().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }

    /// True if both handles point at the same store
    pub fn same_store(&self, other: &SessionState) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl From<Map<String, Value>> for SessionState {
    fn from(map: Map<String, Value>) -> Self {
        Self::from_map(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_clones_share_the_store() {
        let state = SessionState::new();
        let view = state.clone();

        state.insert("draft", json!("v1"));
        assert_eq!(view.get("draft"), Some(json!("v1")));
        assert!(view.same_store(&state));
        assert!(!SessionState::new().same_store(&state));
    }

    #[test]
    fn test_last_write_wins() {
        let state = SessionState::new();
        assert_eq!(state.insert("k", json!(1)), None);
        assert_eq!(state.insert("k", json!(2)), Some(json!(1)));
        assert_eq!(state.get("k"), Some(json!(2)));
        assert_eq!(state.len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_writers_on_distinct_keys() {
        let state = SessionState::new();
        let mut handles = Vec::new();
        for i in 0..16 {
            let state = state.clone();
            handles.push(tokio::spawn(async move {
                state.insert(format!("k{}", i), json!(i));
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(state.len(), 16);
        assert_eq!(state.get("k7"), Some(json!(7)));
    }

    #[test]
    fn test_snapshot_is_detached() {
        let state = SessionState::new();
        state.insert("a", json!(true));
        let snap = state.snapshot();
        state.remove("a");
        assert!(snap.contains_key("a"));
        assert!(state.is_empty());
    }
}

// Last-known-good values per metric
use std::collections::HashMap;
use tokio::sync::RwLock;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CachedValue {
    pub value: f64,
    pub timestamp: i64,
}

/// Fallback store for metrics whose live query failed. Entries are only
/// written by successful reads and never evicted; the metric set is small
/// and fixed.
#[derive(Debug, Default)]
pub struct MetricCache {
    entries: RwLock<HashMap<String, CachedValue>>,
}

impl MetricCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn record_success(&self, name: &str, value: f64, timestamp: i64) {
        self.entries
            .write()
            .await
            .insert(name.to_string(), CachedValue { value, timestamp });
    }

    pub async fn fallback(&self, name: &str) -> Option<CachedValue> {
        self.entries.read().await.get(name).copied()
    }
}

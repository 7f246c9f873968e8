//! `now` is always supplied by the caller (see every operation
//! signature in `crate::engine`); this module only holds the
//! key/value configuration half, with per-queue override via the
//! `<queue>-<key>` prefix.

use std::collections::BTreeMap;

use serde_json::Value;

pub const DEFAULT_HEARTBEAT_SECONDS: f64 = 60.0;

/// Flat key/value configuration. Unknown keys are accepted and
/// echoed back on `config.get`.
#[derive(Debug, Clone, Default)]
pub struct Config {
    values: BTreeMap<String, String>,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn unset(&mut self, key: &str) {
        self.values.remove(key);
    }

    /// Per-queue override lookup: `<queue>-<key>` first, then `<key>`.
    pub fn get(&self, key: &str, queue: Option<&str>) -> Option<&str> {
        if let Some(q) = queue {
            if let Some(v) = self.values.get(&format!("{q}-{key}")) {
                return Some(v);
            }
        }
        self.values.get(key).map(|s| s.as_str())
    }

    pub fn heartbeat_seconds(&self, queue: Option<&str>) -> f64 {
        self.get("heartbeat", queue)
            .and_then(|v| v.parse::<f64>().ok())
            .unwrap_or(DEFAULT_HEARTBEAT_SECONDS)
    }

    pub fn jobs_history(&self) -> Option<f64> {
        self.get("jobs-history", None).and_then(|v| v.parse().ok())
    }

    pub fn jobs_history_count(&self) -> Option<u64> {
        self.get("jobs-history-count", None)
            .and_then(|v| v.parse().ok())
    }

    pub fn to_json(&self) -> Value {
        let map: serde_json::Map<String, Value> = self
            .values
            .iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect();
        Value::Object(map)
    }
}

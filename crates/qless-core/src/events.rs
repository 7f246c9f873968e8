//! Structured events published to named channels. Publish failures
//! are best-effort and silent: the engine calls `StorageOps::publish`
//! directly and never treats a publish as something that can fail the
//! surrounding operation.

use serde_json::{json, Value};

pub const CHANNEL_LOG: &str = "log";
pub const CHANNEL_PUT: &str = "put";
pub const CHANNEL_POPPED: &str = "popped";
pub const CHANNEL_COMPLETED: &str = "completed";
pub const CHANNEL_FAILED: &str = "failed";
pub const CHANNEL_STALLED: &str = "stalled";
pub const CHANNEL_CANCELED: &str = "canceled";
pub const CHANNEL_TRACK: &str = "track";
pub const CHANNEL_UNTRACK: &str = "untrack";

pub fn worker_channel(worker: &str) -> String {
    worker.to_string()
}

pub fn log_message(event: &str, jid: &str, extra: Value) -> String {
    let mut obj = json!({ "event": event, "jid": jid });
    if let (Some(obj_map), Some(extra_map)) = (obj.as_object_mut(), extra.as_object()) {
        for (k, v) in extra_map {
            obj_map.insert(k.clone(), v.clone());
        }
    }
    obj.to_string()
}

pub fn jid_message(jid: &str) -> String {
    json!({ "jid": jid }).to_string()
}

//! Runnable demo: opens an in-memory store, drives the Command Facade
//! end to end with a tiny put/pop/complete flow, and prints what comes
//! back. Not a test — a worked example for reading alongside the core
//! crate's docs.

use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::Result;
use serde_json::json;

use qless_core::engine::QueueEngine;
use qless_core::facade;
use qless_core::stats::day_bin;
use qless_storage_memory::MemoryStorage;

fn now() -> f64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_secs_f64()
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_env_filter(tracing_subscriber::EnvFilter::from_default_env()).init();

    let storage = MemoryStorage::new();
    let engine = QueueEngine::new(storage);
    let t = now();

    let jid = facade::dispatch(
        &engine,
        "put",
        &json!(t),
        &json!({
            "jid": "demo-1",
            "klass": "demo::SendEmail",
            "data": "{\"to\":\"ferris@example.com\"}",
            "queue": "emails",
            "priority": 5,
        }),
    )
    .await?;
    println!("put -> {jid}");

    let popped = facade::dispatch(
        &engine,
        "pop",
        &json!(t + 1.0),
        &json!({"queue": "emails", "worker": "worker-1", "count": 1}),
    )
    .await?;
    println!("pop -> {popped}");

    let jid = popped[0]["jid"].as_str().expect("popped job has a jid").to_string();

    let state = facade::dispatch(
        &engine,
        "complete",
        &json!(t + 2.0),
        &json!({
            "jid": jid,
            "worker": "worker-1",
            "queue": "emails",
            "data": "{\"sent\":true}",
        }),
    )
    .await?;
    println!("complete -> {state}");

    let stats = facade::dispatch(
        &engine,
        "stats",
        &json!(t + 2.0),
        &json!({"queue": "emails", "day_bin": day_bin(t + 2.0)}),
    )
    .await?;
    println!("stats -> {stats}");

    Ok(())
}

//! Cancel/Pause/Unpause/Tag/Track/Unfail plus the
//! remaining read-mostly commands in the registry: `failed`,
//! `stats`, `priority`, `queues`, `jobs`, `workers`, `length`.

use serde_json::{json, Value};

use crate::engine::common;
use crate::error::{Error, Result};
use crate::events;
use crate::job::{JobRecord, State};
use crate::keys;
use crate::options::{TagAction, TrackAction};
use crate::storage::StorageOps;

pub fn pause(ops: &mut dyn StorageOps, queues: &[String]) {
    for q in queues {
        ops.sadd(keys::PAUSED_QUEUES, q);
    }
}

pub fn unpause(ops: &mut dyn StorageOps, queues: &[String]) {
    for q in queues {
        ops.srem(keys::PAUSED_QUEUES, q);
    }
}

pub fn tag(
    ops: &mut dyn StorageOps,
    now: f64,
    action: TagAction,
    jid: Option<&str>,
    tags: &[String],
) -> Result<Value> {
    match action {
        TagAction::Add => {
            let jid = jid.ok_or_else(|| Error::InvalidArguments {
                argument: "jid".into(),
                reason: "tag add requires a jid".into(),
            })?;
            let mut job = ops.job_get(jid).ok_or_else(|| Error::JobNotFound(jid.to_string()))?;
            let fresh: Vec<String> = tags
                .iter()
                .filter(|t| !job.tags.iter().any(|existing| existing == *t))
                .cloned()
                .collect();
            common::index_tags(ops, now, jid, &fresh);
            job.tags.extend(fresh);
            ops.job_put(job.clone());
            Ok(json!(job.tags.iter().collect::<Vec<_>>()))
        }
        TagAction::Remove => {
            let jid = jid.ok_or_else(|| Error::InvalidArguments {
                argument: "jid".into(),
                reason: "tag remove requires a jid".into(),
            })?;
            let mut job = ops.job_get(jid).ok_or_else(|| Error::JobNotFound(jid.to_string()))?;
            common::unindex_tags(ops, jid, tags);
            job.tags.retain(|t| !tags.contains(t));
            ops.job_put(job.clone());
            Ok(json!(job.tags.iter().collect::<Vec<_>>()))
        }
        TagAction::Get => {
            // For `get`, the "jid" slot carries a tag name: it
            // returns the jids carrying that tag, not a job's tags.
            let tag_name = jid.ok_or_else(|| Error::InvalidArguments {
                argument: "tag".into(),
                reason: "tag get requires a tag name".into(),
            })?;
            let members = ops.zrevrange(&keys::tag(tag_name), 0);
            Ok(json!(members.into_iter().map(|m| m.member).collect::<Vec<_>>()))
        }
        TagAction::Top => {
            let members = ops.zrevrange(keys::TAGS, 25);
            Ok(json!(members.into_iter().map(|m| m.member).collect::<Vec<_>>()))
        }
    }
}

pub fn track(ops: &mut dyn StorageOps, now: f64, action: TrackAction, jid: Option<&str>) -> Result<Value> {
    match action {
        TrackAction::Track => {
            let jid = jid.ok_or_else(|| Error::InvalidArguments {
                argument: "jid".into(),
                reason: "track requires a jid".into(),
            })?;
            ops.zadd(keys::TRACKED, jid, now);
            ops.publish(events::CHANNEL_TRACK, events::jid_message(jid));
            Ok(Value::Bool(true))
        }
        TrackAction::Untrack => {
            let jid = jid.ok_or_else(|| Error::InvalidArguments {
                argument: "jid".into(),
                reason: "untrack requires a jid".into(),
            })?;
            ops.zrem(keys::TRACKED, jid);
            ops.publish(events::CHANNEL_UNTRACK, events::jid_message(jid));
            Ok(Value::Bool(true))
        }
        TrackAction::Peek => {
            let members = ops.zrevrange(keys::TRACKED, 0);
            Ok(json!(members.into_iter().map(|m| m.member).collect::<Vec<_>>()))
        }
    }
}

/// `unfail`: resets up to `count` jids from the tail
/// (oldest) of `failed-<group>` back to `waiting`.
pub fn unfail(
    ops: &mut dyn StorageOps,
    now: f64,
    group: &str,
    queue: &str,
    count: usize,
) -> Result<i64> {
    let key = keys::failed_group(group);
    let jids = ops.lpop_tail(&key, count);
    if ops.llen(&key) == 0 {
        ops.ldel(&key);
        ops.srem(keys::FAILURES, group);
    }

    let mut moved = 0i64;
    for jid in &jids {
        let Some(mut job) = ops.job_get(jid) else { continue };
        job.state = State::Waiting;
        job.remaining = job.retries;
        job.worker = None;
        job.expires = 0.0;
        job.failure = None;
        job.history.push(crate::job::HistoryEntry::new(queue.to_string(), now));
        let score = JobRecord::work_score(job.priority, now);
        ops.zadd(&keys::work(queue), jid, score);
        ops.job_put(job);
        moved += 1;
    }
    Ok(moved)
}

pub fn failed(ops: &dyn StorageOps, group: Option<&str>, offset: usize, count: usize) -> Value {
    match group {
        Some(g) => {
            let key = keys::failed_group(g);
            if !ops.sismember(keys::FAILURES, g) {
                return json!({ "total": 0, "jobs": [] });
            }
            let total = ops.llen(&key);
            let window = ops.lrange(&key, offset, count);
            json!({ "total": total, "jobs": window })
        }
        None => {
            let groups = ops.smembers(keys::FAILURES);
            let mut out = serde_json::Map::new();
            for g in groups {
                let total = ops.llen(&keys::failed_group(&g));
                out.insert(g, json!(total));
            }
            Value::Object(out)
        }
    }
}

pub fn stats(ops: &dyn StorageOps, queue: &str, day_bin: i64) -> Value {
    let wait = ops.stats_get(crate::stats::Stage::Wait, day_bin, queue);
    let run = ops.stats_get(crate::stats::Stage::Run, day_bin, queue);
    let counters = ops.day_counters_get(day_bin, queue);
    json!({
        "wait": wait.to_json(),
        "run": run.to_json(),
        "retries": counters.retries,
        "failed": counters.failed,
        "failures": counters.failures,
    })
}

pub fn priority(ops: &mut dyn StorageOps, jid: &str, priority: i64) -> Result<()> {
    let mut job = ops.job_get(jid).ok_or_else(|| Error::JobNotFound(jid.to_string()))?;
    let old_priority = job.priority;
    job.priority = priority;
    if job.state == State::Waiting {
        let work_key = keys::work(&job.queue);
        // score = priority - t/1e10; keep the put-time component
        // (t/1e10 = old_priority - old_score) and only move priority.
        if let Some(old_score) = ops.zscore(&work_key, jid) {
            let new_score = (priority - old_priority) as f64 + old_score;
            ops.zadd(&work_key, jid, new_score);
        }
    }
    ops.job_put(job);
    Ok(())
}

pub fn queues(ops: &dyn StorageOps) -> Value {
    let names = ops.zrevrange(keys::QUEUES, 0);
    let mut out = Vec::new();
    for entry in names {
        let q = &entry.member;
        out.push(json!({
            "name": q,
            "waiting": ops.zcard(&keys::work(q)),
            "running": ops.zcard(&keys::locks(q)),
            "scheduled": ops.zcard(&keys::scheduled(q)),
            "depends": ops.zcard(&keys::depends(q)),
            "recurring": ops.zcard(&keys::recur(q)),
            "paused": ops.sismember(keys::PAUSED_QUEUES, q),
        }));
    }
    json!(out)
}

pub fn jobs(ops: &dyn StorageOps, queue: &str, state: &str) -> Vec<String> {
    let key = match state {
        "waiting" | "work" => keys::work(queue),
        "running" | "locks" => keys::locks(queue),
        "scheduled" => keys::scheduled(queue),
        "depends" => keys::depends(queue),
        "recurring" => keys::recur(queue),
        _ => return Vec::new(),
    };
    ops.zrevrange(&key, 0).into_iter().map(|m| m.member).collect()
}

pub fn workers(ops: &dyn StorageOps, worker: Option<&str>) -> Value {
    match worker {
        Some(w) => {
            let jobs = ops.zrevrange(&keys::worker_jobs(w), 0);
            json!({ "jobs": jobs.into_iter().map(|m| m.member).collect::<Vec<_>>() })
        }
        None => {
            let names = ops.zrevrange(keys::WORKERS, 0);
            let mut out = Vec::new();
            for entry in names {
                out.push(json!({
                    "name": entry.member.clone(),
                    "jobs": ops.zcard(&keys::worker_jobs(&entry.member)),
                    "last_seen": entry.score,
                }));
            }
            json!(out)
        }
    }
}

pub fn length(ops: &dyn StorageOps, queue: &str) -> i64 {
    (ops.zcard(&keys::work(queue))
        + ops.zcard(&keys::locks(queue))
        + ops.zcard(&keys::scheduled(queue))
        + ops.zcard(&keys::depends(queue))) as i64
}

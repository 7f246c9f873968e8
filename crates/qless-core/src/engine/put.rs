//! `put`.

use std::collections::BTreeSet;

use smallvec::SmallVec;

use crate::engine::common;
use crate::error::{Error, Result};
use crate::events;
use crate::job::{HistoryEntry, JobRecord, State, DEFAULT_RETRIES};
use crate::keys;
use crate::options::PutOptions;
use crate::stats::{day_bin, DayCounters};
use crate::storage::StorageOps;

pub fn put(
    ops: &mut dyn StorageOps,
    now: f64,
    jid: &str,
    klass: &str,
    data: &str,
    queue: &str,
    delay: f64,
    opts: PutOptions,
) -> Result<String> {
    let depends = opts.depends.clone().unwrap_or_default();
    if delay > 0.0 && !depends.is_empty() {
        return Err(Error::Conflict(
            "delay>0 with non-empty depends is not allowed".into(),
        ));
    }

    // 1. Load existing job (if any).
    let existing = ops.job_get(jid);

    let priority = opts
        .priority
        .or_else(|| existing.as_ref().map(|j| j.priority))
        .unwrap_or(0);
    let tags: SmallVec<[String; 4]> = opts
        .tags
        .clone()
        .map(SmallVec::from_vec)
        .or_else(|| existing.as_ref().map(|j| j.tags.clone()))
        .unwrap_or_default();
    let retries = opts
        .retries
        .or_else(|| existing.as_ref().map(|j| j.retries))
        .unwrap_or(DEFAULT_RETRIES);

    // 3. Publish log: put.
    ops.publish(
        events::CHANNEL_LOG,
        events::log_message("put", jid, serde_json::json!({ "queue": queue })),
    );

    // 4. Append history entry.
    let mut history = existing.as_ref().map(|j| j.history.clone()).unwrap_or_default();
    history.push(HistoryEntry::new(queue.to_string(), now));

    if let Some(old) = &existing {
        // 5. Remove from old queue's indices.
        if !old.queue.is_empty() {
            common::remove_from_queue_indices(ops, &old.queue, jid);
        }
        // 6. Revoke an outstanding lease.
        if let Some(worker) = &old.worker {
            common::remove_from_worker(ops, worker, jid);
            ops.publish(&events::worker_channel(worker), events::jid_message(jid));
        }
        // 7. Drop from the completed-expiry set.
        if old.state == State::Complete {
            ops.zrem(keys::COMPLETED, jid);
        }
        // 9. Drop from its failure group.
        if old.state == State::Failed {
            if let Some(failure) = &old.failure {
                let group_key = keys::failed_group(&failure.group);
                // lpop_tail only removes from the tail; a put-driven
                // reinstatement can target any position, so rebuild
                // the list without this jid.
                remove_from_failed_list(ops, &failure.group, jid);
                if ops.llen(&group_key) == 0 {
                    ops.ldel(&group_key);
                    ops.srem(keys::FAILURES, &failure.group);
                }
                let bin = day_bin(failure.when);
                let mut counters = ops.day_counters_get(bin, &old.queue);
                counters.failed = counters.failed.saturating_sub(1);
                ops.day_counters_put(bin, &old.queue, counters);
            }
        }
    }

    // 8. Insert into tag indices.
    common::index_tags(ops, now, jid, &tags);

    // 10-11. Build the fresh record and wire dependency edges.
    let mut dependencies = BTreeSet::new();
    for dep in &depends {
        if let Some(mut dep_job) = ops.job_get(dep) {
            if dep_job.state != State::Complete {
                dep_job.dependents.insert(jid.to_string());
                ops.job_put(dep_job);
                dependencies.insert(dep.clone());
            }
        }
    }

    let mut job = JobRecord {
        jid: jid.to_string(),
        klass: klass.to_string(),
        data: data.to_string(),
        priority,
        tags,
        state: State::Waiting,
        queue: queue.to_string(),
        worker: None,
        expires: 0.0,
        retries,
        remaining: retries,
        history,
        failure: None,
        dependencies,
        dependents: existing.map(|j| j.dependents).unwrap_or_default(),
    };

    // 12. Placement.
    if delay > 0.0 {
        job.state = State::Scheduled;
        ops.zadd(&keys::scheduled(queue), jid, now + delay);
    } else if !job.dependencies.is_empty() {
        job.state = State::Depends;
        ops.zadd(&keys::depends(queue), jid, now);
    } else {
        job.state = State::Waiting;
        let score = JobRecord::work_score(priority, now);
        ops.zadd(&keys::work(queue), jid, score);
    }

    ops.job_put(job);

    // 13. Ensure the queue is known.
    common::ensure_queue_known(ops, now, queue);

    // 14. Publish if tracked.
    common::publish_if_tracked(ops, jid, events::CHANNEL_PUT);

    Ok(jid.to_string())
}

fn remove_from_failed_list(ops: &mut dyn StorageOps, group: &str, jid: &str) {
    let key = keys::failed_group(group);
    let len = ops.llen(&key);
    if len == 0 {
        return;
    }
    // lpop_tail returns oldest-first; lpushing in that same order
    // re-inserts each at the head in turn, so the most-recent entry
    // ends up pushed last and lands back at the head.
    let all = ops.lpop_tail(&key, len);
    for entry in all {
        if entry != jid {
            ops.lpush(&key, entry);
        }
    }
}

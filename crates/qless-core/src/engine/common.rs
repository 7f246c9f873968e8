//! Shared mutation helpers used by more than one operation module.
//! Plain functions over `&mut dyn StorageOps`, never async: every
//! call site already holds the single-writer lock (see
//! `crate::storage::Storage::transaction`).

use crate::engine::stats_support;
use crate::events;
use crate::job::{FailureRecord, JobRecord, State};
use crate::keys;
use crate::storage::StorageOps;

/// Remove a jid from every queue-scoped index it could occupy.
pub fn remove_from_queue_indices(ops: &mut dyn StorageOps, queue: &str, jid: &str) {
    ops.zrem(&keys::work(queue), jid);
    ops.zrem(&keys::locks(queue), jid);
    ops.zrem(&keys::scheduled(queue), jid);
    ops.zrem(&keys::depends(queue), jid);
}

/// Remove a jid from its worker's held set.
pub fn remove_from_worker(ops: &mut dyn StorageOps, worker: &str, jid: &str) {
    ops.zrem(&keys::worker_jobs(worker), jid);
}

pub fn ensure_queue_known(ops: &mut dyn StorageOps, now: f64, queue: &str) {
    if ops.zscore(keys::QUEUES, queue).is_none() {
        ops.zadd(keys::QUEUES, queue, now);
    }
}

/// Add a jid to every tag's reverse index and bump the global tag
/// frequency map.
pub fn index_tags(ops: &mut dyn StorageOps, now: f64, jid: &str, tags: &[String]) {
    for t in tags {
        ops.zadd(&keys::tag(t), jid, now);
        let freq = ops.zscore(keys::TAGS, t).unwrap_or(0.0);
        ops.zadd(keys::TAGS, t, freq + 1.0);
    }
}

/// Remove a jid from the given tags' reverse index and decrement the
/// global frequency map.
pub fn unindex_tags(ops: &mut dyn StorageOps, jid: &str, tags: &[String]) {
    for t in tags {
        ops.zrem(&keys::tag(t), jid);
        if let Some(freq) = ops.zscore(keys::TAGS, t) {
            let next = (freq - 1.0).max(0.0);
            if next <= 0.0 {
                ops.zrem(keys::TAGS, t);
            } else {
                ops.zadd(keys::TAGS, t, next);
            }
        }
    }
}

/// Move a dependent into `work` once its dependency set empties.
pub fn release_into_work(ops: &mut dyn StorageOps, now: f64, queue: &str, job: &mut JobRecord) {
    ops.zrem(&keys::depends(queue), &job.jid);
    job.state = crate::job::State::Waiting;
    let score = JobRecord::work_score(job.priority, now);
    ops.zadd(&keys::work(queue), &job.jid, score);
    ops.job_put(job.clone());
}

pub fn publish_if_tracked(ops: &mut dyn StorageOps, jid: &str, channel: &str) {
    if ops.zscore(keys::TRACKED, jid).is_some() {
        ops.publish(channel, events::jid_message(jid));
    }
}

pub fn is_tracked(ops: &dyn StorageOps, jid: &str) -> bool {
    ops.zscore(keys::TRACKED, jid).is_some()
}

/// Transition a running job into `failed`, shared by `fail`,
/// lock-expiry retries-exhaustion and retry-exhaustion via `retry`.
/// Assumes the caller has already removed the job from its queue's
/// `locks` index and the worker's held set.
pub fn fail_job(
    ops: &mut dyn StorageOps,
    now: f64,
    job: &mut JobRecord,
    worker: &str,
    group: &str,
    message: &str,
    data: Option<&str>,
) {
    job.state = State::Failed;
    job.worker = None;
    job.expires = 0.0;
    if let Some(d) = data {
        job.data = d.to_string();
    }
    job.failure = Some(FailureRecord {
        group: group.to_string(),
        message: message.to_string(),
        when: now,
        worker: worker.to_string(),
    });
    if let Some(last) = job.last_history_mut() {
        last.failed = Some(now);
    }
    ops.job_put(job.clone());

    ops.sadd(keys::FAILURES, group);
    ops.lpush(&keys::failed_group(group), job.jid.clone());
    stats_support::bump_failed(ops, now, &job.queue);

    tracing::warn!(jid = %job.jid, queue = %job.queue, now, group, "job failed");
    publish_if_tracked(ops, &job.jid, events::CHANNEL_FAILED);
}

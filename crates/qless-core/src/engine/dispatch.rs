//! `peek` and `pop`: the Queue Engine's dispatch
//! algorithm — lock-expiry reclamation, recurring instantiation,
//! scheduled promotion, and priority-ordered work selection.

use std::collections::HashSet;

use crate::engine::{common, recur_impl, stats_support};
use crate::error::Result;
use crate::events;
use crate::job::{JobRecord, State};
use crate::keys;
use crate::stats::Stage;
use crate::storage::StorageOps;

/// Steps 1-6 shared by `peek` and `pop`; `worker` is `Some` only for
/// `pop` (step 2, the pause gate and worker-liveness record).
fn dispatch_candidates(
    ops: &mut dyn StorageOps,
    now: f64,
    queue: &str,
    count: usize,
    worker: Option<&str>,
) -> Vec<String> {
    // 1. Pause gate (pop only).
    if worker.is_some() && ops.sismember(keys::PAUSED_QUEUES, queue) {
        return Vec::new();
    }
    // 2. Worker liveness (pop only).
    if let Some(w) = worker {
        ops.zadd(keys::WORKERS, w, now);
    }

    // 3. Expired-lock reclamation.
    let locks_key = keys::locks(queue);
    let expired = ops.zrange_by_score(&locks_key, now, count);
    let mut candidates = Vec::new();
    let mut reclaimed = 0u64;
    for entry in &expired {
        let jid = &entry.member;
        let Some(mut job) = ops.job_get(jid) else {
            ops.zrem(&locks_key, jid);
            continue;
        };
        reclaimed += 1;
        let prior_worker = job.worker.clone().unwrap_or_default();
        if let Some(w) = &job.worker {
            common::remove_from_worker(ops, w, jid);
            ops.publish(&events::worker_channel(w), events::jid_message(jid));
            ops.publish(
                events::CHANNEL_LOG,
                events::log_message("lock_lost", jid, serde_json::json!({ "worker": w })),
            );
            tracing::warn!(jid = %jid, queue = %queue, now, worker = %w, "lock lost");
        }
        ops.zrem(&locks_key, jid);
        job.remaining -= 1;
        job.worker = None;
        job.expires = 0.0;

        if job.remaining < 0 {
            common::remove_from_queue_indices(ops, queue, jid);
            let group = keys::retries_group(queue);
            common::fail_job(
                ops,
                now,
                &mut job,
                &prior_worker,
                &group,
                "job retries exhausted",
                None,
            );
        } else {
            job.state = State::Waiting;
            let score = JobRecord::work_score(job.priority, now);
            let remaining = job.remaining;
            ops.zadd(&keys::work(queue), jid, score);
            ops.job_put(job);
            tracing::info!(jid = %jid, queue = %queue, now, remaining, "job reclaimed");
            common::publish_if_tracked(ops, jid, events::CHANNEL_STALLED);
            candidates.push(jid.clone());
        }
    }
    stats_support::bump_retries(ops, now, queue, reclaimed);

    let need = count.saturating_sub(candidates.len());
    if need > 0 {
        // 4. Recurring instantiation.
        recur_impl::update_recurring_jobs(ops, now, queue, need);

        // 5. Scheduled promotion.
        let scheduled_key = keys::scheduled(queue);
        let due = ops.zrange_by_score(&scheduled_key, now, need);
        for entry in due {
            let jid = entry.member;
            if let Some(mut job) = ops.job_get(&jid) {
                ops.zrem(&scheduled_key, &jid);
                job.state = State::Waiting;
                let score = JobRecord::work_score(job.priority, entry.score);
                ops.zadd(&keys::work(queue), &jid, score);
                ops.job_put(job);
            } else {
                ops.zrem(&scheduled_key, &jid);
            }
        }

        // 6. Work selection: highest score (priority desc, put-time
        // asc) first. A job reclaimed above was already re-added to
        // `work`, so it can resurface here too; skip it rather than
        // returning the same jid twice.
        let reclaimed_jids: HashSet<String> = candidates.iter().cloned().collect();
        let work_key = keys::work(queue);
        let selected = ops.zrevrange(&work_key, need + reclaimed_jids.len());
        let mut added = 0usize;
        for entry in selected {
            if added >= need {
                break;
            }
            if reclaimed_jids.contains(entry.member.as_str()) {
                continue;
            }
            candidates.push(entry.member);
            added += 1;
        }
    }

    candidates
}

pub fn peek(ops: &mut dyn StorageOps, now: f64, queue: &str, count: usize) -> Result<Vec<JobRecord>> {
    let candidates = dispatch_candidates(ops, now, queue, count, None);
    Ok(candidates
        .into_iter()
        .filter_map(|jid| ops.job_get(&jid))
        .collect())
}

pub fn pop(
    ops: &mut dyn StorageOps,
    now: f64,
    queue: &str,
    worker: &str,
    count: usize,
) -> Result<Vec<JobRecord>> {
    let candidates = dispatch_candidates(ops, now, queue, count, Some(worker));
    let heartbeat = ops.config().heartbeat_seconds(Some(queue));
    let expires = now + heartbeat;

    let mut out = Vec::with_capacity(candidates.len());
    for jid in candidates {
        let Some(mut job) = ops.job_get(&jid) else { continue };

        if let Some(popped_at) = job.history.last().map(|h| h.put) {
            stats_support::record(ops, Stage::Wait, now, queue, now - popped_at);
        }
        if let Some(last) = job.last_history_mut() {
            last.worker = Some(worker.to_string());
            last.popped = Some(now);
        }

        ops.zrem(&keys::work(queue), &jid);
        ops.zadd(&keys::locks(queue), &jid, expires);
        ops.zadd(&keys::worker_jobs(worker), &jid, expires);

        job.state = State::Running;
        job.worker = Some(worker.to_string());
        job.expires = expires;
        ops.job_put(job.clone());

        common::publish_if_tracked(ops, &jid, events::CHANNEL_POPPED);
        out.push(job);
    }
    Ok(out)
}

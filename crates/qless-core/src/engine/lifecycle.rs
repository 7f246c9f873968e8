//! `complete`, `fail`, `retry`, `heartbeat`, `cancel`.

use crate::engine::common;
use crate::engine::put;
use crate::engine::stats_support;
use crate::error::{Error, Result};
use crate::events;
use crate::job::{JobRecord, State};
use crate::keys;
use crate::options::{CompleteOptions, PutOptions};
use crate::storage::StorageOps;

fn require_running(job: &JobRecord, worker: &str, queue: &str) -> Result<()> {
    if job.state != State::Running {
        return Err(Error::JobNotRunning {
            jid: job.jid.clone(),
            state: job.state.as_str().to_string(),
        });
    }
    match &job.worker {
        Some(w) if w == worker => {}
        Some(w) => {
            return Err(Error::WorkerMismatch {
                jid: job.jid.clone(),
                expected: w.clone(),
                actual: worker.to_string(),
            })
        }
        None => {
            return Err(Error::WorkerMismatch {
                jid: job.jid.clone(),
                expected: String::new(),
                actual: worker.to_string(),
            })
        }
    }
    if job.queue != queue {
        return Err(Error::QueueMismatch {
            jid: job.jid.clone(),
            expected: job.queue.clone(),
            actual: queue.to_string(),
        });
    }
    Ok(())
}

pub fn complete(
    ops: &mut dyn StorageOps,
    now: f64,
    jid: &str,
    worker: &str,
    queue: &str,
    data: &str,
    opts: CompleteOptions,
) -> Result<String> {
    let mut job = ops.job_get(jid).ok_or_else(|| Error::JobNotFound(jid.to_string()))?;
    require_running(&job, worker, queue)?;

    common::remove_from_queue_indices(ops, queue, jid);
    common::remove_from_worker(ops, worker, jid);

    if let Some(last) = job.last_history_mut() {
        last.completed = Some(now);
        if let Some(popped) = last.popped {
            stats_support::record(ops, crate::stats::Stage::Run, now, queue, now - popped);
        }
    }
    job.data = data.to_string();
    job.worker = None;
    job.expires = 0.0;
    // Persist the completed-running state first so an inline `put`
    // (below) builds its history/fields off this job's true state
    // rather than the stale running record.
    ops.job_put(job.clone());

    let next_state = if let Some(next_queue) = &opts.next {
        let put_opts = PutOptions {
            priority: Some(job.priority),
            tags: Some(job.tags.iter().cloned().collect()),
            retries: Some(job.retries),
            depends: if opts.depends.is_empty() {
                None
            } else {
                Some(opts.depends.clone())
            },
        };
        put::put(ops, now, jid, &job.klass, &job.data, next_queue, opts.delay, put_opts)?;
        State::Waiting
    } else {
        job.state = State::Complete;
        job.queue = String::new();
        ops.job_put(job.clone());
        ops.zadd(keys::COMPLETED, jid, now);
        release_dependents(ops, now, jid);
        State::Complete
    };

    common::publish_if_tracked(ops, jid, events::CHANNEL_COMPLETED);

    Ok(next_state.as_str().to_string())
}

/// Release dependents whose only remaining dependency was `jid`.
fn release_dependents(ops: &mut dyn StorageOps, now: f64, jid: &str) {
    let Some(completed) = ops.job_get(jid) else {
        return;
    };
    for dependent_jid in completed.dependents.clone() {
        if let Some(mut dependent) = ops.job_get(&dependent_jid) {
            dependent.dependencies.remove(jid);
            if dependent.dependencies.is_empty() && dependent.state == State::Depends {
                let queue = dependent.queue.clone();
                common::release_into_work(ops, now, &queue, &mut dependent);
            } else {
                ops.job_put(dependent);
            }
        }
    }
}

pub fn fail(
    ops: &mut dyn StorageOps,
    now: f64,
    jid: &str,
    worker: &str,
    group: &str,
    message: &str,
    data: Option<&str>,
) -> Result<()> {
    let mut job = ops.job_get(jid).ok_or_else(|| Error::JobNotFound(jid.to_string()))?;
    if job.state != State::Running {
        return Err(Error::JobNotRunning {
            jid: jid.to_string(),
            state: job.state.as_str().to_string(),
        });
    }
    match &job.worker {
        Some(w) if w == worker => {}
        _ => {
            return Err(Error::WorkerMismatch {
                jid: jid.to_string(),
                expected: job.worker.clone().unwrap_or_default(),
                actual: worker.to_string(),
            })
        }
    }

    let queue = job.queue.clone();
    common::remove_from_queue_indices(ops, &queue, jid);
    common::remove_from_worker(ops, worker, jid);
    common::fail_job(ops, now, &mut job, worker, group, message, data);
    Ok(())
}

/// `retry`: decrements `remaining`; exhaustion behaves
/// like `fail` with group `failed-retries-<queue>`. Returns `true` if
/// the job is still alive (waiting/scheduled), `false` if it failed.
pub fn retry(
    ops: &mut dyn StorageOps,
    now: f64,
    jid: &str,
    queue: &str,
    worker: &str,
    delay: f64,
) -> Result<bool> {
    let mut job = ops.job_get(jid).ok_or_else(|| Error::JobNotFound(jid.to_string()))?;
    require_running(&job, worker, queue)?;

    common::remove_from_queue_indices(ops, queue, jid);
    common::remove_from_worker(ops, worker, jid);

    job.remaining -= 1;
    job.worker = None;
    job.expires = 0.0;

    if job.remaining < 0 {
        let group = keys::retries_group(queue);
        common::fail_job(ops, now, &mut job, worker, &group, "job retries exhausted", None);
        return Ok(false);
    }

    if delay > 0.0 {
        job.state = State::Scheduled;
        ops.zadd(&keys::scheduled(queue), jid, now + delay);
    } else {
        job.state = State::Waiting;
        let score = JobRecord::work_score(job.priority, now);
        ops.zadd(&keys::work(queue), jid, score);
    }
    ops.job_put(job);
    common::publish_if_tracked(ops, jid, events::CHANNEL_STALLED);
    Ok(true)
}

pub fn heartbeat(
    ops: &mut dyn StorageOps,
    now: f64,
    jid: &str,
    worker: &str,
    data: Option<&str>,
) -> Result<f64> {
    let mut job = ops.job_get(jid).ok_or_else(|| Error::JobNotFound(jid.to_string()))?;
    if job.state != State::Running {
        return Err(Error::JobNotRunning {
            jid: jid.to_string(),
            state: job.state.as_str().to_string(),
        });
    }
    match &job.worker {
        Some(w) if w == worker => {}
        _ => {
            return Err(Error::WorkerMismatch {
                jid: jid.to_string(),
                expected: job.worker.clone().unwrap_or_default(),
                actual: worker.to_string(),
            })
        }
    }

    let heartbeat_secs = ops.config().heartbeat_seconds(Some(&job.queue));
    let expires = now + heartbeat_secs;
    job.expires = expires;
    if let Some(d) = data {
        job.data = d.to_string();
    }
    ops.zadd(&keys::locks(&job.queue), jid, expires);
    ops.zadd(&keys::worker_jobs(worker), jid, expires);
    ops.job_put(job);
    Ok(expires)
}

/// `cancel`: rejected if running, or if any dependent is
/// not already complete.
pub fn cancel(ops: &mut dyn StorageOps, _now: f64, jids: &[String]) -> Result<Vec<String>> {
    for jid in jids {
        let job = ops.job_get(jid).ok_or_else(|| Error::JobNotFound(jid.clone()))?;
        if job.state == State::Running {
            return Err(Error::InvalidTransition {
                jid: jid.clone(),
                reason: "cannot cancel a running job".into(),
            });
        }
        for dep in &job.dependents {
            if let Some(dep_job) = ops.job_get(dep) {
                if dep_job.state != State::Complete {
                    return Err(Error::InvalidTransition {
                        jid: jid.clone(),
                        reason: format!("job has an incomplete dependent `{dep}`"),
                    });
                }
            }
        }
    }

    for jid in jids {
        let Some(job) = ops.job_get(jid) else { continue };
        if !job.queue.is_empty() {
            common::remove_from_queue_indices(ops, &job.queue, jid);
        }
        if let Some(worker) = &job.worker {
            common::remove_from_worker(ops, worker, jid);
        }
        common::unindex_tags(ops, jid, &job.tags.iter().cloned().collect::<Vec<_>>());
        ops.zrem(keys::TRACKED, jid);
        ops.zrem(keys::COMPLETED, jid);
        if let Some(failure) = &job.failure {
            let key = keys::failed_group(&failure.group);
            let len = ops.llen(&key);
            let all = ops.lpop_tail(&key, len);
            for entry in all {
                if entry != *jid {
                    ops.lpush(&key, entry);
                }
            }
            if ops.llen(&key) == 0 {
                ops.ldel(&key);
                ops.srem(keys::FAILURES, &failure.group);
            }
        }
        // Release this jid from any dependency it still held over others.
        for dep in &job.dependencies {
            if let Some(mut dep_job) = ops.job_get(dep) {
                dep_job.dependents.remove(jid);
                ops.job_put(dep_job);
            }
        }
        // Drop the edge on the other side without transitioning the
        // dependent.
        for dependent_jid in &job.dependents {
            if let Some(mut dependent) = ops.job_get(dependent_jid) {
                dependent.dependencies.remove(jid);
                if dependent.dependencies.is_empty() && dependent.state == State::Depends {
                    let queue = dependent.queue.clone();
                    common::release_into_work(ops, _now, &queue, &mut dependent);
                } else {
                    ops.job_put(dependent);
                }
            }
        }
        ops.job_del(jid);
        ops.publish(events::CHANNEL_CANCELED, events::jid_message(jid));
    }

    Ok(jids.to_vec())
}

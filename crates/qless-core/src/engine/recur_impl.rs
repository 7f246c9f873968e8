//! The recurring scheduler plus the `recur`/`unrecur` family of
//! commands.

use smallvec::SmallVec;

use crate::engine::common;
use crate::error::{Error, Result};
use crate::job::{HistoryEntry, JobRecord, State};
use crate::keys;
use crate::options::RecurOptions;
use crate::recur::{RecurringJob, ScheduleKind};
use crate::storage::StorageOps;

pub fn recur(
    ops: &mut dyn StorageOps,
    now: f64,
    jid: &str,
    klass: &str,
    data: &str,
    queue: &str,
    spec: &str,
    interval: f64,
    offset: f64,
    opts: RecurOptions,
) -> Result<String> {
    let kind = ScheduleKind::parse(spec).ok_or_else(|| Error::UnknownSchedule(spec.to_string()))?;
    if interval <= 0.0 {
        return Err(Error::RecurInvalidInterval {
            jid: jid.to_string(),
            interval,
        });
    }

    let existing = ops.recur_get(jid);
    let priority = opts.priority.or(existing.as_ref().map(|r| r.priority)).unwrap_or(0);
    let retries = opts
        .retries
        .or(existing.as_ref().map(|r| r.retries))
        .unwrap_or(crate::job::DEFAULT_RETRIES);
    let tags: SmallVec<[String; 4]> = opts
        .tags
        .map(SmallVec::from_vec)
        .or(existing.map(|r| r.tags))
        .unwrap_or_default();

    let rec = RecurringJob {
        jid: jid.to_string(),
        klass: klass.to_string(),
        data: data.to_string(),
        priority,
        tags,
        queue: queue.to_string(),
        kind,
        interval,
        count: 0,
        retries,
    };
    ops.recur_put(rec);
    ops.zadd(&keys::recur(queue), jid, now + offset);
    common::ensure_queue_known(ops, now, queue);
    Ok(jid.to_string())
}

pub fn unrecur(ops: &mut dyn StorageOps, jid: &str) -> Result<()> {
    let rec = ops.recur_get(jid).ok_or_else(|| Error::JobNotFound(jid.to_string()))?;
    ops.zrem(&keys::recur(&rec.queue), jid);
    ops.recur_del(jid);
    Ok(())
}

pub fn recur_update(
    ops: &mut dyn StorageOps,
    jid: &str,
    priority: Option<i64>,
    interval: Option<f64>,
    retries: Option<i64>,
    data: Option<String>,
) -> Result<()> {
    let mut rec = ops.recur_get(jid).ok_or_else(|| Error::JobNotFound(jid.to_string()))?;
    if let Some(p) = priority {
        rec.priority = p;
    }
    if let Some(i) = interval {
        if i <= 0.0 {
            return Err(Error::RecurInvalidInterval {
                jid: jid.to_string(),
                interval: i,
            });
        }
        rec.interval = i;
    }
    if let Some(r) = retries {
        rec.retries = r;
    }
    if let Some(d) = data {
        rec.data = d;
    }
    ops.recur_put(rec);
    Ok(())
}

pub fn recur_tag(
    ops: &mut dyn StorageOps,
    jid: &str,
    tags: &[String],
    add: bool,
) -> Result<Vec<String>> {
    let mut rec = ops.recur_get(jid).ok_or_else(|| Error::JobNotFound(jid.to_string()))?;
    if add {
        for t in tags {
            if !rec.tags.contains(t) {
                rec.tags.push(t.clone());
            }
        }
    } else {
        rec.tags.retain(|t| !tags.contains(t));
    }
    let out = rec.tags.iter().cloned().collect();
    ops.recur_put(rec);
    Ok(out)
}

/// Spawn concrete instances from due recurring templates, bounded by
/// `need`. Returns the jids spawned, in spawn order,
/// ready to be picked up by the work-selection step of `peek`/`pop`.
pub fn update_recurring_jobs(
    ops: &mut dyn StorageOps,
    now: f64,
    queue: &str,
    need: usize,
) -> Vec<String> {
    if need == 0 {
        return Vec::new();
    }
    let due = ops.zrange_by_score(&keys::recur(queue), now, need);
    let mut spawned = Vec::new();
    let mut moved = 0usize;

    for entry in due {
        let jid = entry.member;
        loop {
            if moved >= need {
                return spawned;
            }
            let Some(score) = ops.zscore(&keys::recur(queue), &jid) else {
                break;
            };
            if score > now {
                break;
            }
            let Some(mut rec) = ops.recur_get(&jid) else {
                break;
            };
            rec.count += 1;
            let spawn_jid = format!("{}-{}", jid, rec.count);
            let interval = rec.interval;
            let spawn = JobRecord {
                jid: spawn_jid.clone(),
                klass: rec.klass.clone(),
                data: rec.data.clone(),
                priority: rec.priority,
                tags: rec.tags.clone(),
                state: State::Waiting,
                queue: queue.to_string(),
                worker: None,
                expires: 0.0,
                retries: rec.retries,
                remaining: rec.retries,
                history: vec![HistoryEntry::new(queue.to_string(), score)],
                failure: None,
                dependencies: Default::default(),
                dependents: Default::default(),
            };
            for t in &rec.tags {
                ops.zadd(&keys::tag(t), &spawn_jid, score);
                let freq = ops.zscore(keys::TAGS, t).unwrap_or(0.0);
                ops.zadd(keys::TAGS, t, freq + 1.0);
            }
            let work_score = JobRecord::work_score(rec.priority, score);
            ops.zadd(&keys::work(queue), &spawn_jid, work_score);
            ops.job_put(spawn);
            ops.recur_put(rec);
            ops.zadd(&keys::recur(queue), &jid, score + interval);

            spawned.push(spawn_jid);
            moved += 1;
        }
    }
    spawned
}

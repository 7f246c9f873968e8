//! `depends` command: `on`/`off`/`all`.

use crate::engine::common;
use crate::error::{Error, Result};
use crate::job::State;
use crate::options::DependsAction;
use crate::storage::StorageOps;

pub fn depends(
    ops: &mut dyn StorageOps,
    now: f64,
    jid: &str,
    action: DependsAction,
    jids: &[String],
) -> Result<Vec<String>> {
    let mut job = ops.job_get(jid).ok_or_else(|| Error::JobNotFound(jid.to_string()))?;

    match action {
        DependsAction::All => {
            return Ok(job.dependencies.iter().cloned().collect());
        }
        DependsAction::On => {
            if !matches!(job.state, State::Depends | State::Waiting | State::Scheduled) {
                return Err(Error::InvalidTransition {
                    jid: jid.to_string(),
                    reason: format!(
                        "cannot add dependencies while job is `{}`",
                        job.state.as_str()
                    ),
                });
            }
            for dep in jids {
                if let Some(mut dep_job) = ops.job_get(dep) {
                    if dep_job.state != State::Complete {
                        dep_job.dependents.insert(jid.to_string());
                        ops.job_put(dep_job);
                        job.dependencies.insert(dep.clone());
                    }
                }
            }
            if !job.dependencies.is_empty() && job.state != State::Depends {
                if job.state == State::Waiting {
                    ops.zrem(&crate::keys::work(&job.queue), jid);
                }
                job.state = State::Depends;
                ops.zadd(&crate::keys::depends(&job.queue), jid, now);
            }
            ops.job_put(job.clone());
        }
        DependsAction::Off => {
            if !matches!(job.state, State::Depends | State::Waiting | State::Scheduled) {
                return Err(Error::InvalidTransition {
                    jid: jid.to_string(),
                    reason: format!(
                        "cannot remove dependencies while job is `{}`",
                        job.state.as_str()
                    ),
                });
            }
            for dep in jids {
                job.dependencies.remove(dep);
                if let Some(mut dep_job) = ops.job_get(dep) {
                    dep_job.dependents.remove(jid);
                    ops.job_put(dep_job);
                }
            }
            if job.dependencies.is_empty() && job.state == State::Depends {
                let queue = job.queue.clone();
                common::release_into_work(ops, now, &queue, &mut job);
            } else {
                ops.job_put(job.clone());
            }
        }
    }

    Ok(job.dependencies.iter().cloned().collect())
}

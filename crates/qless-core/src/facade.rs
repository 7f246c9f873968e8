//! Thin dispatch from a `(command_name, now, args)` triple onto a
//! `QueueEngine` method. This is the mapping layer itself, not the
//! request transport around it (wire codec, socket handling) — those
//! stay external to this crate.

use serde_json::Value;

use crate::error::{Error, Result};
use crate::job::JobRecord;
use crate::options::{CompleteOptions, DependsAction, PutOptions, RecurOptions, TagAction, TrackAction};
use crate::engine::QueueEngine;
use crate::recur::RecurringJob;
use crate::storage::Storage;

/// The full command registry. Unknown names are rejected by `dispatch`
/// before any argument parsing happens.
pub const COMMANDS: &[&str] = &[
    "get",
    "config.get",
    "config.set",
    "config.unset",
    "queues",
    "complete",
    "failed",
    "fail",
    "jobs",
    "retry",
    "depends",
    "heartbeat",
    "workers",
    "track",
    "tag",
    "stats",
    "priority",
    "peek",
    "pop",
    "pause",
    "unpause",
    "cancel",
    "put",
    "unfail",
    "recur",
    "unrecur",
    "recur.get",
    "recur.update",
    "recur.tag",
    "recur.untag",
    "length",
];

/// Parses `now` per the facade's own contract: present and numeric, or
/// `Error::InvalidNow`.
pub fn parse_now(now: &Value) -> Result<f64> {
    now.as_f64().ok_or_else(|| Error::InvalidNow(now.to_string()))
}

struct Args<'a>(&'a Value);

impl<'a> Args<'a> {
    fn field(&self, key: &str) -> Option<&'a Value> {
        self.0.get(key)
    }

    fn required(&self, key: &str) -> Result<&'a Value> {
        self.field(key).ok_or_else(|| Error::InvalidArguments {
            argument: key.to_string(),
            reason: "missing".to_string(),
        })
    }

    fn string(&self, key: &str) -> Result<String> {
        self.required(key)?
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| Error::InvalidArguments {
                argument: key.to_string(),
                reason: "expected a string".to_string(),
            })
    }

    fn opt_string(&self, key: &str) -> Option<String> {
        self.field(key).and_then(Value::as_str).map(str::to_string)
    }

    fn i64(&self, key: &str) -> Result<i64> {
        self.required(key)?
            .as_i64()
            .ok_or_else(|| Error::InvalidArguments {
                argument: key.to_string(),
                reason: "expected an integer".to_string(),
            })
    }

    fn opt_i64(&self, key: &str) -> Option<i64> {
        self.field(key).and_then(Value::as_i64)
    }

    fn f64(&self, key: &str) -> Result<f64> {
        self.required(key)?
            .as_f64()
            .ok_or_else(|| Error::InvalidArguments {
                argument: key.to_string(),
                reason: "expected a number".to_string(),
            })
    }

    fn opt_f64(&self, key: &str, default: f64) -> f64 {
        self.field(key).and_then(Value::as_f64).unwrap_or(default)
    }

    fn usize(&self, key: &str, default: usize) -> usize {
        self.field(key)
            .and_then(Value::as_u64)
            .map(|n| n as usize)
            .unwrap_or(default)
    }

    fn string_vec(&self, key: &str) -> Vec<String> {
        self.field(key)
            .and_then(Value::as_array)
            .map(|arr| arr.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
            .unwrap_or_default()
    }

    fn opt_string_vec(&self, key: &str) -> Option<Vec<String>> {
        self.field(key)
            .and_then(Value::as_array)
            .map(|arr| arr.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
    }
}

fn put_options(args: &Args) -> PutOptions {
    PutOptions {
        priority: args.opt_i64("priority"),
        tags: args.opt_string_vec("tags"),
        retries: args.opt_i64("retries"),
        depends: args.opt_string_vec("depends"),
    }
}

fn depends_action(args: &Args) -> Result<DependsAction> {
    match args.string("action")?.as_str() {
        "on" => Ok(DependsAction::On),
        "off" => Ok(DependsAction::Off),
        "all" => Ok(DependsAction::All),
        other => Err(Error::InvalidArguments {
            argument: "action".to_string(),
            reason: format!("must be `on`, `off` or `all`, got `{other}`"),
        }),
    }
}

fn tag_action(args: &Args) -> Result<TagAction> {
    match args.string("action")?.as_str() {
        "add" => Ok(TagAction::Add),
        "remove" => Ok(TagAction::Remove),
        "get" => Ok(TagAction::Get),
        "top" => Ok(TagAction::Top),
        other => Err(Error::InvalidArguments {
            argument: "action".to_string(),
            reason: format!("must be `add`, `remove`, `get` or `top`, got `{other}`"),
        }),
    }
}

fn track_action(args: &Args) -> Result<TrackAction> {
    match args.opt_string("action").as_deref() {
        Some("track") => Ok(TrackAction::Track),
        Some("untrack") => Ok(TrackAction::Untrack),
        None => Ok(TrackAction::Peek),
        Some(other) => Err(Error::InvalidArguments {
            argument: "action".to_string(),
            reason: format!("must be `track` or `untrack` if present, got `{other}`"),
        }),
    }
}

fn job_to_json(job: &JobRecord) -> Value {
    serde_json::to_value(job).unwrap_or(Value::Null)
}

fn recurring_to_json(rec: &RecurringJob) -> Value {
    serde_json::to_value(rec).unwrap_or(Value::Null)
}

/// Dispatches one command. `now` and `args` are exactly what arrived
/// over the (out-of-scope) transport: a raw JSON number and a JSON
/// object of named arguments.
pub async fn dispatch<S>(engine: &QueueEngine<S>, command: &str, now: &Value, args: &Value) -> Result<Value>
where
    S: Storage + Clone + Send + Sync + 'static,
{
    let now = parse_now(now)?;
    let a = Args(args);

    match command {
        "get" => {
            let jid = a.string("jid")?;
            Ok(engine.get(&jid).await?.as_ref().map(job_to_json).unwrap_or(Value::Null))
        }
        "config.get" => engine.config_get(a.opt_string("key")).await,
        "config.set" => {
            engine.config_set(a.string("key")?, a.string("value")?).await?;
            Ok(Value::Bool(true))
        }
        "config.unset" => {
            engine.config_unset(a.string("key")?).await?;
            Ok(Value::Bool(true))
        }
        "queues" => engine.queues().await,
        "complete" => {
            let opts = CompleteOptions {
                next: a.opt_string("next"),
                delay: a.opt_f64("delay", 0.0),
                depends: a.string_vec("depends"),
            };
            let state = engine
                .complete(now, a.string("jid")?, a.string("worker")?, a.string("queue")?, a.string("data")?, opts)
                .await?;
            Ok(Value::String(state))
        }
        "failed" => engine.failed(a.opt_string("group"), a.usize("offset", 0), a.usize("count", 25)).await,
        "fail" => {
            engine
                .fail(now, a.string("jid")?, a.string("worker")?, a.string("group")?, a.string("message")?, a.opt_string("data"))
                .await?;
            Ok(Value::Bool(true))
        }
        "jobs" => Ok(serde_json::to_value(engine.jobs(a.string("queue")?, a.string("state")?).await?).unwrap()),
        "retry" => {
            let alive = engine
                .retry(now, a.string("jid")?, a.string("queue")?, a.string("worker")?, a.opt_f64("delay", 0.0))
                .await?;
            Ok(Value::Bool(alive))
        }
        "depends" => {
            let out = engine
                .depends(now, a.string("jid")?, depends_action(&a)?, a.string_vec("jids"))
                .await?;
            Ok(serde_json::to_value(out).unwrap())
        }
        "heartbeat" => {
            let expires = engine.heartbeat(now, a.string("jid")?, a.string("worker")?, a.opt_string("data")).await?;
            Ok(Value::from(expires))
        }
        "workers" => engine.workers(a.opt_string("worker")).await,
        "track" => engine.track(now, track_action(&a)?, a.opt_string("jid")).await,
        "tag" => engine.tag(now, tag_action(&a)?, a.opt_string("jid"), a.string_vec("tags")).await,
        "stats" => engine.stats(a.string("queue")?, a.i64("day_bin")?).await,
        "priority" => {
            engine.priority(a.string("jid")?, a.i64("priority")?).await?;
            Ok(Value::Bool(true))
        }
        "peek" => {
            let jobs = engine.peek(now, a.string("queue")?, a.usize("count", 1)).await?;
            Ok(Value::Array(jobs.iter().map(job_to_json).collect()))
        }
        "pop" => {
            let jobs = engine.pop(now, a.string("queue")?, a.string("worker")?, a.usize("count", 1)).await?;
            Ok(Value::Array(jobs.iter().map(job_to_json).collect()))
        }
        "pause" => {
            engine.pause(a.string_vec("queues")).await?;
            Ok(Value::Bool(true))
        }
        "unpause" => {
            engine.unpause(a.string_vec("queues")).await?;
            Ok(Value::Bool(true))
        }
        "cancel" => Ok(serde_json::to_value(engine.cancel(now, a.string_vec("jids")).await?).unwrap()),
        "put" => {
            let jid = engine
                .put(
                    now,
                    a.string("jid")?,
                    a.string("klass")?,
                    a.string("data")?,
                    a.string("queue")?,
                    a.opt_f64("delay", 0.0),
                    put_options(&a),
                )
                .await?;
            Ok(Value::String(jid))
        }
        "unfail" => {
            let moved = engine
                .unfail(now, a.string("group")?, a.string("queue")?, a.usize("count", 25))
                .await?;
            Ok(Value::from(moved))
        }
        "recur" => {
            let opts = RecurOptions {
                tags: a.opt_string_vec("tags"),
                priority: a.opt_i64("priority"),
                retries: a.opt_i64("retries"),
            };
            let jid = engine
                .recur(
                    now,
                    a.string("jid")?,
                    a.string("klass")?,
                    a.string("data")?,
                    a.string("queue")?,
                    a.opt_string("spec").unwrap_or_else(|| "interval".to_string()),
                    a.f64("interval")?,
                    a.opt_f64("offset", 0.0),
                    opts,
                )
                .await?;
            Ok(Value::String(jid))
        }
        "unrecur" => {
            engine.unrecur(a.string("jid")?).await?;
            Ok(Value::Bool(true))
        }
        "recur.get" => Ok(engine.recur_get(a.string("jid")?).await?.as_ref().map(recurring_to_json).unwrap_or(Value::Null)),
        "recur.update" => {
            engine
                .recur_update(a.string("jid")?, a.opt_i64("priority"), a.field("interval").and_then(Value::as_f64), a.opt_i64("retries"), a.opt_string("data"))
                .await?;
            Ok(Value::Bool(true))
        }
        "recur.tag" => Ok(serde_json::to_value(engine.recur_tag(a.string("jid")?, a.string_vec("tags")).await?).unwrap()),
        "recur.untag" => Ok(serde_json::to_value(engine.recur_untag(a.string("jid")?, a.string_vec("tags")).await?).unwrap()),
        "length" => Ok(Value::from(engine.length(a.string("queue")?).await?)),
        other => Err(Error::UnknownCommand(other.to_string())),
    }
}

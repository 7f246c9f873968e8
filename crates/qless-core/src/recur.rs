//! Recurring job templates: the standing definition a `recur` command
//! creates, which the recurring scheduler instantiates into concrete
//! jobs on an interval.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// Only `interval` scheduling is defined; anything else is rejected
/// with `Error::UnknownSchedule`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScheduleKind {
    Interval,
}

impl ScheduleKind {
    pub fn parse(spec: &str) -> Option<Self> {
        match spec {
            "interval" => Some(Self::Interval),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ScheduleKind::Interval => "interval",
        }
    }
}

/// A recurring template. Spawned instances get jids `<jid>-<count>`
/// and live on as ordinary `JobRecord`s once created; cancelling the
/// template only stops future instantiation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecurringJob {
    pub jid: String,
    pub klass: String,
    pub data: String,
    pub priority: i64,
    pub tags: SmallVec<[String; 4]>,
    pub queue: String,
    pub kind: ScheduleKind,
    pub interval: f64,
    /// Monotonic spawn counter; next instance is `<jid>-<count+1>`.
    pub count: i64,
    pub retries: i64,
}

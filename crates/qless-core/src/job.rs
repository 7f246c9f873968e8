//! The job record and its state machine.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// States a job record can occupy. `Recur` templates are a distinct
/// record type (`RecurringJob`, see `crate::recur`) and are not a
/// `State` variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum State {
    Waiting,
    Scheduled,
    Depends,
    Running,
    Complete,
    Failed,
}

impl State {
    pub fn as_str(&self) -> &'static str {
        match self {
            State::Waiting => "waiting",
            State::Scheduled => "scheduled",
            State::Depends => "depends",
            State::Running => "running",
            State::Complete => "complete",
            State::Failed => "failed",
        }
    }
}

/// One entry of a job's lifecycle history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub q: String,
    pub put: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub popped: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub worker: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed: Option<f64>,
}

impl HistoryEntry {
    pub fn new(queue: impl Into<String>, put: f64) -> Self {
        Self {
            q: queue.into(),
            put,
            popped: None,
            worker: None,
            failed: None,
            completed: None,
        }
    }
}

/// Last-failure record, present when `state == Failed`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureRecord {
    pub group: String,
    pub message: String,
    pub when: f64,
    pub worker: String,
}

pub const DEFAULT_RETRIES: i64 = 5;

/// A job: identified by an opaque `jid`, carrying an opaque `klass`
/// and `data` the core never interprets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRecord {
    pub jid: String,
    pub klass: String,
    pub data: String,
    pub priority: i64,
    pub tags: SmallVec<[String; 4]>,
    pub state: State,
    /// Current queue, or empty when the job has no queue affiliation
    /// (e.g. freshly completed with no `next`).
    pub queue: String,
    pub worker: Option<String>,
    /// Lease deadline, or 0 when not currently leased.
    pub expires: f64,
    pub retries: i64,
    pub remaining: i64,
    pub history: Vec<HistoryEntry>,
    pub failure: Option<FailureRecord>,
    pub dependencies: BTreeSet<String>,
    pub dependents: BTreeSet<String>,
}

impl JobRecord {
    /// The score a waiting job sorts by in a `work` index: higher
    /// priority sorts first, FIFO within a priority. Any caller
    /// recomputing a score (e.g. after a priority change) must use
    /// this exact formula or ordering silently drifts.
    pub fn work_score(priority: i64, t: f64) -> f64 {
        priority as f64 - (t / 1e10)
    }

    pub fn last_history_mut(&mut self) -> Option<&mut HistoryEntry> {
        self.history.last_mut()
    }
}

//! Typed access to hashes, sorted sets, lists, sets and a publish
//! channel. Every `QueueEngine` operation executes as one call to
//! `Storage::transaction`: the closure sees a single exclusive
//! `&mut dyn StorageOps` and either all of its writes land or none do,
//! so a networked backend can implement this as one script or
//! transaction and callers never observe a partial mutation.
//!
//! Job and recurring records are typed accessors rather than raw hash
//! fields. The remaining keyspaces (work/locks/scheduled/recur/depends
//! indices, tag index, worker registry, failure lists, stats, config,
//! paused set) mirror a normative key layout directly, since a real
//! backend needs exactly that shape to interoperate with other client
//! libraries.

use async_trait::async_trait;
use thiserror::Error;

use crate::config::Config;
use crate::job::JobRecord;
use crate::recur::RecurringJob;
use crate::stats::{DayCounters, Stage, StageStats};

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage backend error: {0}")]
    Backend(String),
}

pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// A member of a sorted set together with its score.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredMember {
    pub member: String,
    pub score: f64,
}

/// Synchronous operations available while holding the single-writer
/// lock. Object-safe so `Storage::transaction` can hand out
/// `&mut dyn StorageOps` without generic method parameters.
pub trait StorageOps {
    // -- job / recurring records (typed) --
    fn job_get(&self, jid: &str) -> Option<JobRecord>;
    fn job_put(&mut self, job: JobRecord);
    fn job_del(&mut self, jid: &str);

    fn recur_get(&self, jid: &str) -> Option<RecurringJob>;
    fn recur_put(&mut self, rec: RecurringJob);
    fn recur_del(&mut self, jid: &str);

    // -- config hash (ql:config) --
    fn config(&self) -> Config;
    fn config_set(&mut self, key: &str, value: &str);
    fn config_unset(&mut self, key: &str);

    // -- per-day statistics (ql:s:wait:<bin>:<queue>, ql:s:run:..., ql:s:stats:...) --
    fn stats_get(&self, stage: Stage, day_bin: i64, queue: &str) -> StageStats;
    fn stats_put(&mut self, stage: Stage, day_bin: i64, queue: &str, stats: StageStats);
    fn day_counters_get(&self, day_bin: i64, queue: &str) -> DayCounters;
    fn day_counters_put(&mut self, day_bin: i64, queue: &str, counters: DayCounters);

    // -- sorted sets: queue indices, ql:queues, ql:tracked, ql:completed,
    //    ql:workers, ql:w:<worker>:jobs, ql:t:<tag>, ql:tags --
    fn zadd(&mut self, key: &str, member: &str, score: f64);
    fn zrem(&mut self, key: &str, member: &str) -> bool;
    fn zscore(&self, key: &str, member: &str) -> Option<f64>;
    fn zincrby(&mut self, key: &str, member: &str, delta: f64) -> f64;
    fn zcard(&self, key: &str) -> usize;
    /// Ascending by score, `score <= max_score`, at most `limit` entries.
    fn zrange_by_score(&self, key: &str, max_score: f64, limit: usize) -> Vec<ScoredMember>;
    /// Descending by score, at most `limit` entries (0 = unlimited).
    fn zrevrange(&self, key: &str, limit: usize) -> Vec<ScoredMember>;

    // -- plain sets: ql:failures, ql:paused_queues --
    fn sadd(&mut self, key: &str, member: &str) -> bool;
    fn srem(&mut self, key: &str, member: &str) -> bool;
    fn sismember(&self, key: &str, member: &str) -> bool;
    fn smembers(&self, key: &str) -> Vec<String>;

    // -- lists: ql:f:<group> (head = most recently failed) --
    fn lpush(&mut self, key: &str, value: String);
    fn llen(&self, key: &str) -> usize;
    /// Read-only window starting `offset` entries from the head
    /// (most recent first), at most `count` entries.
    fn lrange(&self, key: &str, offset: usize, count: usize) -> Vec<String>;
    /// Remove up to `n` entries from the tail (oldest first) and
    /// return them oldest-first.
    fn lpop_tail(&mut self, key: &str, n: usize) -> Vec<String>;
    fn ldel(&mut self, key: &str);

    // -- pub/sub --
    fn publish(&mut self, channel: &str, message: String);
}

/// The storage handle the engine is constructed with. `transaction`
/// is the single async boundary: acquiring the writer lock (or, for a
/// networked backend, opening a script/transaction) is the only
/// suspend point; everything inside the closure is synchronous and
/// deterministic, so the closure's result either fully lands or the
/// whole operation never touched the store.
#[async_trait]
pub trait Storage: Send + Sync {
    async fn transaction<F, T>(&self, f: F) -> StorageResult<T>
    where
        F: FnOnce(&mut dyn StorageOps) -> T + Send + 'static,
        T: Send + 'static;
}

//! An in-memory `qless_core::storage::Storage` backend: a `DashMap`
//! per record kind plus a generic keyed slot map for the zset/set/list
//! indices, with a `tokio::sync::Mutex<()>` held for the duration of
//! each `transaction` call as the single-writer token. `DashMap`
//! already makes per-key access safe across tasks; the mutex is what
//! turns a *sequence* of such accesses into one atomic operation, the
//! same guarantee a scripted command gets against a real store.

mod keyspace;

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::{broadcast, Mutex};

use qless_core::config::Config;
use qless_core::job::JobRecord;
use qless_core::recur::RecurringJob;
use qless_core::stats::{DayCounters, Stage, StageStats};
use qless_core::storage::{ScoredMember, Storage, StorageError, StorageOps, StorageResult};

use keyspace::{Slot, ZSet};

/// Capacity of the broadcast channel backing `publish`. Sized so a
/// burst from one transaction never blocks the writer; a lagging
/// subscriber drops the oldest messages rather than stalling storage,
/// matching the "publish is best-effort" guarantee at the core.
const EVENT_CHANNEL_CAPACITY: usize = 1024;

#[derive(Debug, Clone)]
pub struct MemoryStorage {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    writer: Mutex<()>,
    jobs: DashMap<String, JobRecord>,
    recur: DashMap<String, RecurringJob>,
    config: DashMap<String, String>,
    stats: DashMap<(Stage, i64, String), StageStats>,
    day_counters: DashMap<(i64, String), DayCounters>,
    keyspace: DashMap<String, Slot>,
    events: broadcast::Sender<(String, String)>,
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStorage {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            inner: Arc::new(Inner {
                writer: Mutex::new(()),
                jobs: DashMap::new(),
                recur: DashMap::new(),
                config: DashMap::new(),
                stats: DashMap::new(),
                day_counters: DashMap::new(),
                keyspace: DashMap::new(),
                events,
            }),
        }
    }

    /// Subscribe to every message ever published via `StorageOps::publish`,
    /// tagged with its channel name. Intended for tests and demo workers;
    /// a real deployment would fan this out over a network pub/sub.
    pub fn subscribe(&self) -> broadcast::Receiver<(String, String)> {
        self.inner.events.subscribe()
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn transaction<F, T>(&self, f: F) -> StorageResult<T>
    where
        F: FnOnce(&mut dyn StorageOps) -> T + Send + 'static,
        T: Send + 'static,
    {
        let inner = self.inner.clone();
        let _permit = inner.writer.lock().await;
        let mut ops = Ops { inner: &inner };
        Ok(f(&mut ops))
    }
}

struct Ops<'a> {
    inner: &'a Inner,
}

impl<'a> Ops<'a> {
    fn with_zset<R>(&self, key: &str, default: R, f: impl FnOnce(&ZSet) -> R) -> R {
        match self.inner.keyspace.get(key) {
            Some(slot) => match slot.value() {
                Slot::ZSet(z) => f(z),
                _ => default,
            },
            None => default,
        }
    }

    fn zset_mut(&self, key: &str) -> dashmap::mapref::one::RefMut<'_, String, Slot> {
        self.inner
            .keyspace
            .entry(key.to_string())
            .or_insert_with(|| Slot::ZSet(ZSet::default()))
    }

    fn set_mut(&self, key: &str) -> dashmap::mapref::one::RefMut<'_, String, Slot> {
        self.inner
            .keyspace
            .entry(key.to_string())
            .or_insert_with(|| Slot::Set(Default::default()))
    }

    fn list_mut(&self, key: &str) -> dashmap::mapref::one::RefMut<'_, String, Slot> {
        self.inner
            .keyspace
            .entry(key.to_string())
            .or_insert_with(|| Slot::List(Default::default()))
    }
}

impl<'a> StorageOps for Ops<'a> {
    fn job_get(&self, jid: &str) -> Option<JobRecord> {
        self.inner.jobs.get(jid).map(|r| r.value().clone())
    }

    fn job_put(&mut self, job: JobRecord) {
        self.inner.jobs.insert(job.jid.clone(), job);
    }

    fn job_del(&mut self, jid: &str) {
        self.inner.jobs.remove(jid);
    }

    fn recur_get(&self, jid: &str) -> Option<RecurringJob> {
        self.inner.recur.get(jid).map(|r| r.value().clone())
    }

    fn recur_put(&mut self, rec: RecurringJob) {
        self.inner.recur.insert(rec.jid.clone(), rec);
    }

    fn recur_del(&mut self, jid: &str) {
        self.inner.recur.remove(jid);
    }

    fn config(&self) -> Config {
        let mut cfg = Config::new();
        for entry in self.inner.config.iter() {
            cfg.set(entry.key().clone(), entry.value().clone());
        }
        cfg
    }

    fn config_set(&mut self, key: &str, value: &str) {
        self.inner.config.insert(key.to_string(), value.to_string());
    }

    fn config_unset(&mut self, key: &str) {
        self.inner.config.remove(key);
    }

    fn stats_get(&self, stage: Stage, day_bin: i64, queue: &str) -> StageStats {
        self.inner
            .stats
            .get(&(stage, day_bin, queue.to_string()))
            .map(|r| r.value().clone())
            .unwrap_or_default()
    }

    fn stats_put(&mut self, stage: Stage, day_bin: i64, queue: &str, stats: StageStats) {
        self.inner
            .stats
            .insert((stage, day_bin, queue.to_string()), stats);
    }

    fn day_counters_get(&self, day_bin: i64, queue: &str) -> DayCounters {
        self.inner
            .day_counters
            .get(&(day_bin, queue.to_string()))
            .map(|r| *r.value())
            .unwrap_or_default()
    }

    fn day_counters_put(&mut self, day_bin: i64, queue: &str, counters: DayCounters) {
        self.inner
            .day_counters
            .insert((day_bin, queue.to_string()), counters);
    }

    fn zadd(&mut self, key: &str, member: &str, score: f64) {
        if let Slot::ZSet(z) = self.zset_mut(key).value_mut() {
            z.insert(member, score);
        }
    }

    fn zrem(&mut self, key: &str, member: &str) -> bool {
        match self.inner.keyspace.get_mut(key) {
            Some(mut slot) => match slot.value_mut() {
                Slot::ZSet(z) => z.remove(member),
                _ => false,
            },
            None => false,
        }
    }

    fn zscore(&self, key: &str, member: &str) -> Option<f64> {
        self.with_zset(key, None, |z| z.score(member))
    }

    fn zincrby(&mut self, key: &str, member: &str, delta: f64) -> f64 {
        if let Slot::ZSet(z) = self.zset_mut(key).value_mut() {
            let next = z.score(member).unwrap_or(0.0) + delta;
            z.insert(member, next);
            next
        } else {
            delta
        }
    }

    fn zcard(&self, key: &str) -> usize {
        self.with_zset(key, 0, |z| z.len())
    }

    fn zrange_by_score(&self, key: &str, max_score: f64, limit: usize) -> Vec<ScoredMember> {
        self.with_zset(key, Vec::new(), |z| z.range_by_score(max_score, limit))
    }

    fn zrevrange(&self, key: &str, limit: usize) -> Vec<ScoredMember> {
        self.with_zset(key, Vec::new(), |z| z.revrange(limit))
    }

    fn sadd(&mut self, key: &str, member: &str) -> bool {
        if let Slot::Set(s) = self.set_mut(key).value_mut() {
            s.insert(member.to_string())
        } else {
            false
        }
    }

    fn srem(&mut self, key: &str, member: &str) -> bool {
        match self.inner.keyspace.get_mut(key) {
            Some(mut slot) => match slot.value_mut() {
                Slot::Set(s) => s.remove(member),
                _ => false,
            },
            None => false,
        }
    }

    fn sismember(&self, key: &str, member: &str) -> bool {
        match self.inner.keyspace.get(key) {
            Some(slot) => match slot.value() {
                Slot::Set(s) => s.contains(member),
                _ => false,
            },
            None => false,
        }
    }

    fn smembers(&self, key: &str) -> Vec<String> {
        match self.inner.keyspace.get(key) {
            Some(slot) => match slot.value() {
                Slot::Set(s) => s.iter().cloned().collect(),
                _ => Vec::new(),
            },
            None => Vec::new(),
        }
    }

    fn lpush(&mut self, key: &str, value: String) {
        if let Slot::List(l) = self.list_mut(key).value_mut() {
            l.push_front(value);
        }
    }

    fn llen(&self, key: &str) -> usize {
        match self.inner.keyspace.get(key) {
            Some(slot) => match slot.value() {
                Slot::List(l) => l.len(),
                _ => 0,
            },
            None => 0,
        }
    }

    fn lrange(&self, key: &str, offset: usize, count: usize) -> Vec<String> {
        match self.inner.keyspace.get(key) {
            Some(slot) => match slot.value() {
                Slot::List(l) => l.iter().skip(offset).take(count).cloned().collect(),
                _ => Vec::new(),
            },
            None => Vec::new(),
        }
    }

    fn lpop_tail(&mut self, key: &str, n: usize) -> Vec<String> {
        match self.inner.keyspace.get_mut(key) {
            Some(mut slot) => match slot.value_mut() {
                Slot::List(l) => {
                    let take = n.min(l.len());
                    let mut out = Vec::with_capacity(take);
                    for _ in 0..take {
                        if let Some(v) = l.pop_back() {
                            out.push(v);
                        }
                    }
                    out.reverse();
                    out
                }
                _ => Vec::new(),
            },
            None => Vec::new(),
        }
    }

    fn ldel(&mut self, key: &str) {
        self.inner.keyspace.remove(key);
    }

    fn publish(&mut self, channel: &str, message: String) {
        // No subscribers is not an error; `send` only fails then.
        let _ = self.inner.events.send((channel.to_string(), message));
    }
}

impl std::fmt::Debug for Inner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Inner")
            .field("jobs", &self.jobs.len())
            .field("recur", &self.recur.len())
            .field("keyspace", &self.keyspace.len())
            .finish()
    }
}

// Surfaced so callers that only see `qless_core::storage::StorageError`
// can still construct one from a backend-specific failure, if a future
// fallible operation is added to this store.
#[allow(dead_code)]
fn _backend_error(msg: impl Into<String>) -> StorageError {
    StorageError::Backend(msg.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use qless_core::job::{HistoryEntry, State};

    fn sample_job(jid: &str, queue: &str) -> JobRecord {
        JobRecord {
            jid: jid.to_string(),
            klass: "demo::Klass".to_string(),
            data: "{}".to_string(),
            priority: 0,
            tags: Default::default(),
            state: State::Waiting,
            queue: queue.to_string(),
            worker: None,
            expires: 0.0,
            retries: 5,
            remaining: 5,
            history: vec![HistoryEntry::new(queue.to_string(), 0.0)],
            failure: None,
            dependencies: Default::default(),
            dependents: Default::default(),
        }
    }

    #[tokio::test]
    async fn transaction_round_trips_a_job() {
        let storage = MemoryStorage::new();
        storage
            .transaction(|ops| ops.job_put(sample_job("jid-1", "q")))
            .await
            .unwrap();
        let job = storage
            .transaction(|ops| ops.job_get("jid-1"))
            .await
            .unwrap();
        assert_eq!(job.unwrap().queue, "q");
    }

    #[tokio::test]
    async fn zset_orders_by_score_descending() {
        let storage = MemoryStorage::new();
        storage
            .transaction(|ops| {
                ops.zadd("k", "a", 1.0);
                ops.zadd("k", "b", 3.0);
                ops.zadd("k", "c", 2.0);
            })
            .await
            .unwrap();
        let top = storage.transaction(|ops| ops.zrevrange("k", 0)).await.unwrap();
        let names: Vec<_> = top.into_iter().map(|m| m.member).collect();
        assert_eq!(names, vec!["b", "c", "a"]);
    }

    #[tokio::test]
    async fn publish_does_not_error_without_subscribers() {
        let storage = MemoryStorage::new();
        storage
            .transaction(|ops| ops.publish("log", "hi".to_string()))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn publish_is_observed_by_a_subscriber() {
        let storage = MemoryStorage::new();
        let mut rx = storage.subscribe();
        storage
            .transaction(|ops| ops.publish("log", "hi".to_string()))
            .await
            .unwrap();
        let (channel, message) = rx.recv().await.unwrap();
        assert_eq!(channel, "log");
        assert_eq!(message, "hi");
    }

    #[tokio::test]
    async fn lpop_tail_returns_oldest_first() {
        let storage = MemoryStorage::new();
        storage
            .transaction(|ops| {
                ops.lpush("f", "third".to_string());
                ops.lpush("f", "second".to_string());
                ops.lpush("f", "first".to_string());
            })
            .await
            .unwrap();
        let popped = storage.transaction(|ops| ops.lpop_tail("f", 2)).await.unwrap();
        assert_eq!(popped, vec!["third", "second"]);
    }
}

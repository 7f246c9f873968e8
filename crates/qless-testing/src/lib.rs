//! Test fixtures for `qless-core`: a job builder, a fixed-step clock,
//! and state-assertion helpers, all built on the in-memory storage
//! backend so integration tests never need a real key-value service.

use qless_core::engine::QueueEngine;
use qless_core::job::{JobRecord, State};
use qless_core::options::PutOptions;
use qless_storage_memory::MemoryStorage;

/// A monotonically advancing clock for deterministic tests. Every
/// `QueueEngine` operation takes `now` as an explicit argument, so
/// tests drive time by hand instead of sleeping.
#[derive(Debug, Clone, Copy)]
pub struct Clock(f64);

impl Clock {
    pub fn new() -> Self {
        Self(0.0)
    }

    pub fn at(t: f64) -> Self {
        Self(t)
    }

    pub fn now(&self) -> f64 {
        self.0
    }

    pub fn advance(&mut self, seconds: f64) -> f64 {
        self.0 += seconds;
        self.0
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::new()
    }
}

/// A fresh engine over an empty in-memory store, with a fixed
/// `uuid`-derived jid prefix so generated jids in a test run don't
/// collide with hand-picked literal jids like `"jid-1"`.
pub fn new_engine() -> QueueEngine<MemoryStorage> {
    QueueEngine::new(MemoryStorage::new())
}

/// Generates an opaque jid distinct from any literal the test itself
/// chose, for scenarios that need a jid but don't care about its value.
pub fn random_jid() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Fluent builder for `put`'s arguments. Defaults: priority 0, no
/// tags, no depends, `klass = "test::Job"`, `data = "{}"`.
#[derive(Debug, Clone)]
pub struct JobBuilder {
    pub jid: String,
    pub klass: String,
    pub data: String,
    pub queue: String,
    pub delay: f64,
    pub opts: PutOptions,
}

impl JobBuilder {
    pub fn new(jid: impl Into<String>, queue: impl Into<String>) -> Self {
        Self {
            jid: jid.into(),
            klass: "test::Job".to_string(),
            data: "{}".to_string(),
            queue: queue.into(),
            delay: 0.0,
            opts: PutOptions::default(),
        }
    }

    pub fn klass(mut self, klass: impl Into<String>) -> Self {
        self.klass = klass.into();
        self
    }

    pub fn data(mut self, data: impl Into<String>) -> Self {
        self.data = data.into();
        self
    }

    pub fn priority(mut self, priority: i64) -> Self {
        self.opts.priority = Some(priority);
        self
    }

    pub fn tags(mut self, tags: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.opts.tags = Some(tags.into_iter().map(Into::into).collect());
        self
    }

    pub fn retries(mut self, retries: i64) -> Self {
        self.opts.retries = Some(retries);
        self
    }

    pub fn depends_on(mut self, jids: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.opts.depends = Some(jids.into_iter().map(Into::into).collect());
        self
    }

    pub fn delay(mut self, delay: f64) -> Self {
        self.delay = delay;
        self
    }

    /// Submits this job via `engine.put` at `now`.
    pub async fn submit(
        self,
        engine: &QueueEngine<MemoryStorage>,
        now: f64,
    ) -> qless_core::error::Result<String> {
        engine
            .put(now, self.jid, self.klass, self.data, self.queue, self.delay, self.opts)
            .await
    }
}

/// Panics with a readable message unless `job.state == expected`.
#[track_caller]
pub fn assert_state(job: &JobRecord, expected: State) {
    assert_eq!(
        job.state.as_str(),
        expected.as_str(),
        "job `{}` expected state `{}`, was `{}`",
        job.jid,
        expected.as_str(),
        job.state.as_str(),
    );
}

/// Panics unless `job.tags` contains exactly the given tags, ignoring
/// order.
#[track_caller]
pub fn assert_tags(job: &JobRecord, expected: &[&str]) {
    let mut actual: Vec<&str> = job.tags.iter().map(|s| s.as_str()).collect();
    actual.sort_unstable();
    let mut want: Vec<&str> = expected.to_vec();
    want.sort_unstable();
    assert_eq!(actual, want, "job `{}` tags mismatch", job.jid);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn builder_submits_and_round_trips() {
        let engine = new_engine();
        let jid = JobBuilder::new("jid-1", "q")
            .priority(5)
            .tags(["a", "b"])
            .submit(&engine, 0.0)
            .await
            .unwrap();
        let job = engine.get(&jid).await.unwrap().unwrap();
        assert_state(&job, State::Waiting);
        assert_tags(&job, &["a", "b"]);
        assert_eq!(job.priority, 5);
    }

    #[test]
    fn clock_advances() {
        let mut clock = Clock::new();
        assert_eq!(clock.advance(10.0), 10.0);
        assert_eq!(clock.now(), 10.0);
    }
}

//! `QueueEngine<S>` is the single entry point `crate::facade` dispatches
//! onto. Each public method here is exactly one `Storage::transaction`
//! call wrapping a synchronous, pure function of `&mut dyn StorageOps`,
//! so every operation lands atomically or not at all.
//!
//! Every operation also emits a `tracing::debug!` at its boundary,
//! carrying whichever of `jid`/`queue`/`now` apply. This is operator
//! observability of the process itself, separate from the `EB`
//! pub/sub domain events `StorageOps::publish` emits for external
//! subscribers — the two fire from the same call sites but serve
//! different audiences.

mod admin;
mod common;
mod depends_impl;
mod dispatch;
mod lifecycle;
mod put;
mod recur_impl;
mod stats_support;

use crate::error::Result;
use crate::job::JobRecord;
use crate::options::{CompleteOptions, DependsAction, PutOptions, RecurOptions, TagAction, TrackAction};
use crate::recur::RecurringJob;
use crate::storage::Storage;
use serde_json::Value;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct QueueEngine<S: Storage> {
    storage: S,
}

impl<S: Storage + Clone + Send + Sync + 'static> QueueEngine<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    pub async fn get(&self, jid: &str) -> Result<Option<JobRecord>> {
        debug!(jid, "get");
        let jid = jid.to_string();
        Ok(self.storage.transaction(move |ops| ops.job_get(&jid)).await?)
    }

    pub async fn config_get(&self, key: Option<String>) -> Result<Value> {
        debug!(key = key.as_deref(), "config.get");
        Ok(self
            .storage
            .transaction(move |ops| {
                let cfg = ops.config();
                match &key {
                    Some(k) => cfg
                        .get(k, None)
                        .map(|v| Value::String(v.to_string()))
                        .unwrap_or(Value::Null),
                    None => cfg.to_json(),
                }
            })
            .await?)
    }

    pub async fn config_set(&self, key: String, value: String) -> Result<()> {
        debug!(key, value, "config.set");
        self.storage
            .transaction(move |ops| ops.config_set(&key, &value))
            .await?;
        Ok(())
    }

    pub async fn config_unset(&self, key: String) -> Result<()> {
        debug!(key, "config.unset");
        self.storage
            .transaction(move |ops| ops.config_unset(&key))
            .await?;
        Ok(())
    }

    pub async fn put(
        &self,
        now: f64,
        jid: String,
        klass: String,
        data: String,
        queue: String,
        delay: f64,
        opts: PutOptions,
    ) -> Result<String> {
        debug!(jid, queue, now, delay, "put");
        self.storage
            .transaction(move |ops| put::put(ops, now, &jid, &klass, &data, &queue, delay, opts))
            .await?
    }

    pub async fn complete(
        &self,
        now: f64,
        jid: String,
        worker: String,
        queue: String,
        data: String,
        opts: CompleteOptions,
    ) -> Result<String> {
        debug!(jid, queue, now, worker, "complete");
        self.storage
            .transaction(move |ops| {
                lifecycle::complete(ops, now, &jid, &worker, &queue, &data, opts)
            })
            .await?
    }

    pub async fn fail(
        &self,
        now: f64,
        jid: String,
        worker: String,
        group: String,
        message: String,
        data: Option<String>,
    ) -> Result<()> {
        tracing::warn!(jid, now, worker, group, "fail");
        self.storage
            .transaction(move |ops| {
                lifecycle::fail(ops, now, &jid, &worker, &group, &message, data.as_deref())
            })
            .await?
    }

    pub async fn retry(
        &self,
        now: f64,
        jid: String,
        queue: String,
        worker: String,
        delay: f64,
    ) -> Result<bool> {
        debug!(jid, queue, now, worker, delay, "retry");
        self.storage
            .transaction(move |ops| lifecycle::retry(ops, now, &jid, &queue, &worker, delay))
            .await?
    }

    pub async fn heartbeat(
        &self,
        now: f64,
        jid: String,
        worker: String,
        data: Option<String>,
    ) -> Result<f64> {
        debug!(jid, now, worker, "heartbeat");
        self.storage
            .transaction(move |ops| lifecycle::heartbeat(ops, now, &jid, &worker, data.as_deref()))
            .await?
    }

    pub async fn cancel(&self, now: f64, jids: Vec<String>) -> Result<Vec<String>> {
        debug!(now, count = jids.len(), "cancel");
        self.storage
            .transaction(move |ops| lifecycle::cancel(ops, now, &jids))
            .await?
    }

    pub async fn depends(
        &self,
        now: f64,
        jid: String,
        action: DependsAction,
        jids: Vec<String>,
    ) -> Result<Vec<String>> {
        debug!(jid, now, ?action, "depends");
        self.storage
            .transaction(move |ops| depends_impl::depends(ops, now, &jid, action, &jids))
            .await?
    }

    pub async fn peek(&self, now: f64, queue: String, count: usize) -> Result<Vec<JobRecord>> {
        debug!(queue, now, count, "peek");
        self.storage
            .transaction(move |ops| dispatch::peek(ops, now, &queue, count))
            .await?
    }

    pub async fn pop(
        &self,
        now: f64,
        queue: String,
        worker: String,
        count: usize,
    ) -> Result<Vec<JobRecord>> {
        debug!(queue, now, worker, count, "pop");
        self.storage
            .transaction(move |ops| dispatch::pop(ops, now, &queue, &worker, count))
            .await?
    }

    pub async fn pause(&self, queues: Vec<String>) -> Result<()> {
        debug!(?queues, "pause");
        self.storage
            .transaction(move |ops| admin::pause(ops, &queues))
            .await?;
        Ok(())
    }

    pub async fn unpause(&self, queues: Vec<String>) -> Result<()> {
        debug!(?queues, "unpause");
        self.storage
            .transaction(move |ops| admin::unpause(ops, &queues))
            .await?;
        Ok(())
    }

    pub async fn tag(
        &self,
        now: f64,
        action: TagAction,
        jid: Option<String>,
        tags: Vec<String>,
    ) -> Result<Value> {
        debug!(jid = jid.as_deref(), now, ?action, "tag");
        self.storage
            .transaction(move |ops| admin::tag(ops, now, action, jid.as_deref(), &tags))
            .await?
    }

    pub async fn track(
        &self,
        now: f64,
        action: TrackAction,
        jid: Option<String>,
    ) -> Result<Value> {
        debug!(jid = jid.as_deref(), now, ?action, "track");
        self.storage
            .transaction(move |ops| admin::track(ops, now, action, jid.as_deref()))
            .await?
    }

    pub async fn unfail(
        &self,
        now: f64,
        group: String,
        queue: String,
        count: usize,
    ) -> Result<i64> {
        debug!(group, queue, now, count, "unfail");
        self.storage
            .transaction(move |ops| admin::unfail(ops, now, &group, &queue, count))
            .await?
    }

    pub async fn failed(&self, group: Option<String>, offset: usize, count: usize) -> Result<Value> {
        debug!(group = group.as_deref(), offset, count, "failed");
        Ok(self
            .storage
            .transaction(move |ops| admin::failed(ops, group.as_deref(), offset, count))
            .await?)
    }

    pub async fn stats(&self, queue: String, day_bin: i64) -> Result<Value> {
        debug!(queue, day_bin, "stats");
        Ok(self
            .storage
            .transaction(move |ops| admin::stats(ops, &queue, day_bin))
            .await?)
    }

    pub async fn priority(&self, jid: String, priority: i64) -> Result<()> {
        debug!(jid, priority, "priority");
        self.storage
            .transaction(move |ops| admin::priority(ops, &jid, priority))
            .await?
    }

    pub async fn queues(&self) -> Result<Value> {
        debug!("queues");
        Ok(self.storage.transaction(move |ops| admin::queues(ops)).await?)
    }

    pub async fn jobs(&self, queue: String, state: String) -> Result<Vec<String>> {
        debug!(queue, state, "jobs");
        Ok(self
            .storage
            .transaction(move |ops| admin::jobs(ops, &queue, &state))
            .await?)
    }

    pub async fn workers(&self, worker: Option<String>) -> Result<Value> {
        debug!(worker = worker.as_deref(), "workers");
        Ok(self
            .storage
            .transaction(move |ops| admin::workers(ops, worker.as_deref()))
            .await?)
    }

    pub async fn length(&self, queue: String) -> Result<i64> {
        debug!(queue, "length");
        Ok(self.storage.transaction(move |ops| admin::length(ops, &queue)).await?)
    }

    pub async fn recur(
        &self,
        now: f64,
        jid: String,
        klass: String,
        data: String,
        queue: String,
        spec: String,
        interval: f64,
        offset: f64,
        opts: RecurOptions,
    ) -> Result<String> {
        debug!(jid, queue, now, interval, offset, "recur");
        self.storage
            .transaction(move |ops| {
                recur_impl::recur(
                    ops, now, &jid, &klass, &data, &queue, &spec, interval, offset, opts,
                )
            })
            .await?
    }

    pub async fn unrecur(&self, jid: String) -> Result<()> {
        debug!(jid, "unrecur");
        self.storage
            .transaction(move |ops| recur_impl::unrecur(ops, &jid))
            .await?
    }

    pub async fn recur_get(&self, jid: String) -> Result<Option<RecurringJob>> {
        debug!(jid, "recur.get");
        Ok(self
            .storage
            .transaction(move |ops| ops.recur_get(&jid))
            .await?)
    }

    pub async fn recur_update(
        &self,
        jid: String,
        priority: Option<i64>,
        interval: Option<f64>,
        retries: Option<i64>,
        data: Option<String>,
    ) -> Result<()> {
        debug!(jid, "recur.update");
        self.storage
            .transaction(move |ops| {
                recur_impl::recur_update(ops, &jid, priority, interval, retries, data)
            })
            .await?
    }

    pub async fn recur_tag(&self, jid: String, tags: Vec<String>) -> Result<Vec<String>> {
        debug!(jid, ?tags, "recur.tag");
        self.storage
            .transaction(move |ops| recur_impl::recur_tag(ops, &jid, &tags, true))
            .await?
    }

    pub async fn recur_untag(&self, jid: String, tags: Vec<String>) -> Result<Vec<String>> {
        debug!(jid, ?tags, "recur.untag");
        self.storage
            .transaction(move |ops| recur_impl::recur_tag(ops, &jid, &tags, false))
            .await?
    }
}

//! The server-resident execution core of a distributed job queue:
//! atomic job-state transitions, priority-ordered dispatch with
//! lease-based worker fencing, delayed and recurring scheduling,
//! dependency chains, tagging and tracking, failure grouping, and
//! per-queue statistics.
//!
//! This crate has no I/O of its own beyond the async `Storage`
//! boundary (`crate::storage`): every operation is a pure function of
//! `(now, storage-state, arguments)`. A concrete store — such as
//! `qless_storage_memory::MemoryStorage` — plugs in behind that trait.
//!
//! `crate::engine::QueueEngine` is the primary entry point for
//! embedding this crate directly; `crate::facade::dispatch` is the
//! thin string-command router for callers that already have a
//! `(command_name, now, args)` triple from some external transport.

pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod facade;
pub mod job;
pub mod keys;
pub mod options;
pub mod recur;
pub mod stats;
pub mod storage;

pub use engine::QueueEngine;
pub use error::{Error, Result};
pub use job::{JobRecord, State};
pub use recur::RecurringJob;

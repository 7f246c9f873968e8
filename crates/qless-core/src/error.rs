//! Error kinds the core signals. Every variant carries enough
//! structured context to render a human-readable message naming the
//! offending parameter; propagation is all-or-nothing — an operation
//! that returns `Err` has made no writes (see `Storage::transaction`).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid argument `{argument}`: {reason}")]
    InvalidArguments { argument: String, reason: String },

    #[error("unknown command `{0}`")]
    UnknownCommand(String),

    #[error("`now` must be present and numeric, got `{0}`")]
    InvalidNow(String),

    #[error("unknown schedule `{0}`, only `interval` is supported")]
    UnknownSchedule(String),

    #[error("job `{0}` not found")]
    JobNotFound(String),

    #[error("job `{jid}` is not running (state is `{state}`)")]
    JobNotRunning { jid: String, state: String },

    #[error("job `{jid}` is held by worker `{expected}`, not `{actual}`")]
    WorkerMismatch {
        jid: String,
        expected: String,
        actual: String,
    },

    #[error("job `{jid}` is in queue `{expected}`, not `{actual}`")]
    QueueMismatch {
        jid: String,
        expected: String,
        actual: String,
    },

    #[error("invalid transition for job `{jid}`: {reason}")]
    InvalidTransition { jid: String, reason: String },

    #[error("recurring job `{jid}` has invalid interval {interval}: must be > 0")]
    RecurInvalidInterval { jid: String, interval: f64 },

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("storage error: {0}")]
    Storage(#[from] crate::storage::StorageError),
}

pub type Result<T> = std::result::Result<T, Error>;

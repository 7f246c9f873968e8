//! Canonical keyspace layout: normative key names so that a
//! real storage substrate (a hosted key-value engine with scripting)
//! stays interoperable with client libraries that assume this exact
//! layout. `qless-storage-memory` and any future backend must use
//! these names for the generic index keyspaces (job and recurring
//! records themselves are typed, see `crate::storage`'s design note).

pub fn work(queue: &str) -> String {
    format!("ql:q:{queue}-work")
}

pub fn locks(queue: &str) -> String {
    format!("ql:q:{queue}-locks")
}

pub fn scheduled(queue: &str) -> String {
    format!("ql:q:{queue}-scheduled")
}

pub fn recur(queue: &str) -> String {
    format!("ql:q:{queue}-recur")
}

pub fn depends(queue: &str) -> String {
    format!("ql:q:{queue}-depends")
}

pub const QUEUES: &str = "ql:queues";
pub const TRACKED: &str = "ql:tracked";
pub const COMPLETED: &str = "ql:completed";
pub const WORKERS: &str = "ql:workers";
pub const FAILURES: &str = "ql:failures";
pub const PAUSED_QUEUES: &str = "ql:paused_queues";
pub const TAGS: &str = "ql:tags";

pub fn worker_jobs(worker: &str) -> String {
    format!("ql:w:{worker}:jobs")
}

pub fn tag(tag: &str) -> String {
    format!("ql:t:{tag}")
}

pub fn failed_group(group: &str) -> String {
    format!("ql:f:{group}")
}

pub fn retries_group(queue: &str) -> String {
    format!("failed-retries-{queue}")
}

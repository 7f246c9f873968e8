//! Statistics recording shared by `dispatch::pop` (wait) and
//! `lifecycle::complete` (run).

use crate::stats::{day_bin, Stage};
use crate::storage::StorageOps;

pub fn record(ops: &mut dyn StorageOps, stage: Stage, now: f64, queue: &str, x: f64) {
    let bin = day_bin(now);
    let mut stats = ops.stats_get(stage, bin, queue);
    stats.observe(x);
    ops.stats_put(stage, bin, queue, stats);
}

pub fn bump_retries(ops: &mut dyn StorageOps, now: f64, queue: &str, n: u64) {
    if n == 0 {
        return;
    }
    let bin = day_bin(now);
    let mut counters = ops.day_counters_get(bin, queue);
    counters.retries += n;
    ops.day_counters_put(bin, queue, counters);
}

pub fn bump_failed(ops: &mut dyn StorageOps, now: f64, queue: &str) {
    let bin = day_bin(now);
    let mut counters = ops.day_counters_get(bin, queue);
    counters.failed += 1;
    counters.failures += 1;
    ops.day_counters_put(bin, queue, counters);
}

//! Online mean/variance plus multi-resolution histograms for the
//! `wait` and `run` stages, kept per day-bin and per queue.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// The midnight (UTC, or whatever epoch the caller's `now` uses)
/// timestamp of the day containing `t`.
pub fn day_bin(t: f64) -> i64 {
    ((t / 86400.0).floor() as i64) * 86400
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Wait,
    Run,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Wait => "wait",
            Stage::Run => "run",
        }
    }
}

/// Welford's online algorithm for mean and variance.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Moments {
    pub total: u64,
    pub mean: f64,
    pub vk: f64,
}

impl Moments {
    pub fn observe(&mut self, x: f64) {
        if self.total == 0 {
            self.total = 1;
            self.mean = x;
            self.vk = 0.0;
            return;
        }
        self.total += 1;
        let old = self.mean;
        self.mean += (x - self.mean) / self.total as f64;
        self.vk += (x - self.mean) * (x - old);
    }

    pub fn stddev(&self) -> f64 {
        if self.total > 1 {
            (self.vk / (self.total - 1) as f64).sqrt()
        } else {
            0.0
        }
    }
}

/// 60 second buckets (`s0..s59`), 59 minute buckets (`m1..m59`), 23
/// hour buckets (`h1..h23`) and 6 day buckets (`d1..d6`), with
/// samples beyond 7 days saturating into `d6`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Histogram {
    seconds: [u64; 60],
    minutes: [u64; 60], // index 0 unused
    hours: [u64; 24],   // index 0 unused
    days: [u64; 7],     // index 0 unused
}

impl Default for Histogram {
    fn default() -> Self {
        Self {
            seconds: [0; 60],
            minutes: [0; 60],
            hours: [0; 24],
            days: [0; 7],
        }
    }
}

impl Histogram {
    pub fn record(&mut self, x: f64) {
        let xi = x.max(0.0).floor() as i64;
        if xi < 60 {
            self.seconds[xi as usize] += 1;
        } else if xi < 3600 {
            self.minutes[(xi / 60) as usize] += 1;
        } else if xi < 86_400 {
            self.hours[(xi / 3600) as usize] += 1;
        } else {
            let d = ((xi / 86_400) as usize).min(6);
            self.days[d] += 1;
        }
    }

    pub fn sum(&self) -> u64 {
        self.seconds.iter().sum::<u64>()
            + self.minutes[1..].iter().sum::<u64>()
            + self.hours[1..].iter().sum::<u64>()
            + self.days[1..].iter().sum::<u64>()
    }

    pub fn to_json(&self) -> Value {
        let mut obj = serde_json::Map::new();
        for i in 0..60 {
            obj.insert(format!("s{i}"), json!(self.seconds[i]));
        }
        for i in 1..=59 {
            obj.insert(format!("m{i}"), json!(self.minutes[i]));
        }
        for i in 1..=23 {
            obj.insert(format!("h{i}"), json!(self.hours[i]));
        }
        for i in 1..=6 {
            obj.insert(format!("d{i}"), json!(self.days[i]));
        }
        Value::Object(obj)
    }
}

/// `{total, mean, vk}` plus the histogram, for one `(stage, day-bin,
/// queue)` key.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StageStats {
    pub moments: Moments,
    pub histogram: Histogram,
}

impl StageStats {
    pub fn observe(&mut self, x: f64) {
        self.moments.observe(x);
        self.histogram.record(x);
    }

    pub fn to_json(&self) -> Value {
        json!({
            "total": self.moments.total,
            "mean": self.moments.mean,
            "stddev": self.moments.stddev(),
            "histogram": self.histogram.to_json(),
        })
    }
}

/// Per-day `{retries, failed, failures}` counters for a queue.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct DayCounters {
    pub retries: u64,
    pub failed: u64,
    pub failures: u64,
}

//! Randomized property checks, generated with `fastrand` rather than
//! enumerated by hand: dispatch ordering, retry-decrement, and
//! stats-moments invariants should hold over many random sequences,
//! not just the one sequence a hand-written test happens to pick.

use qless_core::job::State;
use qless_testing::{assert_state, new_engine, JobBuilder};

/// Invariant 2: across random `(priority, put-time)` pairs, pop
/// always returns jobs in descending-priority, then ascending-put-
/// time order.
#[tokio::test]
async fn pop_orders_by_priority_then_fifo() {
    fastrand::seed(42);
    for _trial in 0..20 {
        let engine = new_engine();
        let n = fastrand::usize(2..8);
        let mut submitted = Vec::with_capacity(n);
        for i in 0..n {
            let jid = format!("j{i}");
            let priority = fastrand::i64(-3..4);
            let t = i as f64; // strictly increasing put order
            JobBuilder::new(jid.clone(), "q").priority(priority).submit(&engine, t).await.unwrap();
            submitted.push((jid, priority, t));
        }

        let popped = engine.pop(n as f64, "q".into(), "w".into(), n).await.unwrap();
        assert_eq!(popped.len(), n);

        let mut expected = submitted.clone();
        expected.sort_by(|a, b| b.1.cmp(&a.1).then(a.2.partial_cmp(&b.2).unwrap()));

        let got: Vec<&str> = popped.iter().map(|j| j.jid.as_str()).collect();
        let want: Vec<&str> = expected.iter().map(|(jid, _, _)| jid.as_str()).collect();
        assert_eq!(got, want, "pop order mismatch for trial with priorities {:?}", submitted);
    }
}

/// Invariant 3: a lease that expires is reclaimed exactly once per
/// miss, decrementing `remaining` by exactly 1 each time, until it
/// either returns to `work` or fails.
#[tokio::test]
async fn reclaim_decrements_remaining_exactly_once_per_miss() {
    fastrand::seed(7);
    for _trial in 0..15 {
        let engine = new_engine();
        let retries = fastrand::i64(0..5);
        JobBuilder::new("j", "q").retries(retries).submit(&engine, 0.0).await.unwrap();

        let mut now = 0.0;
        let mut expected_remaining = retries;
        loop {
            let popped = engine.pop(now, "q".into(), "w".into(), 1).await.unwrap();
            if popped.is_empty() {
                let job = engine.get("j").await.unwrap().unwrap();
                assert_state(&job, State::Failed);
                break;
            }
            assert_eq!(popped[0].remaining, expected_remaining);
            expected_remaining -= 1;
            now = popped[0].expires + 1.0;
            if expected_remaining < -1 {
                panic!("reclaim loop did not converge to failed within expected retries");
            }
        }
    }
}

/// Invariant 6: streaming mean/variance and the histogram total agree
/// with a naive recomputation from the raw samples, over random wait
/// durations.
#[tokio::test]
async fn stats_moments_match_naive_recomputation() {
    fastrand::seed(99);
    for _trial in 0..10 {
        let engine = new_engine();
        let n = fastrand::usize(3..12);
        let mut samples = Vec::with_capacity(n);
        let mut now = 0.0;

        for i in 0..n {
            let jid = format!("j{i}");
            JobBuilder::new(jid.clone(), "q").submit(&engine, now).await.unwrap();
            let wait = fastrand::f64() * 20.0;
            let popped = engine.pop(now + wait, "q".into(), "w".into(), 1).await.unwrap();
            assert_eq!(popped[0].jid, jid);
            samples.push(wait);
            now += wait + 1.0;
        }

        let stats = engine.stats("q".into(), qless_core::stats::day_bin(0.0)).await.unwrap();
        let total = stats["wait"]["total"].as_u64().unwrap();
        assert_eq!(total, n as u64);

        let naive_mean = samples.iter().sum::<f64>() / n as f64;
        let got_mean = stats["wait"]["mean"].as_f64().unwrap();
        assert!((naive_mean - got_mean).abs() < 1e-6, "mean mismatch: {naive_mean} vs {got_mean}");

        let histogram_sum: u64 = stats["wait"]["histogram"]
            .as_object()
            .unwrap()
            .values()
            .map(|v| v.as_u64().unwrap())
            .sum();
        assert_eq!(histogram_sum, n as u64);
    }
}

//! Scenarios given as fixed `(now, args) -> expected` traces, each
//! checked literally against its quoted numbers.

use qless_core::job::State;
use qless_testing::{assert_state, new_engine, JobBuilder};

/// S1: basic put/pop/complete with wait and run stats.
#[tokio::test]
async fn s1_basic_put_pop_complete() {
    let engine = new_engine();
    JobBuilder::new("j1", "q").klass("K").submit(&engine, 100.0).await.unwrap();

    let popped = engine.pop(101.0, "q".into(), "w".into(), 1).await.unwrap();
    assert_eq!(popped.len(), 1);
    assert_state(&popped[0], State::Running);
    assert_eq!(popped[0].expires, 161.0);

    let state = engine
        .complete(110.0, "j1".into(), "w".into(), "q".into(), "{}".into(), Default::default())
        .await
        .unwrap();
    assert_eq!(state, "complete");

    let wait = engine.stats("q".into(), qless_core::stats::day_bin(110.0)).await.unwrap();
    assert_eq!(wait["wait"]["total"], 1);
    assert_eq!(wait["wait"]["mean"], 1.0);
    assert_eq!(wait["run"]["total"], 1);
    assert_eq!(wait["run"]["mean"], 9.0);
}

/// S2: a delayed job is invisible to peek until its due time.
#[tokio::test]
async fn s2_delay() {
    let engine = new_engine();
    JobBuilder::new("j2", "q").delay(30.0).submit(&engine, 100.0).await.unwrap();

    let peeked = engine.peek(120.0, "q".into(), 1).await.unwrap();
    assert!(peeked.is_empty());

    let peeked = engine.peek(131.0, "q".into(), 1).await.unwrap();
    assert_eq!(peeked.len(), 1);
    assert_eq!(peeked[0].jid, "j2");
    assert_state(&peeked[0], State::Waiting);
}

/// S3: lock loss reclaims once, then fails once retries exhaust.
#[tokio::test]
async fn s3_lock_loss_then_retries_exhausted() {
    let engine = new_engine();
    JobBuilder::new("j3", "q").retries(1).submit(&engine, 0.0).await.unwrap();

    let popped = engine.pop(0.0, "q".into(), "wA".into(), 1).await.unwrap();
    assert_eq!(popped[0].expires, 60.0);

    let popped = engine.pop(61.0, "q".into(), "wB".into(), 1).await.unwrap();
    assert_eq!(popped.len(), 1);
    assert_eq!(popped[0].jid, "j3");
    assert_eq!(popped[0].remaining, 0);

    let popped = engine.pop(122.0, "q".into(), "wC".into(), 1).await.unwrap();
    assert!(popped.is_empty());

    let job = engine.get("j3").await.unwrap().unwrap();
    assert_state(&job, State::Failed);
    assert_eq!(job.failure.unwrap().group, "failed-retries-q");
}

/// S4: a dependent only becomes poppable once its dependency
/// completes.
#[tokio::test]
async fn s4_dependencies() {
    let engine = new_engine();
    JobBuilder::new("p", "q").submit(&engine, 0.0).await.unwrap();
    JobBuilder::new("c", "q").depends_on(["p"]).submit(&engine, 0.0).await.unwrap();

    let popped = engine.pop(0.0, "q".into(), "w".into(), 10).await.unwrap();
    assert_eq!(popped.len(), 1);
    assert_eq!(popped[0].jid, "p");

    engine
        .complete(1.0, "p".into(), "w".into(), "q".into(), "{}".into(), Default::default())
        .await
        .unwrap();

    let popped = engine.pop(1.0, "q".into(), "w".into(), 10).await.unwrap();
    assert_eq!(popped.len(), 1);
    assert_eq!(popped[0].jid, "c");
}

/// S5: priority orders strictly ahead of put time.
#[tokio::test]
async fn s5_priority_ordering() {
    let engine = new_engine();
    JobBuilder::new("lo", "q").priority(0).submit(&engine, 0.0).await.unwrap();
    JobBuilder::new("hi", "q").priority(5).submit(&engine, 1.0).await.unwrap();

    let popped = engine.pop(2.0, "q".into(), "w".into(), 2).await.unwrap();
    let jids: Vec<&str> = popped.iter().map(|j| j.jid.as_str()).collect();
    assert_eq!(jids, vec!["hi", "lo"]);
}

//! Admin-surface operations: priority reordering, cancel, failure
//! grouping, unfail, and configuration overrides.

use qless_core::job::State;
use qless_testing::{assert_state, new_engine, Clock, JobBuilder};

#[tokio::test]
async fn priority_change_reorders_a_waiting_job() {
    let engine = new_engine();
    let low = JobBuilder::new("low", "q").priority(0).submit(&engine, 0.0).await.unwrap();
    let mid = JobBuilder::new("mid", "q").priority(1).submit(&engine, 1.0).await.unwrap();

    // Bump `low`'s priority above `mid`'s; it should now pop first.
    engine.priority(low.clone(), 5).await.unwrap();

    let popped = engine.pop(2.0, "q".into(), "w".into(), 10).await.unwrap();
    assert_eq!(popped[0].jid, low);
    assert_eq!(popped[1].jid, mid);
}

#[tokio::test]
async fn cancel_rejects_a_running_job() {
    let engine = new_engine();
    let jid = JobBuilder::new("jid-1", "q").submit(&engine, 0.0).await.unwrap();
    engine.pop(0.0, "q".into(), "w".into(), 1).await.unwrap();

    let err = engine.cancel(0.0, vec![jid]).await.unwrap_err();
    assert!(matches!(err, qless_core::Error::InvalidTransition { .. }));
}

#[tokio::test]
async fn cancel_removes_a_waiting_job_and_its_tags() {
    let engine = new_engine();
    let jid = JobBuilder::new("jid-1", "q").tags(["x"]).submit(&engine, 0.0).await.unwrap();

    let canceled = engine.cancel(0.0, vec![jid.clone()]).await.unwrap();
    assert_eq!(canceled, vec![jid.clone()]);
    assert!(engine.get(&jid).await.unwrap().is_none());

    let by_tag = engine
        .tag(0.0, qless_core::options::TagAction::Get, Some("x".into()), vec![])
        .await
        .unwrap();
    assert_eq!(by_tag, serde_json::json!([]));
}

/// A job that exhausts its retries lands in `failed-<group>`;
/// `unfail` moves it back to `waiting` with retries reset.
#[tokio::test]
async fn failed_job_can_be_unfailed_back_to_waiting() {
    let engine = new_engine();
    let jid = JobBuilder::new("jid-1", "q").submit(&engine, 0.0).await.unwrap();
    let popped = engine.pop(0.0, "q".into(), "w".into(), 1).await.unwrap();
    assert_eq!(popped[0].jid, jid);

    engine
        .fail(1.0, jid.clone(), "w".into(), "bad-input".into(), "oops".into(), None)
        .await
        .unwrap();

    let job = engine.get(&jid).await.unwrap().unwrap();
    assert_state(&job, State::Failed);

    let failed = engine.failed(None, 0, 25).await.unwrap();
    assert_eq!(failed["bad-input"], 1);

    let moved = engine.unfail(2.0, "bad-input".into(), "q".into(), 25).await.unwrap();
    assert_eq!(moved, 1);

    let job = engine.get(&jid).await.unwrap().unwrap();
    assert_state(&job, State::Waiting);
    assert_eq!(job.remaining, job.retries);
}

#[tokio::test]
async fn pause_blocks_pop_but_not_peek() {
    let engine = new_engine();
    JobBuilder::new("jid-1", "q").submit(&engine, 0.0).await.unwrap();
    engine.pause(vec!["q".into()]).await.unwrap();

    let popped = engine.pop(0.0, "q".into(), "w".into(), 1).await.unwrap();
    assert!(popped.is_empty());

    let peeked = engine.peek(0.0, "q".into(), 1).await.unwrap();
    assert_eq!(peeked.len(), 1, "pause gate only applies to pop, not peek");

    engine.unpause(vec!["q".into()]).await.unwrap();
    let popped = engine.pop(0.0, "q".into(), "w".into(), 1).await.unwrap();
    assert_eq!(popped.len(), 1);
}

#[tokio::test]
async fn config_set_overrides_heartbeat_per_queue() {
    let engine = new_engine();
    engine.config_set("q-heartbeat".into(), "5".into()).await.unwrap();

    let jid = JobBuilder::new("jid-1", "q").submit(&engine, 0.0).await.unwrap();
    let popped = engine.pop(0.0, "q".into(), "w".into(), 1).await.unwrap();
    assert_eq!(popped[0].jid, jid);
    assert_eq!(popped[0].expires, 5.0);
}

#[tokio::test]
async fn queues_reports_per_state_counts() {
    let engine = new_engine();
    let mut clock = Clock::new();
    JobBuilder::new("jid-1", "q").submit(&engine, clock.now()).await.unwrap();
    JobBuilder::new("jid-2", "q").delay(100.0).submit(&engine, clock.now()).await.unwrap();

    let queues = engine.queues().await.unwrap();
    let q = queues.as_array().unwrap().iter().find(|q| q["name"] == "q").unwrap();
    assert_eq!(q["waiting"], 1);
    assert_eq!(q["scheduled"], 1);
}

//! Tests for the fixed-interval status poller.

use std::collections::VecDeque;
use std::time::Duration;

use tokio::time::{Instant, sleep};
use tokio_util::sync::CancellationToken;

use super::{Observation, PollError, WaitSpec, wait_for_state};

const INTERVAL: Duration = Duration::from_secs(10);

const CREATE_SPEC: WaitSpec<'static> = WaitSpec {
    pending: &["pending"],
    target: &["available", "failed"],
    gone: None,
    interval: INTERVAL,
    timeout: Duration::from_secs(600),
};

const DELETE_SPEC: WaitSpec<'static> = WaitSpec {
    pending: &["available", "deleting", "pending"],
    target: &["deleted", "failed"],
    gone: Some("deleted"),
    interval: INTERVAL,
    timeout: Duration::from_secs(600),
};

/// Scripted status source; once exhausted it keeps returning `pending`.
struct Script {
    observations: VecDeque<Result<Observation, String>>,
    fetches: usize,
}

impl Script {
    fn new(observations: impl IntoIterator<Item = Result<Observation, String>>) -> Self {
        Self {
            observations: observations.into_iter().collect(),
            fetches: 0,
        }
    }

    fn next(&mut self) -> Result<Observation, String> {
        self.fetches += 1;
        self.observations
            .pop_front()
            .unwrap_or_else(|| Ok(Observation::status("pending")))
    }
}

fn statuses(labels: &[&str]) -> Vec<Result<Observation, String>> {
    labels
        .iter()
        .map(|label| Ok(Observation::status(*label)))
        .collect()
}

#[tokio::test(start_paused = true)]
async fn returns_target_after_three_spaced_fetches() {
    let mut script = Script::new(statuses(&["pending", "pending", "available"]));
    let mut sink = None;
    let started = Instant::now();

    let status = wait_for_state(CREATE_SPEC, &CancellationToken::new(), &mut sink, || {
        let next = script.next();
        async move { next }
    })
    .await
    .expect("wait should reach available");

    assert_eq!(status, "available");
    assert_eq!(script.fetches, 3);
    assert_eq!(started.elapsed(), INTERVAL * 3);
    assert_eq!(sink.as_deref(), Some("available"));
}

#[tokio::test(start_paused = true)]
async fn never_terminal_times_out() {
    let mut script = Script::new(Vec::new());
    let mut sink = None;
    let spec = WaitSpec {
        timeout: Duration::from_secs(25),
        ..CREATE_SPEC
    };

    let err = wait_for_state(spec, &CancellationToken::new(), &mut sink, || {
        let next = script.next();
        async move { next }
    })
    .await
    .expect_err("wait must not succeed silently");

    assert_eq!(
        err,
        PollError::Timeout {
            waited: Duration::from_secs(20),
            last_status: Some(String::from("pending")),
        }
    );
    assert_eq!(script.fetches, 2);
    assert_eq!(sink.as_deref(), Some("pending"));
}

#[tokio::test(start_paused = true)]
async fn not_found_during_delete_is_deleted() {
    let mut script = Script::new(vec![
        Ok(Observation::status("deleting")),
        Ok(Observation::status("deleting")),
        Ok(Observation::Gone),
    ]);
    let mut sink = None;

    let status = wait_for_state(DELETE_SPEC, &CancellationToken::new(), &mut sink, || {
        let next = script.next();
        async move { next }
    })
    .await
    .expect("gone counts as deleted");

    assert_eq!(status, "deleted");
    assert_eq!(script.fetches, 3);
    assert_eq!(sink.as_deref(), Some("deleted"));
}

#[tokio::test(start_paused = true)]
async fn gone_without_label_is_an_error() {
    let mut script = Script::new(vec![Ok(Observation::Gone)]);
    let mut sink = None;

    let err = wait_for_state(CREATE_SPEC, &CancellationToken::new(), &mut sink, || {
        let next = script.next();
        async move { next }
    })
    .await
    .expect_err("create wait has no gone label");

    assert_eq!(err, PollError::Vanished);
}

#[tokio::test(start_paused = true)]
async fn fetch_error_is_fatal() {
    let mut script = Script::new(vec![
        Ok(Observation::status("pending")),
        Err(String::from("500 internal error")),
    ]);
    let mut sink = None;

    let err = wait_for_state(CREATE_SPEC, &CancellationToken::new(), &mut sink, || {
        let next = script.next();
        async move { next }
    })
    .await
    .expect_err("fetch errors abort the wait");

    assert_eq!(err, PollError::Fetch(String::from("500 internal error")));
    assert_eq!(script.fetches, 2);
}

#[tokio::test(start_paused = true)]
async fn unknown_status_is_rejected() {
    let mut script = Script::new(statuses(&["pending", "exploded"]));
    let mut sink = None;

    let err = wait_for_state(CREATE_SPEC, &CancellationToken::new(), &mut sink, || {
        let next = script.next();
        async move { next }
    })
    .await
    .expect_err("unknown labels are errors");

    assert_eq!(err, PollError::UnexpectedState(String::from("exploded")));
    assert_eq!(sink.as_deref(), Some("exploded"));
}

#[tokio::test(start_paused = true)]
async fn cancellation_aborts_before_any_fetch() {
    let token = CancellationToken::new();
    token.cancel();
    let mut script = Script::new(Vec::new());
    let mut sink = None;

    let err = wait_for_state(CREATE_SPEC, &token, &mut sink, || {
        let next = script.next();
        async move { next }
    })
    .await
    .expect_err("cancelled wait");

    assert_eq!(err, PollError::Cancelled);
    assert_eq!(script.fetches, 0);
    assert!(sink.is_none());
}

#[tokio::test(start_paused = true)]
async fn cancellation_interrupts_a_running_wait() {
    let token = CancellationToken::new();
    let canceller = token.clone();
    tokio::spawn(async move {
        sleep(Duration::from_secs(25)).await;
        canceller.cancel();
    });
    let mut script = Script::new(Vec::new());
    let mut sink = None;
    let started = Instant::now();

    let err = wait_for_state(CREATE_SPEC, &token, &mut sink, || {
        let next = script.next();
        async move { next }
    })
    .await
    .expect_err("cancelled wait");

    assert_eq!(err, PollError::Cancelled);
    assert_eq!(script.fetches, 2);
    assert_eq!(started.elapsed(), Duration::from_secs(25));
}

mod common;

use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use common::{Call, ScriptedApi};
use telemetry_tasks::poll::{GroupEvent, GroupProgressPoller};
use telemetry_tasks::{GroupHandle, GroupProgress, PollError};

fn is_progress(call: &Call) -> bool {
    matches!(call, Call::Progress(_))
}

#[tokio::test(start_paused = true)]
async fn progress_then_single_completion() {
    let api = Arc::new(
        ScriptedApi::new()
            .progress(GroupProgress::active(0, 10))
            .progress(GroupProgress::active(3, 10))
            .progress(GroupProgress::complete(10, 10))
            .progress(GroupProgress::complete(10, 10)),
    );
    let parent = CancellationToken::new();
    let (tx, mut rx) = mpsc::unbounded_channel();

    let session = GroupProgressPoller::new(api.clone(), Duration::from_secs(5)).start(GroupHandle::new("g1"), &parent, tx);

    let mut percents = Vec::new();
    let mut completions = 0;
    while let Some(event) = rx.recv().await {
        match event {
            GroupEvent::Progress(progress) => percents.push(progress.percent()),
            GroupEvent::Completed(progress) => {
                completions += 1;
                assert_eq!(progress.completed, 10);
                assert_eq!(percents.len(), 3);
            }
            GroupEvent::Abandoned(e) => panic!("unexpected abandon: {e}"),
        }
    }

    assert_eq!(percents, vec![0.0, 30.0, 100.0]);
    assert_eq!(completions, 1);
    // nothing can be done before the first interval elapses
    assert_eq!(api.times_of(is_progress), vec![5, 10, 15]);
    assert!(!session.is_active());

    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(api.count(is_progress), 3);
}

#[tokio::test(start_paused = true)]
async fn transport_error_abandons_the_group() {
    let api = Arc::new(
        ScriptedApi::new()
            .progress(GroupProgress::active(1, 4))
            .progress_error(500),
    );
    let parent = CancellationToken::new();
    let (tx, mut rx) = mpsc::unbounded_channel();

    let session = GroupProgressPoller::new(api.clone(), Duration::from_secs(5)).start(GroupHandle::new("g1"), &parent, tx);

    assert_matches!(rx.recv().await, Some(GroupEvent::Progress(p)) if p.completed == 1);
    let abandoned = rx.recv().await;
    assert_matches!(abandoned, Some(GroupEvent::Abandoned(PollError::GroupTransport(_))));
    assert!(rx.recv().await.is_none());
    assert!(!session.is_active());
}

#[tokio::test(start_paused = true)]
async fn empty_group_reports_zero_percent() {
    let api = Arc::new(ScriptedApi::new().progress(GroupProgress::active(0, 0)));
    let parent = CancellationToken::new();
    let (tx, mut rx) = mpsc::unbounded_channel();

    let session = GroupProgressPoller::new(api.clone(), Duration::from_secs(5)).start(GroupHandle::new("g1"), &parent, tx);

    assert_matches!(rx.recv().await, Some(GroupEvent::Progress(p)) if p.percent() == 0.0);
    session.cancel();
    assert!(rx.recv().await.is_none());
}

#[tokio::test(start_paused = true)]
async fn overreported_completion_is_clamped() {
    let api = Arc::new(
        ScriptedApi::new()
            .progress(GroupProgress::active(12, 10))
            .progress(GroupProgress::active(4, 8)),
    );
    let parent = CancellationToken::new();
    let (tx, mut rx) = mpsc::unbounded_channel();

    let _session = GroupProgressPoller::new(api.clone(), Duration::from_secs(5)).start(GroupHandle::new("g1"), &parent, tx);

    assert_matches!(rx.recv().await, Some(GroupEvent::Progress(p)) if p.completed == 10 && p.percent() == 100.0);
    // a smaller total than already known is ignored
    assert_matches!(rx.recv().await, Some(GroupEvent::Progress(p)) if p.total == 10 && p.percent() == 40.0);
    parent.cancel();
    assert!(rx.recv().await.is_none());
}

//! Poll sessions: the state one polling loop shares with the view that owns it.
//!
//! A [`PollSession`] is owned by exactly one view. Dropping it cancels the
//! loop. The loop only touches shared state through [`SessionGuard::apply`],
//! which checks cancellation and runs the mutation without an await point in
//! between, so a response that lands after cancellation changes nothing.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

pub type SessionId = u64;

/// Loop-side view of a session: cancellation token plus the active flag.
#[derive(Clone)]
pub struct SessionGuard {
    id: SessionId,
    cancel: CancellationToken,
    active: Arc<watch::Sender<bool>>,
}

impl SessionGuard {
    /// A new session whose token is a child of `parent`, so cancelling the
    /// parent (view teardown, superseded run) reaches it too.
    pub fn new(parent: &CancellationToken, active: bool) -> Self {
        let (active, _) = watch::channel(active);
        Self {
            id: NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed),
            cancel: parent.child_token(),
            active: Arc::new(active),
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
        self.set_active(false);
    }

    pub async fn cancelled(&self) {
        self.cancel.cancelled().await
    }

    /// Run `apply` only while the session is live.
    ///
    /// `apply` is synchronous: nothing can cancel the session between the
    /// check and the mutation.
    pub fn apply<T>(&self, apply: impl FnOnce() -> T) -> Option<T> {
        if self.cancel.is_cancelled() {
            return None;
        }
        Some(apply())
    }

    /// Await `fut` unless the session is cancelled first. An output that
    /// arrives after cancellation is dropped.
    pub async fn guarded<F: Future>(&self, fut: F) -> Option<F::Output> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => None,
            out = fut => {
                if self.cancel.is_cancelled() {
                    None
                } else {
                    Some(out)
                }
            }
        }
    }

    pub fn set_active(&self, active: bool) {
        self.active.send_if_modified(|current| {
            if *current == active {
                return false;
            }
            *current = active;
            true
        });
    }

    pub fn is_active(&self) -> bool {
        *self.active.borrow()
    }

    pub fn subscribe_active(&self) -> watch::Receiver<bool> {
        self.active.subscribe()
    }
}

/// One polling loop bound to `handle`, owned by the view that started it.
pub struct PollSession<H = ()> {
    handle: H,
    interval: Duration,
    guard: SessionGuard,
    task: Option<JoinHandle<()>>,
}

impl<H> PollSession<H> {
    pub(crate) fn spawn<F>(handle: H, interval: Duration, guard: SessionGuard, run: F) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let task = tokio::spawn(run);
        Self {
            handle,
            interval,
            guard,
            task: Some(task),
        }
    }

    pub fn id(&self) -> SessionId {
        self.guard.id()
    }

    pub fn handle(&self) -> &H {
        &self.handle
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn is_active(&self) -> bool {
        self.guard.is_active()
    }

    pub fn subscribe_active(&self) -> watch::Receiver<bool> {
        self.guard.subscribe_active()
    }

    pub fn is_cancelled(&self) -> bool {
        self.guard.is_cancelled()
    }

    pub fn cancel(&self) {
        self.guard.cancel();
    }

    pub(crate) fn guard(&self) -> &SessionGuard {
        &self.guard
    }

    /// Whether the loop task has exited (its ticker is gone).
    pub fn is_finished(&self) -> bool {
        self.task.as_ref().map_or(true, |task| task.is_finished())
    }

    /// Wait for the loop task to exit without cancelling it.
    pub async fn finished(mut self) {
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::error!(session = self.guard.id(), error = %e, "Poll loop panicked");
            }
        }
    }
}

impl<H> Drop for PollSession<H> {
    fn drop(&mut self) {
        self.guard.cancel();
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FirstTick {
    /// Fire as soon as the ticker is created.
    Immediate,
    /// Fire one full period after creation.
    AfterInterval,
}

/// Fixed-period ticker that stops at session cancellation.
///
/// A late response delays the following tick instead of producing a burst.
pub struct Ticker {
    interval: Interval,
}

impl Ticker {
    pub fn new(period: Duration, first: FirstTick) -> Self {
        let period = period.max(Duration::from_millis(1));
        let start = match first {
            FirstTick::Immediate => Instant::now(),
            FirstTick::AfterInterval => Instant::now() + period,
        };
        let mut interval = tokio::time::interval_at(start, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self { interval }
    }

    /// Wait for the next tick. `false` once the session is cancelled.
    pub async fn tick(&mut self, guard: &SessionGuard) -> bool {
        tokio::select! {
            biased;
            _ = guard.cancelled() => false,
            _ = self.interval.tick() => !guard.is_cancelled(),
        }
    }
}

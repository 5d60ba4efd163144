//! The view-side owner of one computation slot.
//!
//! A [`ComputationSlot`] holds at most one run. An accepted resubmission
//! cancels the current run before the new one starts, and dropping the slot cancels
//! everything it started. The view reads progress, outcome and the latest
//! result snapshot through `watch` receivers.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::client::{
    ComputationParams, GroupHandle, GroupProgress, ResultsSnapshot, SubmittedHandle, TaskApi, TaskHandle,
};
use crate::config::PollingConfig;
use crate::error::SubmissionError;
use crate::poll::{
    GroupEvent, GroupProgressPoller, PollSession, ResultsStreamer, SessionGuard, StatusPoller, TaskEvent,
};
use crate::submitter::TaskSubmitter;

/// What the view shows for the slot. Exactly one at a time.
#[derive(Clone, Debug, PartialEq)]
pub enum SlotState {
    Idle,
    /// The start request failed; the trigger stays enabled.
    SubmissionFailed(String),
    Running(GroupProgress),
    Succeeded,
    Failed(String),
    /// Progress could not be read any more. Not a success, not a reported failure.
    Abandoned(String),
}

impl SlotState {
    pub fn is_running(&self) -> bool {
        matches!(self, SlotState::Running(_))
    }

    /// Progress bar value in `0.0..=100.0`.
    pub fn percent(&self) -> f64 {
        match self {
            SlotState::Running(progress) => progress.percent(),
            SlotState::Succeeded => 100.0,
            _ => 0.0,
        }
    }
}

#[derive(Clone)]
struct ViewState {
    state: Arc<watch::Sender<SlotState>>,
    snapshot: Arc<watch::Sender<Option<ResultsSnapshot>>>,
}

enum RunSessions {
    Task(PollSession<TaskHandle>),
    Group {
        progress: PollSession<GroupHandle>,
        results: PollSession,
    },
}

struct ActiveRun {
    guard: SessionGuard,
    sessions: Option<RunSessions>,
    driver: Option<JoinHandle<()>>,
}

impl ActiveRun {
    async fn shutdown(mut self) {
        self.guard.cancel();
        if let Some(driver) = self.driver.take() {
            let _ = driver.await;
        }
        match self.sessions.take() {
            Some(RunSessions::Task(session)) => session.finished().await,
            Some(RunSessions::Group { progress, results }) => {
                progress.finished().await;
                results.finished().await;
            }
            None => {}
        }
    }
}

impl Drop for ActiveRun {
    fn drop(&mut self) {
        self.guard.cancel();
    }
}

pub struct ComputationSlot {
    api: Arc<dyn TaskApi>,
    submitter: TaskSubmitter,
    config: PollingConfig,
    view: CancellationToken,
    params: watch::Sender<ComputationParams>,
    view_state: ViewState,
    run: Option<ActiveRun>,
}

impl ComputationSlot {
    pub fn new(api: Arc<dyn TaskApi>, config: PollingConfig) -> Self {
        Self::with_params(api, config, ComputationParams::default())
    }

    pub fn with_params(api: Arc<dyn TaskApi>, config: PollingConfig, params: ComputationParams) -> Self {
        let (params, _) = watch::channel(params);
        let (state, _) = watch::channel(SlotState::Idle);
        let (snapshot, _) = watch::channel(None);
        Self {
            submitter: TaskSubmitter::new(Arc::clone(&api)),
            api,
            config: config.sanitized(),
            view: CancellationToken::new(),
            params,
            view_state: ViewState {
                state: Arc::new(state),
                snapshot: Arc::new(snapshot),
            },
            run: None,
        }
    }

    pub fn params(&self) -> ComputationParams {
        self.params.borrow().clone()
    }

    /// Edit the parameters. A running results stream uses the new values
    /// from its next tick on.
    pub fn update_params(&self, edit: impl FnOnce(&mut ComputationParams)) {
        self.params.send_modify(edit);
    }

    pub fn state(&self) -> SlotState {
        self.view_state.state.borrow().clone()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<SlotState> {
        self.view_state.state.subscribe()
    }

    pub fn snapshot(&self) -> Option<ResultsSnapshot> {
        self.view_state.snapshot.borrow().clone()
    }

    pub fn subscribe_snapshot(&self) -> watch::Receiver<Option<ResultsSnapshot>> {
        self.view_state.snapshot.subscribe()
    }

    pub fn is_polling(&self) -> bool {
        self.view_state.state.borrow().is_running()
    }

    /// Submit the current parameters. Only an accepted submission replaces
    /// the run in progress; a rejected one leaves it polling and is reported
    /// through the returned error alone.
    pub async fn submit(&mut self) -> Result<SubmittedHandle, SubmissionError> {
        let params = self.params();
        match self.submitter.submit(&params).await {
            Ok(handle) => {
                self.stop_run();
                self.view_state.snapshot.send_replace(None);
                self.view_state
                    .state
                    .send_replace(SlotState::Running(GroupProgress::default()));
                self.start_run(handle.clone());
                Ok(handle)
            }
            Err(e) => {
                if !self.is_polling() {
                    self.view_state
                        .state
                        .send_replace(SlotState::SubmissionFailed(e.to_string()));
                }
                Err(e)
            }
        }
    }

    /// User-initiated cancellation of the current run.
    pub fn cancel(&mut self) {
        if self.run.is_some() {
            self.stop_run();
            self.view_state.state.send_replace(SlotState::Idle);
        }
    }

    /// Tear the view down and wait until every loop it started has exited.
    pub async fn teardown(mut self) {
        self.view.cancel();
        if let Some(run) = self.run.take() {
            run.shutdown().await;
        }
    }

    fn stop_run(&mut self) {
        if let Some(run) = self.run.take() {
            tracing::debug!(run = run.guard.id(), "Cancelling active run");
        }
    }

    fn start_run(&mut self, handle: SubmittedHandle) {
        let guard = SessionGuard::new(&self.view, true);
        let (sessions, driver) = match handle {
            SubmittedHandle::Task(task) => {
                let (tx, rx) = mpsc::unbounded_channel();
                let poller = StatusPoller::new(Arc::clone(&self.api), self.config.status_interval);
                let session = poller.start(task, guard.token(), tx);
                tracing::debug!(
                    run = guard.id(),
                    task_id = %session.handle(),
                    interval_ms = session.interval().as_millis() as u64,
                    "Polling task status",
                );
                let driver = tokio::spawn(drive_task(rx, guard.clone(), self.view_state.clone()));
                (RunSessions::Task(session), driver)
            }
            SubmittedHandle::Group(group) => {
                let (progress_tx, progress_rx) = mpsc::unbounded_channel();
                let (results_tx, results_rx) = mpsc::unbounded_channel();
                let poller = GroupProgressPoller::new(Arc::clone(&self.api), self.config.group_interval);
                let progress = poller.start(group, guard.token(), progress_tx);
                tracing::debug!(
                    run = guard.id(),
                    group_id = %progress.handle(),
                    interval_ms = progress.interval().as_millis() as u64,
                    "Polling group progress",
                );
                let streamer = ResultsStreamer::new(Arc::clone(&self.api), self.config.results_interval);
                let results = streamer.start(
                    self.params.subscribe(),
                    progress.subscribe_active(),
                    guard.token(),
                    results_tx,
                );
                let driver = tokio::spawn(drive_group(
                    GroupChannels {
                        progress: progress_rx,
                        results: results_rx,
                    },
                    guard.clone(),
                    results.guard().clone(),
                    Arc::clone(&self.api),
                    self.params.subscribe(),
                    self.view_state.clone(),
                ));
                (RunSessions::Group { progress, results }, driver)
            }
        };
        self.run = Some(ActiveRun {
            guard,
            sessions: Some(sessions),
            driver: Some(driver),
        });
    }
}

impl Drop for ComputationSlot {
    fn drop(&mut self) {
        self.view.cancel();
    }
}

async fn drive_task(mut events: mpsc::UnboundedReceiver<TaskEvent>, guard: SessionGuard, view: ViewState) {
    loop {
        let event = tokio::select! {
            biased;
            _ = guard.cancelled() => break,
            event = events.recv() => event,
        };
        let Some(event) = event else {
            break;
        };
        let applied = guard.apply(|| match event {
            TaskEvent::Status(_) => true,
            TaskEvent::Succeeded(payload) => {
                view.snapshot
                    .send_replace(Some(ResultsSnapshot::from_payload(payload)));
                view.state.send_replace(SlotState::Succeeded);
                false
            }
            TaskEvent::Failed(failure) => {
                view.state.send_replace(SlotState::Failed(failure.to_string()));
                false
            }
        });
        if applied != Some(true) {
            break;
        }
    }
    guard.set_active(false);
}

struct GroupChannels {
    progress: mpsc::UnboundedReceiver<GroupEvent>,
    results: mpsc::UnboundedReceiver<Option<ResultsSnapshot>>,
}

async fn drive_group(
    mut channels: GroupChannels,
    guard: SessionGuard,
    streamer: SessionGuard,
    api: Arc<dyn TaskApi>,
    params: watch::Receiver<ComputationParams>,
    view: ViewState,
) {
    let mut results_open = true;

    loop {
        tokio::select! {
            biased;
            _ = guard.cancelled() => break,
            event = channels.progress.recv() => {
                let Some(event) = event else {
                    break;
                };
                match event {
                    GroupEvent::Progress(progress) => {
                        guard.apply(|| {
                            view.state.send_replace(SlotState::Running(progress));
                        });
                    }
                    GroupEvent::Completed(progress) => {
                        streamer.cancel();
                        refresh_final_results(api.as_ref(), &params, &guard, &view).await;
                        guard.apply(|| {
                            tracing::info!(completed = progress.completed, total = progress.total, "Computation finished");
                            view.state.send_replace(SlotState::Succeeded);
                        });
                        break;
                    }
                    GroupEvent::Abandoned(error) => {
                        guard.apply(|| {
                            view.state.send_replace(SlotState::Abandoned(error.to_string()));
                        });
                        break;
                    }
                }
            }
            snapshot = channels.results.recv(), if results_open => {
                match snapshot {
                    Some(snapshot) => {
                        guard.apply(|| {
                            view.snapshot.send_replace(snapshot);
                        });
                    }
                    None => results_open = false,
                }
            }
        }
    }

    streamer.cancel();
    guard.set_active(false);
}

/// One closing results fetch after completion, so sub-tasks finished after
/// the last streaming tick show up.
async fn refresh_final_results(
    api: &dyn TaskApi,
    params: &watch::Receiver<ComputationParams>,
    guard: &SessionGuard,
    view: &ViewState,
) {
    let current = params.borrow().clone();
    if !current.is_queryable() {
        return;
    }
    match guard.guarded(api.results(&current)).await {
        Some(Ok(snapshot)) => {
            guard.apply(|| {
                view.snapshot.send_replace(Some(snapshot));
            });
        }
        Some(Err(e)) => {
            tracing::warn!(client_id = current.client_id, error = %e, "Final results fetch failed");
        }
        None => {}
    }
}

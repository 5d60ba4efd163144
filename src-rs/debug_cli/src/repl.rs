use std::sync::Arc;

use tokio::io::{self, AsyncBufReadExt, BufReader};
use tokio::task::JoinHandle;

use telemetry_tasks::{ComputationSlot, HttpTaskApi, SubmittedHandle};

use crate::cli::parse_kind;
use crate::models::CLIConfig;
use crate::render;

pub struct REPL {
    pub config: CLIConfig,
    slot: ComputationSlot,
    watchers: Vec<JoinHandle<()>>,
}

impl REPL {
    pub fn new(config: CLIConfig) -> Result<Self, String> {
        let slot = build_slot(&config)?;
        let watchers = spawn_watchers(&slot);
        Ok(Self {
            config,
            slot,
            watchers,
        })
    }

    pub async fn run(mut self) {
        render::banner(&self.config);
        let mut lines = BufReader::new(io::stdin()).lines();
        loop {
            render::prompt();
            let line = match lines.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) | Err(_) => break,
            };
            let line = line.trim().to_string();
            if line.is_empty() {
                continue;
            }
            if !line.starts_with('/') {
                render::info("commands start with '/', type /help");
                continue;
            }
            if self.handle_command(&line).await {
                break;
            }
        }

        for watcher in self.watchers.drain(..) {
            watcher.abort();
        }
        self.slot.teardown().await;
    }

    async fn handle_command(&mut self, line: &str) -> bool {
        let mut parts = line.splitn(2, ' ');
        let cmd = parts.next().unwrap_or("").trim_start_matches('/');
        let rest = parts.next().unwrap_or("").trim();
        match cmd {
            "exit" | "quit" => return true,
            "help" => render::help(),
            "client" => match rest.parse::<i64>() {
                Ok(id) => {
                    self.slot.update_params(|params| params.client_id = id);
                    render::info(&format!("client: {}", id));
                }
                Err(_) => render::error("invalid client id"),
            },
            "year" => match rest.parse::<i32>() {
                Ok(year) => {
                    self.slot.update_params(|params| params.year = year);
                    render::info(&format!("year: {}", year));
                }
                Err(_) => render::error("invalid year"),
            },
            "month" => match rest.parse::<u32>() {
                Ok(month) => {
                    self.slot.update_params(|params| params.month = month);
                    render::info(&format!("month: {}", month));
                }
                Err(_) => render::error("invalid month"),
            },
            "kind" => match parse_kind(rest) {
                Some(kind) => {
                    self.slot.update_params(|params| params.kind = kind);
                    render::info(&format!("kind: {:?}", kind));
                }
                None => render::error("kind must be breakdown or summary"),
            },
            "start" => self.start().await,
            "cancel" => {
                if self.slot.is_polling() {
                    self.slot.cancel();
                    render::info("run cancelled");
                } else {
                    render::info("nothing is running");
                }
            }
            "status" => render::status(&self.slot.state()),
            "rows" => render::rows(self.slot.snapshot().as_ref()),
            "config" => {
                self.config.params = self.slot.params();
                render::config(&self.config);
            }
            "base" => {
                if rest.is_empty() {
                    render::info(&format!("base: {}", self.config.polling.api_base_url));
                } else {
                    self.rebuild(rest).await;
                }
            }
            _ => render::info("unknown command, type /help"),
        }
        false
    }

    async fn start(&mut self) {
        match self.slot.submit().await {
            Ok(SubmittedHandle::Group(group)) => render::info(&format!("started group {}", group)),
            Ok(SubmittedHandle::Task(task)) => render::info(&format!("started task {}", task)),
            Err(err) => render::error(&err.to_string()),
        }
    }

    async fn rebuild(&mut self, base_url: &str) {
        tracing::debug!(base = %base_url, "Rebuilding computation slot");
        let mut config = self.config.clone();
        config.polling.api_base_url = base_url.to_string();
        config.params = self.slot.params();
        let slot = match build_slot(&config) {
            Ok(slot) => slot,
            Err(err) => {
                render::error(&err);
                return;
            }
        };

        for watcher in self.watchers.drain(..) {
            watcher.abort();
        }
        let previous = std::mem::replace(&mut self.slot, slot);
        previous.teardown().await;
        self.watchers = spawn_watchers(&self.slot);
        self.config = config;
        render::info("base url updated");
    }
}

fn build_slot(config: &CLIConfig) -> Result<ComputationSlot, String> {
    let api = HttpTaskApi::new(&config.polling.api_base_url, config.polling.request_timeout)
        .map_err(|err| err.to_string())?;
    Ok(ComputationSlot::with_params(
        Arc::new(api),
        config.polling.clone(),
        config.params.clone(),
    ))
}

fn spawn_watchers(slot: &ComputationSlot) -> Vec<JoinHandle<()>> {
    let mut state = slot.subscribe_state();
    let state_watcher = tokio::spawn(async move {
        while state.changed().await.is_ok() {
            let current = state.borrow_and_update().clone();
            render::state_change(&current);
        }
    });

    let mut snapshot = slot.subscribe_snapshot();
    let snapshot_watcher = tokio::spawn(async move {
        while snapshot.changed().await.is_ok() {
            let current = snapshot.borrow_and_update().clone();
            render::snapshot_change(current.as_ref());
        }
    });

    vec![state_watcher, snapshot_watcher]
}

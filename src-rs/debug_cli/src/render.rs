use std::io::{self, Write};

use telemetry_tasks::{GroupProgress, ResultsSnapshot, SlotState};

use crate::models::CLIConfig;

const BAR_WIDTH: usize = 30;

pub fn banner(cfg: &CLIConfig) {
    println!("Telemetry Tasks Debug CLI");
    println!("API: {}", cfg.polling.api_base_url);
    println!(
        "Client: {}  Period: {}-{:02}  Kind: {:?}",
        cfg.params.client_id, cfg.params.year, cfg.params.month, cfg.params.kind
    );
    println!("Type /help for commands.");
}

pub fn prompt() {
    print!("> ");
    let _ = io::stdout().flush();
}

pub fn help() {
    println!("Commands:");
    println!("  /help                       Show commands");
    println!("  /exit | /quit                Exit");
    println!("  /client <id>                 Set client id");
    println!("  /year <yyyy>                 Set year");
    println!("  /month <1-12>                Set month");
    println!("  /kind <breakdown|summary>    Choose the computation");
    println!("  /start                       Submit and start polling");
    println!("  /cancel                      Cancel the running computation");
    println!("  /status                      Show state and progress");
    println!("  /rows                        Show the latest result rows");
    println!("  /config                      Show current config");
    println!("  /base <url>                  Update API base URL");
}

pub fn progress_bar(progress: &GroupProgress) -> String {
    let filled = (progress.fraction() * BAR_WIDTH as f64).round() as usize;
    format!(
        "[{}{}] {:>3.0}% {} of {} device-days",
        "#".repeat(filled),
        ".".repeat(BAR_WIDTH - filled.min(BAR_WIDTH)),
        progress.percent(),
        progress.completed,
        progress.total
    )
}

pub fn status(state: &SlotState) {
    match state {
        SlotState::Idle => println!("idle"),
        SlotState::SubmissionFailed(err) => println!("submission failed: {}", err),
        SlotState::Running(progress) => println!("running {}", progress_bar(progress)),
        SlotState::Succeeded => println!("succeeded"),
        SlotState::Failed(err) => println!("failed: {}", err),
        SlotState::Abandoned(err) => println!("abandoned: {}", err),
    }
}

pub fn state_change(state: &SlotState) {
    print!("\r");
    status(state);
    prompt();
}

pub fn snapshot_change(snapshot: Option<&ResultsSnapshot>) {
    match snapshot {
        Some(snapshot) => println!("\r{} result rows", snapshot.len()),
        None => println!("\rresults cleared"),
    }
    prompt();
}

pub fn rows(snapshot: Option<&ResultsSnapshot>) {
    let Some(snapshot) = snapshot.filter(|s| !s.is_empty()) else {
        println!("no rows");
        return;
    };
    for row in &snapshot.data {
        println!("{}", row);
    }
}

pub fn config(cfg: &CLIConfig) {
    println!("config:");
    println!("  base: {}", cfg.polling.api_base_url);
    println!("  status interval: {:?}", cfg.polling.status_interval);
    println!("  group interval: {:?}", cfg.polling.group_interval);
    println!("  results interval: {:?}", cfg.polling.results_interval);
    println!("  request timeout: {:?}", cfg.polling.request_timeout);
    println!("  client: {}", cfg.params.client_id);
    println!("  period: {}-{:02}", cfg.params.year, cfg.params.month);
    println!("  kind: {:?}", cfg.params.kind);
}

pub fn info(msg: &str) {
    println!("{}", msg);
}

pub fn error(msg: &str) {
    eprintln!("error: {}", msg);
}

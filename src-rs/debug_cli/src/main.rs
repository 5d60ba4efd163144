mod cli;
mod models;
mod repl;
mod render;

use repl::REPL;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "telemetry_tasks=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = cli::parse_config();
    match REPL::new(config) {
        Ok(repl) => repl.run().await,
        Err(err) => {
            render::error(&err);
            std::process::exit(1);
        }
    }
}

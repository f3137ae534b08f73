use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use saya_dictionary::DictionaryService;
use tokio::signal;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

pub mod cli;
pub mod config_file;
pub mod controller;
pub mod events;
pub mod io;
pub mod state;
pub mod ui;

#[cfg(test)]
mod tests;

use self::cli::Cli;
use self::controller::AppController;
use self::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    let mut config = config_file::load_config(cli.config.as_deref())?;
    if let Some(store) = cli.store {
        config.dictionary.store_path = store;
    }

    let service = DictionaryService::open(&config.dictionary)?;
    let state = Arc::new(AppState::new(config, service));

    match cli.command {
        Some(command) => cli::run_command(state, command, cli.json).await,
        None => {
            // Shutdown future (Ctrl+C)
            let shutdown = async {
                if let Err(e) = signal::ctrl_c().await {
                    tracing::error!("failed to listen for ctrl+c: {e}");
                    std::future::pending::<()>().await;
                }
            };
            run(state, shutdown).await
        }
    }
}

/// Logs go to stderr so stdout stays clean for results
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(atty::is(atty::Stream::Stderr)),
        )
        .init();
}

pub async fn run(state: Arc<AppState>, shutdown: impl Future<Output = ()>) -> anyhow::Result<()> {
    let (delta_time, capacity) = {
        let config = state.config.read().await;
        (Duration::from_millis(config.delta_time), config.channel_capacity)
    };

    let controller = AppController::new(state, capacity);
    let mut tasks = controller.spawn_tasks(delta_time);

    tokio::select! {
        _ = shutdown => {
            tracing::info!("Shutdown requested");
        }
        Some(result) = tasks.join_next() => {
            match result {
                Ok(Ok(())) => tracing::info!("task exited"),
                Ok(Err(e)) => tracing::error!("task failed: {e}"),
                Err(e) => tracing::error!("task panicked: {e}"),
            }
        }
    }

    controller.shutdown();
    tasks.shutdown().await;
    Ok(())
}

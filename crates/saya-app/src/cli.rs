use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use saya_types::{ImportProgress, SearchMode};
use tokio_util::sync::CancellationToken;

use crate::config_file::write_config;
use crate::state::AppState;
use crate::ui::{format_dictionary, format_result};

#[derive(Parser, Debug)]
#[command(name = "saya", version, about = "Yomitan dictionary import and ranked lookup")]
pub struct Cli {
    /// SQLite store, overrides SAYA_STORE_PATH
    #[arg(long, global = true)]
    pub store: Option<String>,

    /// JSON config file, overrides SAYA_CONFIG
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Without a command, read commands interactively from stdin
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Import a Yomitan archive
    Import { path: PathBuf },
    /// Ranked search over term, reading and definition
    Search {
        query: String,
        /// Term/reading only, capped
        #[arg(long)]
        fast: bool,
        #[arg(long)]
        profile: Option<i64>,
    },
    /// Match every word of a piece of text
    Lookup {
        text: String,
        #[arg(long)]
        profile: Option<i64>,
    },
    /// Delete a dictionary and everything it owns
    Delete { id: i64 },
    /// Set a dictionary's priority (higher ranks first)
    Priority { id: i64, priority: i64 },
    /// List imported dictionaries
    List,
    /// Count entries in one dictionary or all of them
    Count { id: Option<i64> },
    /// Write the effective config as JSON
    InitConfig { path: PathBuf },
}

pub async fn run_command(state: Arc<AppState>, command: Command, json: bool) -> anyhow::Result<()> {
    let service = &state.dictionary;
    match command {
        Command::Import { path } => {
            let cancel = CancellationToken::new();
            let on_ctrl_c = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    tracing::warn!("[IMPORT] Cancelling after the current batch");
                    on_ctrl_c.cancel();
                }
            });

            let progress = |p: ImportProgress| {
                tracing::info!("[IMPORT] {:>5.1}% {}", p.percent, p.message);
            };
            let outcome = service.import_archive_file(path, progress, cancel).await?;
            println!(
                "Imported '{}' as #{}: {} entries, {} frequencies, {} pitch accents ({} skipped)",
                outcome.title,
                outcome.dictionary_id,
                outcome.entries,
                outcome.frequencies,
                outcome.pitch_accents,
                outcome.skipped
            );
        }
        Command::Search {
            query,
            fast,
            profile,
        } => {
            let mode = if fast { SearchMode::Fast } else { SearchMode::Full };
            let entries = service.search(&query, profile, mode).await;
            let results = state.processor.display_results(entries, service).await;
            if json {
                println!("{}", serde_json::to_string_pretty(&results)?);
            } else {
                for result in &results {
                    println!("{}", format_result(result));
                }
            }
        }
        Command::Lookup { text, profile } => {
            let entries = state.processor.match_words(&text, service, profile).await;
            let results = state.processor.display_results(entries, service).await;
            if json {
                println!("{}", serde_json::to_string_pretty(&results)?);
            } else {
                for result in &results {
                    println!("{}", format_result(result));
                }
            }
        }
        Command::Delete { id } => {
            if service.delete_dictionary(id).await? {
                println!("Deleted dictionary #{}", id);
            } else {
                anyhow::bail!("No dictionary #{}", id);
            }
        }
        Command::Priority { id, priority } => {
            service.update_dictionary_priority(id, priority).await?;
            println!("Dictionary #{} priority set to {}", id, priority);
        }
        Command::List => {
            let dictionaries = service.list_dictionaries().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&dictionaries)?);
            } else {
                for dictionary in &dictionaries {
                    println!("{}", format_dictionary(dictionary));
                }
            }
        }
        Command::Count { id } => {
            println!("{}", service.get_entry_count(id).await?);
        }
        Command::InitConfig { path } => {
            let config = state.config.read().await;
            write_config(&path, &config)?;
        }
    }
    Ok(())
}

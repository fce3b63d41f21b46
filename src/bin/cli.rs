//! CLI binary for grand-search.

use clap::Parser;
use grand_search::{GrandSearchConfig, MainController, MatchedItemMap, TaskEvent};
use std::path::PathBuf;
use tracing::info;

/// Grand Search: search files, applications and more from the terminal.
#[derive(Parser)]
#[command(name = "grand-search", version, about)]
struct Cli {
    /// Path to TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print all results as JSON once the search is finished.
    #[arg(long)]
    json: bool,

    /// Text to search for.
    query: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match cli.config {
        Some(ref path) => GrandSearchConfig::from_file(path)?,
        None => GrandSearchConfig::load_or_default(),
    };
    let _log_guard = grand_search::logging::init_logging(&config.log)?;

    let controller = MainController::new(config)?;
    let (task, mut events) = controller.search(&cli.query)?;

    let mut printed = 0usize;
    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(TaskEvent::Matched) => {
                    let batch = task.read_buffer();
                    if !cli.json {
                        printed += print_batch(&batch);
                    }
                }
                Some(TaskEvent::Finished) => {
                    info!(task_id = %task.task_id(), "search finished");
                    break;
                }
                None => break,
            },
            _ = tokio::signal::ctrl_c() => {
                info!("received Ctrl+C, stopping search...");
                controller.terminate();
                break;
            }
        }
    }

    let results = task.results();
    if cli.json {
        println!("{}", serde_json::to_string_pretty(&results)?);
    } else {
        // Anything merged after the last Matched event.
        printed += print_batch(&task.read_buffer());
        eprintln!("{printed} results in {} groups", results.len());
    }
    controller.terminate();
    Ok(())
}

fn print_batch(batch: &MatchedItemMap) -> usize {
    let mut count = 0;
    for (group, items) in batch {
        for item in items {
            println!("[{group}] {}\t{}", item.name, item.item);
            count += 1;
        }
    }
    count
}

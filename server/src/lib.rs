//! nexus-memd: command-line front end and retention daemon for the Nexus
//! memory layer.
//!
//! One-shot commands (`add`, `search`, `show`, `list`, `delete`, `sweep`,
//! `stats`) print JSON to stdout. `serve` keeps the store open and runs
//! retention sweeps on a fixed interval until Ctrl-C.

pub mod cli;
pub mod commands;
pub mod error;
pub mod scheduler;

pub use cli::{Args, Command};
pub use error::{CliError, CliResult};

use nexus_memory::{render_context, MemoryEngine};
use std::sync::Arc;
use std::time::Duration;

/// Execute the parsed command line.
pub async fn run(args: Args) -> CliResult<()> {
    let config = args.load_config()?;
    let data_dir = args.data_dir();
    std::fs::create_dir_all(&data_dir)?;

    tracing::debug!("Opening memory store at {:?}", data_dir);
    let engine = Arc::new(MemoryEngine::open(&data_dir, config)?);

    match &args.command {
        Command::Serve { interval_secs } => {
            let secs = interval_secs.unwrap_or(engine.config().retention.sweep_interval_secs);
            if secs == 0 {
                return Err(CliError::InvalidArgument(
                    "sweep interval must be at least one second".to_string(),
                ));
            }

            tracing::info!(
                "Serving {:?}: {} memories, sweeping every {}s",
                data_dir,
                engine.store().len(),
                secs
            );
            scheduler::run_retention_loop(engine, Duration::from_secs(secs), scheduler::ctrl_c())
                .await?;
        }

        Command::Search {
            query,
            limit,
            context: true,
        } => {
            let k = limit.unwrap_or(engine.config().search.limit);
            let results = engine.search(&query.join(" "), k)?;
            let rendered = render_context(&results);
            if !rendered.is_empty() {
                println!("{}", rendered);
            }
        }

        command => {
            let value = commands::execute(&engine, command)?;
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
    }

    Ok(())
}

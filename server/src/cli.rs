//! Command-line arguments.

use clap::{Parser, Subcommand};
use nexus_memory::MemoryConfig;
use std::path::PathBuf;

use crate::error::CliResult;

/// Default store location, relative to the working directory
pub const DEFAULT_DATA_DIR: &str = ".nexus/memory";

#[derive(Debug, Parser)]
#[command(name = "nexus-memd")]
#[command(about = "Nexus memory engine: store, search and prune memories")]
#[command(version)]
pub struct Args {
    /// Directory holding the memory database
    #[arg(long, short = 'd', global = true)]
    pub data_dir: Option<PathBuf>,

    /// JSON config file (confidence, search, retention sections)
    #[arg(long, short = 'c', global = true)]
    pub config: Option<PathBuf>,

    /// Override the usage reinforcement constant
    #[arg(long, global = true)]
    pub reinforcement: Option<f64>,

    /// Override the retention prune threshold
    #[arg(long, global = true)]
    pub prune_threshold: Option<f64>,

    /// Debug logging
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Store a new memory
    Add {
        /// Memory text
        content: String,
        /// fact, preference, project, skill, or any other label
        #[arg(long = "type", short = 't', default_value = "fact")]
        memory_type: String,
        /// Ranking weight (default 1)
        #[arg(long, short = 'i')]
        importance: Option<i64>,
        /// Tag, repeatable
        #[arg(long = "tag")]
        tags: Vec<String>,
    },
    /// Search memories; returned memories are reinforced
    Search {
        /// Query terms
        #[arg(required = true)]
        query: Vec<String>,
        /// Maximum results (defaults to the configured limit)
        #[arg(long, short = 'k')]
        limit: Option<usize>,
        /// Print `- content` lines instead of JSON
        #[arg(long)]
        context: bool,
    },
    /// Show one memory with its current confidence
    Show { id: String },
    /// List memories in insertion order
    List {
        /// Only memories carrying this tag
        #[arg(long)]
        tag: Option<String>,
    },
    /// Delete a memory (succeeds if already gone)
    Delete { id: String },
    /// Prune memories below the retention threshold
    Sweep {
        /// Report what would be pruned without deleting
        #[arg(long)]
        dry_run: bool,
    },
    /// Store statistics
    Stats,
    /// Run retention sweeps on a schedule until interrupted
    Serve {
        /// Seconds between sweeps (defaults to the configured interval)
        #[arg(long)]
        interval_secs: Option<u64>,
    },
}

impl Args {
    pub fn data_dir(&self) -> PathBuf {
        self.data_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR))
    }

    /// Config file (or defaults) with command-line overrides applied
    pub fn load_config(&self) -> CliResult<MemoryConfig> {
        let mut config = match &self.config {
            Some(path) => MemoryConfig::from_file(path)?,
            None => MemoryConfig::default(),
        };

        if let Some(reinforcement) = self.reinforcement {
            config.confidence.reinforcement = reinforcement;
        }
        if let Some(threshold) = self.prune_threshold {
            config.retention.prune_threshold = threshold;
        }

        config.validate()?;
        Ok(config)
    }
}

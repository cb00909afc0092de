//! nexus-memd entry point
//!
//! Logs go to stderr so stdout stays clean JSON for scripts.

use clap::Parser;
use nexus_memd::Args;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Initialize logging
    let log_filter = if args.verbose {
        "nexus_memd=debug,nexus_memory=debug"
    } else {
        "nexus_memd=info,nexus_memory=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Err(e) = nexus_memd::run(args).await {
        tracing::error!("{}", e);
        std::process::exit(e.exit_code());
    }
}

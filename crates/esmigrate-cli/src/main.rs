//! esmigrate command-line driver
//!
//! Runs migrations, index copies and alias moves against an in-memory
//! backend. With `--state` the backend's indices and aliases are read from a
//! JSON file before the command and written back after it succeeds, so
//! several invocations can build on each other. Without a subcommand the
//! bundled "people" chain is run.

mod commands;
mod demo;
mod formatter;

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use commands::Command;
use esmigrate_core::{MigrationConfig, ScrollConfig};
use formatter::OutputFormat;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// esmigrate command-line driver
#[derive(Parser, Debug)]
#[command(name = "esmigrate")]
#[command(version, about = "Staged migrations for aliased indices, run against an in-memory backend")]
pub struct Cli {
    /// JSON file holding the backend's indices and aliases
    #[arg(long, global = true)]
    pub state: Option<PathBuf>,

    /// Documents fetched per scroll page
    #[arg(long, global = true, default_value_t = esmigrate_core::config::DEFAULT_PAGE_SIZE)]
    pub page_size: usize,

    /// Scroll cursor keep-alive in seconds
    #[arg(long, global = true, default_value_t = 60)]
    pub keep_alive_secs: u64,

    /// Log copy progress every N documents (0 disables)
    #[arg(long, global = true, default_value_t = esmigrate_core::config::DEFAULT_PROGRESS_INTERVAL)]
    pub progress_interval: u64,

    /// Output format
    #[arg(long, global = true, default_value = "table", value_enum)]
    pub format: OutputFormat,

    #[command(subcommand)]
    pub command: Option<Command>,
}

fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "esmigrate=info,esmigrate_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let scroll = ScrollConfig::new()
        .with_page_size(cli.page_size)
        .with_keep_alive(Duration::from_secs(cli.keep_alive_secs));
    let config = MigrationConfig::new().with_progress_interval(cli.progress_interval);
    let command = cli.command.unwrap_or_default();

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        state = ?cli.state,
        page_size = scroll.page_size,
        keep_alive = %scroll.keep_alive_param(),
        "starting esmigrate"
    );

    let backend = commands::load_state(cli.state.as_deref())?.with_scroll_config(scroll);
    let output = commands::execute(&backend, command, &config, cli.format)?;
    println!("{}", output);

    if let Some(path) = cli.state.as_deref() {
        commands::save_state(path, &backend)?;
        tracing::info!(path = %path.display(), "state saved");
    }

    Ok(())
}

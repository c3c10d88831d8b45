//! Combat scenario runner.
//!
//! Replays RON scenarios against `combat-core` and prints the events the
//! engine publishes. Run with: `combat-sim run <scenario.ron>`

mod commands;
mod output;
mod scenario;

use anyhow::Result;
use clap::Parser;
use commands::{Run, Spells};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Combat scenario runner
#[derive(Parser)]
#[command(name = "combat-sim")]
#[command(about = "Replay combat scenarios against the engine", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Parser)]
enum Command {
    /// Run a scenario file and print the published events
    Run(Run),

    /// List the spells of a catalog
    Spells(Spells),
}

fn main() -> Result<()> {
    setup_logging();

    let cli = Cli::parse();

    match cli.command {
        Command::Run(cmd) => cmd.execute(),
        Command::Spells(cmd) => cmd.execute(),
    }
}

/// Logs go to stderr so event output on stdout stays machine-readable.
fn setup_logging() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .init();
}

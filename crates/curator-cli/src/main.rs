mod cmd;
mod gateway;
mod output;

use clap::{Parser, Subcommand};
use cmd::config::ConfigSubcommand;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "curator",
    about = "Vote on new posts by chosen authors, after a per-author delay",
    version,
    propagate_version = true
)]
struct Cli {
    /// Directory holding the state database (default: config `state_dir`, then ~/.curator)
    #[arg(long, global = true, env = "CURATOR_STATE_DIR")]
    state_dir: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan the ledger and vote until interrupted
    Run {
        /// Path to the config file (YAML or JSON)
        config: PathBuf,

        /// First block height to process (default: resume after the checkpoint)
        #[arg(long)]
        start_from: Option<u64>,
    },

    /// Show the checkpoint and number of recorded votes
    Status {
        /// Path to the config file (YAML or JSON)
        config: PathBuf,
    },

    /// List recorded votes, newest first
    History {
        /// Path to the config file (YAML or JSON)
        config: PathBuf,

        /// Maximum number of votes to list
        #[arg(long, default_value = "20")]
        limit: usize,
    },

    /// Inspect the configuration
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = match &cli.command {
        Commands::Run { .. } => tracing::Level::INFO,
        _ => tracing::Level::WARN,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let state_dir = cli.state_dir.as_deref();

    let result = match cli.command {
        Commands::Run { config, start_from } => cmd::run::run(&config, state_dir, start_from),
        Commands::Status { config } => cmd::status::run(&config, state_dir, cli.json),
        Commands::History { config, limit } => {
            cmd::history::run(&config, state_dir, limit, cli.json)
        }
        Commands::Config { subcommand } => cmd::config::run(subcommand, cli.json),
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

//! Puzzle Duel CLI - binary entry point.
//!
//! ```text
//! duel play <domain> [--count N] [--provider P] [--bank FILE]
//! duel race [--seed N]
//! ```
//!
//! `play` runs one batch through [`duel_engine::Session`]; `race` is the
//! interactive push-box race against the greedy move selector. Everything is
//! driven on a single-threaded runtime.

mod play;
mod race;

use std::{
    fs::{self, OpenOptions},
    path::PathBuf,
    sync::Mutex,
};

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use duel_engine::DuelConfig;
use duel_engine::duel_types::{Domain, Provider};

#[derive(Debug, Parser)]
#[command(name = "duel", version, about = "Human vs AI on generated puzzles")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Play one batch of puzzles.
    Play {
        /// wire, physics, agent, or riddle
        #[arg(value_parser = parse_domain)]
        domain: Domain,
        /// Puzzles in the batch (defaults to the configured batch size).
        #[arg(long, short = 'n')]
        count: Option<usize>,
        /// Override the configured opponent: simulated, openai, or gemini.
        #[arg(long, value_parser = parse_provider)]
        provider: Option<Provider>,
        /// TOML puzzle bank to play instead of generated puzzles.
        #[arg(long)]
        bank: Option<PathBuf>,
    },
    /// Race the AI to push your box onto your target.
    Race {
        /// Seed for a reproducible warehouse.
        #[arg(long)]
        seed: Option<u64>,
    },
}

fn parse_domain(raw: &str) -> Result<Domain, String> {
    Domain::parse(raw).ok_or_else(|| format!("unknown domain '{raw}'"))
}

fn parse_provider(raw: &str) -> Result<Provider, String> {
    Provider::parse(raw).map_err(|e| e.to_string())
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let (log_file, init_warnings) = open_duel_log_file();

    if let Some((log_path, file)) = log_file {
        tracing_subscriber::registry()
            .with(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
            .with(env_filter)
            .init();

        tracing::info!(path = %log_path.display(), "Logging initialized");
        for warning in init_warnings {
            tracing::warn!("{warning}");
        }
        return;
    }

    // No log file: stay silent rather than interleave logs with the game.
    tracing_subscriber::registry().with(env_filter).init();
}

fn open_duel_log_file() -> (Option<(PathBuf, std::fs::File)>, Vec<String>) {
    let mut warnings = Vec::new();

    for candidate in duel_log_file_candidates() {
        if let Some(parent) = candidate.parent()
            && let Err(e) = fs::create_dir_all(parent)
        {
            warnings.push(format!(
                "Failed to create log dir {}: {e}",
                parent.display()
            ));
            continue;
        }

        match OpenOptions::new().create(true).append(true).open(&candidate) {
            Ok(file) => return (Some((candidate, file)), warnings),
            Err(e) => warnings.push(format!(
                "Failed to open log file {}: {e}",
                candidate.display()
            )),
        }
    }

    (None, warnings)
}

fn duel_log_file_candidates() -> Vec<PathBuf> {
    let mut candidates = Vec::new();

    // Primary: ~/.duel/logs/duel.log
    if let Some(config_path) = DuelConfig::path()
        && let Some(config_dir) = config_path.parent()
    {
        candidates.push(config_dir.join("logs").join("duel.log"));
    }

    // Fallback: ./.duel/logs/duel.log
    candidates.push(PathBuf::from(".duel").join("logs").join("duel.log"));

    candidates
}

fn load_config() -> DuelConfig {
    match DuelConfig::load() {
        Ok(Some(config)) => config,
        Ok(None) => DuelConfig::default(),
        Err(e) => {
            eprintln!("warning: {e}; using defaults");
            DuelConfig::default()
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing();
    let config = load_config();

    match cli.command {
        Command::Play {
            domain,
            count,
            provider,
            bank,
        } => {
            let options = play::PlayOptions {
                domain,
                count: count.unwrap_or_else(|| config.batch_size()),
                provider,
                bank,
            };
            play::run(&config, options).await
        }
        Command::Race { seed } => race::run(seed).await,
    }
}

mod commands;
mod config;

use clap::{Parser, Subcommand};
use colored::Colorize;
use commands::{check, replay, CheckArgs, ReplayArgs};
use config::Config;
use std::path::PathBuf;

/// Scribe CLI - replay collaborative editing logs
#[derive(Parser, Debug)]
#[command(name = "scribe")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Config file (defaults to scribe.config.json in the current directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Apply a delta log to a document snapshot
    Replay(ReplayArgs),

    /// Decode a delta log without applying it
    Check(CheckArgs),
}

fn init_logging(level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => {
            let cwd = std::env::current_dir()
                .map_err(|e| anyhow::anyhow!("Cannot get current directory: {}", e))?;
            Config::load(&cwd.display().to_string())?
        }
    };

    init_logging(&config.log_level);

    match cli.command {
        Command::Replay(args) => replay(args, &config),
        Command::Check(args) => check(args),
    }
}

fn main() {
    let cli = Cli::parse();

    if let Err(err) = run(cli) {
        eprintln!();
        eprintln!("{} {}", "Error:".red().bold(), err);
        eprintln!();
        std::process::exit(1);
    }
}

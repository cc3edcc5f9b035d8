//! Autosnap CLI - autosnap command

use anyhow::Result;
use autosnap_cli::config::{Config, LogFormat, LogLevel, Overrides};
use autosnap_cli::{cmd, logging};
use autosnap_zfs::Mode;
use clap::{Parser, Subcommand};
use owo_colors::OwoColorize;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::warn;

/// Autosnap - periodic ZFS snapshots with tiered retention
#[derive(Parser)]
#[command(name = "autosnap")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Config file (default: $AUTOSNAP_CONFIG, then ~/.config/autosnap/config.toml)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// How zfs/zpool are reached: direct, chroot or test
    #[arg(long, global = true)]
    mode: Option<Mode>,

    /// info or debug
    #[arg(long, global = true)]
    log_level: Option<LogLevel>,

    /// text or json
    #[arg(long, global = true)]
    log_format: Option<LogFormat>,

    /// Log decisions without creating or destroying snapshots
    #[arg(long, global = true)]
    dry_run: bool,

    /// Skip the lock file
    #[arg(long, global = true)]
    no_lock: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create due snapshots and prune expired ones (default)
    Run {
        /// Write the JSON run report to this file
        #[arg(long, value_name = "PATH")]
        report: Option<PathBuf>,
    },
    /// Show pool health, usage and snapshot counts
    Status,
    /// Inspect configuration
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Print the effective configuration
    Show,
    /// Print an annotated example config file
    Example,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match execute(cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("{} {:#}", "error:".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

/// Returns whether the command succeeded
fn execute(cli: Cli) -> Result<bool> {
    // needs no config, so a broken config file cannot block it
    if matches!(cli.command, Some(Commands::Config(ConfigCommands::Example))) {
        cmd::config::run_example()?;
        return Ok(true);
    }

    let overrides = Overrides {
        config: cli.config,
        mode: cli.mode,
        log_level: cli.log_level,
        log_format: cli.log_format,
        dry_run: cli.dry_run,
        no_lock: cli.no_lock,
    };
    let loaded = Config::load(&overrides, |key| std::env::var(key).ok())?;
    let _guard = logging::init(&loaded.config)?;
    for warning in &loaded.warnings {
        warn!("{}", warning);
    }

    match cli.command.unwrap_or(Commands::Run { report: None }) {
        Commands::Run { report } => cmd::run::run(&loaded.config, report.as_deref()),
        Commands::Status => cmd::status::run(&loaded.config).map(|_| true),
        Commands::Config(ConfigCommands::Show) => {
            cmd::config::run_show(&loaded.config, loaded.source.as_deref()).map(|_| true)
        }
        Commands::Config(ConfigCommands::Example) => cmd::config::run_example().map(|_| true),
    }
}

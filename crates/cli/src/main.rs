//! LinkSphere CLI - share and browse links from the terminal

mod commands;

use anyhow::Result;
use clap::{Parser, ValueEnum};
use commands::Commands;
use linksphere_core::LinkSphereConfig;
use linksphere_core::logging::init_tracing;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, error};

#[derive(Parser)]
#[command(name = "linksphere")]
#[command(about = "Share and browse links on LinkSphere")]
#[command(version)]
struct Cli {
    /// Configuration file (TOML, YAML or JSON)
    #[arg(short = 'c', long, global = true, env = "LINKSPHERE_CONFIG_FILE")]
    config: Option<PathBuf>,

    /// Override the configured logging level
    #[arg(short = 'l', long, global = true)]
    log_level: Option<LogLevel>,

    /// Timeout for the whole command in seconds (0 = no timeout)
    #[arg(short = 't', long, global = true, default_value = "30")]
    timeout: u64,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = LinkSphereConfig::load(cli.config.as_deref())?;
    if let Some(level) = cli.log_level {
        config.logging.level = level.as_str().to_string();
    }
    init_tracing(&config.logging)?;

    debug!(base_url = %config.api.base_url, "Starting LinkSphere CLI");

    let result = if cli.timeout == 0 {
        cli.command.execute(config).await
    } else {
        let timeout_duration = Duration::from_secs(cli.timeout);
        match tokio::time::timeout(timeout_duration, cli.command.execute(config)).await {
            Ok(result) => result,
            Err(_) => {
                error!("Command timed out after {} seconds", cli.timeout);
                std::process::exit(1);
            }
        }
    };

    if let Err(e) = result {
        error!("Command failed: {e:#}");
        std::process::exit(1);
    }

    Ok(())
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    const fn as_str(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

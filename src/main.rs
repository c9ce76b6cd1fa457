//! Runner Agent - reports CI runner jobs and host identity to a controller.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use runner_agent::agent::{scan_jobs, Agent, AgentError};
use runner_agent::config::{AgentConfig, ConfigLoader};

#[derive(Parser)]
#[command(
    name = "runner-agent",
    about = "Reports CI runner jobs and host identity to a controller",
    version
)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short = 'v', long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Config file (default: ./runner-agent.toml, then the user config dir)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Identify the host and monitor worker logs.
    Run {
        /// Directory to scan for worker logs.
        #[arg(long)]
        root: Option<PathBuf>,
        /// Seconds between scans.
        #[arg(long)]
        interval: Option<u64>,
        /// Run a single scan and exit.
        #[arg(long)]
        once: bool,
    },
    /// Parse worker logs and print jobs as JSON lines, without reporting.
    Scan {
        /// Directory to scan for worker logs.
        #[arg(long)]
        root: Option<PathBuf>,
        /// Worker log file name prefix.
        #[arg(long)]
        prefix: Option<String>,
    },
}

fn init_tracing(verbosity: u8) {
    let level = match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn load_config(path: Option<PathBuf>) -> Result<AgentConfig, AgentError> {
    let loader = path.map_or_else(ConfigLoader::new, ConfigLoader::with_path);
    if let Some(found) = loader.find_config_file() {
        tracing::debug!(path = %found.display(), "Using config file");
    }
    Ok(loader.load_with_env()?)
}

async fn run(
    mut config: AgentConfig,
    root: Option<PathBuf>,
    interval: Option<u64>,
    once: bool,
) -> Result<(), AgentError> {
    if let Some(root) = root {
        config.monitor.root = root;
    }
    if let Some(interval) = interval {
        config.monitor.interval_secs = interval;
    }

    let agent = Agent::from_config(config)?;

    if once {
        let report = agent.run_once().await?;
        tracing::info!(
            discovered = report.discovered,
            reported = report.reported,
            parse_failures = report.parse_failures,
            report_failures = report.report_failures,
            "Single scan complete"
        );
        return Ok(());
    }

    let cancel = CancellationToken::new();
    let shutdown = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Shutdown requested, finishing current tick");
            shutdown.cancel();
        }
    });

    let ticks = agent.deploy(&cancel).await?;
    tracing::info!(ticks, "Runner agent stopped");
    Ok(())
}

async fn scan(
    mut config: AgentConfig,
    root: Option<PathBuf>,
    prefix: Option<String>,
) -> Result<(), AgentError> {
    if let Some(root) = root {
        config.monitor.root = root;
    }
    if let Some(prefix) = prefix {
        config.monitor.file_prefix = prefix;
    }
    config.validate_monitor()?;

    for job in scan_jobs(&config.monitor.root, &config.monitor.file_prefix).await? {
        match serde_json::to_string(&job) {
            Ok(line) => println!("{line}"),
            Err(e) => tracing::warn!(error = %e, "Failed to serialize job"),
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match load_config(cli.config) {
        Ok(config) => match cli.command {
            Commands::Run {
                root,
                interval,
                once,
            } => run(config, root, interval, once).await,
            Commands::Scan { root, prefix } => scan(config, root, prefix).await,
        },
        Err(e) => Err(e),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Runner agent failed");
            ExitCode::FAILURE
        }
    }
}

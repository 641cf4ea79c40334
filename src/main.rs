use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use chrono::Utc;
use clap::{Parser, Subcommand};

use agsist_ingest::config::AppConfig;
use agsist_ingest::jobs;
use agsist_ingest::monitoring::logger;

#[derive(Debug, Parser)]
#[command(name = "agsist", version, about = "AGSIST market, price and briefing ingestion")]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long, default_value = "config/default.toml")]
    config: PathBuf,

    /// Override `output.data_dir`.
    #[arg(long)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Scan prediction markets and write markets.json.
    Markets,
    /// Refresh futures quotes and write prices.json.
    Prices,
    /// Generate the daily briefing and write daily.json.
    Daily,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %format!("{e:#}"), "Run failed");
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let (mut config, secrets) = AppConfig::load(&cli.config)?;
    if let Some(dir) = cli.data_dir {
        config.output.data_dir = dir;
    }

    logger::init_logging(&config.monitoring)?;

    tracing::info!(
        command = ?cli.command,
        data_dir = %config.output.data_dir.display(),
        "AGSIST ingest starting"
    );

    let now = Utc::now();
    match cli.command {
        Command::Markets => jobs::markets::run(&config, now).await.map(drop),
        Command::Prices => jobs::prices::run(&config, now).await.map(drop),
        Command::Daily => jobs::daily::run(&config, &secrets, now).await.map(drop),
    }
}

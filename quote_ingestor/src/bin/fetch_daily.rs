use std::{path::PathBuf, process::ExitCode, sync::Arc};

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use quote_ingestor::{
    config::JobConfig,
    notify::{LogNotifier, Notifier},
    pipeline::IngestJob,
    providers::{QuoteProvider, alpha_vantage::AlphaVantageProvider, mock::MockProvider},
    quality::QualityGate,
};
use shared_utils::event_log::TracingLog;
use stock_store::{atomic::AtomicStore, blob::FsStore};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(version, about = "Fetch the latest daily quotes and store them")]
struct Cli {
    /// TOML settings file; environment variables are used when omitted.
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
    /// Dotenv file loaded before reading the environment.
    #[arg(long, value_name = "FILE")]
    env_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match &cli.env_file {
        Some(path) => {
            dotenvy::from_path(path).with_context(|| format!("load {}", path.display()))?;
        }
        None => {
            // A missing .env is fine; the variables may come from the shell.
            let _ = dotenvy::dotenv();
        }
    }

    let config = match &cli.config {
        Some(path) => JobConfig::from_toml_path(path)?,
        None => JobConfig::from_env()?,
    };
    tracing::info!(?config, "resolved configuration");

    let provider: Arc<dyn QuoteProvider> = if config.mock_mode {
        Arc::new(MockProvider::new(
            Utc::now().date_naive(),
            TracingLog::shared("mock"),
        ))
    } else {
        Arc::new(AlphaVantageProvider::new(
            config.alpha_vantage()?,
            TracingLog::shared("alpha_vantage"),
        )?)
    };
    let store = Arc::new(
        FsStore::for_bucket(&config.store_root, &config.bucket)
            .with_context(|| format!("invalid bucket {:?}", config.bucket))?,
    );

    let job = IngestJob::new(
        provider,
        QualityGate::new(TracingLog::shared("quality")),
        AtomicStore::new(store, TracingLog::shared("atomic_store")),
        config.ingest,
        TracingLog::shared("fetch_daily"),
    );
    let report = job.run(&config.symbols[..]).await;

    for (symbol, status) in &report.results {
        println!("{symbol}: {status}");
    }

    LogNotifier::new(TracingLog::shared("notify"))
        .notify(&report.summary())
        .await;

    Ok(ExitCode::from(report.exit_code()))
}

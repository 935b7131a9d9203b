use std::{process::ExitCode, sync::Arc};

use anyhow::{Context, Result};
use clap::Parser;
use shared_utils::event_log::TracingLog;
use stock_store::{
    blob::FsStore,
    keys::{DEFAULT_V1_PREFIX, DataKind, Environment, KeyVersion},
    migrate::{MigrateOptions, MigrationRunner},
};
use tracing_subscriber::EnvFilter;

/// Number of migrated pairs echoed after the summary.
const SAMPLE_PAIRS: usize = 10;

#[derive(Parser)]
#[command(version, about = "Rewrite stored quote objects into another key layout")]
struct Cli {
    /// Directory holding one sub-directory per bucket.
    #[arg(long, value_name = "DIR", default_value = "./data")]
    root: String,
    /// Bucket to migrate.
    #[arg(long)]
    bucket: String,
    /// Only migrate keys under this prefix.
    #[arg(long, default_value = "")]
    prefix: String,
    /// Layout to convert into (v1, v2, lambda).
    #[arg(long, default_value = "v2")]
    target_version: KeyVersion,
    /// Data kind for v2 keys (raw, processed).
    #[arg(long, default_value = "raw")]
    data_kind: DataKind,
    /// Environment for v2 keys (test, prod); defaults to the source's.
    #[arg(long)]
    environment: Option<Environment>,
    /// Prefix for v1 keys.
    #[arg(long, default_value = DEFAULT_V1_PREFIX)]
    v1_prefix: String,
    /// Delete each source object after copying it.
    #[arg(long)]
    delete_source: bool,
    /// Only log what would be done.
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let store = FsStore::for_bucket(&cli.root, &cli.bucket)
        .with_context(|| format!("invalid bucket {:?}", cli.bucket))?;
    let runner = MigrationRunner::new(Arc::new(store), TracingLog::shared("migrate"));

    let opts = MigrateOptions {
        prefix: cli.prefix,
        target_version: cli.target_version,
        data_kind: cli.data_kind,
        environment: cli.environment,
        v1_prefix: cli.v1_prefix,
        delete_source: cli.delete_source,
        dry_run: cli.dry_run,
    };
    let stats = runner.migrate(&opts).await?;

    println!("{stats}");
    for (source, destination) in stats.pairs.iter().take(SAMPLE_PAIRS) {
        println!("  {source} -> {destination}");
    }
    if stats.pairs.len() > SAMPLE_PAIRS {
        println!("  ... and {} more", stats.pairs.len() - SAMPLE_PAIRS);
    }

    Ok(if stats.has_failures() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for the data-flux ingestion tool.

use std::num::NonZeroU64;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use data_flux_cli_utils::IndicatifProgress;
use data_flux_client::http::{HttpConfig, HttpPageFetcher};
use data_flux_client::progress::{ProgressCallback, null_progress};
use data_flux_ingest::{IngestManager, config, log_observer};
use data_flux_ingest_models::IngestSettings;
use data_flux_schema_models::Endpoint;
use data_flux_store::{JsonLinesSink, RecordSink};
use strum::IntoEnumIterator;

#[derive(Parser)]
#[command(name = "data_flux_ingest", about = "Paginated API ingestion tool")]
struct Cli {
    /// TOML settings file, applied before `DATA_FLUX_*` environment variables
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Probe, fetch, validate and persist every page of an endpoint
    Run {
        #[command(flatten)]
        args: RunArgs,
        /// Validate and report without writing records
        #[arg(long)]
        no_persist: bool,
    },
    /// Probe an endpoint and print its record and page counts
    Probe {
        #[command(flatten)]
        args: RunArgs,
    },
    /// List the available endpoints
    Endpoints,
}

/// Flags that override file and environment settings.
#[derive(Args, Default)]
struct RunArgs {
    /// API root (e.g., "http://localhost:8000")
    #[arg(long)]
    base_url: Option<String>,
    /// Endpoint to ingest ("users", "tracks" or "listen_history")
    #[arg(long, value_parser = parse_endpoint)]
    endpoint: Option<Endpoint>,
    /// Records per page
    #[arg(long)]
    request_size: Option<NonZeroU64>,
    /// Version stamped on every persisted record
    #[arg(long)]
    version_id: Option<NonZeroU64>,
    /// Ingest at most this many records
    #[arg(long)]
    total: Option<u64>,
    /// Maximum concurrent page requests (unbounded if unset)
    #[arg(long)]
    max_concurrency: Option<usize>,
    /// Per-request timeout in seconds
    #[arg(long)]
    timeout_secs: Option<NonZeroU64>,
    /// Directory persisted records are written to
    #[arg(long)]
    output_dir: Option<PathBuf>,
}

fn parse_endpoint(value: &str) -> Result<Endpoint, String> {
    value.parse().map_err(|_| {
        format!(
            "unknown endpoint {value:?} (expected one of: {})",
            Endpoint::iter()
                .map(|endpoint| endpoint.to_string())
                .collect::<Vec<_>>()
                .join(", ")
        )
    })
}

impl RunArgs {
    fn apply(self, settings: &mut IngestSettings) {
        if let Some(base_url) = self.base_url {
            settings.base_url = base_url;
        }
        if let Some(endpoint) = self.endpoint {
            settings.endpoint = endpoint;
        }
        if let Some(request_size) = self.request_size {
            settings.request_size = request_size.get();
        }
        if let Some(version_id) = self.version_id {
            settings.version_id = version_id;
        }
        if let Some(total) = self.total {
            settings.total = Some(total);
        }
        if let Some(max_concurrency) = self.max_concurrency {
            settings.max_concurrency = Some(max_concurrency);
        }
        if let Some(timeout_secs) = self.timeout_secs {
            settings.timeout_secs = timeout_secs.get();
        }
        if let Some(output_dir) = self.output_dir {
            settings.output_dir = output_dir;
        }
    }
}

fn resolve_settings(
    path: Option<&std::path::Path>,
    args: RunArgs,
) -> Result<IngestSettings, config::ConfigError> {
    let mut settings = config::load(path)?;
    args.apply(&mut settings);
    config::validate(&settings)?;
    Ok(settings)
}

fn build_manager(
    settings: &IngestSettings,
    progress: Arc<dyn ProgressCallback>,
) -> Result<IngestManager<HttpPageFetcher>, Box<dyn std::error::Error>> {
    let http = HttpConfig::new(&settings.base_url)
        .with_timeout(Duration::from_secs(settings.timeout_secs));
    let client = Arc::new(HttpPageFetcher::new(&http)?);
    let sink: Arc<dyn RecordSink> = Arc::new(JsonLinesSink::new(&settings.output_dir));

    Ok(
        IngestManager::new(client, settings.endpoint, settings.version_id, sink)
            .with_max_concurrency(settings.max_concurrency)
            .with_observer(log_observer())
            .with_progress(progress),
    )
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = data_flux_cli_utils::init_logger();
    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Commands::Run {
        args: RunArgs::default(),
        no_persist: false,
    });

    match command {
        Commands::Endpoints => {
            println!("{:<16} {:<16} RECORD", "NAME", "PATH");
            println!("{}", "-".repeat(44));
            for endpoint in Endpoint::iter() {
                println!(
                    "{:<16} {:<16} {}",
                    endpoint.to_string(),
                    endpoint.path(),
                    endpoint.record_kind().to_string()
                );
            }
        }
        Commands::Probe { args } => {
            let settings = resolve_settings(cli.config.as_deref(), args)?;
            let mut manager = build_manager(&settings, null_progress())?;
            let report = manager
                .configure(settings.request_size, settings.total)
                .await?;
            println!("endpoint:       {}", settings.endpoint);
            println!("reported total: {}", report.reported_total);
            println!("records:        {}", report.total_records);
            println!("page size:      {}", settings.request_size);
            println!("pages:          {}", report.page_count);
        }
        Commands::Run { args, no_persist } => {
            let mut settings = resolve_settings(cli.config.as_deref(), args)?;
            if no_persist {
                settings.persist = false;
            }
            log::info!(
                "Ingesting {} from {} (version {})",
                settings.endpoint,
                settings.base_url,
                settings.version_id
            );

            let progress =
                IndicatifProgress::pages_bar(&multi, &format!("Probing {}", settings.endpoint));
            let mut manager = build_manager(&settings, progress)?;
            manager
                .configure(settings.request_size, settings.total)
                .await?;
            let summary = manager.run(settings.persist).await?;

            if settings.persist && summary.records_persisted > 0 {
                log::info!(
                    "Wrote {} record(s) to {}",
                    summary.records_persisted,
                    settings.output_dir.display()
                );
            }
        }
    }

    Ok(())
}

//! CLI entry point for the tourist traffic tool.
//!
//! Provides subcommands for crawling live visitor snapshots, building the
//! overview and per-site detail files, and migrating legacy stored data.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, FixedOffset, Utc};
use clap::{Args, Parser, Subcommand};
use tourist_traffic::analyzers::analyzer::analyze;
use tourist_traffic::config::{
    DEFAULT_DETAIL_DAYS, DEFAULT_GRID_END, DEFAULT_GRID_START, DEFAULT_STEP_MINUTES,
    DEFAULT_TOP_N, DEFAULT_WINDOW_DAYS, OverviewConfig, StoreConfig,
};
use tourist_traffic::crawler::crawl_once;
use tourist_traffic::infra::shanghai::ShanghaiTouristClient;
use tourist_traffic::layout::DATA_PREFIX;
use tourist_traffic::migrate::Migrator;
use tourist_traffic::store::{LocalStore, ObjectStore, S3Store};
use tracing::{error, info, warn};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "tourist_traffic")]
#[command(about = "Collects and aggregates Shanghai tourist site visitor counts")]
#[command(long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct StoreArgs {
    /// Use a local directory instead of the OSS bucket
    #[arg(long, value_name = "DIR")]
    local_store: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch visitor snapshots and append them to the store
    Crawl {
        #[command(flatten)]
        store: StoreArgs,

        /// Number of samples to collect (0 = infinite)
        #[arg(short = 'n', long, default_value_t = 1)]
        num_samples: usize,

        /// Sample rate: fetch a snapshot every X seconds
        #[arg(short = 'r', long, default_value_t = 600)]
        sample_rate: u64,

        /// Offset from UTC of the local day
        #[arg(long, default_value_t = 8, allow_hyphen_values = true)]
        utc_offset_hours: i32,
    },
    /// Build overview.json and per-site detail files
    Build {
        #[command(flatten)]
        store: StoreArgs,

        /// Directory the outputs are written to
        #[arg(short, long, default_value = "public/data")]
        output_dir: PathBuf,

        /// Write outputs to the store under this prefix instead of the output directory
        #[arg(long)]
        upload_prefix: Option<String>,

        /// First grid point (HH:MM)
        #[arg(long, default_value = DEFAULT_GRID_START)]
        grid_start: String,

        /// Last grid point (HH:MM)
        #[arg(long, default_value = DEFAULT_GRID_END)]
        grid_end: String,

        /// Minutes between grid points
        #[arg(long, default_value_t = DEFAULT_STEP_MINUTES)]
        step_minutes: u32,

        /// Number of days aggregated, ending today
        #[arg(short, long, default_value_t = DEFAULT_WINDOW_DAYS)]
        window_days: u32,

        /// Number of sites in the ranking
        #[arg(short, long, default_value_t = DEFAULT_TOP_N)]
        top_n: usize,

        /// Days of history in each site's detail file
        #[arg(long, default_value_t = DEFAULT_DETAIL_DAYS)]
        detail_days: u32,

        /// Offset from UTC of the local day
        #[arg(long, default_value_t = 8, allow_hyphen_values = true)]
        utc_offset_hours: i32,
    },
    /// Move legacy stored files into the YYYY/MM layout
    Migrate {
        #[command(flatten)]
        store: StoreArgs,

        /// Prefix scanned for legacy files
        #[arg(long, default_value = DATA_PREFIX)]
        prefix: String,

        /// Apply the migration (default is a dry run)
        #[arg(long, default_value_t = false)]
        execute: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/tourist_traffic.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("tourist_traffic.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Crawl {
            store,
            num_samples,
            sample_rate,
            utc_offset_hours,
        } => {
            let offset = utc_offset(utc_offset_hours)?;
            let store = open_store(&store).await?;
            crawl(store, num_samples, sample_rate, offset).await?;
        }
        Commands::Build {
            store,
            output_dir,
            upload_prefix,
            grid_start,
            grid_end,
            step_minutes,
            window_days,
            top_n,
            detail_days,
            utc_offset_hours,
        } => {
            let config = OverviewConfig::from_parts(
                &grid_start,
                &grid_end,
                step_minutes,
                window_days,
                top_n,
                detail_days,
            )?;
            let now = local_now(utc_offset(utc_offset_hours)?);
            let source = open_store(&store).await?;

            let report = match upload_prefix {
                Some(prefix) => analyze(&source, &*source, &prefix, &config, now).await?,
                None => {
                    let sink = LocalStore::new(&output_dir);
                    analyze(&source, &sink, "", &config, now).await?
                }
            };

            info!(
                days_with_visitors = report.days_with_visitors,
                sites = report.sites,
                details = report.details_written,
                "Build finished"
            );
        }
        Commands::Migrate {
            store,
            prefix,
            execute,
        } => {
            let store = open_store(&store).await?;
            if !execute {
                warn!("Dry run, pass --execute to apply the migration");
            }

            let report = Migrator::new(&*store, prefix, !execute).run().await?;
            if report.failed > 0 {
                anyhow::bail!(
                    "{} of {} objects failed to migrate",
                    report.failed,
                    report.found
                );
            }
        }
    }

    Ok(())
}

/// Opens the directory-backed store when requested, the OSS bucket otherwise.
async fn open_store(args: &StoreArgs) -> Result<Arc<dyn ObjectStore>> {
    match &args.local_store {
        Some(dir) => {
            info!(dir = %dir.display(), "Using local store");
            Ok(Arc::new(LocalStore::new(dir)))
        }
        None => {
            let config = StoreConfig::from_env()?;
            info!(bucket = %config.bucket, endpoint = %config.endpoint, "Using OSS store");
            Ok(Arc::new(S3Store::from_config(&config).await))
        }
    }
}

fn utc_offset(hours: i32) -> Result<FixedOffset> {
    hours
        .checked_mul(3600)
        .and_then(FixedOffset::east_opt)
        .with_context(|| format!("invalid UTC offset: {hours} hours"))
}

fn local_now(offset: FixedOffset) -> DateTime<FixedOffset> {
    Utc::now().with_timezone(&offset)
}

/// Fetches snapshots at a fixed interval and appends them to the store.
#[tracing::instrument(skip(store))]
async fn crawl(
    store: Arc<dyn ObjectStore>,
    num_samples: usize,
    sample_rate: u64,
    offset: FixedOffset,
) -> Result<()> {
    let api = ShanghaiTouristClient::new()?;

    if num_samples == 0 {
        info!(sample_rate, "Sampling infinitely. Press Ctrl+C to stop.");
    } else {
        info!(num_samples, sample_rate, "Starting sample collection");
    }

    let mut sample_count = 0;
    let mut failures = 0;

    loop {
        // Check if we've reached the sample limit (0 = infinite)
        if num_samples > 0 && sample_count >= num_samples {
            break;
        }
        sample_count += 1;

        info!(
            sample = sample_count,
            total = if num_samples == 0 {
                None
            } else {
                Some(num_samples)
            },
            "Starting sample round"
        );

        match crawl_once(&api, &*store, local_now(offset)).await {
            Ok(report) if report.is_complete() => {}
            Ok(report) => {
                failures += 1;
                warn!(
                    sites_written = report.sites_written,
                    sites_total = report.sites_total,
                    "Sample stored incompletely"
                );
            }
            Err(e) => {
                failures += 1;
                error!(error = %e, "Sample failed");
            }
        }

        // If not the last sample, wait before next iteration
        if num_samples == 0 || sample_count < num_samples {
            info!(sample_rate, "Waiting before next sample");
            tokio::time::sleep(tokio::time::Duration::from_secs(sample_rate)).await;
        }
    }

    info!(samples = sample_count, failures, "Finished crawling");
    if failures > 0 {
        anyhow::bail!("{failures} of {sample_count} samples failed");
    }
    Ok(())
}

use anyhow::Context;
use clap::{Parser, Subcommand};
use olx_scraper::config::{Config, SinkConfig};
use olx_scraper::export::{ads_schema, BigQuerySink, ExportPipeline, NdjsonSink, Sink};
use olx_scraper::extractor::PageExtractor;
use olx_scraper::orchestrator::Orchestrator;
use olx_scraper::page::ListingSelectors;
use olx_scraper::transport::HttpTransport;
use olx_scraper::{logging, metrics};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "olx_scraper")]
#[command(about = "OLX board game listings scraper")]
#[command(version = "0.1.0")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Crawl every configured query and export the accepted ads
    Run {
        /// Path to the TOML config file
        #[arg(long, default_value = "config.toml")]
        config: PathBuf,
        /// Override the configured concurrency ceiling
        #[arg(long)]
        concurrency: Option<usize>,
        /// Stop crawling after this many seconds and export what was collected
        #[arg(long)]
        deadline_secs: Option<u64>,
    },
}

fn build_sink(config: &SinkConfig) -> anyhow::Result<Arc<dyn Sink>> {
    let sink: Arc<dyn Sink> = match config {
        SinkConfig::Bigquery {
            project_id,
            dataset_id,
            table_id,
            token_env,
        } => Arc::new(BigQuerySink::from_env(
            project_id, dataset_id, table_id, token_env,
        )?),
        SinkConfig::Ndjson {
            output_dir,
            table_id,
        } => Arc::new(NdjsonSink::new(output_dir, table_id.clone())),
    };
    Ok(sink)
}

/// Resolves on Ctrl-C or when the optional deadline passes.
async fn shutdown_signal(deadline: Option<Duration>) {
    let deadline = async {
        match deadline {
            Some(d) => tokio::time::sleep(d).await,
            None => std::future::pending::<()>().await,
        }
    };
    tokio::select! {
        _ = tokio::signal::ctrl_c() => warn!("Received Ctrl-C"),
        _ = deadline => warn!("Run deadline reached"),
    }
}

async fn run(
    config_path: PathBuf,
    concurrency: Option<usize>,
    deadline_secs: Option<u64>,
) -> anyhow::Result<()> {
    let mut config = Config::load(&config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;
    if let Some(concurrency) = concurrency {
        config.concurrency = concurrency;
        config.validate()?;
    }
    if let Some(addr) = &config.metrics_addr {
        metrics::init_metrics(addr);
    }

    let sink = build_sink(&config.sink)?;
    let schema = ads_schema(config.sink.table_id());
    let pipeline = ExportPipeline::open(sink, &schema)
        .await
        .context("ensuring destination table")?;

    let selectors = ListingSelectors::compile(&config.selectors)?;
    let transport = Arc::new(HttpTransport::new(&config.http, selectors)?);
    let extractor = Arc::new(PageExtractor::new(&config.base_origin)?);
    let orchestrator = Orchestrator::new(
        config.catalog.units(),
        config.concurrency,
        transport,
        extractor,
    );

    let summary = orchestrator
        .run(
            pipeline.buffer(),
            shutdown_signal(deadline_secs.map(Duration::from_secs)),
        )
        .await;
    summary.log();

    let export = pipeline.flush().await;
    export.log();
    info!("Run complete");
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    logging::init_logging();

    let cli = Cli::parse();
    match cli.command {
        Commands::Run {
            config,
            concurrency,
            deadline_secs,
        } => run(config, concurrency, deadline_secs).await,
    }
}

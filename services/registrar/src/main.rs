//! Registrar service entry point

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use adapter_service::{build_http_client, EnsLedger, GasStationFeed, SqsQueue, TickerPriceFeed};
use anyhow::{bail, Context, Result};
use clap::Parser;
use config::{load_config, RegistrarConfig};
use registrar_service::{
    Collaborators, PipelineSettings, RegistrarPipeline, SubmissionOutcome, DEFAULT_LOG_FILTER,
};
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(author, version, about = "Drain the Ethvault registration queue", long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Run a single drain cycle and exit
    #[arg(long)]
    once: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.json_logs);

    info!("🚀 Starting Ethvault registrar v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config(args.config.as_deref()).context("Failed to load configuration")?;
    let pipeline = build_pipeline(&config).await?;

    if pipeline.settings().registration_disabled {
        warn!("Registration disabled: requests are validated and deduplicated, no funds move");
    }

    if args.once {
        let report = pipeline.run_cycle().await.context("Drain cycle failed")?;
        report.log_summary();
        if let SubmissionOutcome::Aborted(e) = &report.submission {
            bail!("Registration submission failed: {e}");
        }
        return Ok(());
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Shutdown requested, finishing current cycle"),
            Err(e) => error!(error = %e, "Failed to listen for Ctrl-C"),
        }
        let _ = shutdown_tx.send(true);
    });

    let cycles = pipeline
        .drain(
            shutdown_rx,
            Duration::from_secs(config.drain.idle_delay_secs),
            Duration::from_secs(config.drain.error_delay_secs),
        )
        .await;

    info!(cycles, "👋 Registrar stopped");
    Ok(())
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into());
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn build_pipeline(config: &RegistrarConfig) -> Result<RegistrarPipeline> {
    let feed_client = build_http_client(Duration::from_secs(config.pricing.request_timeout_secs))
        .context("Failed to create HTTP client")?;
    let gas_client = build_http_client(Duration::from_secs(config.gas.request_timeout_secs))
        .context("Failed to create HTTP client")?;
    let rpc_client = build_http_client(Duration::from_secs(config.ledger.request_timeout_secs))
        .context("Failed to create RPC client")?;

    let sdk_config = SqsQueue::load_sdk_config().await;
    let queue = SqsQueue::new(&sdk_config, &config.queue)
        .await
        .context("Failed to connect to registration queue")?;
    let ledger = EnsLedger::new(&config.ledger, rpc_client).context("Failed to create ledger client")?;

    let collaborators = Collaborators {
        queue: Arc::new(queue),
        ledger: Arc::new(ledger),
        prices: Arc::new(TickerPriceFeed::new(feed_client, config.pricing.price_url.clone())),
        fees: Arc::new(GasStationFeed::new(gas_client, config.gas.gas_station_url.clone())),
    };
    let settings = PipelineSettings::from_config(config).context("Invalid validation policy")?;

    info!(
        queue_arn = %config.queue.queue_arn,
        chain_id = config.ledger.chain_id,
        max_gas_price_gwei = %config.gas.max_gas_price_gwei,
        max_dollars = %config.validation.max_dollars,
        "✅ Registrar pipeline ready"
    );
    Ok(RegistrarPipeline::new(collaborators, settings))
}

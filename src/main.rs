//! Launch bundler
//!
//! Reads the launch settings from the environment (or a `.env` file), runs
//! the enabled stages and exits non-zero when a stage fails.

#![deny(unused_imports)]
#![deny(unused_mut)]
#![deny(unused_variables)]
#![warn(unused_must_use)]

use anyhow::{Context, Result};
use clap::Parser;
use launch_bundler::{
    config::AppConfig,
    launch::Launcher,
    ledger::RpcLedger,
    metrics::metrics,
    relay::JitoRelay,
    BundleCoordinator,
};
use std::{process::ExitCode, sync::Arc};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command line arguments
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Environment file merged into the process environment
    #[arg(short, long)]
    env_file: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    if let Err(e) = init_logging(args.verbose, args.json_logs) {
        eprintln!("failed to initialize logging: {:#}", e);
        return ExitCode::FAILURE;
    }
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let outcome = run(&args).await;
    if let Some(m) = metrics() {
        info!(metrics = %m.snapshot(), "Final metrics");
    }
    info!("Finished");

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %format!("{:#}", e), "Launch failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: &Args) -> Result<()> {
    let config = AppConfig::from_env_file(args.env_file.as_deref()).context("Failed to load configuration")?;
    info!(network = ?config.network, stages = ?config.stages, "Configuration loaded");

    let ledger = Arc::new(RpcLedger::new(config.rpc_url()));
    let relay = Arc::new(JitoRelay::new(&config.relay).context("Failed to open relay session")?);
    info!(
        rpc = %ledger.url(),
        block_engine = %config.relay.block_engine_url,
        identity = %relay.identity(),
        "Connected"
    );

    let coordinator = BundleCoordinator::new(ledger.clone(), relay, config.bundle);
    let report = Launcher::new(&config, ledger, coordinator).run().await?;

    if let Some(mint) = report.mint {
        info!(mint = %mint, "Token");
    }
    if let Some(market) = &report.market {
        info!(market = %market.market, "Market");
    }
    if let Some(pool) = report.pool {
        info!(pool = %pool, sold = report.sold, "Pool");
    }
    Ok(())
}

/// Initialize logging subsystem
fn init_logging(verbose: bool, json: bool) -> Result<()> {
    let default_filter = if verbose {
        "launch_bundler=debug,info"
    } else {
        "launch_bundler=info,warn"
    };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_filter.into());

    let registry = tracing_subscriber::registry().with(env_filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_target(true))
            .try_init()?;
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_target(true))
            .try_init()?;
    }
    Ok(())
}

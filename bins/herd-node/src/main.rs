//! CyberHerd daemon.
//!
//! Runs the herd engine behind a JSON-RPC server, applies the daily reset,
//! and writes every herd notification to stdout as one JSON line. Logs go
//! to stderr.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tokio::sync::watch;
use tracing::{error, info};

use herd_core::traits::SystemClock;
use herd_node_lib::emitter::{forward_events, ChannelEmitter};
use herd_node_lib::scheduler::run_reset_loop;
use herd_node_lib::{start_rpc_server, HerdConfig, HerdEngine};

/// CyberHerd membership and payout daemon.
#[derive(Parser, Debug)]
#[command(name = "herd-node", version, about = "CyberHerd membership and payout daemon")]
struct Args {
    /// Config file (TOML). Defaults to <config_dir>/herd/herd.toml
    #[arg(long)]
    config: Option<PathBuf>,

    /// RPC server bind address (overrides config)
    #[arg(long)]
    rpc_bind: Option<String>,

    /// RPC server port (overrides config)
    #[arg(long)]
    rpc_port: Option<u16>,

    /// Log level (trace, debug, info, warn, error; overrides config)
    #[arg(long)]
    log_level: Option<String>,

    /// Log output format ("text" or "json")
    #[arg(long, default_value = "text")]
    log_format: String,

    /// Admission note reference for the current cycle (overrides config)
    #[arg(long)]
    admission_reference: Option<String>,

    /// How often to check for a due reset, in seconds
    #[arg(long, default_value_t = 30)]
    reset_poll_secs: u64,
}

impl Args {
    /// Merge CLI overrides into the loaded configuration.
    fn apply(&self, mut config: HerdConfig) -> HerdConfig {
        if let Some(bind) = &self.rpc_bind {
            config.rpc_bind = bind.clone();
        }
        if let Some(port) = self.rpc_port {
            config.rpc_port = port;
        }
        if let Some(level) = &self.log_level {
            config.log_level = level.clone();
        }
        if let Some(reference) = &self.admission_reference {
            config.admission_reference = Some(reference.clone());
        }
        config
    }
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    if let Err(e) = run(args).await {
        error!("{e:#}");
        eprintln!("herd-node: {e:#}");
        std::process::exit(1);
    }
}

async fn run(args: Args) -> anyhow::Result<()> {
    let config = HerdConfig::load(args.config.as_deref()).context("loading configuration")?;
    let config = args.apply(config);

    init_logging(&config.log_level, &args.log_format);

    info!("CyberHerd node v{}", env!("CARGO_PKG_VERSION"));
    info!(
        max_herd_size = config.max_herd_size,
        min_receipt_amount = config.min_receipt_amount,
        herd_fraction_bps = config.herd_fraction_bps,
        headbutt_cooldown_secs = config.headbutt_cooldown_secs,
        "herd rules"
    );
    info!("reset_at: {:02}:{:02} UTC", config.reset_hour_utc, config.reset_minute_utc);

    let (emitter, events) = ChannelEmitter::channel();
    let engine = Arc::new(
        HerdEngine::new(config.clone(), Arc::new(emitter), Arc::new(SystemClock))
            .context("starting herd engine")?,
    );

    let forwarder = tokio::spawn(forward_events(events, tokio::io::stdout()));

    let (rpc_addr, rpc_handle) = start_rpc_server(&config.rpc_addr(), Arc::clone(&engine))
        .await
        .context("starting RPC server")?;
    info!("RPC server listening on {rpc_addr}");

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let reference = config.admission_reference.clone();
    let reset_task = tokio::spawn(run_reset_loop(
        Arc::clone(&engine),
        Duration::from_secs(args.reset_poll_secs.max(1)),
        move || reference.clone(),
        shutdown_rx,
    ));

    info!("herd node running (Ctrl+C to stop)");
    tokio::signal::ctrl_c()
        .await
        .context("installing Ctrl+C handler")?;
    info!("received Ctrl+C, shutting down...");

    shutdown_tx.send(true).ok();
    reset_task.await.ok();
    rpc_handle.stop().ok();
    rpc_handle.stopped().await;
    info!("RPC server stopped");

    // Dropping the last engine handle closes the notification channel.
    drop(engine);
    match tokio::time::timeout(Duration::from_secs(2), forwarder).await {
        Ok(Ok(written)) => info!(written, "notifications flushed"),
        _ => info!("notification forwarder did not finish in time"),
    }
    info!("herd node shutdown complete");
    Ok(())
}

/// Initialize tracing subscriber with the given log level and output format.
///
/// Pass `format = "json"` for structured JSON output. Any other value
/// defaults to human-readable text. Both write to stderr.
fn init_logging(level_str: &str, format: &str) {
    use tracing_subscriber::filter::EnvFilter;
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level_str));

    if format == "json" {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_level(true).with_writer(std::io::stderr))
            .init();
    }
}

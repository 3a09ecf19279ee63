//! SimpleMon Agent - host metrics sampler
//!
//! Samples system utilization at a fixed cadence and ships each report to
//! the configured collector until interrupted.

use anyhow::Result;
use clap::Parser;
use simplemon_agent::{agent::Agent, cli::Cli, config::Config, internal_metrics};
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration by layering sources: defaults, file, environment, and CLI args.
    let config = Config::load(&cli).unwrap_or_else(|err| {
        // Manually initialize logging for this specific error
        tracing_subscriber::fmt().with_writer(std::io::stderr).init();
        error!("Failed to load configuration: {}", err);
        std::process::exit(1);
    });

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    // Logs go to stderr; stdout carries reports for the stdout transport.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    info!("SimpleMon agent starting up...");

    // Log the loaded configuration settings for visibility
    info!("-------------------- Configuration --------------------");
    match Config::source_file(&cli) {
        Some(path) => info!("Config File: {}", path.display()),
        None => info!("Config File: None (defaults)"),
    }
    info!("Log Level: {}", config.log_level);
    info!("Log Metrics: {}", config.metrics.log_metrics);
    info!("Sampling Interval: {:?}", config.sampling.interval());
    info!("CPU Window: {:?}", config.sampling.cpu_window());
    info!("Root Path: {}", config.sampling.root_path.display());
    info!("Pseudo Filesystems: {}", config.sampling.include_pseudo_filesystems);
    info!("Transport: {}", config.transport.kind);
    info!("Service URL: {}", config.transport.service_url);
    info!(
        "API Key: {}",
        if config.transport.api_key().is_some() { "Configured" } else { "Not configured" }
    );
    info!("Connect Timeout: {:?}", config.transport.connect_timeout());
    info!("Send Timeout: {:?}", config.transport.send_timeout());
    info!("Delivery Failure Policy: {}", config.delivery.retry.describe());
    info!("-------------------------------------------------------");

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let metrics_task = internal_metrics::install(&config.metrics, shutdown_rx.clone());

    let agent = Agent::builder(config).build()?;

    let signal_task = tokio::spawn(async move {
        shutdown_signal().await;
        info!("Shutdown signal received. Shutting down gracefully...");
        let _ = shutdown_tx.send(true);
    });

    let result = agent.run(shutdown_rx).await;
    // Dropping the signal task drops the sender, which stops the metrics task.
    signal_task.abort();
    let _ = signal_task.await;

    if let Some(handle) = metrics_task {
        if let Err(e) = handle.await {
            error!("Metrics task panicked: {:?}", e);
        }
    }

    match result {
        Ok(()) => {
            info!("Agent stopped. Exiting.");
            Ok(())
        }
        Err(e) => {
            error!("Agent halted: {}", e);
            Err(e.into())
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

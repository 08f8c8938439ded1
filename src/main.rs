//! Main entry point for the finance-complaint-ingest CLI

use clap::Parser;
use finance_complaint_ingest::cli::{Cli, Commands};
use finance_complaint_ingest::shutdown::{self, ShutdownCoordinator};
use tracing::error;
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber with optional JSON formatting
fn init_tracing() {
    let json_format = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("finance_complaint_ingest=info"));

    // Logs go to stderr so `--output-format json` keeps stdout parseable
    if json_format {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
}

#[tokio::main]
async fn main() {
    init_tracing();

    let cli = Cli::parse();

    if let Some(addr) = cli.metrics_addr {
        if let Err(e) = finance_complaint_ingest::metrics::init_metrics(addr).await {
            error!("Failed to start metrics exporter: {}", e);
            std::process::exit(1);
        }
    }

    // Install global shutdown coordinator and Ctrl+C handler
    let shutdown = ShutdownCoordinator::shared();
    shutdown::set_global_shutdown(shutdown.clone());
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            while tokio::signal::ctrl_c().await.is_ok() {
                if shutdown.request_shutdown() == 1 {
                    tracing::warn!(
                        "Ctrl+C received, finishing in-flight intervals (press again to abort)"
                    );
                } else {
                    tracing::warn!("Second Ctrl+C received, aborting without checkpoint");
                    std::process::exit(130);
                }
            }
        }
    });

    let result = match cli.command {
        Commands::Ingest(ref args) => args
            .execute(&cli, shutdown.clone())
            .await
            .map_err(|e| anyhow::anyhow!(e)),
        Commands::Checkpoint(ref cmd) => cmd.execute(&cli).map_err(|e| anyhow::anyhow!(e)),
    };

    if let Err(e) = result {
        error!("Command failed: {}", e);
        std::process::exit(1);
    }
}

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use supervisor_exporter::{Args, Exporter, ExporterConfig, MetricsServer, Publisher};
use supervisor_rpc::SupervisordClient;
use tracing::{info, Level};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose, args.quiet)?;

    let config = ExporterConfig::load(&args).context("invalid configuration")?;

    let client = SupervisordClient::builder()
        .endpoint(config.supervisord_url.as_str())
        .timeout(config.timeout())
        .build()?;
    let exporter = Arc::new(Exporter::new(
        client,
        Publisher::new(config.namespace.clone()),
    ));

    let listen_addr = config.listen_addr();
    let server = MetricsServer::bind(&listen_addr, &config.metrics_path, exporter)
        .await
        .with_context(|| format!("failed to bind {}", listen_addr))?;

    info!(
        "Listening on {}{}, scraping {}",
        server.local_addr()?,
        config.metrics_path,
        config.supervisord_url
    );

    server.run(shutdown_signal()).await?;

    info!("Server stopped");
    Ok(())
}

fn init_logging(verbose: u8, quiet: bool) -> Result<()> {
    let level = if quiet {
        Level::ERROR
    } else {
        match verbose {
            0 => Level::INFO,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        }
    };

    let filter = EnvFilter::from_default_env()
        .add_directive(format!("supervisor_exporter={}", level).parse()?)
        .add_directive(format!("supervisor_rpc={}", level).parse()?);

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl-C, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}

//! Run command implementation

use crate::config::Config;
use crate::engine::{Engine, EngineSettings};
use crate::server::StatusServer;
use clap::Args;
use std::sync::Arc;
use tokio::sync::watch;

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Override the status server port
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Start with the engine disabled
    #[arg(long)]
    pub paused: bool,

    /// Track prices without firing simulated fills
    #[arg(long)]
    pub no_auto_bet: bool,
}

impl RunArgs {
    pub async fn execute(&self, mut config: Config) -> anyhow::Result<()> {
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if self.paused {
            config.trade.engine_active = false;
        }
        if self.no_auto_bet {
            config.trade.auto_bet = false;
        }

        let catalog = Arc::new(super::gamma_client(&config.catalog)?);
        let prices = Arc::new(super::clob_client(&config.clob)?);
        let settings = EngineSettings {
            strategy: config.strategy.clone(),
            catalog: config.catalog.clone(),
            pairing: config.pairing.clone(),
        };
        let engine = Engine::new(catalog, prices, config.trade.clone(), settings);

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (handle, engine_task) = engine.spawn(shutdown_rx.clone());

        let mut server_shutdown = shutdown_rx;
        let server = StatusServer::new(handle, config.server.clone());
        let mut server_task = tokio::spawn(server.run(async move {
            // Sender dropped counts as shutdown too
            let _ = server_shutdown.changed().await;
        }));

        tracing::info!(
            port = config.server.port,
            interval_ms = config.trade.scan_interval_ms,
            sum_target = %config.trade.sum_target,
            drop_threshold = %config.trade.drop_threshold,
            active = config.trade.engine_active,
            "poly-edge started, monitoring Polymarket order books"
        );

        let server_result = tokio::select! {
            _ = shutdown_signal() => None,
            result = &mut server_task => Some(result),
        };

        shutdown_tx.send_replace(true);
        let server_result = match server_result {
            Some(result) => result,
            None => server_task.await,
        };
        engine_task.await?;
        server_result??;

        tracing::info!("poly-edge stopped");
        Ok(())
    }
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
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
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl+C, shutting down"),
        _ = terminate => tracing::info!("Received SIGTERM, shutting down"),
    }
}

//! rootsync whitelist service.
//!
//! Main entry point. Loads configuration, opens the whitelist store, connects
//! the ledger client, and runs the HTTP API alongside the background
//! reconciler until a shutdown signal arrives.

use std::{sync::Arc, time::Duration};

use anyhow::{Context, Result};
use rootsync_api::{create_router, start_server, AppState, Config};
use rootsync_core::{AddressStore, Clock, FileAddressStore, RealClock};
use rootsync_publisher::{JsonRpcLedger, RootPublisher};
use rootsync_whitelist::{Reconciler, WhitelistService};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load()?;
    init_tracing(&config.rust_log)?;

    info!("Starting rootsync whitelist service");
    info!(
        data_dir = %config.data_dir.display(),
        rpc_url = %config.rpc_url,
        contract = %config.contract_address,
        "Configuration loaded"
    );

    let store: Arc<dyn AddressStore> = Arc::new(
        FileAddressStore::open(config.data_dir.clone())
            .await
            .context("Failed to open whitelist store")?,
    );

    let ledger =
        JsonRpcLedger::new(config.to_ledger_config()).context("Failed to configure ledger client")?;
    let clock: Arc<dyn Clock> = Arc::new(RealClock::new());
    let publisher =
        RootPublisher::with_clock(Arc::new(ledger), config.to_publisher_config(), clock.clone());

    let service = Arc::new(
        WhitelistService::load(store, publisher).await.context("Failed to load whitelist")?,
    );

    let status = service.get_sync_status().await;
    if status.in_sync {
        info!(root = %status.local_root, addresses = status.leaf_count, "Ledger in sync");
    } else {
        warn!(
            local_root = %status.local_root,
            ledger_root = ?status.last_confirmed_root,
            "Ledger diverged from local whitelist; reconciler will resync"
        );
    }

    let shutdown = CancellationToken::new();
    let reconciler =
        Reconciler::new(Arc::clone(&service), config.resync_interval(), shutdown.child_token())
            .spawn();

    let router = create_router(
        AppState::new(Arc::clone(&service), clock),
        Duration::from_secs(config.request_timeout),
    );
    let addr = config.parse_server_addr()?;

    let server_handle = tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            if let Err(e) = start_server(router, addr, shutdown.cancelled_owned()).await {
                error!(error = %e, "Server failed");
            }
        }
    });

    info!(%addr, "rootsync is ready");

    shutdown_signal().await;
    info!("Shutdown signal received, starting graceful shutdown");
    shutdown.cancel();

    tokio::select! {
        _ = tokio::time::sleep(Duration::from_secs(30)) => {
            warn!("Shutdown grace period expired");
        }
        _ = server_handle => {
            info!("Server stopped");
        }
    }

    if let Err(e) = reconciler.await {
        error!(error = %e, "Reconciler task failed");
    }

    info!("rootsync shutdown complete");
    Ok(())
}

/// Initializes tracing. `RUST_LOG` wins over the configured default.
fn init_tracing(default_filter: &str) -> Result<()> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter))
        .context("Invalid log filter")?;

    let fmt_layer = fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()
        .context("Failed to initialize tracing")?;
    Ok(())
}

/// Waits for shutdown signal (CTRL+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            },
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received CTRL+C");
        },
        () = terminate => {
            info!("Received SIGTERM");
        },
    }
}

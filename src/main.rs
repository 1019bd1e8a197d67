// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use hufu_server::{
    api::router,
    compliance::{AlertDispatcher, AlertWorker, ComplianceMonitor, CompliancePolicy, HttpAlertSink},
    config::{AppConfig, LogFormat, DEFAULT_LOG_FILTER},
    provisioning,
    proxy::ProxyWalletPool,
    state::AppState,
    storage::Ledger,
};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

fn init_tracing(format: LogFormat) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.init(),
    }
}

async fn shutdown_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };
    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
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
    warn!("Shutdown signal received");
    shutdown.cancel();
}

#[tokio::main]
async fn main() {
    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid configuration: {e}");
            std::process::exit(1);
        }
    };
    init_tracing(config.log_format);

    let ledger = match Ledger::open(&config.ledger_path()) {
        Ok(ledger) => Arc::new(ledger),
        Err(e) => {
            error!(error = %e, path = %config.ledger_path().display(), "Failed to open ledger");
            std::process::exit(1);
        }
    };
    info!(path = %config.ledger_path().display(), "Ledger opened");

    let proxies = Arc::new(ProxyWalletPool::default());
    if let Err(e) = provisioning::ensure_proxy_pool(&ledger, &proxies, config.proxy_pool_size) {
        error!(error = %e, "Failed to provision proxy wallets");
        std::process::exit(1);
    }

    let sink = match HttpAlertSink::new(config.alert_endpoint.clone(), config.alert_timeout) {
        Ok(sink) => sink,
        Err(e) => {
            error!(error = %e, "Failed to build alert client");
            std::process::exit(1);
        }
    };
    let (alerts, queue) = AlertDispatcher::channel(config.alert_queue_capacity);
    let monitor = ComplianceMonitor::new(
        CompliancePolicy {
            ceiling: config.transfer_ceiling,
        },
        alerts,
    );

    let shutdown = CancellationToken::new();
    info!(endpoint = %sink.endpoint(), "Alert worker configured");
    let worker = tokio::spawn(AlertWorker::new(queue, sink).run(shutdown.clone()));

    let state = AppState::new(ledger, proxies, monitor, config.jury.clone());
    let app = router(state);

    let listener = match tokio::net::TcpListener::bind(config.bind_addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!(error = %e, addr = %config.bind_addr, "Failed to bind");
            std::process::exit(1);
        }
    };
    info!(
        addr = %config.bind_addr,
        ceiling = %config.transfer_ceiling,
        "Hufu server listening (docs at /docs)"
    );

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown.clone()))
        .await
    {
        error!(error = %e, "Server error");
    }

    shutdown.cancel();
    let _ = worker.await;
    info!("Server stopped");
}

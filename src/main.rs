//! MediSupply Market - B2B marketplace service for medical supplies

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use medisupply_market::api::{build_app, AppState};
use medisupply_market::config::load_app_config;
use medisupply_market::services::{Marketplace, Notifier};
use medisupply_market::store::{DocumentStore, MemoryStore, PgStore, Repository};

#[tokio::main]
async fn main() -> Result<()> {
    let config = load_app_config()?;
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| config.log_level.clone().into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let backend: Arc<dyn DocumentStore> = match &config.database_url {
        Some(url) => Arc::new(PgStore::connect(url, config.db_max_connections).await.context("connecting to postgres")?),
        None => {
            tracing::warn!("DATABASE_URL not set, using the in-memory store; data is lost on restart");
            Arc::new(MemoryStore::new())
        }
    };

    let nats = match &config.nats_url {
        Some(url) => match async_nats::connect(url.as_str()).await {
            Ok(client) => Some(client),
            Err(e) => {
                tracing::warn!(error = %e, "NATS unavailable, notifications stay in-process");
                None
            }
        },
        None => None,
    };

    let notifier = Notifier::new(config.notification_buffer, nats);
    let market = Marketplace::new(Repository::new(backend), notifier, config.bootstrap_admin_email.clone());
    let app = build_app(AppState { market });

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, "medisupply market listening");
    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
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
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, starting graceful shutdown");
}

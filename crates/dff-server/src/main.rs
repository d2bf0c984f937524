mod api;
mod auth;
mod inventory_log;
mod middleware;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use crate::{
    api::{build_app, default_rate_limit_state, AppState},
    inventory_log::InventoryLog,
    middleware::AuthState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Arc::new(dff_core::load_app_config()?);
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let secret = config
        .jwt_secret
        .as_deref()
        .context("JWT_SECRET is required to run the inventory API")?;
    let auth = AuthState::new(secret);

    let pool_config = dff_db::PoolConfig::from_app_config(&config);
    let pool = dff_db::connect_pool(&config.database_url, pool_config).await?;
    dff_db::run_migrations(&pool).await?;

    let shutdown = CancellationToken::new();
    let keepalive = dff_db::spawn_keepalive(
        pool.clone(),
        Duration::from_secs(config.db_keepalive_secs),
        shutdown.clone(),
    );

    let localline = dff_localline::LocalLineClient::from_app_config(&config)?;
    let state = AppState {
        pool,
        localline,
        inventory_log: Arc::new(InventoryLog::new(config.inventory_log_path.clone())),
        config: Arc::clone(&config),
    };
    let app = build_app(state, auth, default_rate_limit_state());

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, env = %config.env, "inventory API listening");
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    shutdown.cancel();
    if let Err(e) = keepalive.await {
        tracing::warn!(error = %e, "database keep-alive task ended abnormally");
    }
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to listen for ctrl-c");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, starting graceful shutdown");
}

mod config;
mod notifier;

use std::sync::Arc;

use tracing::info;

use sest_api::{AppState, AppStateInner};
use sest_core::notify::{LogMailer, Mailer};
use sest_db::Database;

use crate::config::ServerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "sest=debug,sest_api=debug,sest_core=debug,sest_db=info,tower_http=debug".into()
            }),
        )
        .init();

    let config = ServerConfig::from_env()?;
    let addr = config.addr()?;

    let db = Arc::new(Database::open(&config.db_path)?);

    let state: AppState = Arc::new(AppStateInner::new(
        db.clone(),
        config.parse_policy,
        config.admin_token.clone(),
    ));
    if state.admin_token.is_none() {
        info!("SEST_ADMIN_TOKEN not set, admin routes are disabled");
    }

    // Owner notifications for new records
    let mailer: Arc<dyn Mailer> = Arc::new(LogMailer);
    tokio::spawn(notifier::run_notifier(
        db,
        mailer,
        config.notify_from.clone(),
        state.events.subscribe(),
    ));

    let app = sest_api::router(state);

    info!(
        "Sest server listening on {} (parse policy: {:?})",
        addr, config.parse_policy
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
                    _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
                }
            }
            Err(e) => {
                tracing::warn!("Failed to install SIGTERM handler: {}", e);
                ctrl_c.await.ok();
                info!("Received Ctrl+C, shutting down...");
            }
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}

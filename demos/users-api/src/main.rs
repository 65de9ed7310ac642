//! Users service HTTP server.
//!
//! ```bash
//! BIND_ADDR=127.0.0.1:3000 RUST_LOG=info,users_api=debug cargo run -p users-api
//! curl -H 'X-User-Id: 1' -H 'X-User-Roles: admin' \
//!      -d '{"email":"ada@example.com"}' -H 'content-type: application/json' \
//!      http://127.0.0.1:3000/api/users
//! ```

use callstack_postgres::PgTransactionProvider;
use callstack_web::CallstackSettings;
use std::sync::Arc;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use users_api::{AppState, ServerConfig, UserRepository, build_router};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting users service");

    let config = ServerConfig::load()?;
    let mut settings = CallstackSettings::new(config.callstack());

    if let Some(database_url) = &config.database_url {
        let provider = PgTransactionProvider::connect(database_url).await?;
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS user_audit (
                user_id BIGINT NOT NULL,
                action TEXT NOT NULL,
                at TIMESTAMPTZ NOT NULL DEFAULT now()
            )
            ",
        )
        .execute(provider.pool())
        .await?;
        info!("Requests run inside PostgreSQL transactions");
        settings = settings.with_transactions(Arc::new(provider));
    } else {
        warn!("DATABASE_URL not set, running without transactions");
    }

    let state = AppState::new(settings, Arc::new(UserRepository::new()));
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    info!(address = %config.bind_addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(error) = signal::ctrl_c().await {
            tracing::error!(%error, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(error) => {
                tracing::error!(%error, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received Ctrl+C signal, shutting down gracefully...");
        },
        () = terminate => {
            info!("Received SIGTERM signal, shutting down gracefully...");
        },
    }
}

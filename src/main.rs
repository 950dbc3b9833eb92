//! Atomic Workflow Server - Main Application Entry Point
//!
//! REST API server exposing two transactional workflows: bulk fund transfers
//! and course enrollments.
//!
//! # Architecture
//!
//! - **Web Framework**: Axum (async HTTP server)
//! - **Database**: PostgreSQL with sqlx, serializable transactions
//! - **Format**: JSON requests/responses
//!
//! # Startup Flow
//!
//! 1. Load configuration from environment variables
//! 2. Create database connection pool
//! 3. Run database migrations
//! 4. Wire the workflows to the Postgres stores
//! 5. Build HTTP router and start server on configured address
//! 6. On SIGINT/SIGTERM, stop accepting connections and drain in-flight requests

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use atomic_workflow_server::{
    app::{self, AppState},
    config::Config,
    db::{self, PgDatabase},
    services::{EnrollmentWorkflow, FundTransferWorkflow},
    stores::{PgAccountStore, PgClassStore, PgLedgerStore},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Reads RUST_LOG (defaults to "info" level)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = Config::from_env()?;
    tracing::info!("Configuration loaded");

    let pool = db::create_pool(
        &config.database_url()?,
        config.db_max_connections,
        config.connect_timeout(),
    )
    .await?;
    tracing::info!("Database pool created");

    db::run_migrations(&pool).await?;
    tracing::info!("Database migrations complete");

    let database = PgDatabase::new(pool.clone());
    let retry = config.retry_policy();

    let transfers = FundTransferWorkflow::new(database.clone(), PgAccountStore, PgLedgerStore)
        .with_retry_policy(retry);
    let enrollments = EnrollmentWorkflow::new(database, PgClassStore).with_retry_policy(retry);

    let state = AppState {
        pool,
        transfers: Arc::new(transfers),
        enrollments: Arc::new(enrollments),
    };
    let app = app::router(state, config.request_timeout());

    let addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(
        max_attempts = retry.max_attempts(),
        "Server listening on {}",
        addr
    );

    app::serve(listener, app, shutdown_signal()).await?;

    tracing::info!("Server stopped");
    Ok(())
}

/// Resolves on SIGINT or SIGTERM. In-flight requests are drained before the
/// server returns, so no workflow is cut off between its writes and commit.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to listen for SIGTERM");
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

    tracing::info!("Shutdown signal received, draining in-flight requests");
}

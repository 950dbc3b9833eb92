//! Router assembly and shared handler state.

use std::{future::Future, io, sync::Arc, time::Duration};

use axum::{
    Router,
    routing::{get, post},
};
use tokio::net::TcpListener;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::{
    db::DbPool,
    handlers,
    services::{BulkTransferService, EnrollmentService},
};

/// State shared with every handler via `State` extraction.
#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub transfers: Arc<dyn BulkTransferService>,
    pub enrollments: Arc<dyn EnrollmentService>,
}

/// Build the HTTP router.
///
/// A request that outlives `request_timeout` is answered with 408 and its
/// handler future is dropped, which rolls back any open transaction.
pub fn router(state: AppState, request_timeout: Duration) -> Router {
    Router::new()
        .route("/health", get(handlers::health::health_check))
        .route(
            "/api/v1/bulk-transfers",
            post(handlers::transfers::create_bulk_transfer),
        )
        .route(
            "/api/v1/enrollments",
            post(handlers::enrollments::create_enrollment),
        )
        .layer(TimeoutLayer::new(request_timeout))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve `router` until `shutdown` resolves, then stop accepting connections
/// and wait for in-flight requests to finish.
pub async fn serve<F>(listener: TcpListener, router: Router, shutdown: F) -> io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await
}

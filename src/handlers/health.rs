//! `GET /health` - liveness plus a database round trip.

use crate::{app::AppState, error::AppError};
use axum::{Json, extract::State};
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub database: &'static str,
    pub checked_at: DateTime<Utc>,
}

/// Answers 200 once the pool can run a query. An unreachable database
/// surfaces as the usual 500 error body, so load balancers stop routing
/// transfers and enrollments here.
pub async fn health_check(State(state): State<AppState>) -> Result<Json<HealthResponse>, AppError> {
    sqlx::query("SELECT 1").execute(&state.pool).await?;

    Ok(Json(HealthResponse {
        status: "ok",
        database: "reachable",
        checked_at: Utc::now(),
    }))
}

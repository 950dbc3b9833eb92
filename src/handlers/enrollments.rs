//! Enrollment HTTP handler.

use axum::{Json, extract::State, extract::rejection::JsonRejection, http::StatusCode};

use crate::{app::AppState, error::AppError, models::class::EnrollmentRequest};

/// `POST /api/v1/enrollments`
///
/// Enrolls every listed student in the course or none of them. Returns 201
/// with an empty body; rejections carry the offending emails or the course
/// capacity figures in `error.details`.
pub async fn create_enrollment(
    State(state): State<AppState>,
    payload: Result<Json<EnrollmentRequest>, JsonRejection>,
) -> Result<StatusCode, AppError> {
    let Json(request) = payload?;

    state.enrollments.submit_enrollment(request).await?;

    Ok(StatusCode::CREATED)
}

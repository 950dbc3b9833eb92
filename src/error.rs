//! Error types and HTTP error response handling.
//!
//! Errors are layered:
//! - `StoreError`: a store or driver operation failed
//! - `TransferError` / `EnrollmentError`: typed outcomes of the two workflows
//! - `AppError`: what an HTTP handler returns, converted into a JSON response

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::{Value, json};

use crate::{models::class::Email, scope::ScopeError};

/// SQLSTATE codes Postgres uses when a transaction lost a race and may be retried.
const SERIALIZATION_FAILURE: &str = "40001";
const DEADLOCK_DETECTED: &str = "40P01";
const UNIQUE_VIOLATION: &str = "23505";

/// Failure of a store primitive (lookup, insert, update, commit, rollback).
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The requested row does not exist.
    #[error("record not found")]
    NotFound,

    /// The database aborted the transaction to keep concurrent transactions
    /// serializable. Retrying the whole transaction may succeed.
    #[error("serialization conflict: {0}")]
    SerializationConflict(String),

    #[error("unique constraint violated: {0}")]
    UniqueViolation(String),

    /// A row could not be mapped into the domain model.
    #[error("invalid row: {0}")]
    InvalidRow(String),

    #[error("database error: {0}")]
    Database(#[source] sqlx::Error),
}

impl StoreError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::SerializationConflict(_))
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::RowNotFound = err {
            return StoreError::NotFound;
        }

        let classified = match &err {
            sqlx::Error::Database(db_err) => match db_err.code().as_deref() {
                Some(SERIALIZATION_FAILURE | DEADLOCK_DETECTED) => Some(
                    StoreError::SerializationConflict(db_err.message().to_string()),
                ),
                Some(UNIQUE_VIOLATION) => {
                    Some(StoreError::UniqueViolation(db_err.message().to_string()))
                }
                _ => None,
            },
            _ => None,
        };

        classified.unwrap_or_else(|| StoreError::Database(err))
    }
}

/// Outcome of a failed bulk transfer.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    /// The request is structurally invalid; no transaction was opened.
    #[error("invalid bulk transfer: {0}")]
    Invalid(String),

    #[error("no bank account with IBAN {iban:?}")]
    AccountNotFound { iban: String },

    #[error(
        "insufficient funds to settle bulk transfer: balance is {balance_cents} cents, transfers total {total_cents} cents"
    )]
    InsufficientFunds { balance_cents: i64, total_cents: i64 },

    /// Lost a race with a concurrent transaction; safe to retry.
    #[error("bulk transfer conflicted with a concurrent transaction")]
    Conflict(#[source] StoreError),

    #[error("bulk transfer failed: {0}")]
    Store(#[source] StoreError),

    #[error("bulk transfer failed: {0}")]
    Scope(#[source] ScopeError),
}

impl From<StoreError> for TransferError {
    fn from(err: StoreError) -> Self {
        if err.is_conflict() {
            TransferError::Conflict(err)
        } else {
            TransferError::Store(err)
        }
    }
}

impl From<ScopeError> for TransferError {
    fn from(err: ScopeError) -> Self {
        match err {
            ScopeError::Store(store) => store.into(),
            other => TransferError::Scope(other),
        }
    }
}

/// Outcome of a failed enrollment.
#[derive(Debug, thiserror::Error)]
pub enum EnrollmentError {
    /// The request is structurally invalid; no transaction was opened.
    #[error("invalid enrollment request: {0}")]
    Invalid(String),

    #[error("no course with code {course_code:?}")]
    CourseNotFound { course_code: String },

    #[error("attempted to enroll unregistered students: {}", join_emails(.missing))]
    UnregisteredStudents { missing: Vec<Email> },

    #[error("students {} are already enrolled", join_emails(.students))]
    AlreadyEnrolled { students: Vec<Email> },

    #[error(
        "attempted to enroll {attempted_enrollments} students, but course {course_code:?} has only {available_spaces} spaces"
    )]
    Oversubscribed {
        course_code: String,
        available_spaces: u32,
        attempted_enrollments: u32,
    },

    /// Lost a race with a concurrent transaction; safe to retry.
    #[error("enrollment conflicted with a concurrent transaction")]
    Conflict(#[source] StoreError),

    #[error("enrollment failed: {0}")]
    Store(#[source] StoreError),

    #[error("enrollment failed: {0}")]
    Scope(#[source] ScopeError),
}

impl From<StoreError> for EnrollmentError {
    fn from(err: StoreError) -> Self {
        // A concurrent enrollment of the same student surfaces as a unique
        // violation rather than a serialization failure.
        if err.is_conflict() || matches!(err, StoreError::UniqueViolation(_)) {
            EnrollmentError::Conflict(err)
        } else {
            EnrollmentError::Store(err)
        }
    }
}

impl From<ScopeError> for EnrollmentError {
    fn from(err: ScopeError) -> Self {
        match err {
            ScopeError::Store(store) => store.into(),
            other => EnrollmentError::Scope(other),
        }
    }
}

fn join_emails(emails: &[Email]) -> String {
    emails
        .iter()
        .map(Email::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Application-wide error type returned by HTTP handlers.
///
/// # Status Code Mapping
///
/// - Validation and not-found → 400 Bad Request
/// - Body not sent as JSON → 415 Unsupported Media Type
/// - Business-rule rejections → 422 Unprocessable Entity
/// - Serialization conflicts → 409 Conflict (the client may retry)
/// - Everything else → 500 Internal Server Error (hides details from client)
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Transfer(#[from] TransferError),

    #[error(transparent)]
    Enrollment(#[from] EnrollmentError),

    /// Request body or parameters are invalid.
    #[error("Invalid request")]
    InvalidRequest(String),

    /// Request body is not declared as `application/json`.
    #[error("Unsupported media type")]
    UnsupportedMediaType(String),
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        match &rejection {
            JsonRejection::MissingJsonContentType(_) => {
                AppError::UnsupportedMediaType(rejection.body_text())
            }
            _ => AppError::InvalidRequest(rejection.body_text()),
        }
    }
}

const INTERNAL_MESSAGE: &str = "An internal error occurred";

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message, details): (StatusCode, &str, String, Option<Value>) =
            match &self {
                AppError::InvalidRequest(msg) => {
                    (StatusCode::BAD_REQUEST, "invalid_request", msg.clone(), None)
                }
                AppError::UnsupportedMediaType(msg) => (
                    StatusCode::UNSUPPORTED_MEDIA_TYPE,
                    "unsupported_media_type",
                    msg.clone(),
                    None,
                ),
                AppError::Database(_) => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    INTERNAL_MESSAGE.to_string(),
                    None,
                ),
                AppError::Transfer(err) => match err {
                    TransferError::Invalid(msg) => {
                        (StatusCode::BAD_REQUEST, "invalid_request", msg.clone(), None)
                    }
                    TransferError::AccountNotFound { .. } => (
                        StatusCode::BAD_REQUEST,
                        "account_not_found",
                        err.to_string(),
                        None,
                    ),
                    TransferError::InsufficientFunds { .. } => (
                        StatusCode::UNPROCESSABLE_ENTITY,
                        "insufficient_funds",
                        err.to_string(),
                        None,
                    ),
                    TransferError::Conflict(_) => {
                        (StatusCode::CONFLICT, "conflict", err.to_string(), None)
                    }
                    TransferError::Store(_) | TransferError::Scope(_) => (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "internal_error",
                        INTERNAL_MESSAGE.to_string(),
                        None,
                    ),
                },
                AppError::Enrollment(err) => match err {
                    EnrollmentError::Invalid(msg) => {
                        (StatusCode::BAD_REQUEST, "invalid_request", msg.clone(), None)
                    }
                    EnrollmentError::CourseNotFound { .. } => (
                        StatusCode::BAD_REQUEST,
                        "course_not_found",
                        err.to_string(),
                        None,
                    ),
                    EnrollmentError::UnregisteredStudents { missing } => (
                        StatusCode::UNPROCESSABLE_ENTITY,
                        "unregistered_students",
                        err.to_string(),
                        Some(json!({ "emails": missing })),
                    ),
                    EnrollmentError::AlreadyEnrolled { students } => (
                        StatusCode::UNPROCESSABLE_ENTITY,
                        "already_enrolled",
                        err.to_string(),
                        Some(json!({ "emails": students })),
                    ),
                    EnrollmentError::Oversubscribed {
                        course_code,
                        available_spaces,
                        attempted_enrollments,
                    } => (
                        StatusCode::UNPROCESSABLE_ENTITY,
                        "oversubscribed",
                        err.to_string(),
                        Some(json!({
                            "course_code": course_code,
                            "available_spaces": available_spaces,
                            "attempted_enrollments": attempted_enrollments,
                        })),
                    ),
                    EnrollmentError::Conflict(_) => {
                        (StatusCode::CONFLICT, "conflict", err.to_string(), None)
                    }
                    EnrollmentError::Store(_) | EnrollmentError::Scope(_) => (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "internal_error",
                        INTERNAL_MESSAGE.to_string(),
                        None,
                    ),
                },
            };

        let mut error = json!({
            "code": code,
            "message": message,
        });
        if let Some(details) = details {
            error["details"] = details;
        }

        (status, Json(json!({ "error": error }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_error_conversions_keep_conflicts_distinct() {
        let conflict = StoreError::SerializationConflict("could not serialize access".into());
        assert!(matches!(
            TransferError::from(conflict),
            TransferError::Conflict(_)
        ));

        let lost = StoreError::Database(sqlx::Error::PoolClosed);
        assert!(matches!(TransferError::from(lost), TransferError::Store(_)));

        let duplicate = StoreError::UniqueViolation("enrollments_course_id_student_id_key".into());
        assert!(matches!(
            EnrollmentError::from(duplicate),
            EnrollmentError::Conflict(_)
        ));
    }

    #[test]
    fn scope_store_errors_are_unwrapped() {
        let err = ScopeError::Store(StoreError::SerializationConflict("40001".into()));
        assert!(matches!(
            EnrollmentError::from(err),
            EnrollmentError::Conflict(_)
        ));

        assert!(matches!(
            TransferError::from(ScopeError::AlreadyUsed),
            TransferError::Scope(ScopeError::AlreadyUsed)
        ));
    }

    #[test]
    fn row_not_found_maps_to_not_found() {
        assert!(matches!(
            StoreError::from(sqlx::Error::RowNotFound),
            StoreError::NotFound
        ));
    }

    #[test]
    fn status_codes_follow_error_class() {
        let status = |err: AppError| err.into_response().status();

        assert_eq!(
            status(AppError::InvalidRequest("bad".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status(AppError::UnsupportedMediaType("text/plain".into())),
            StatusCode::UNSUPPORTED_MEDIA_TYPE
        );
        assert_eq!(
            status(
                TransferError::AccountNotFound {
                    iban: "FR10474608000002006107XXXXX".into()
                }
                .into()
            ),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status(
                TransferError::InsufficientFunds {
                    balance_cents: 100,
                    total_cents: 120
                }
                .into()
            ),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            status(
                EnrollmentError::Oversubscribed {
                    course_code: "SICP".into(),
                    available_spaces: 0,
                    attempted_enrollments: 1
                }
                .into()
            ),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            status(
                EnrollmentError::Conflict(StoreError::SerializationConflict("40001".into())).into()
            ),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status(TransferError::Store(StoreError::Database(sqlx::Error::PoolClosed)).into()),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}

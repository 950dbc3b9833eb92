//! Business workflows.
//!
//! Each workflow runs its reads, invariant checks and writes inside one
//! serializable [`TransactionScope`]; on any failure the scope is rolled back
//! and nothing persists.

use async_trait::async_trait;

use crate::{
    error::{EnrollmentError, TransferError},
    models::{account::BulkTransfer, class::EnrollmentRequest},
    scope::{Database, ScopeError, TransactionScope},
};

pub mod enrollment_service;
pub mod transfer_service;

pub use enrollment_service::EnrollmentWorkflow;
pub use transfer_service::FundTransferWorkflow;

/// Bulk transfers as seen by the HTTP layer.
#[async_trait]
pub trait BulkTransferService: Send + Sync {
    async fn submit_bulk_transfer(&self, bulk_transfer: BulkTransfer) -> Result<(), TransferError>;
}

/// Enrollments as seen by the HTTP layer.
#[async_trait]
pub trait EnrollmentService: Send + Sync {
    async fn submit_enrollment(&self, request: EnrollmentRequest) -> Result<(), EnrollmentError>;
}

/// How often a workflow re-runs after losing a serialization race.
///
/// Business rejections are never retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
}

impl RetryPolicy {
    /// Run once and surface any conflict to the caller.
    pub const fn none() -> Self {
        Self { max_attempts: 1 }
    }

    /// Allow `retries` further attempts after the first.
    pub const fn with_retries(retries: u32) -> Self {
        Self {
            max_attempts: retries.saturating_add(1),
        }
    }

    pub const fn max_attempts(self) -> u32 {
        self.max_attempts
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::none()
    }
}

/// Roll back unconditionally once a workflow is done with its scope.
///
/// After a successful commit the rollback reports `AlreadyUsed`, which is
/// expected. A genuine rollback failure is logged and never replaces the
/// outcome the workflow returns.
async fn release<D: Database>(scope: &mut TransactionScope<'_, D>) {
    match scope.rollback().await {
        Ok(()) => tracing::debug!("transaction rolled back"),
        Err(ScopeError::AlreadyUsed) => tracing::debug!("transaction already finished"),
        Err(err) => tracing::warn!(error = %err, "failed to roll back transaction"),
    }
}

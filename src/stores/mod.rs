//! Store collaborators consumed by the workflows.
//!
//! Each trait is generic over the transaction handle type so that every call
//! runs against the scope's open transaction, never a fresh pooled
//! connection. The Postgres adapters implement them for
//! [`PgTransaction`](crate::db::PgTransaction).

use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    error::StoreError,
    models::{
        account::Account,
        class::{Class, Email, Enrollment, Student},
        transaction::{NewTransaction, Transaction},
    },
};

pub mod accounts;
pub mod classes;
pub mod ledger;
#[cfg(test)]
pub mod memory;

pub use accounts::PgAccountStore;
pub use classes::PgClassStore;
pub use ledger::PgLedgerStore;

/// Bank account lookups and updates.
#[async_trait]
pub trait AccountStore<Tx: Send>: Send + Sync {
    /// Fails with [`StoreError::NotFound`] if no account has this IBAN.
    async fn find_by_iban(&self, tx: &mut Tx, iban: &str) -> Result<Account, StoreError>;

    /// Persist the full row identified by `account.id`.
    async fn update(&self, tx: &mut Tx, account: &Account) -> Result<(), StoreError>;
}

/// Append-only store of credit transfer transactions.
#[async_trait]
pub trait LedgerStore<Tx: Send>: Send + Sync {
    /// Insert all rows as one operation, returning them with assigned IDs.
    async fn bulk_insert(
        &self,
        tx: &mut Tx,
        transactions: &[NewTransaction],
    ) -> Result<Vec<Transaction>, StoreError>;
}

/// Courses, students and the enrollments joining them.
#[async_trait]
pub trait ClassStore<Tx: Send>: Send + Sync {
    /// Load a course and its enrolled students. Fails with
    /// [`StoreError::NotFound`] if the course does not exist.
    async fn get_class_by_course_code(
        &self,
        tx: &mut Tx,
        course_code: &str,
    ) -> Result<Class, StoreError>;

    /// Registered students whose email exactly matches one of `emails`.
    async fn get_students_by_email(
        &self,
        tx: &mut Tx,
        emails: &[Email],
    ) -> Result<Vec<Student>, StoreError>;

    async fn insert_enrollments(
        &self,
        tx: &mut Tx,
        course_id: Uuid,
        student_ids: &[Uuid],
    ) -> Result<Vec<Enrollment>, StoreError>;
}

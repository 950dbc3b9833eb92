//! Single-use transaction scope.
//!
//! A `TransactionScope` wraps exactly one database transaction and walks a
//! linear lifecycle:
//!
//! ```text
//! Idle --begin--> Active --commit---> Committed
//!                        \--rollback-> RolledBack
//! ```
//!
//! Once the scope reaches a terminal state every further `begin`, `commit` or
//! `rollback` fails with [`ScopeError::AlreadyUsed`] and touches no I/O.
//! Dropping an `Active` scope drops the transaction handle, which discards the
//! transaction (sqlx rolls back on drop), so a cancelled workflow never leaves
//! partial writes behind.
//!
//! A scope is owned by the invocation that created it and is never shared
//! between tasks; workflows construct a fresh scope per attempt.

use async_trait::async_trait;

use crate::error::StoreError;

/// Isolation level requested when a transaction begins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IsolationLevel {
    /// Whatever the database defaults to (read committed on Postgres).
    Default,
    /// Required whenever a decision derived from a read drives a dependent
    /// write, so check-then-act races abort instead of both succeeding.
    Serializable,
}

impl IsolationLevel {
    /// Statement that must run first inside the transaction, if any.
    pub fn set_statement(self) -> Option<&'static str> {
        match self {
            IsolationLevel::Default => None,
            IsolationLevel::Serializable => Some("SET TRANSACTION ISOLATION LEVEL SERIALIZABLE"),
        }
    }
}

/// An open transaction handle owned by the database driver.
#[async_trait]
pub trait TransactionHandle: Send + Sized {
    async fn commit(self) -> Result<(), StoreError>;

    /// Must leave the store in its pre-transaction state even when it
    /// returns an error.
    async fn rollback(self) -> Result<(), StoreError>;
}

/// Source of transactions.
#[async_trait]
pub trait Database: Send + Sync {
    type Tx: TransactionHandle;

    async fn begin(&self, isolation: IsolationLevel) -> Result<Self::Tx, StoreError>;
}

/// Lifecycle errors raised by a [`TransactionScope`].
#[derive(Debug, thiserror::Error)]
pub enum ScopeError {
    #[error("transaction already in progress")]
    InProgress,

    #[error("transaction not started")]
    NotStarted,

    #[error("transaction scope already used")]
    AlreadyUsed,

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Observable lifecycle state of a scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeStatus {
    Idle,
    Active,
    Committed,
    RolledBack,
}

enum State<T> {
    Idle,
    Active(T),
    Committed,
    RolledBack,
}

/// Single-use capsule around one database transaction.
pub struct TransactionScope<'a, D: Database> {
    database: &'a D,
    state: State<D::Tx>,
}

impl<'a, D: Database> TransactionScope<'a, D> {
    pub fn new(database: &'a D) -> Self {
        Self {
            database,
            state: State::Idle,
        }
    }

    pub fn status(&self) -> ScopeStatus {
        match self.state {
            State::Idle => ScopeStatus::Idle,
            State::Active(_) => ScopeStatus::Active,
            State::Committed => ScopeStatus::Committed,
            State::RolledBack => ScopeStatus::RolledBack,
        }
    }

    /// Open the transaction. Valid only while idle.
    pub async fn begin(&mut self, isolation: IsolationLevel) -> Result<(), ScopeError> {
        match self.state {
            State::Idle => {}
            State::Active(_) => return Err(ScopeError::InProgress),
            State::Committed | State::RolledBack => return Err(ScopeError::AlreadyUsed),
        }

        let tx = self.database.begin(isolation).await?;
        self.state = State::Active(tx);

        Ok(())
    }

    /// Borrow the open transaction so store calls run inside it.
    pub fn transaction(&mut self) -> Result<&mut D::Tx, ScopeError> {
        match &mut self.state {
            State::Active(tx) => Ok(tx),
            State::Idle => Err(ScopeError::NotStarted),
            State::Committed | State::RolledBack => Err(ScopeError::AlreadyUsed),
        }
    }

    /// Commit the transaction.
    ///
    /// A failed commit leaves the scope rolled back: the database has
    /// discarded the transaction and nothing it wrote persists.
    pub async fn commit(&mut self) -> Result<(), ScopeError> {
        let tx = self.take_active(State::Committed)?;

        if let Err(err) = tx.commit().await {
            self.state = State::RolledBack;
            return Err(err.into());
        }

        Ok(())
    }

    /// Roll the transaction back.
    ///
    /// The scope ends up rolled back whether or not the driver reports an
    /// error.
    pub async fn rollback(&mut self) -> Result<(), ScopeError> {
        let tx = self.take_active(State::RolledBack)?;
        tx.rollback().await?;

        Ok(())
    }

    /// Move the handle out of an active scope, leaving `terminal` behind.
    fn take_active(&mut self, terminal: State<D::Tx>) -> Result<D::Tx, ScopeError> {
        match std::mem::replace(&mut self.state, terminal) {
            State::Active(tx) => Ok(tx),
            State::Idle => {
                self.state = State::Idle;
                Err(ScopeError::NotStarted)
            }
            finished => {
                self.state = finished;
                Err(ScopeError::AlreadyUsed)
            }
        }
    }
}

//! Database connection pool, migrations and the Postgres transaction source.
//!
//! This module provides:
//! - Creating the PostgreSQL connection pool
//! - Running embedded migrations
//! - `PgDatabase`, which opens transactions at a requested isolation level

use std::time::Duration;

use async_trait::async_trait;
use sqlx::{Pool, Postgres};

use crate::{
    error::StoreError,
    scope::{Database, IsolationLevel, TransactionHandle},
};

/// Type alias for PostgreSQL connection pool.
pub type DbPool = Pool<Postgres>;

/// An open Postgres transaction checked out of the pool.
///
/// Dropping it without committing rolls the transaction back.
pub type PgTransaction = sqlx::Transaction<'static, Postgres>;

/// Create a new PostgreSQL connection pool.
///
/// # Arguments
///
/// * `database_url` - PostgreSQL connection string
/// * `max_connections` - Upper bound on pooled connections
/// * `acquire_timeout` - How long a caller waits for a free connection
///
/// # Errors
///
/// Returns an error if the connection string is invalid or the server cannot
/// be reached.
pub async fn create_pool(
    database_url: &str,
    max_connections: u32,
    acquire_timeout: Duration,
) -> Result<DbPool, sqlx::Error> {
    sqlx::postgres::PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(acquire_timeout)
        .connect(database_url)
        .await
}

/// Run database migrations from the `migrations/` directory.
///
/// Migrations are embedded at compile time and tracked in the
/// `_sqlx_migrations` table, so each one runs only once.
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}

/// Transaction source backed by the connection pool.
#[derive(Debug, Clone)]
pub struct PgDatabase {
    pool: DbPool,
}

impl PgDatabase {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Database for PgDatabase {
    type Tx = PgTransaction;

    async fn begin(&self, isolation: IsolationLevel) -> Result<PgTransaction, StoreError> {
        let mut tx = self.pool.begin().await?;

        // Must be the first statement of the transaction.
        if let Some(statement) = isolation.set_statement() {
            sqlx::query(statement).execute(&mut *tx).await?;
        }

        Ok(tx)
    }
}

#[async_trait]
impl TransactionHandle for PgTransaction {
    async fn commit(self) -> Result<(), StoreError> {
        sqlx::Transaction::commit(self).await?;
        Ok(())
    }

    async fn rollback(self) -> Result<(), StoreError> {
        sqlx::Transaction::rollback(self).await?;
        Ok(())
    }
}

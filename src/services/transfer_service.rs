//! Fund transfer workflow - debits one account for a batch of credit transfers.
//!
//! # Process
//!
//! 1. Validate the request shape (no transaction yet)
//! 2. Begin a serializable transaction
//! 3. Resolve the account by IBAN
//! 4. Check the debited balance stays non-negative
//! 5. Update the balance and insert every credit transfer in one statement
//! 6. Commit (or roll back on any error)
//!
//! # Atomicity Guarantees
//!
//! Two concurrent bulk transfers against the same account that each fit the
//! starting balance but jointly exceed it cannot both commit: serializable
//! isolation makes the database abort one of them instead of letting both
//! read the stale pre-debit balance.

use async_trait::async_trait;

use crate::{
    error::{StoreError, TransferError},
    models::{account::BulkTransfer, transaction::NewTransaction},
    scope::{Database, IsolationLevel, TransactionScope},
    stores::{AccountStore, LedgerStore},
    validation,
};

use super::{BulkTransferService, RetryPolicy, release};

pub struct FundTransferWorkflow<D, A, L> {
    database: D,
    accounts: A,
    ledger: L,
    retry: RetryPolicy,
}

impl<D, A, L> FundTransferWorkflow<D, A, L>
where
    D: Database,
    A: AccountStore<D::Tx>,
    L: LedgerStore<D::Tx>,
{
    pub fn new(database: D, accounts: A, ledger: L) -> Self {
        Self {
            database,
            accounts,
            ledger,
            retry: RetryPolicy::none(),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Execute a bulk transfer atomically.
    ///
    /// # Errors
    ///
    /// - `Invalid`: empty IBAN, no transfers, a non-positive amount or an
    ///   overflowing total
    /// - `AccountNotFound`: no account has the referenced IBAN
    /// - `InsufficientFunds`: the total exceeds the balance; nothing is written
    /// - `Conflict`: a concurrent transaction won the race (after any retries)
    /// - `Store` / `Scope`: infrastructure failure
    #[tracing::instrument(
        name = "bulk_transfer",
        skip_all,
        fields(
            iban = %bulk_transfer.account.organization_iban,
            transfers = bulk_transfer.credit_transfers.len(),
        )
    )]
    pub async fn execute(&self, bulk_transfer: &BulkTransfer) -> Result<(), TransferError> {
        let total_cents = validate_bulk_transfer(bulk_transfer).inspect_err(log_failure)?;

        let mut attempt = 1;
        loop {
            match self.attempt(bulk_transfer, total_cents).await {
                Ok(()) => {
                    tracing::info!(total_cents, "bulk transfer settled");
                    return Ok(());
                }
                Err(TransferError::Conflict(err)) if attempt < self.retry.max_attempts() => {
                    tracing::warn!(attempt, error = %err, "serialization conflict, retrying bulk transfer");
                    attempt += 1;
                }
                Err(err) => {
                    log_failure(&err);
                    return Err(err);
                }
            }
        }
    }

    async fn attempt(
        &self,
        bulk_transfer: &BulkTransfer,
        total_cents: i64,
    ) -> Result<(), TransferError> {
        let mut scope = TransactionScope::new(&self.database);
        scope.begin(IsolationLevel::Serializable).await?;

        let outcome = self
            .debit_and_record(&mut scope, bulk_transfer, total_cents)
            .await;
        release(&mut scope).await;

        outcome
    }

    async fn debit_and_record(
        &self,
        scope: &mut TransactionScope<'_, D>,
        bulk_transfer: &BulkTransfer,
        total_cents: i64,
    ) -> Result<(), TransferError> {
        let iban = &bulk_transfer.account.organization_iban;
        let tx = scope.transaction()?;

        let mut account = self
            .accounts
            .find_by_iban(tx, iban)
            .await
            .map_err(|err| match err {
                StoreError::NotFound => TransferError::AccountNotFound { iban: iban.clone() },
                other => other.into(),
            })?;

        let new_balance = account
            .balance_cents
            .checked_sub(total_cents)
            .filter(|balance| validation::positive_balance(*balance))
            .ok_or(TransferError::InsufficientFunds {
                balance_cents: account.balance_cents,
                total_cents,
            })?;

        account.balance_cents = new_balance;
        self.accounts.update(tx, &account).await?;

        let transactions: Vec<NewTransaction> = bulk_transfer
            .credit_transfers
            .iter()
            .map(|transfer| transfer.assign_account(account.id))
            .collect();
        self.ledger.bulk_insert(tx, &transactions).await?;

        scope.commit().await?;

        Ok(())
    }
}

#[async_trait]
impl<D, A, L> BulkTransferService for FundTransferWorkflow<D, A, L>
where
    D: Database,
    A: AccountStore<D::Tx>,
    L: LedgerStore<D::Tx>,
{
    async fn submit_bulk_transfer(&self, bulk_transfer: BulkTransfer) -> Result<(), TransferError> {
        self.execute(&bulk_transfer).await
    }
}

/// Structural checks that need no database. Returns the total in cents.
fn validate_bulk_transfer(bulk_transfer: &BulkTransfer) -> Result<i64, TransferError> {
    if bulk_transfer.account.organization_iban.trim().is_empty() {
        return Err(TransferError::Invalid(
            "organization IBAN is required".to_string(),
        ));
    }

    if bulk_transfer.credit_transfers.is_empty() {
        return Err(TransferError::Invalid(
            "at least one credit transfer is required".to_string(),
        ));
    }

    if let Some((index, transfer)) = bulk_transfer
        .credit_transfers
        .iter()
        .enumerate()
        .find(|(_, transfer)| transfer.amount_cents <= 0)
    {
        return Err(TransferError::Invalid(format!(
            "credit transfer {index} has non-positive amount {} cents",
            transfer.amount_cents
        )));
    }

    bulk_transfer
        .total_cents()
        .ok_or_else(|| TransferError::Invalid("bulk transfer total is too large".to_string()))
}

fn log_failure(err: &TransferError) {
    match err {
        TransferError::Invalid(_)
        | TransferError::AccountNotFound { .. }
        | TransferError::InsufficientFunds { .. } => {
            tracing::info!(error = %err, "bulk transfer rejected");
        }
        TransferError::Conflict(_) => {
            tracing::warn!(error = %err, "bulk transfer lost a serialization race");
        }
        TransferError::Store(_) | TransferError::Scope(_) => {
            tracing::error!(error = %err, "bulk transfer failed");
        }
    }
}

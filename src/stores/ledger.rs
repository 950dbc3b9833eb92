//! Postgres-backed `LedgerStore`.

use async_trait::async_trait;
use sqlx::{Postgres, QueryBuilder};

use crate::{
    db::PgTransaction,
    error::StoreError,
    models::transaction::{NewTransaction, Transaction},
};

use super::LedgerStore;

/// Postgres accepts at most 65535 bind parameters per statement; each row
/// binds seven.
const ROWS_PER_STATEMENT: usize = 65535 / 7;

#[derive(Debug, Clone, Copy, Default)]
pub struct PgLedgerStore;

#[async_trait]
impl LedgerStore<PgTransaction> for PgLedgerStore {
    async fn bulk_insert(
        &self,
        tx: &mut PgTransaction,
        transactions: &[NewTransaction],
    ) -> Result<Vec<Transaction>, StoreError> {
        let mut inserted = Vec::with_capacity(transactions.len());

        for chunk in transactions.chunks(ROWS_PER_STATEMENT) {
            let mut builder = QueryBuilder::<Postgres>::new(
                "INSERT INTO transactions (bank_account_id, counterparty_name, counterparty_iban, \
                 counterparty_bic, amount_cents, amount_currency, description) ",
            );

            builder.push_values(chunk, |mut row, transaction| {
                row.push_bind(transaction.bank_account_id)
                    .push_bind(transaction.counterparty_name.clone())
                    .push_bind(transaction.counterparty_iban.clone())
                    .push_bind(transaction.counterparty_bic.clone())
                    .push_bind(transaction.amount_cents)
                    .push_bind(transaction.amount_currency.clone())
                    .push_bind(transaction.description.clone());
            });

            builder.push(
                " RETURNING id, bank_account_id, counterparty_name, counterparty_iban, \
                 counterparty_bic, amount_cents, amount_currency, description",
            );

            let rows = builder
                .build_query_as::<Transaction>()
                .fetch_all(&mut **tx)
                .await?;
            inserted.extend(rows);
        }

        Ok(inserted)
    }
}

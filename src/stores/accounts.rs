//! Postgres-backed `AccountStore`.

use async_trait::async_trait;

use crate::{db::PgTransaction, error::StoreError, models::account::Account};

use super::AccountStore;

#[derive(Debug, Clone, Copy, Default)]
pub struct PgAccountStore;

#[async_trait]
impl AccountStore<PgTransaction> for PgAccountStore {
    async fn find_by_iban(
        &self,
        tx: &mut PgTransaction,
        iban: &str,
    ) -> Result<Account, StoreError> {
        sqlx::query_as::<_, Account>(
            r#"
            SELECT id, organization_name, iban, bic, balance_cents
            FROM bank_accounts
            WHERE iban = $1
            "#,
        )
        .bind(iban)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or(StoreError::NotFound)
    }

    async fn update(&self, tx: &mut PgTransaction, account: &Account) -> Result<(), StoreError> {
        let updated_count = sqlx::query(
            r#"
            UPDATE bank_accounts
            SET organization_name = $2,
                iban = $3,
                bic = $4,
                balance_cents = $5
            WHERE id = $1
            "#,
        )
        .bind(account.id)
        .bind(&account.organization_name)
        .bind(&account.organization_iban)
        .bind(&account.organization_bic)
        .bind(account.balance_cents)
        .execute(&mut **tx)
        .await?
        .rows_affected();

        if updated_count == 0 {
            return Err(StoreError::NotFound);
        }

        Ok(())
    }
}

//! Credit transfer and transaction row models.
//!
//! A `CreditTransfer` is what the caller asks for; once the workflow has
//! resolved the debited account it becomes a `NewTransaction`, and the store
//! hands back the persisted `Transaction` with its assigned ID.

use uuid::Uuid;

/// A single credit transfer to a counterparty, as requested.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreditTransfer {
    /// Amount in cents, must be positive
    pub amount_cents: i64,

    /// Currency code (ISO 4217)
    pub currency: String,

    pub counterparty_name: String,
    pub counterparty_bic: String,
    pub counterparty_iban: String,
    pub description: String,
}

impl CreditTransfer {
    /// Attach the debited account, producing a row ready for insertion.
    pub fn assign_account(&self, bank_account_id: Uuid) -> NewTransaction {
        NewTransaction {
            bank_account_id,
            counterparty_name: self.counterparty_name.clone(),
            counterparty_iban: self.counterparty_iban.clone(),
            counterparty_bic: self.counterparty_bic.clone(),
            amount_cents: self.amount_cents,
            amount_currency: self.currency.clone(),
            description: self.description.clone(),
        }
    }
}

/// A transaction row that has not been inserted yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTransaction {
    pub bank_account_id: Uuid,
    pub counterparty_name: String,
    pub counterparty_iban: String,
    pub counterparty_bic: String,
    pub amount_cents: i64,
    pub amount_currency: String,
    pub description: String,
}

/// Represents a transaction record from the database.
///
/// # Database Table
///
/// Maps to the `transactions` table. Rows are immutable once inserted and
/// always reference the bank account that was debited.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Transaction {
    /// Identifier assigned on insert
    pub id: Uuid,

    /// Debited account
    pub bank_account_id: Uuid,

    pub counterparty_name: String,
    pub counterparty_iban: String,
    pub counterparty_bic: String,

    /// Amount in cents
    ///
    /// Must be positive (enforced by CHECK constraint)
    pub amount_cents: i64,

    /// Currency code (ISO 4217)
    pub amount_currency: String,

    pub description: String,
}

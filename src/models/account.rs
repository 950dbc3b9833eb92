//! Bank account and bulk transfer models.
//!
//! This module defines:
//! - `Account`: Database entity representing an organization's bank account
//! - `BulkTransfer`: In-flight request debiting one account for many credit transfers
//! - `BulkTransferRequest`: Request body for the bulk transfer endpoint

use rust_decimal::{Decimal, prelude::ToPrimitive};
use serde::Deserialize;
use uuid::Uuid;

use crate::models::transaction::CreditTransfer;

/// Represents a bank account record from the database.
///
/// # Database Table
///
/// Maps to the `bank_accounts` table. The balance is stored as `i64` cents
/// and must stay non-negative after every debit (also enforced by a CHECK
/// constraint).
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Account {
    /// Identifier assigned by the database
    pub id: Uuid,

    /// Name of the organization owning the account
    pub organization_name: String,

    /// International bank account number, unique per account
    #[sqlx(rename = "iban")]
    pub organization_iban: String,

    /// Bank identifier code
    #[sqlx(rename = "bic")]
    pub organization_bic: String,

    /// Current balance in cents
    pub balance_cents: i64,
}

/// Identifies the account a bulk transfer debits.
///
/// Only the IBAN is used for resolution; name and BIC are carried as sent by
/// the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountReference {
    pub organization_name: String,
    pub organization_bic: String,
    pub organization_iban: String,
}

/// One debit against a single account paired with N credit transfers.
///
/// Exists only as a request value; it is never persisted as such.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkTransfer {
    pub account: AccountReference,
    pub credit_transfers: Vec<CreditTransfer>,
}

impl BulkTransfer {
    /// Sum of all credit transfer amounts, or `None` on overflow.
    pub fn total_cents(&self) -> Option<i64> {
        self.credit_transfers
            .iter()
            .try_fold(0i64, |total, transfer| total.checked_add(transfer.amount_cents))
    }
}

/// Request body for the bulk transfer endpoint.
///
/// # JSON Example
///
/// ```json
/// {
///   "organization_name": "ACME Corp",
///   "organization_bic": "OIVUSCLQXXX",
///   "organization_iban": "FR10474608000002006107XXXXX",
///   "credit_transfers": [
///     {
///       "amount": "14.5",
///       "currency": "EUR",
///       "counterparty_name": "Bip Bip",
///       "counterparty_bic": "CRLYFRPPTOU",
///       "counterparty_iban": "EE383680981021245685",
///       "description": "Wonderland/4410"
///     }
///   ]
/// }
/// ```
#[derive(Debug, Deserialize)]
pub struct BulkTransferRequest {
    pub organization_name: String,
    pub organization_bic: String,
    pub organization_iban: String,
    pub credit_transfers: Vec<CreditTransferRequest>,
}

/// A single credit transfer as sent over the wire.
#[derive(Debug, Deserialize)]
pub struct CreditTransferRequest {
    /// Amount in major currency units, e.g. `"14.50"` or `14.5`
    ///
    /// JSON numbers are read from their literal text, never through `f64`.
    #[serde(with = "rust_decimal::serde::arbitrary_precision")]
    pub amount: Decimal,
    pub currency: String,
    pub counterparty_name: String,
    pub counterparty_bic: String,
    pub counterparty_iban: String,
    pub description: String,
}

/// Convert a major-unit amount with at most two fractional digits into cents.
pub fn amount_cents(amount: Decimal) -> Result<i64, String> {
    if amount.normalize().scale() > 2 {
        return Err(format!("amount {amount} has more than two decimal places"));
    }

    amount
        .checked_mul(Decimal::ONE_HUNDRED)
        .and_then(|cents| cents.to_i64())
        .ok_or_else(|| format!("amount {amount} out of range"))
}

impl BulkTransferRequest {
    /// Convert the wire request into the domain `BulkTransfer`.
    pub fn into_domain(self) -> Result<BulkTransfer, String> {
        let credit_transfers = self
            .credit_transfers
            .into_iter()
            .map(|transfer| {
                Ok(CreditTransfer {
                    amount_cents: amount_cents(transfer.amount)?,
                    currency: transfer.currency,
                    counterparty_name: transfer.counterparty_name,
                    counterparty_bic: transfer.counterparty_bic,
                    counterparty_iban: transfer.counterparty_iban,
                    description: transfer.description,
                })
            })
            .collect::<Result<Vec<_>, String>>()?;

        Ok(BulkTransfer {
            account: AccountReference {
                organization_name: self.organization_name,
                organization_bic: self.organization_bic,
                organization_iban: self.organization_iban,
            },
            credit_transfers,
        })
    }
}

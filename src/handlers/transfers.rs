//! Bulk transfer HTTP handler.
//!
//! - POST /api/v1/bulk-transfers - Debit one account for many credit transfers

use axum::{Json, extract::State, extract::rejection::JsonRejection, http::StatusCode};

use crate::{app::AppState, error::AppError, models::account::BulkTransferRequest};

/// Settle a bulk transfer.
///
/// # Request Body
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
///
/// # Responses
///
/// - 201 with an empty body: the debit and every credit transfer are persisted
/// - 400: malformed body or unknown IBAN
/// - 415: body not sent as `application/json`
/// - 422: insufficient funds
/// - 409: lost a race with a concurrent transfer
pub async fn create_bulk_transfer(
    State(state): State<AppState>,
    payload: Result<Json<BulkTransferRequest>, JsonRejection>,
) -> Result<StatusCode, AppError> {
    let Json(request) = payload?;
    let bulk_transfer = request.into_domain().map_err(AppError::InvalidRequest)?;

    state.transfers.submit_bulk_transfer(bulk_transfer).await?;

    Ok(StatusCode::CREATED)
}

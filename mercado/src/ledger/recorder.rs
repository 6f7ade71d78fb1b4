//! Records of value moving from a client to a provider.
//!
//! A recorded transaction is the only source of truth for money owed to a provider. Rows start
//! unpaid (`payout_request_id = NULL`) and are never edited apart from payout attachment.
//! Corrections would be new offsetting rows; none are produced today.

use sqlx::PgConnection;
use tracing::{info, instrument};

use super::CashSplit;
use crate::{
    config::CreditsConfig,
    db::{
        handlers::Transactions,
        models::transactions::{TransactionCreateDBRequest, TransactionDBResponse, TransactionType},
    },
    errors::{Error, Result},
    types::{ListingId, UserId, abbrev_uuid},
};

#[derive(Debug, Clone)]
pub struct ValueExchange {
    pub transaction_type: TransactionType,
    pub amount_credits: i64,
    pub provider_id: UserId,
    pub client_id: UserId,
    pub listing_id: Option<ListingId>,
}

/// Persist one unpaid transaction with its cash split at the configured rates.
#[instrument(skip(conn, rates, exchange), fields(provider_id = %abbrev_uuid(&exchange.provider_id), credits = exchange.amount_credits), err)]
pub async fn record_transaction(conn: &mut PgConnection, rates: &CreditsConfig, exchange: &ValueExchange) -> Result<TransactionDBResponse> {
    if exchange.amount_credits <= 0 {
        return Err(Error::BadRequest {
            message: "Transaction amount must be positive".to_string(),
        });
    }

    let split = CashSplit::compute(exchange.amount_credits, rates);
    let transaction = Transactions::new(conn)
        .create(&TransactionCreateDBRequest {
            transaction_type: exchange.transaction_type,
            amount_credits: exchange.amount_credits,
            amount_cash: split.amount_cash,
            platform_fee: split.platform_fee,
            provider_amount: split.provider_amount,
            provider_id: exchange.provider_id,
            client_id: exchange.client_id,
            listing_id: exchange.listing_id,
        })
        .await?;

    info!(
        transaction_id = %abbrev_uuid(&transaction.id),
        amount_cash = %split.amount_cash,
        platform_fee = %split.platform_fee,
        "Recorded transaction"
    );
    Ok(transaction)
}

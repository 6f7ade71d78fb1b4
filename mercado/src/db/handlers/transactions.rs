//! Repository for value-moving transactions.
//!
//! Rows are immutable apart from `payout_request_id`, which is only touched by [`attach`] and
//! [`detach_all`].
//!
//! [`attach`]: Transactions::attach
//! [`detach_all`]: Transactions::detach_all

use crate::db::{
    errors::Result,
    models::transactions::{TransactionCreateDBRequest, TransactionDBResponse, TransactionTotals},
};
use crate::types::{PayoutRequestId, TransactionId, UserId, abbrev_uuid};
use rust_decimal::Decimal;
use sqlx::PgConnection;
use tracing::instrument;

pub struct Transactions<'c> {
    db: &'c mut PgConnection,
}

impl<'c> Transactions<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    #[instrument(skip(self, request), fields(provider_id = %abbrev_uuid(&request.provider_id), credits = request.amount_credits), err)]
    pub async fn create(&mut self, request: &TransactionCreateDBRequest) -> Result<TransactionDBResponse> {
        let transaction = sqlx::query_as::<_, TransactionDBResponse>(
            r#"
            INSERT INTO transactions (
                transaction_type, amount_credits, amount_cash, platform_fee, provider_amount,
                provider_id, client_id, listing_id
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(request.transaction_type)
        .bind(request.amount_credits)
        .bind(request.amount_cash)
        .bind(request.platform_fee)
        .bind(request.provider_amount)
        .bind(request.provider_id)
        .bind(request.client_id)
        .bind(request.listing_id)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(transaction)
    }

    pub async fn get_by_id(&mut self, id: TransactionId) -> Result<Option<TransactionDBResponse>> {
        let transaction = sqlx::query_as::<_, TransactionDBResponse>("SELECT * FROM transactions WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(transaction)
    }

    /// Transactions where the user is either provider or client, newest first
    pub async fn list_for_user(&mut self, user_id: UserId, skip: i64, limit: i64) -> Result<Vec<TransactionDBResponse>> {
        let transactions = sqlx::query_as::<_, TransactionDBResponse>(
            r#"
            SELECT * FROM transactions
            WHERE provider_id = $1 OR client_id = $1
            ORDER BY created_at DESC, id DESC
            OFFSET $2
            LIMIT $3
            "#,
        )
        .bind(user_id)
        .bind(skip)
        .bind(limit)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(transactions)
    }

    pub async fn count_for_user(&mut self, user_id: UserId) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM transactions WHERE provider_id = $1 OR client_id = $1")
            .bind(user_id)
            .fetch_one(&mut *self.db)
            .await?;

        Ok(count)
    }

    /// Sum of `amount_cash` over the provider's unpaid transactions
    #[instrument(skip(self), fields(provider_id = %abbrev_uuid(&provider_id)), err)]
    pub async fn available_balance(&mut self, provider_id: UserId) -> Result<Decimal> {
        let balance = sqlx::query_scalar::<_, Decimal>(
            r#"
            SELECT COALESCE(SUM(amount_cash), 0)
            FROM transactions
            WHERE provider_id = $1 AND payout_request_id IS NULL
            "#,
        )
        .bind(provider_id)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(balance)
    }

    /// Unpaid transactions in creation order, locked until the surrounding transaction ends
    #[instrument(skip(self), fields(provider_id = %abbrev_uuid(&provider_id)), err)]
    pub async fn lock_unpaid(&mut self, provider_id: UserId) -> Result<Vec<TransactionDBResponse>> {
        let transactions = sqlx::query_as::<_, TransactionDBResponse>(
            r#"
            SELECT * FROM transactions
            WHERE provider_id = $1 AND payout_request_id IS NULL
            ORDER BY created_at, id
            FOR UPDATE
            "#,
        )
        .bind(provider_id)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(transactions)
    }

    /// Attach unpaid transactions to a payout request. Rows already attached elsewhere are left
    /// alone; the returned count says how many moved.
    #[instrument(skip(self, ids), fields(payout_id = %abbrev_uuid(&payout_id), count = ids.len()), err)]
    pub async fn attach(&mut self, ids: &[TransactionId], payout_id: PayoutRequestId) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE transactions
            SET payout_request_id = $1
            WHERE id = ANY($2) AND payout_request_id IS NULL
            "#,
        )
        .bind(payout_id)
        .bind(ids)
        .execute(&mut *self.db)
        .await?;

        Ok(result.rows_affected())
    }

    /// Return every transaction attached to the payout request to the unpaid pool
    #[instrument(skip(self), fields(payout_id = %abbrev_uuid(&payout_id)), err)]
    pub async fn detach_all(&mut self, payout_id: PayoutRequestId) -> Result<u64> {
        let result = sqlx::query("UPDATE transactions SET payout_request_id = NULL WHERE payout_request_id = $1")
            .bind(payout_id)
            .execute(&mut *self.db)
            .await?;

        Ok(result.rows_affected())
    }

    pub async fn list_attached(&mut self, payout_id: PayoutRequestId) -> Result<Vec<TransactionDBResponse>> {
        let transactions = sqlx::query_as::<_, TransactionDBResponse>(
            "SELECT * FROM transactions WHERE payout_request_id = $1 ORDER BY created_at, id",
        )
        .bind(payout_id)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(transactions)
    }

    pub async fn totals(&mut self) -> Result<TransactionTotals> {
        let totals = sqlx::query_as::<_, TransactionTotals>(
            r#"
            SELECT
                COALESCE(SUM(t.amount_cash), 0) AS gross_cash,
                COALESCE(SUM(t.platform_fee), 0) AS platform_fees,
                COALESCE(SUM(t.amount_cash) FILTER (WHERE t.payout_request_id IS NULL), 0) AS unpaid_cash,
                COALESCE(SUM(t.amount_cash) FILTER (WHERE p.status = 'REQUESTED'), 0) AS requested_cash
            FROM transactions t
            LEFT JOIN payout_requests p ON p.id = t.payout_request_id
            "#,
        )
        .fetch_one(&mut *self.db)
        .await?;

        Ok(totals)
    }
}

//! Credit balance primitives and the append-only credit audit trail.
//!
//! Balances live on `users.credits`. The only writes to that column are the two statements in
//! this file: an unconditional increment and a conditional decrement that refuses to go below
//! zero. Callers run them on the same connection (usually a transaction) as the record that
//! explains the change.

use crate::db::{
    errors::{DbError, Result},
    models::credits::{CreditTransactionCreateDBRequest, CreditTransactionDBResponse},
};
use crate::types::{UserId, abbrev_uuid};
use sqlx::PgConnection;
use tracing::instrument;

pub struct Credits<'c> {
    db: &'c mut PgConnection,
}

impl<'c> Credits<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    /// Atomically subtract `amount` if the balance covers it.
    ///
    /// Returns the new balance, or `None` when the balance is too low or the user does not
    /// exist. The check and the write are a single statement, so concurrent debits serialize on
    /// the row lock and can never drive the balance negative.
    #[instrument(skip(self), fields(user_id = %abbrev_uuid(&user_id)), err)]
    pub async fn try_debit(&mut self, user_id: UserId, amount: i64) -> Result<Option<i64>> {
        let balance = sqlx::query_scalar::<_, i64>(
            r#"
            UPDATE users
            SET credits = credits - $1, updated_at = NOW()
            WHERE id = $2 AND credits >= $1
            RETURNING credits
            "#,
        )
        .bind(amount)
        .bind(user_id)
        .fetch_optional(&mut *self.db)
        .await?;

        Ok(balance)
    }

    /// Atomically add `amount`, returning the new balance.
    #[instrument(skip(self), fields(user_id = %abbrev_uuid(&user_id)), err)]
    pub async fn credit(&mut self, user_id: UserId, amount: i64) -> Result<i64> {
        let balance = sqlx::query_scalar::<_, i64>(
            r#"
            UPDATE users
            SET credits = credits + $1, updated_at = NOW()
            WHERE id = $2
            RETURNING credits
            "#,
        )
        .bind(amount)
        .bind(user_id)
        .fetch_optional(&mut *self.db)
        .await?
        .ok_or(DbError::NotFound)?;

        Ok(balance)
    }

    #[instrument(skip(self), fields(user_id = %abbrev_uuid(&user_id)), err)]
    pub async fn balance(&mut self, user_id: UserId) -> Result<i64> {
        let balance = sqlx::query_scalar::<_, i64>("SELECT credits FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&mut *self.db)
            .await?
            .ok_or(DbError::NotFound)?;

        Ok(balance)
    }

    /// Append an audit record
    #[instrument(skip(self, request), fields(user_id = %abbrev_uuid(&request.user_id), kind = ?request.transaction_type), err)]
    pub async fn record(&mut self, request: &CreditTransactionCreateDBRequest) -> Result<CreditTransactionDBResponse> {
        let record = sqlx::query_as::<_, CreditTransactionDBResponse>(
            r#"
            INSERT INTO credit_transactions (user_id, transaction_type, amount, balance_after, description, payment_reference)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(request.user_id)
        .bind(request.transaction_type)
        .bind(request.amount)
        .bind(request.balance_after)
        .bind(&request.description)
        .bind(&request.payment_reference)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(record)
    }

    pub async fn list_user_transactions(&mut self, user_id: UserId, skip: i64, limit: i64) -> Result<Vec<CreditTransactionDBResponse>> {
        let records = sqlx::query_as::<_, CreditTransactionDBResponse>(
            r#"
            SELECT * FROM credit_transactions
            WHERE user_id = $1
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

        Ok(records)
    }

    pub async fn count_user_transactions(&mut self, user_id: UserId) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM credit_transactions WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(&mut *self.db)
            .await?;

        Ok(count)
    }

    /// Sum of all user balances
    pub async fn outstanding_credits(&mut self) -> Result<i64> {
        let total = sqlx::query_scalar::<_, i64>("SELECT COALESCE(SUM(credits), 0)::BIGINT FROM users")
            .fetch_one(&mut *self.db)
            .await?;

        Ok(total)
    }
}

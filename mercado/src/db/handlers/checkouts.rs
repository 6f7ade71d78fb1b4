//! Repository for checkouts awaiting payment confirmation.

use sqlx::PgConnection;
use tracing::instrument;

use crate::{
    db::{
        errors::{DbError, Result},
        models::checkouts::{CheckoutCreateDBRequest, CheckoutDBResponse, CheckoutStatus},
    },
    types::{CheckoutId, abbrev_uuid},
};

pub struct Checkouts<'c> {
    db: &'c mut PgConnection,
}

impl<'c> Checkouts<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    #[instrument(skip(self, request), fields(kind = ?request.kind, item = %request.item_key), err)]
    pub async fn create(&mut self, request: &CheckoutCreateDBRequest) -> Result<CheckoutDBResponse> {
        let checkout = sqlx::query_as::<_, CheckoutDBResponse>(
            r#"
            INSERT INTO checkouts (kind, item_key, amount, credits, user_id, email, listing_id, contest_id, payment_reference)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(request.kind)
        .bind(&request.item_key)
        .bind(request.amount)
        .bind(request.credits)
        .bind(request.user_id)
        .bind(&request.email)
        .bind(request.listing_id)
        .bind(request.contest_id)
        .bind(&request.payment_reference)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(checkout)
    }

    pub async fn get_by_reference(&mut self, payment_reference: &str) -> Result<Option<CheckoutDBResponse>> {
        let checkout = sqlx::query_as::<_, CheckoutDBResponse>("SELECT * FROM checkouts WHERE payment_reference = $1")
            .bind(payment_reference)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(checkout)
    }

    /// Lock the checkout row until the surrounding transaction ends, so concurrent deliveries of
    /// the same event reconcile one at a time
    pub async fn get_by_reference_for_update(&mut self, payment_reference: &str) -> Result<Option<CheckoutDBResponse>> {
        let checkout = sqlx::query_as::<_, CheckoutDBResponse>("SELECT * FROM checkouts WHERE payment_reference = $1 FOR UPDATE")
            .bind(payment_reference)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(checkout)
    }

    /// Move a pending checkout to a terminal status. `NotFound` if it is no longer pending.
    #[instrument(skip(self, reason), fields(checkout_id = %abbrev_uuid(&id), status = ?status), err)]
    pub async fn finish(&mut self, id: CheckoutId, status: CheckoutStatus, reason: Option<&str>) -> Result<CheckoutDBResponse> {
        let checkout = sqlx::query_as::<_, CheckoutDBResponse>(
            r#"
            UPDATE checkouts
            SET status = $2, status_reason = $3, completed_at = NOW()
            WHERE id = $1 AND status = 'PENDING'
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(status)
        .bind(reason)
        .fetch_optional(&mut *self.db)
        .await?
        .ok_or(DbError::NotFound)?;

        Ok(checkout)
    }

    /// Count pending checkouts; used by the admin summary
    pub async fn count_pending(&mut self) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM checkouts WHERE status = 'PENDING'")
            .fetch_one(&mut *self.db)
            .await?;

        Ok(count)
    }
}

//! Repository for payout requests.

use crate::db::{
    errors::{DbError, Result},
    models::payouts::{PayoutRequestCreateDBRequest, PayoutRequestDBResponse, PayoutStatus},
};
use crate::types::{PayoutRequestId, UserId, abbrev_uuid};
use sqlx::PgConnection;
use tracing::instrument;

/// Filter for listing payout requests
#[derive(Debug, Clone)]
pub struct PayoutFilter {
    pub provider_id: Option<UserId>,
    pub status: Option<PayoutStatus>,
    pub skip: i64,
    pub limit: i64,
}

impl PayoutFilter {
    pub fn new(skip: i64, limit: i64) -> Self {
        Self {
            provider_id: None,
            status: None,
            skip,
            limit,
        }
    }

    pub fn provider(mut self, provider_id: UserId) -> Self {
        self.provider_id = Some(provider_id);
        self
    }

    pub fn status(mut self, status: Option<PayoutStatus>) -> Self {
        self.status = status;
        self
    }
}

pub struct Payouts<'c> {
    db: &'c mut PgConnection,
}

impl<'c> Payouts<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    #[instrument(skip(self, request), fields(provider_id = %abbrev_uuid(&request.provider_id), amount = %request.amount), err)]
    pub async fn create(&mut self, request: &PayoutRequestCreateDBRequest) -> Result<PayoutRequestDBResponse> {
        let payout = sqlx::query_as::<_, PayoutRequestDBResponse>(
            r#"
            INSERT INTO payout_requests (provider_id, amount, attached_amount, method, details)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(request.provider_id)
        .bind(request.amount)
        .bind(request.attached_amount)
        .bind(&request.method)
        .bind(&request.details)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(payout)
    }

    pub async fn get_by_id(&mut self, id: PayoutRequestId) -> Result<Option<PayoutRequestDBResponse>> {
        let payout = sqlx::query_as::<_, PayoutRequestDBResponse>("SELECT * FROM payout_requests WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(payout)
    }

    /// Fetch and row-lock a request so a status check and the following transition cannot race
    #[instrument(skip(self), fields(payout_id = %abbrev_uuid(&id)), err)]
    pub async fn get_for_update(&mut self, id: PayoutRequestId) -> Result<Option<PayoutRequestDBResponse>> {
        let payout = sqlx::query_as::<_, PayoutRequestDBResponse>("SELECT * FROM payout_requests WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(payout)
    }

    /// Move a `REQUESTED` request to a terminal status. Fails with `NotFound` if the request is
    /// missing or already terminal.
    #[instrument(skip(self, rejection_reason), fields(payout_id = %abbrev_uuid(&id), status = ?status), err)]
    pub async fn finish(
        &mut self,
        id: PayoutRequestId,
        status: PayoutStatus,
        processed_by: UserId,
        rejection_reason: Option<&str>,
    ) -> Result<PayoutRequestDBResponse> {
        let payout = sqlx::query_as::<_, PayoutRequestDBResponse>(
            r#"
            UPDATE payout_requests
            SET status = $2, processed_by = $3, processed_at = NOW(), rejection_reason = $4
            WHERE id = $1 AND status = 'REQUESTED'
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(status)
        .bind(processed_by)
        .bind(rejection_reason)
        .fetch_optional(&mut *self.db)
        .await?
        .ok_or(DbError::NotFound)?;

        Ok(payout)
    }

    pub async fn list(&mut self, filter: &PayoutFilter) -> Result<Vec<PayoutRequestDBResponse>> {
        let payouts = sqlx::query_as::<_, PayoutRequestDBResponse>(
            r#"
            SELECT * FROM payout_requests
            WHERE ($1::uuid IS NULL OR provider_id = $1)
              AND ($2::text IS NULL OR status = $2)
            ORDER BY created_at DESC, id DESC
            OFFSET $3
            LIMIT $4
            "#,
        )
        .bind(filter.provider_id)
        .bind(filter.status)
        .bind(filter.skip)
        .bind(filter.limit)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(payouts)
    }

    pub async fn count(&mut self, filter: &PayoutFilter) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM payout_requests
            WHERE ($1::uuid IS NULL OR provider_id = $1)
              AND ($2::text IS NULL OR status = $2)
            "#,
        )
        .bind(filter.provider_id)
        .bind(filter.status)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(count)
    }
}

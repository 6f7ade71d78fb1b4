//! Repository for subscriptions.

use sqlx::PgConnection;
use tracing::instrument;

use crate::{
    db::{
        errors::Result,
        models::subscriptions::{SubscriptionDBResponse, SubscriptionUpsertDBRequest},
    },
    types::{UserId, abbrev_uuid},
};

pub struct Subscriptions<'c> {
    db: &'c mut PgConnection,
}

impl<'c> Subscriptions<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    /// Insert or renew by provider subscription id. A renewal only ever moves the period end
    /// forward.
    #[instrument(skip(self, request), fields(user_id = %abbrev_uuid(&request.user_id), plan = %request.plan), err)]
    pub async fn upsert(&mut self, request: &SubscriptionUpsertDBRequest) -> Result<SubscriptionDBResponse> {
        let subscription = sqlx::query_as::<_, SubscriptionDBResponse>(
            r#"
            INSERT INTO subscriptions (user_id, plan, provider_subscription_id, current_period_end)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (provider_subscription_id) DO UPDATE
            SET plan = EXCLUDED.plan,
                current_period_end = GREATEST(subscriptions.current_period_end, EXCLUDED.current_period_end)
            RETURNING *
            "#,
        )
        .bind(request.user_id)
        .bind(&request.plan)
        .bind(&request.provider_subscription_id)
        .bind(request.current_period_end)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(subscription)
    }

    pub async fn list_for_user(&mut self, user_id: UserId) -> Result<Vec<SubscriptionDBResponse>> {
        let subscriptions = sqlx::query_as::<_, SubscriptionDBResponse>(
            "SELECT * FROM subscriptions WHERE user_id = $1 ORDER BY current_period_end DESC",
        )
        .bind(user_id)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(subscriptions)
    }
}

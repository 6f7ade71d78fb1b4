//! Repository for visibility boosts.

use crate::db::{
    errors::Result,
    models::boosts::{BoostCreateDBRequest, BoostDBResponse},
};
use crate::types::{ListingId, UserId, abbrev_uuid};
use sqlx::PgConnection;
use tracing::instrument;

pub struct Boosts<'c> {
    db: &'c mut PgConnection,
}

impl<'c> Boosts<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    #[instrument(skip(self, request), fields(boost_type = %request.boost_type, purchased_by = %abbrev_uuid(&request.purchased_by)), err)]
    pub async fn create(&mut self, request: &BoostCreateDBRequest) -> Result<BoostDBResponse> {
        let boost = sqlx::query_as::<_, BoostDBResponse>(
            r#"
            INSERT INTO listing_boosts (
                boost_type, listing_id, blog_post_id, user_id, purchased_by,
                price_credits, category, start_date, end_date
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(&request.boost_type)
        .bind(request.listing_id)
        .bind(request.blog_post_id)
        .bind(request.user_id)
        .bind(request.purchased_by)
        .bind(request.price_credits)
        .bind(&request.category)
        .bind(request.start_date)
        .bind(request.end_date)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(boost)
    }

    /// Boosts bought by the user, newest first
    pub async fn list_purchased_by(&mut self, user_id: UserId) -> Result<Vec<BoostDBResponse>> {
        let boosts = sqlx::query_as::<_, BoostDBResponse>(
            "SELECT * FROM listing_boosts WHERE purchased_by = $1 ORDER BY created_at DESC, id",
        )
        .bind(user_id)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(boosts)
    }

    /// Boosts on a listing that are live right now
    pub async fn list_live_for_listing(&mut self, listing_id: ListingId) -> Result<Vec<BoostDBResponse>> {
        let boosts = sqlx::query_as::<_, BoostDBResponse>(
            r#"
            SELECT * FROM listing_boosts
            WHERE listing_id = $1 AND is_active AND start_date <= NOW() AND end_date > NOW()
            ORDER BY end_date DESC
            "#,
        )
        .bind(listing_id)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(boosts)
    }

    /// Clear the active flag on every boost past its end date; returns how many changed
    #[instrument(skip(self), err)]
    pub async fn expire_elapsed(&mut self) -> Result<u64> {
        let result = sqlx::query("UPDATE listing_boosts SET is_active = FALSE WHERE is_active AND end_date <= NOW()")
            .execute(&mut *self.db)
            .await?;

        Ok(result.rows_affected())
    }
}

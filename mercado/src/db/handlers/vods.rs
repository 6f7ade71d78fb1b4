//! Repository for premium videos and unlocks.

use crate::db::{
    errors::Result,
    models::vods::{VodCreateDBRequest, VodDBResponse, VodUnlockDBResponse},
};
use crate::types::{TransactionId, UserId, VodId, abbrev_uuid};
use sqlx::PgConnection;
use tracing::instrument;

pub struct Vods<'c> {
    db: &'c mut PgConnection,
}

impl<'c> Vods<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    #[instrument(skip(self, request), fields(owner_id = %abbrev_uuid(&request.owner_id)), err)]
    pub async fn create(&mut self, request: &VodCreateDBRequest) -> Result<VodDBResponse> {
        let vod = sqlx::query_as::<_, VodDBResponse>(
            r#"
            INSERT INTO vods (owner_id, title, description, price_credits, media_url)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(request.owner_id)
        .bind(&request.title)
        .bind(&request.description)
        .bind(request.price_credits)
        .bind(&request.media_url)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(vod)
    }

    pub async fn get_by_id(&mut self, id: VodId) -> Result<Option<VodDBResponse>> {
        let vod = sqlx::query_as::<_, VodDBResponse>("SELECT * FROM vods WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(vod)
    }

    pub async fn list(&mut self, skip: i64, limit: i64) -> Result<Vec<VodDBResponse>> {
        let vods = sqlx::query_as::<_, VodDBResponse>("SELECT * FROM vods ORDER BY created_at DESC, id OFFSET $1 LIMIT $2")
            .bind(skip)
            .bind(limit)
            .fetch_all(&mut *self.db)
            .await?;

        Ok(vods)
    }

    pub async fn count(&mut self) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM vods")
            .fetch_one(&mut *self.db)
            .await?;

        Ok(count)
    }

    pub async fn is_unlocked(&mut self, vod_id: VodId, user_id: UserId) -> Result<bool> {
        let unlocked = sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM vod_unlocks WHERE vod_id = $1 AND user_id = $2)")
            .bind(vod_id)
            .bind(user_id)
            .fetch_one(&mut *self.db)
            .await?;

        Ok(unlocked)
    }

    /// Fails with a unique violation if the user already unlocked this video
    #[instrument(skip(self), fields(vod_id = %abbrev_uuid(&vod_id), user_id = %abbrev_uuid(&user_id)), err)]
    pub async fn insert_unlock(&mut self, vod_id: VodId, user_id: UserId, transaction_id: TransactionId) -> Result<VodUnlockDBResponse> {
        let unlock = sqlx::query_as::<_, VodUnlockDBResponse>(
            "INSERT INTO vod_unlocks (vod_id, user_id, transaction_id) VALUES ($1, $2, $3) RETURNING *",
        )
        .bind(vod_id)
        .bind(user_id)
        .bind(transaction_id)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(unlock)
    }
}

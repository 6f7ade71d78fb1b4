//! Repository for classified listings.

use crate::db::{
    errors::{DbError, Result},
    models::listings::{ListingCreateDBRequest, ListingDBResponse, ListingStatus},
};
use crate::types::{ListingId, Locale, UserId, abbrev_uuid};
use sqlx::PgConnection;
use tracing::instrument;

/// Listing columns plus the derived boost flag. Expects the listing aliased as `l`.
const SELECT_LISTING: &str = r#"
    SELECT l.*, EXISTS (
        SELECT 1 FROM listing_boosts b
        WHERE b.listing_id = l.id AND b.is_active AND b.start_date <= NOW() AND b.end_date > NOW()
    ) AS is_boosted
    FROM listings l
"#;

/// Filter for the public catalogue
#[derive(Debug, Clone, Default)]
pub struct ListingFilter {
    pub category: Option<String>,
    pub locale: Option<Locale>,
    pub skip: i64,
    pub limit: i64,
}

pub struct Listings<'c> {
    db: &'c mut PgConnection,
}

impl<'c> Listings<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    #[instrument(skip(self, request), fields(owner_id = %abbrev_uuid(&request.owner_id)), err)]
    pub async fn create(&mut self, request: &ListingCreateDBRequest) -> Result<ListingDBResponse> {
        let listing = sqlx::query_as::<_, ListingDBResponse>(
            r#"
            INSERT INTO listings (owner_id, title, description, price, category, locale)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *, FALSE AS is_boosted
            "#,
        )
        .bind(request.owner_id)
        .bind(&request.title)
        .bind(&request.description)
        .bind(request.price)
        .bind(&request.category)
        .bind(request.locale)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(listing)
    }

    pub async fn get_by_id(&mut self, id: ListingId) -> Result<Option<ListingDBResponse>> {
        let listing = sqlx::query_as::<_, ListingDBResponse>(&format!("{SELECT_LISTING} WHERE l.id = $1"))
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(listing)
    }

    /// Approved listings, boosted ones first, then newest
    #[instrument(skip(self, filter), fields(skip = filter.skip, limit = filter.limit), err)]
    pub async fn list_public(&mut self, filter: &ListingFilter) -> Result<Vec<ListingDBResponse>> {
        let listings = sqlx::query_as::<_, ListingDBResponse>(&format!(
            r#"
            {SELECT_LISTING}
            WHERE l.status = 'APPROVED'
              AND ($1::text IS NULL OR l.category = $1)
              AND ($2::text IS NULL OR l.locale = $2)
            ORDER BY is_boosted DESC, l.created_at DESC, l.id
            OFFSET $3
            LIMIT $4
            "#
        ))
        .bind(&filter.category)
        .bind(filter.locale)
        .bind(filter.skip)
        .bind(filter.limit)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(listings)
    }

    pub async fn count_public(&mut self, filter: &ListingFilter) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM listings
            WHERE status = 'APPROVED'
              AND ($1::text IS NULL OR category = $1)
              AND ($2::text IS NULL OR locale = $2)
            "#,
        )
        .bind(&filter.category)
        .bind(filter.locale)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(count)
    }

    /// Moderation queue view; oldest first so the queue drains in order
    pub async fn list_by_status(&mut self, status: Option<ListingStatus>, skip: i64, limit: i64) -> Result<Vec<ListingDBResponse>> {
        let listings = sqlx::query_as::<_, ListingDBResponse>(&format!(
            r#"
            {SELECT_LISTING}
            WHERE ($1::text IS NULL OR l.status = $1)
            ORDER BY l.created_at, l.id
            OFFSET $2
            LIMIT $3
            "#
        ))
        .bind(status)
        .bind(skip)
        .bind(limit)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(listings)
    }

    pub async fn count_by_status(&mut self, status: Option<ListingStatus>) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM listings WHERE ($1::text IS NULL OR status = $1)")
            .bind(status)
            .fetch_one(&mut *self.db)
            .await?;

        Ok(count)
    }

    /// Approve or reject a pending listing. `NotFound` when the listing is missing or no longer
    /// pending.
    #[instrument(skip(self, note), fields(listing_id = %abbrev_uuid(&id), status = ?status), err)]
    pub async fn moderate(&mut self, id: ListingId, status: ListingStatus, moderator: UserId, note: Option<&str>) -> Result<ListingDBResponse> {
        let listing = sqlx::query_as::<_, ListingDBResponse>(
            r#"
            UPDATE listings
            SET status = $2, moderated_by = $3, moderated_at = NOW(), moderation_note = $4, updated_at = NOW()
            WHERE id = $1 AND status = 'PENDING'
            RETURNING *, FALSE AS is_boosted
            "#,
        )
        .bind(id)
        .bind(status)
        .bind(moderator)
        .bind(note)
        .fetch_optional(&mut *self.db)
        .await?
        .ok_or(DbError::NotFound)?;

        Ok(listing)
    }

    #[instrument(skip(self), fields(listing_id = %abbrev_uuid(&id)), err)]
    pub async fn delete(&mut self, id: ListingId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM listings WHERE id = $1")
            .bind(id)
            .execute(&mut *self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::users::Role;
    use crate::test_utils::create_test_user;
    use sqlx::PgPool;

    fn listing(owner_id: UserId, title: &str, category: &str) -> ListingCreateDBRequest {
        ListingCreateDBRequest {
            owner_id,
            title: title.to_string(),
            description: String::new(),
            price: None,
            category: category.to_string(),
            locale: Locale::Pt,
        }
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_new_listings_are_pending_and_hidden(pool: PgPool) {
        let owner = create_test_user(&pool, Role::User).await;
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Listings::new(&mut conn);

        let created = repo.create(&listing(owner.id, "Bicicleta", "desporto")).await.unwrap();
        assert_eq!(created.status, ListingStatus::Pending);

        let filter = ListingFilter {
            limit: 10,
            ..Default::default()
        };
        assert!(repo.list_public(&filter).await.unwrap().is_empty());
        assert_eq!(repo.count_by_status(Some(ListingStatus::Pending)).await.unwrap(), 1);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_moderation_only_from_pending(pool: PgPool) {
        let owner = create_test_user(&pool, Role::User).await;
        let admin = create_test_user(&pool, Role::Admin).await;
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Listings::new(&mut conn);

        let created = repo.create(&listing(owner.id, "Sofá", "casa")).await.unwrap();
        let approved = repo.moderate(created.id, ListingStatus::Approved, admin.id, None).await.unwrap();
        assert_eq!(approved.status, ListingStatus::Approved);
        assert_eq!(approved.moderated_by, Some(admin.id));

        let again = repo.moderate(created.id, ListingStatus::Rejected, admin.id, Some("spam")).await;
        assert!(matches!(again, Err(DbError::NotFound)));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_public_filter_by_category(pool: PgPool) {
        let owner = create_test_user(&pool, Role::User).await;
        let admin = create_test_user(&pool, Role::Admin).await;
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Listings::new(&mut conn);

        for (title, category) in [("Mesa", "casa"), ("Raquete", "desporto")] {
            let l = repo.create(&listing(owner.id, title, category)).await.unwrap();
            repo.moderate(l.id, ListingStatus::Approved, admin.id, None).await.unwrap();
        }

        let filter = ListingFilter {
            category: Some("casa".to_string()),
            limit: 10,
            ..Default::default()
        };
        let listings = repo.list_public(&filter).await.unwrap();
        assert_eq!(listings.len(), 1);
        assert_eq!(listings[0].title, "Mesa");
        assert_eq!(repo.count_public(&filter).await.unwrap(), 1);
    }
}

//! Repository for wishlists.

use sqlx::PgConnection;
use tracing::instrument;

use crate::{
    db::{errors::Result, models::wishlist::WishlistItemDBResponse},
    types::{UserId, abbrev_uuid},
};

pub struct Wishlist<'c> {
    db: &'c mut PgConnection,
}

impl<'c> Wishlist<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    /// Fails with a unique violation when the product is already on the list
    #[instrument(skip(self, note), fields(user_id = %abbrev_uuid(&user_id), product_id), err)]
    pub async fn add(&mut self, user_id: UserId, product_id: i64, note: Option<&str>) -> Result<WishlistItemDBResponse> {
        let item = sqlx::query_as::<_, WishlistItemDBResponse>(
            "INSERT INTO wishlist_items (user_id, product_id, note) VALUES ($1, $2, $3) RETURNING *",
        )
        .bind(user_id)
        .bind(product_id)
        .bind(note)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(item)
    }

    pub async fn list(&mut self, user_id: UserId) -> Result<Vec<WishlistItemDBResponse>> {
        let items = sqlx::query_as::<_, WishlistItemDBResponse>(
            "SELECT * FROM wishlist_items WHERE user_id = $1 ORDER BY created_at DESC, id",
        )
        .bind(user_id)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(items)
    }

    #[instrument(skip(self), fields(user_id = %abbrev_uuid(&user_id), product_id), err)]
    pub async fn remove(&mut self, user_id: UserId, product_id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM wishlist_items WHERE user_id = $1 AND product_id = $2")
            .bind(user_id)
            .bind(product_id)
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

    #[sqlx::test]
    #[test_log::test]
    async fn test_duplicate_product_rejected(pool: PgPool) {
        let user = create_test_user(&pool, Role::User).await;
        let mut conn = pool.acquire().await.unwrap();
        let mut wishlist = Wishlist::new(&mut conn);

        wishlist.add(user.id, 42, Some("prenda")).await.unwrap();
        let err = wishlist.add(user.id, 42, None).await.unwrap_err();
        assert!(err.is_unique_violation_on("wishlist_items_user_product_unique"));

        assert_eq!(wishlist.list(user.id).await.unwrap().len(), 1);
        assert!(wishlist.remove(user.id, 42).await.unwrap());
        assert!(!wishlist.remove(user.id, 42).await.unwrap());
    }
}

//! Repository for blog posts.

use crate::db::{
    errors::Result,
    models::blog_posts::{BlogPostCreateDBRequest, BlogPostDBResponse},
};
use crate::types::{BlogPostId, abbrev_uuid};
use sqlx::PgConnection;
use tracing::instrument;

pub struct BlogPosts<'c> {
    db: &'c mut PgConnection,
}

impl<'c> BlogPosts<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    #[instrument(skip(self, request), fields(owner_id = %abbrev_uuid(&request.owner_id)), err)]
    pub async fn create(&mut self, request: &BlogPostCreateDBRequest) -> Result<BlogPostDBResponse> {
        let post = sqlx::query_as::<_, BlogPostDBResponse>(
            "INSERT INTO blog_posts (owner_id, title, body) VALUES ($1, $2, $3) RETURNING *",
        )
        .bind(request.owner_id)
        .bind(&request.title)
        .bind(&request.body)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(post)
    }

    pub async fn get_by_id(&mut self, id: BlogPostId) -> Result<Option<BlogPostDBResponse>> {
        let post = sqlx::query_as::<_, BlogPostDBResponse>("SELECT * FROM blog_posts WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(post)
    }

    pub async fn list(&mut self, skip: i64, limit: i64) -> Result<Vec<BlogPostDBResponse>> {
        let posts = sqlx::query_as::<_, BlogPostDBResponse>("SELECT * FROM blog_posts ORDER BY created_at DESC, id OFFSET $1 LIMIT $2")
            .bind(skip)
            .bind(limit)
            .fetch_all(&mut *self.db)
            .await?;

        Ok(posts)
    }

    pub async fn count(&mut self) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM blog_posts")
            .fetch_one(&mut *self.db)
            .await?;

        Ok(count)
    }
}

//! Repository for the discussion forum.

use sqlx::PgConnection;
use tracing::instrument;

use crate::{
    db::{
        errors::{DbError, Result},
        models::forum::{PostDBResponse, ThreadCreateDBRequest, ThreadDBResponse},
    },
    types::{Locale, ThreadId, UserId, abbrev_uuid},
};

pub struct Forum<'c> {
    db: &'c mut PgConnection,
}

impl<'c> Forum<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    #[instrument(skip(self, request), fields(author_id = %abbrev_uuid(&request.author_id)), err)]
    pub async fn create_thread(&mut self, request: &ThreadCreateDBRequest) -> Result<ThreadDBResponse> {
        let thread = sqlx::query_as::<_, ThreadDBResponse>(
            "INSERT INTO forum_threads (author_id, title, body, locale) VALUES ($1, $2, $3, $4) RETURNING *",
        )
        .bind(request.author_id)
        .bind(&request.title)
        .bind(&request.body)
        .bind(request.locale)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(thread)
    }

    pub async fn get_thread(&mut self, id: ThreadId) -> Result<Option<ThreadDBResponse>> {
        let thread = sqlx::query_as::<_, ThreadDBResponse>("SELECT * FROM forum_threads WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(thread)
    }

    /// Newest activity first
    pub async fn list_threads(&mut self, locale: Option<Locale>, skip: i64, limit: i64) -> Result<Vec<ThreadDBResponse>> {
        let threads = sqlx::query_as::<_, ThreadDBResponse>(
            r#"
            SELECT * FROM forum_threads
            WHERE ($1::text IS NULL OR locale = $1)
            ORDER BY last_activity_at DESC, id
            OFFSET $2
            LIMIT $3
            "#,
        )
        .bind(locale)
        .bind(skip)
        .bind(limit)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(threads)
    }

    pub async fn count_threads(&mut self, locale: Option<Locale>) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM forum_threads WHERE ($1::text IS NULL OR locale = $1)")
            .bind(locale)
            .fetch_one(&mut *self.db)
            .await?;

        Ok(count)
    }

    pub async fn list_posts(&mut self, thread_id: ThreadId) -> Result<Vec<PostDBResponse>> {
        let posts = sqlx::query_as::<_, PostDBResponse>("SELECT * FROM forum_posts WHERE thread_id = $1 ORDER BY created_at, id")
            .bind(thread_id)
            .fetch_all(&mut *self.db)
            .await?;

        Ok(posts)
    }

    /// Reply to a thread and bump its activity time. `NotFound` if the thread is missing or
    /// locked; callers tell the two apart with [`Forum::get_thread`].
    #[instrument(skip(self, body), fields(thread_id = %abbrev_uuid(&thread_id)), err)]
    pub async fn create_post(&mut self, thread_id: ThreadId, author_id: UserId, body: &str) -> Result<PostDBResponse> {
        let bumped = sqlx::query("UPDATE forum_threads SET last_activity_at = NOW() WHERE id = $1 AND NOT is_locked")
            .bind(thread_id)
            .execute(&mut *self.db)
            .await?;
        if bumped.rows_affected() == 0 {
            return Err(DbError::NotFound);
        }

        let post = sqlx::query_as::<_, PostDBResponse>(
            "INSERT INTO forum_posts (thread_id, author_id, body) VALUES ($1, $2, $3) RETURNING *",
        )
        .bind(thread_id)
        .bind(author_id)
        .bind(body)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(post)
    }

    #[instrument(skip(self), fields(thread_id = %abbrev_uuid(&id)), err)]
    pub async fn set_locked(&mut self, id: ThreadId, locked: bool) -> Result<ThreadDBResponse> {
        let thread = sqlx::query_as::<_, ThreadDBResponse>("UPDATE forum_threads SET is_locked = $2 WHERE id = $1 RETURNING *")
            .bind(id)
            .bind(locked)
            .fetch_optional(&mut *self.db)
            .await?
            .ok_or(DbError::NotFound)?;

        Ok(thread)
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
    async fn test_reply_bumps_thread_and_lock_blocks_replies(pool: PgPool) {
        let author = create_test_user(&pool, Role::User).await;
        let mut conn = pool.acquire().await.unwrap();
        let mut forum = Forum::new(&mut conn);

        let older = forum
            .create_thread(&ThreadCreateDBRequest {
                author_id: author.id,
                title: "Primeiro".to_string(),
                body: "Olá".to_string(),
                locale: Locale::Pt,
            })
            .await
            .unwrap();
        let newer = forum
            .create_thread(&ThreadCreateDBRequest {
                author_id: author.id,
                title: "Segundo".to_string(),
                body: "Olá de novo".to_string(),
                locale: Locale::Pt,
            })
            .await
            .unwrap();

        forum.create_post(older.id, author.id, "Resposta").await.unwrap();
        let threads = forum.list_threads(None, 0, 10).await.unwrap();
        assert_eq!(threads[0].id, older.id);
        assert_eq!(threads[1].id, newer.id);
        assert_eq!(forum.list_posts(older.id).await.unwrap().len(), 1);

        forum.set_locked(older.id, true).await.unwrap();
        assert!(matches!(forum.create_post(older.id, author.id, "Tarde").await, Err(DbError::NotFound)));
        assert_eq!(forum.list_posts(older.id).await.unwrap().len(), 1);
    }
}

//! Database repository for users.

use crate::types::{UserId, abbrev_uuid};
use crate::db::{
    errors::{DbError, Result},
    handlers::repository::Repository,
    models::users::{UserCreateDBRequest, UserDBResponse, UserUpdateDBRequest},
};
use chrono::{DateTime, Utc};
use sqlx::PgConnection;
use std::collections::HashMap;
use tracing::instrument;

/// Filter for listing users
#[derive(Debug, Clone, Default)]
pub struct UserFilter {
    pub skip: i64,
    pub limit: i64,
    pub search: Option<String>,
}

impl UserFilter {
    pub fn new(skip: i64, limit: i64) -> Self {
        Self {
            skip,
            limit,
            search: None,
        }
    }

    pub fn with_search(mut self, search: Option<String>) -> Self {
        self.search = search.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
        self
    }

    fn pattern(&self) -> Option<String> {
        self.search.as_ref().map(|s| format!("%{}%", s.to_lowercase()))
    }
}

pub struct Users<'c> {
    db: &'c mut PgConnection,
}

#[async_trait::async_trait]
impl<'c> Repository for Users<'c> {
    type CreateRequest = UserCreateDBRequest;
    type UpdateRequest = UserUpdateDBRequest;
    type Response = UserDBResponse;
    type Id = UserId;
    type Filter = UserFilter;

    #[instrument(skip(self, request), fields(username = %request.username), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let user = sqlx::query_as::<_, UserDBResponse>(
            r#"
            INSERT INTO users (
                username, email, display_name, password_hash, role,
                is_client, is_content_creator, is_service_provider, email_verified_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, CASE WHEN $9 THEN NOW() END)
            RETURNING *
            "#,
        )
        .bind(&request.username)
        .bind(request.email.trim())
        .bind(&request.display_name)
        .bind(&request.password_hash)
        .bind(request.role)
        .bind(request.flags.is_client)
        .bind(request.flags.is_content_creator)
        .bind(request.flags.is_service_provider)
        .bind(request.email_verified)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(user)
    }

    #[instrument(skip(self), fields(user_id = %abbrev_uuid(&id)), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let user = sqlx::query_as::<_, UserDBResponse>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(user)
    }

    #[instrument(skip(self, ids), fields(count = ids.len()), err)]
    async fn get_bulk(&mut self, ids: Vec<UserId>) -> Result<HashMap<Self::Id, UserDBResponse>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let users = sqlx::query_as::<_, UserDBResponse>("SELECT * FROM users WHERE id = ANY($1)")
            .bind(&ids)
            .fetch_all(&mut *self.db)
            .await?;

        Ok(users.into_iter().map(|u| (u.id, u)).collect())
    }

    #[instrument(skip(self, filter), fields(limit = filter.limit, skip = filter.skip), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let users = sqlx::query_as::<_, UserDBResponse>(
            r#"
            SELECT * FROM users
            WHERE $1::text IS NULL
               OR LOWER(username) LIKE $1
               OR LOWER(email) LIKE $1
               OR LOWER(COALESCE(display_name, '')) LIKE $1
            ORDER BY created_at DESC, id
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(filter.pattern())
        .bind(filter.limit)
        .bind(filter.skip)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(users)
    }

    #[instrument(skip(self), fields(user_id = %abbrev_uuid(&id)), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&mut *self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, request), fields(user_id = %abbrev_uuid(&id)), err)]
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response> {
        let user = sqlx::query_as::<_, UserDBResponse>(
            r#"
            UPDATE users SET
                display_name = COALESCE($2, display_name),
                password_hash = COALESCE($3, password_hash),
                role = COALESCE($4, role),
                is_client = COALESCE($5, is_client),
                is_content_creator = COALESCE($6, is_content_creator),
                is_service_provider = COALESCE($7, is_service_provider),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&request.display_name)
        .bind(&request.password_hash)
        .bind(request.role)
        .bind(request.is_client)
        .bind(request.is_content_creator)
        .bind(request.is_service_provider)
        .fetch_optional(&mut *self.db)
        .await?
        .ok_or(DbError::NotFound)?;

        Ok(user)
    }
}

impl<'c> Users<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    /// Case-insensitive lookup
    #[instrument(skip(self, email), err)]
    pub async fn get_user_by_email(&mut self, email: &str) -> Result<Option<UserDBResponse>> {
        let user = sqlx::query_as::<_, UserDBResponse>("SELECT * FROM users WHERE LOWER(email) = LOWER($1)")
            .bind(email.trim())
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(user)
    }

    #[instrument(skip(self, filter), err)]
    pub async fn count(&mut self, filter: &UserFilter) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM users
            WHERE $1::text IS NULL
               OR LOWER(username) LIKE $1
               OR LOWER(email) LIKE $1
               OR LOWER(COALESCE(display_name, '')) LIKE $1
            "#,
        )
        .bind(filter.pattern())
        .fetch_one(&mut *self.db)
        .await?;

        Ok(count)
    }

    #[instrument(skip(self), fields(user_id = %abbrev_uuid(&id)), err)]
    pub async fn mark_email_verified(&mut self, id: UserId) -> Result<()> {
        let result = sqlx::query("UPDATE users SET email_verified_at = COALESCE(email_verified_at, NOW()), updated_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(&mut *self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::NotFound);
        }
        Ok(())
    }

    /// Move `pro_until` forward to `until`; never shortens an existing entitlement.
    #[instrument(skip(self), fields(user_id = %abbrev_uuid(&id)), err)]
    pub async fn extend_pro_until(&mut self, id: UserId, until: DateTime<Utc>) -> Result<DateTime<Utc>> {
        let pro_until = sqlx::query_scalar::<_, DateTime<Utc>>(
            r#"
            UPDATE users
            SET pro_until = GREATEST(COALESCE(pro_until, $2), $2), updated_at = NOW()
            WHERE id = $1
            RETURNING pro_until
            "#,
        )
        .bind(id)
        .bind(until)
        .fetch_optional(&mut *self.db)
        .await?
        .ok_or(DbError::NotFound)?;

        Ok(pro_until)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::users::{Role, RoleFlags};
    use sqlx::PgPool;

    fn create_request(username: &str, email: &str) -> UserCreateDBRequest {
        UserCreateDBRequest {
            username: username.to_string(),
            email: email.to_string(),
            display_name: None,
            password_hash: None,
            role: Role::User,
            flags: RoleFlags::default(),
            email_verified: false,
        }
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_create_user_starts_with_zero_credits(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Users::new(&mut conn);

        let user = repo.create(&create_request("ana", "ana@example.com")).await.unwrap();
        assert_eq!(user.username, "ana");
        assert_eq!(user.credits, 0);
        assert_eq!(user.role, Role::User);
        assert!(user.flags.is_client);
        assert!(user.email_verified_at.is_none());
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_email_lookup_is_case_insensitive(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Users::new(&mut conn);

        let created = repo.create(&create_request("joao", "Joao@Example.com")).await.unwrap();
        let found = repo.get_user_by_email("joao@example.COM").await.unwrap().unwrap();
        assert_eq!(found.id, created.id);

        // Same address in a different case is a duplicate
        let err = repo.create(&create_request("joao2", "JOAO@example.com")).await.unwrap_err();
        assert!(err.is_unique_violation_on("users_email_unique"));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_update_flags_and_role(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Users::new(&mut conn);

        let user = repo.create(&create_request("maria", "maria@example.com")).await.unwrap();
        let updated = repo
            .update(
                user.id,
                &UserUpdateDBRequest {
                    is_service_provider: Some(true),
                    role: Some(Role::Admin),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.role, Role::Admin);
        assert!(updated.flags.is_service_provider);
        // untouched
        assert!(updated.flags.is_client);
        assert!(!updated.flags.is_content_creator);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_list_with_search(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Users::new(&mut conn);

        repo.create(&create_request("pedro", "pedro@example.com")).await.unwrap();
        repo.create(&create_request("lucia", "lucia@example.es")).await.unwrap();

        let filter = UserFilter::new(0, 10).with_search(Some("EXAMPLE.ES".to_string()));
        let users = repo.list(&filter).await.unwrap();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].username, "lucia");
        assert_eq!(repo.count(&filter).await.unwrap(), 1);
        assert_eq!(repo.count(&UserFilter::new(0, 10)).await.unwrap(), 2);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_extend_pro_until_never_shortens(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Users::new(&mut conn);

        let user = repo.create(&create_request("rui", "rui@example.com")).await.unwrap();
        let later = Utc::now() + chrono::Duration::days(30);
        let earlier = Utc::now() + chrono::Duration::days(5);

        let first = repo.extend_pro_until(user.id, later).await.unwrap();
        let second = repo.extend_pro_until(user.id, earlier).await.unwrap();
        assert_eq!(first, second);
    }
}

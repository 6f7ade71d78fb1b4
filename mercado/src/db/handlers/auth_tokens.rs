//! Repository for email verification and password reset tokens.

use chrono::Utc;
use sqlx::PgConnection;
use tracing::{error, instrument};
use uuid::Uuid;

use crate::{
    auth::password,
    db::{
        errors::{DbError, Result},
        models::auth_tokens::{AuthTokenCreateDBRequest, AuthTokenDBResponse, TokenPurpose},
    },
    types::{UserId, abbrev_uuid},
};

pub struct AuthTokens<'c> {
    db: &'c mut PgConnection,
}

impl<'c> AuthTokens<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    #[instrument(skip(self, request), fields(user_id = %abbrev_uuid(&request.user_id), purpose = ?request.purpose), err)]
    pub async fn create(&mut self, request: &AuthTokenCreateDBRequest) -> Result<AuthTokenDBResponse> {
        let token_hash = password::hash_string_with_params(&request.raw_token, Some(request.argon2_params))
            .map_err(|e| DbError::Other(anyhow::anyhow!(e)))?;

        let token = sqlx::query_as::<_, AuthTokenDBResponse>(
            r#"
            INSERT INTO auth_tokens (user_id, purpose, token_hash, expires_at)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(request.user_id)
        .bind(request.purpose)
        .bind(token_hash)
        .bind(request.expires_at)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(token)
    }

    pub async fn get_by_id(&mut self, id: Uuid) -> Result<Option<AuthTokenDBResponse>> {
        let token = sqlx::query_as::<_, AuthTokenDBResponse>("SELECT * FROM auth_tokens WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(token)
    }

    /// Find an unused, unexpired token of the given purpose whose hash matches `raw_token`
    #[instrument(skip(self, raw_token), fields(token_id = %abbrev_uuid(&token_id)), err)]
    pub async fn find_valid(&mut self, token_id: Uuid, purpose: TokenPurpose, raw_token: &str) -> Result<Option<AuthTokenDBResponse>> {
        let Some(token) = self.get_by_id(token_id).await? else {
            return Ok(None);
        };
        if token.purpose != purpose || !token.is_redeemable(Utc::now()) {
            return Ok(None);
        }

        match password::verify_string(raw_token, &token.token_hash) {
            Ok(true) => Ok(Some(token)),
            Ok(false) => Ok(None),
            Err(e) => {
                error!("Token verification error for token {}: {:?}", token_id, e);
                Ok(None)
            }
        }
    }

    /// Mark every outstanding token of this purpose for the user as used
    #[instrument(skip(self), fields(user_id = %abbrev_uuid(&user_id)), err)]
    pub async fn invalidate_for_user(&mut self, user_id: UserId, purpose: TokenPurpose) -> Result<u64> {
        let result = sqlx::query("UPDATE auth_tokens SET used_at = NOW() WHERE user_id = $1 AND purpose = $2 AND used_at IS NULL")
            .bind(user_id)
            .bind(purpose)
            .execute(&mut *self.db)
            .await?;

        Ok(result.rows_affected())
    }
}

//! Database models for one-time authentication tokens.

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use crate::{auth::password::Argon2Params, types::UserId};

/// What a token may be redeemed for
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
pub enum TokenPurpose {
    EmailVerification,
    PasswordReset,
}

#[derive(Debug, Clone, FromRow)]
pub struct AuthTokenDBResponse {
    pub id: Uuid,
    pub user_id: UserId,
    pub purpose: TokenPurpose,
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
    pub used_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl AuthTokenDBResponse {
    pub fn is_redeemable(&self, now: DateTime<Utc>) -> bool {
        self.used_at.is_none() && now <= self.expires_at
    }
}

/// The raw secret is hashed before it reaches the database
#[derive(Debug, Clone)]
pub struct AuthTokenCreateDBRequest {
    pub user_id: UserId,
    pub purpose: TokenPurpose,
    pub raw_token: String,
    pub expires_at: DateTime<Utc>,
    pub argon2_params: Argon2Params,
}

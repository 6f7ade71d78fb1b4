//! Database models for users.

use crate::api::models::users::{Role, RoleFlags};
use crate::types::UserId;
use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// Database request for creating a new user.
///
/// There is no credits field: accounts always start at zero and any starting grant goes
/// through the ledger so it leaves an audit record.
#[derive(Debug, Clone)]
pub struct UserCreateDBRequest {
    pub username: String,
    pub email: String,
    pub display_name: Option<String>,
    pub password_hash: Option<String>,
    pub role: Role,
    pub flags: RoleFlags,
    pub email_verified: bool,
}

/// Database request for updating a user. `None` leaves the column untouched.
#[derive(Debug, Clone, Default)]
pub struct UserUpdateDBRequest {
    pub display_name: Option<String>,
    pub password_hash: Option<String>,
    pub role: Option<Role>,
    pub is_client: Option<bool>,
    pub is_content_creator: Option<bool>,
    pub is_service_provider: Option<bool>,
}

/// Database response for a user
#[derive(Debug, Clone, FromRow)]
pub struct UserDBResponse {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub display_name: Option<String>,
    pub password_hash: Option<String>,
    pub role: Role,
    #[sqlx(flatten)]
    pub flags: RoleFlags,
    pub credits: i64,
    pub email_verified_at: Option<DateTime<Utc>>,
    pub pro_until: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

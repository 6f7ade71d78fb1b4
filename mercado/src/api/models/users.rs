//! API request/response models for users.

use super::pagination::Pagination;
use crate::db::models::users::UserDBResponse;
use crate::types::UserId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

/// Platform-wide role. Capabilities inside the marketplace are carried by [`RoleFlags`].
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, ToSchema)]
#[sqlx(type_name = "text", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    #[default]
    User,
    Admin,
}

/// Independently toggleable marketplace capabilities; a user may hold any combination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct RoleFlags {
    pub is_client: bool,
    pub is_content_creator: bool,
    pub is_service_provider: bool,
}

impl Default for RoleFlags {
    fn default() -> Self {
        Self {
            is_client: true,
            is_content_creator: false,
            is_service_provider: false,
        }
    }
}

/// The authenticated caller, as carried by the session token.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CurrentUser {
    #[schema(value_type = String, format = "uuid")]
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub role: Role,
    #[serde(flatten)]
    pub flags: RoleFlags,
    /// Role is ADMIN or the email is on the configured allow-list
    pub is_admin: bool,
}

impl From<&UserDBResponse> for CurrentUser {
    fn from(user: &UserDBResponse) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            role: user.role,
            flags: user.flags,
            is_admin: user.role == Role::Admin,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub display_name: Option<String>,
    pub role: Role,
    #[serde(flatten)]
    pub flags: RoleFlags,
    pub credits: i64,
    pub email_verified: bool,
    pub is_pro: bool,
    pub pro_until: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<UserDBResponse> for UserResponse {
    fn from(db: UserDBResponse) -> Self {
        let is_pro = db.pro_until.is_some_and(|until| until > Utc::now());
        Self {
            id: db.id,
            username: db.username,
            email: db.email,
            display_name: db.display_name,
            role: db.role,
            flags: db.flags,
            credits: db.credits,
            email_verified: db.email_verified_at.is_some(),
            is_pro,
            pro_until: db.pro_until,
            created_at: db.created_at,
        }
    }
}

/// Self-service profile update
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct UpdateMeRequest {
    pub display_name: Option<String>,
    pub is_client: Option<bool>,
    pub is_content_creator: Option<bool>,
    pub is_service_provider: Option<bool>,
}

/// Admin update of a user's role and capabilities
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct AdminUserUpdate {
    pub role: Option<Role>,
    pub is_client: Option<bool>,
    pub is_content_creator: Option<bool>,
    pub is_service_provider: Option<bool>,
}

/// Query parameters for listing users
#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct ListUsersQuery {
    #[serde(flatten)]
    #[param(inline)]
    pub pagination: Pagination,

    /// Case-insensitive substring match on username, email or display name
    pub search: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_wire_format() {
        assert_eq!(serde_json::to_string(&Role::Admin).unwrap(), "\"ADMIN\"");
        assert_eq!(serde_json::from_str::<Role>("\"USER\"").unwrap(), Role::User);
    }

    #[test]
    fn test_current_user_flattens_flags() {
        let user = CurrentUser {
            id: uuid::Uuid::nil(),
            username: "ana".into(),
            email: "ana@example.com".into(),
            role: Role::User,
            flags: RoleFlags {
                is_client: true,
                is_content_creator: true,
                is_service_provider: false,
            },
            is_admin: false,
        };
        let value = serde_json::to_value(&user).unwrap();
        assert_eq!(value["is_content_creator"], true);
        assert_eq!(value["is_service_provider"], false);
        assert!(value.get("flags").is_none());
    }
}

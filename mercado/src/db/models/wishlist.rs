//! Database models for wishlist items.

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use crate::types::UserId;

#[derive(Debug, Clone, FromRow)]
pub struct WishlistItemDBResponse {
    pub id: Uuid,
    pub user_id: UserId,
    /// Product id in the external store
    pub product_id: i64,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

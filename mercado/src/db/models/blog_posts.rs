//! Database models for blog posts.

use crate::types::{BlogPostId, UserId};
use chrono::{DateTime, Utc};
use sqlx::FromRow;

#[derive(Debug, Clone)]
pub struct BlogPostCreateDBRequest {
    pub owner_id: UserId,
    pub title: String,
    pub body: String,
}

#[derive(Debug, Clone, FromRow)]
pub struct BlogPostDBResponse {
    pub id: BlogPostId,
    pub owner_id: UserId,
    pub title: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//! Database models for forum threads and posts.

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use crate::types::{Locale, ThreadId, UserId};

#[derive(Debug, Clone)]
pub struct ThreadCreateDBRequest {
    pub author_id: UserId,
    pub title: String,
    pub body: String,
    pub locale: Locale,
}

#[derive(Debug, Clone, FromRow)]
pub struct ThreadDBResponse {
    pub id: ThreadId,
    pub author_id: UserId,
    pub title: String,
    pub body: String,
    pub locale: Locale,
    pub is_locked: bool,
    pub last_activity_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct PostDBResponse {
    pub id: Uuid,
    pub thread_id: ThreadId,
    pub author_id: UserId,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

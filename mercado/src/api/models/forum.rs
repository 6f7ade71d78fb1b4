//! Forum threads and posts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use super::pagination::Pagination;
use crate::{
    db::models::forum::{PostDBResponse, ThreadDBResponse},
    types::{Locale, ThreadId, UserId},
};

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ThreadCreate {
    pub title: String,
    pub body: String,
    #[serde(default)]
    pub locale: Locale,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ThreadResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: ThreadId,
    #[schema(value_type = String, format = "uuid")]
    pub author_id: UserId,
    pub title: String,
    pub body: String,
    pub locale: Locale,
    pub is_locked: bool,
    pub last_activity_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl From<ThreadDBResponse> for ThreadResponse {
    fn from(db: ThreadDBResponse) -> Self {
        Self {
            id: db.id,
            author_id: db.author_id,
            title: db.title,
            body: db.body,
            locale: db.locale,
            is_locked: db.is_locked,
            last_activity_at: db.last_activity_at,
            created_at: db.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PostCreate {
    #[schema(value_type = String, format = "uuid")]
    pub thread_id: ThreadId,
    pub body: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PostResponse {
    pub id: Uuid,
    #[schema(value_type = String, format = "uuid")]
    pub thread_id: ThreadId,
    #[schema(value_type = String, format = "uuid")]
    pub author_id: UserId,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

impl From<PostDBResponse> for PostResponse {
    fn from(db: PostDBResponse) -> Self {
        Self {
            id: db.id,
            thread_id: db.thread_id,
            author_id: db.author_id,
            body: db.body,
            created_at: db.created_at,
        }
    }
}

/// A thread with its replies, oldest first
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ThreadDetailResponse {
    #[serde(flatten)]
    pub thread: ThreadResponse,
    pub posts: Vec<PostResponse>,
}

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct ListThreadsQuery {
    #[serde(flatten)]
    #[param(inline)]
    pub pagination: Pagination,

    pub locale: Option<Locale>,
}

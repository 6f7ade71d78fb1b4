//! Blog post bodies and views.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    db::models::blog_posts::BlogPostDBResponse,
    types::{BlogPostId, UserId},
};

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BlogPostCreate {
    pub title: String,
    pub body: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BlogPostResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: BlogPostId,
    #[schema(value_type = String, format = "uuid")]
    pub owner_id: UserId,
    pub title: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

impl From<BlogPostDBResponse> for BlogPostResponse {
    fn from(db: BlogPostDBResponse) -> Self {
        Self {
            id: db.id,
            owner_id: db.owner_id,
            title: db.title,
            body: db.body,
            created_at: db.created_at,
        }
    }
}

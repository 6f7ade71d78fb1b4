//! Premium video bodies and views.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    db::models::vods::VodDBResponse,
    types::{UserId, VodId},
};

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct VodCreate {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub price_credits: i64,
    pub media_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct VodResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: VodId,
    #[schema(value_type = String, format = "uuid")]
    pub owner_id: UserId,
    pub title: String,
    pub description: String,
    pub price_credits: i64,
    /// Only present for the owner and for users who unlocked the video
    pub media_url: Option<String>,
    pub unlocked: bool,
    pub created_at: DateTime<Utc>,
}

impl VodResponse {
    /// `unlocked` covers the owner too
    pub fn new(db: VodDBResponse, unlocked: bool) -> Self {
        Self {
            id: db.id,
            owner_id: db.owner_id,
            title: db.title,
            description: db.description,
            price_credits: db.price_credits,
            media_url: unlocked.then_some(db.media_url),
            unlocked,
            created_at: db.created_at,
        }
    }
}

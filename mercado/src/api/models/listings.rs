//! Classified listing bodies and views.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use super::pagination::Pagination;
use crate::{
    db::models::listings::{ListingDBResponse, ListingStatus},
    types::{ListingId, Locale, UserId},
};

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ListingCreate {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[schema(value_type = Option<String>, example = "120.00")]
    pub price: Option<Decimal>,
    pub category: String,
    #[serde(default)]
    pub locale: Locale,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ListingResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: ListingId,
    #[schema(value_type = String, format = "uuid")]
    pub owner_id: UserId,
    pub title: String,
    pub description: String,
    #[schema(value_type = Option<String>)]
    pub price: Option<Decimal>,
    pub category: String,
    pub locale: Locale,
    pub status: ListingStatus,
    pub moderation_note: Option<String>,
    pub is_boosted: bool,
    pub created_at: DateTime<Utc>,
}

impl From<ListingDBResponse> for ListingResponse {
    fn from(db: ListingDBResponse) -> Self {
        Self {
            id: db.id,
            owner_id: db.owner_id,
            title: db.title,
            description: db.description,
            price: db.price,
            category: db.category,
            locale: db.locale,
            status: db.status,
            moderation_note: db.moderation_note,
            is_boosted: db.is_boosted,
            created_at: db.created_at,
        }
    }
}

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct ListListingsQuery {
    #[serde(flatten)]
    #[param(inline)]
    pub pagination: Pagination,

    pub category: Option<String>,
    pub locale: Option<Locale>,
}

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct ModerationQueueQuery {
    #[serde(flatten)]
    #[param(inline)]
    pub pagination: Pagination,

    /// Defaults to every status
    pub status: Option<ListingStatus>,
}

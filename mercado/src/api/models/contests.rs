//! Contest (paid raffle) bodies and views.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use super::pagination::Pagination;
use crate::{
    db::models::contests::{ContestDBResponse, ContestEntryDBResponse, ContestStatus},
    types::{ContestId, UserId},
};

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ContestCreate {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub prize: String,
    pub total_slots: i32,
    /// Cash price of one slot
    #[schema(value_type = String, example = "5.00")]
    pub slot_price: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ContestEntryResponse {
    #[schema(value_type = String, format = "uuid")]
    pub participant_id: UserId,
    pub is_winner: bool,
    pub created_at: DateTime<Utc>,
}

impl From<ContestEntryDBResponse> for ContestEntryResponse {
    fn from(db: ContestEntryDBResponse) -> Self {
        Self {
            participant_id: db.participant_id,
            is_winner: db.is_winner,
            created_at: db.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ContestResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: ContestId,
    #[schema(value_type = String, format = "uuid")]
    pub creator_id: UserId,
    pub title: String,
    pub description: String,
    pub prize: String,
    pub total_slots: i32,
    pub entries_count: i64,
    #[schema(value_type = String)]
    pub slot_price: Decimal,
    pub status: ContestStatus,
    pub resolved_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub winner: Option<ContestEntryResponse>,
    pub created_at: DateTime<Utc>,
}

impl ContestResponse {
    pub fn new(db: ContestDBResponse, entries_count: i64) -> Self {
        Self {
            id: db.id,
            creator_id: db.creator_id,
            title: db.title,
            description: db.description,
            prize: db.prize,
            total_slots: db.total_slots,
            entries_count,
            slot_price: db.slot_price,
            status: db.status,
            resolved_at: db.resolved_at,
            winner: None,
            created_at: db.created_at,
        }
    }

    pub fn with_winner(mut self, winner: Option<ContestEntryDBResponse>) -> Self {
        self.winner = winner.map(Into::into);
        self
    }
}

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct ListContestsQuery {
    #[serde(flatten)]
    #[param(inline)]
    pub pagination: Pagination,

    pub status: Option<ContestStatus>,
}

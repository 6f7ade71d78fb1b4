//! Database models for visibility boosts.

use crate::types::{BlogPostId, ListingId, UserId};
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// Insert request. Exactly one of the three targets must be set; the table enforces it.
#[derive(Debug, Clone)]
pub struct BoostCreateDBRequest {
    pub boost_type: String,
    pub listing_id: Option<ListingId>,
    pub blog_post_id: Option<BlogPostId>,
    pub user_id: Option<UserId>,
    pub purchased_by: UserId,
    /// Zero when the boost was paid in cash through checkout
    pub price_credits: i64,
    pub category: Option<String>,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct BoostDBResponse {
    pub id: Uuid,
    pub boost_type: String,
    pub listing_id: Option<ListingId>,
    pub blog_post_id: Option<BlogPostId>,
    pub user_id: Option<UserId>,
    pub purchased_by: UserId,
    pub price_credits: i64,
    pub category: Option<String>,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    /// Stored flag; cleared by the expiry sweep
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl BoostDBResponse {
    /// Live activity check, independent of whether the sweep has run yet
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.is_active && self.start_date <= now && now < self.end_date
    }
}

//! Credit-funded purchases: boosts and video unlocks.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    db::models::boosts::BoostDBResponse,
    ledger::boosts::BoostTarget,
    types::{BlogPostId, ListingId, TransactionId, UserId, VodId},
};

/// What to boost; `user` boosts the buyer's own profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BoostTargetRequest {
    Listing {
        #[schema(value_type = String, format = "uuid")]
        id: ListingId,
    },
    BlogPost {
        #[schema(value_type = String, format = "uuid")]
        id: BlogPostId,
    },
    User,
}

impl From<BoostTargetRequest> for BoostTarget {
    fn from(target: BoostTargetRequest) -> Self {
        match target {
            BoostTargetRequest::Listing { id } => BoostTarget::Listing(id),
            BoostTargetRequest::BlogPost { id } => BoostTarget::BlogPost(id),
            BoostTargetRequest::User => BoostTarget::Profile,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BoostPurchaseRequest {
    /// Key in the boost catalog, e.g. "highlight"
    pub boost_type: String,
    pub target: BoostTargetRequest,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BoostResponse {
    pub id: Uuid,
    pub boost_type: String,
    #[schema(value_type = Option<String>, format = "uuid")]
    pub listing_id: Option<ListingId>,
    #[schema(value_type = Option<String>, format = "uuid")]
    pub blog_post_id: Option<BlogPostId>,
    #[schema(value_type = Option<String>, format = "uuid")]
    pub user_id: Option<UserId>,
    pub price_credits: i64,
    pub category: Option<String>,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub is_active: bool,
}

impl From<BoostDBResponse> for BoostResponse {
    fn from(db: BoostDBResponse) -> Self {
        let is_active = db.is_live(Utc::now());
        Self {
            id: db.id,
            boost_type: db.boost_type,
            listing_id: db.listing_id,
            blog_post_id: db.blog_post_id,
            user_id: db.user_id,
            price_credits: db.price_credits,
            category: db.category,
            start_date: db.start_date,
            end_date: db.end_date,
            is_active,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BoostPurchaseResponse {
    pub boost: BoostResponse,
    /// Credit balance after the purchase
    pub balance: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct VodUnlockRequest {
    #[schema(value_type = String, format = "uuid")]
    pub vod_id: VodId,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct VodUnlockResponse {
    #[schema(value_type = String, format = "uuid")]
    pub vod_id: VodId,
    #[schema(value_type = String, format = "uuid")]
    pub transaction_id: TransactionId,
    pub balance: i64,
    pub media_url: String,
}

//! Wishlist items, enriched with live data from the external store.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{commerce::ProductSnapshot, db::models::wishlist::WishlistItemDBResponse};

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct WishlistItemCreate {
    /// Product id in the external store
    pub product_id: i64,
    pub note: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct WishlistItemResponse {
    pub product_id: i64,
    pub note: Option<String>,
    pub added_at: DateTime<Utc>,
    /// The store fields below are null when the store is unreachable or not configured
    pub name: Option<String>,
    #[schema(value_type = Option<String>)]
    pub price: Option<Decimal>,
    pub in_stock: Option<bool>,
    pub permalink: Option<String>,
}

impl WishlistItemResponse {
    pub fn new(db: WishlistItemDBResponse, product: Option<&ProductSnapshot>) -> Self {
        Self {
            product_id: db.product_id,
            note: db.note,
            added_at: db.created_at,
            name: product.map(|p| p.name.clone()),
            price: product.and_then(|p| p.price),
            in_stock: product.map(|p| p.in_stock),
            permalink: product.and_then(|p| p.permalink.clone()),
        }
    }
}

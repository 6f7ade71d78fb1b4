//! Common type definitions shared across the crate.
//!
//! All entity IDs are UUIDs wrapped in type aliases so signatures document which entity they
//! refer to:
//!
//! - [`UserId`]: User account identifier
//! - [`ListingId`]: Classified listing identifier
//! - [`BlogPostId`]: Blog post identifier
//! - [`VodId`]: Premium video identifier
//! - [`TransactionId`]: Value-moving transaction identifier
//! - [`PayoutRequestId`]: Payout request identifier
//! - [`ContestId`]: Contest (raffle) identifier
//! - [`CheckoutId`]: Pending external payment identifier
//! - [`ThreadId`]: Forum thread identifier
//!
//! # Utility Functions
//!
//! - [`abbrev_uuid`]: Abbreviate UUIDs to first 8 chars for logging

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

// Type aliases for IDs
pub type UserId = Uuid;
pub type ListingId = Uuid;
pub type BlogPostId = Uuid;
pub type VodId = Uuid;
pub type TransactionId = Uuid;
pub type PayoutRequestId = Uuid;
pub type ContestId = Uuid;
pub type CheckoutId = Uuid;
pub type ThreadId = Uuid;

/// Abbreviate a UUID to its first 8 characters for more readable logs and traces
/// Example: "550e8400-e29b-41d4-a716-446655440000" -> "550e8400"
pub fn abbrev_uuid(uuid: &Uuid) -> String {
    uuid.to_string().chars().take(8).collect()
}

/// Supported content locales.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    Pt,
    Es,
}

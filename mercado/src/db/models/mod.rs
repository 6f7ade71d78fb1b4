//! Database record models matching table schemas.
//!
//! These are distinct from the API models in [`crate::api::models`] so storage and wire formats
//! can change independently. API models convert from them with `From` impls.
//!
//! - Accounts: [`users`], [`auth_tokens`], [`subscriptions`]
//! - Content: [`listings`], [`blog_posts`], [`vods`], [`forum`], [`wishlist`]
//! - Ledger: [`credits`], [`transactions`], [`payouts`], [`boosts`]
//! - Payments: [`checkouts`], [`contests`]

pub mod auth_tokens;
pub mod blog_posts;
pub mod boosts;
pub mod checkouts;
pub mod contests;
pub mod credits;
pub mod forum;
pub mod listings;
pub mod payouts;
pub mod subscriptions;
pub mod transactions;
pub mod users;
pub mod vods;
pub mod wishlist;

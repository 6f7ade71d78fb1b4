//! API request and response data models.
//!
//! These are distinct from the database records in [`crate::db::models`] so the wire format and
//! the schema can change independently. Every model carries `utoipa` annotations for the
//! generated API documentation.
//!
//! - Accounts: [`auth`], [`users`], [`credits`]
//! - Marketplace content: [`listings`], [`blog_posts`], [`vods`], [`forum`], [`wishlist`]
//! - Money: [`purchases`], [`checkout`], [`transactions`], [`payouts`], [`contests`]
//! - Back-office: [`admin`]

pub mod admin;
pub mod auth;
pub mod blog_posts;
pub mod checkout;
pub mod contests;
pub mod credits;
pub mod forum;
pub mod listings;
pub mod pagination;
pub mod payouts;
pub mod purchases;
pub mod transactions;
pub mod users;
pub mod vods;
pub mod wishlist;

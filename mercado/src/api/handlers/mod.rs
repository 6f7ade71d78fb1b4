//! HTTP request handlers for all API endpoints.
//!
//! Handlers are organized by resource. Each one validates its input, checks who is calling,
//! delegates to a repository or to the ledger, and serializes the response.
//!
//! # Handler Modules
//!
//! - [`auth`]: Registration, login, logout, email verification and password resets
//! - [`users`]: The caller's profile, credit history, transactions and payouts
//! - [`listings`]: Classified listings (publishing debits the listing fee)
//! - [`blog_posts`]: Blog posts
//! - [`vods`]: Premium videos, media URL revealed to unlockers only
//! - [`purchases`]: Boosts and video unlocks paid with credits
//! - [`checkout`]: Card payments for credit packages, Pro plans and turbo boosts
//! - [`webhooks`]: Payment processor callbacks
//! - [`contests`]: Paid-slot contests and winner draws
//! - [`forum`]: Threads and replies
//! - [`wishlist`]: Products from the external store
//! - [`admin`]: Back-office, mounted behind [`crate::auth::gate::admin_gate`]
//!
//! # Authentication
//!
//! Handlers take [`crate::api::models::users::CurrentUser`] when any signed-in caller will do,
//! `Option<CurrentUser>` when guests are welcome, and [`crate::auth::gate::Requires`] when a
//! capability is needed.
//!
//! # Error Handling
//!
//! Handlers return [`crate::errors::Error`], which maps to an HTTP status and a JSON body.

pub mod admin;
pub mod auth;
pub mod blog_posts;
pub mod checkout;
pub mod contests;
pub mod forum;
pub mod listings;
pub mod purchases;
pub mod users;
pub mod vods;
pub mod webhooks;
pub mod wishlist;

//! Repositories for database access.
//!
//! One repository struct per table family. Each wraps a `&mut PgConnection`, so the same
//! repository works on a pooled connection or inside a transaction:
//!
//! ```ignore
//! use mercado::db::handlers::{Credits, Listings};
//!
//! async fn example(pool: &sqlx::PgPool) -> Result<(), Box<dyn std::error::Error>> {
//!     let mut tx = pool.begin().await?;
//!     let balance = Credits::new(&mut tx).balance(user_id).await?;
//!     let listing = Listings::new(&mut tx).get_by_id(listing_id).await?;
//!     tx.commit().await?;
//!     Ok(())
//! }
//! ```
//!
//! Entity-style tables with plain CRUD implement the [`Repository`] trait. Ledger tables
//! (credits, transactions, payouts, boosts) expose narrower operations instead: their rows are
//! appended or moved through fixed status transitions, never freely updated.

pub mod auth_tokens;
pub mod blog_posts;
pub mod boosts;
pub mod checkouts;
pub mod contests;
pub mod credits;
pub mod forum;
pub mod listings;
pub mod payouts;
pub mod repository;
pub mod subscriptions;
pub mod transactions;
pub mod users;
pub mod vods;
pub mod wishlist;

pub use auth_tokens::AuthTokens;
pub use blog_posts::BlogPosts;
pub use boosts::Boosts;
pub use checkouts::Checkouts;
pub use contests::Contests;
pub use credits::Credits;
pub use forum::Forum;
pub use listings::Listings;
pub use payouts::Payouts;
pub use repository::Repository;
pub use subscriptions::Subscriptions;
pub use transactions::Transactions;
pub use users::Users;
pub use vods::Vods;
pub use wishlist::Wishlist;

//! Database layer.
//!
//! ```text
//! API handlers / ledger
//!        │
//!        ↓
//! db::handlers   repositories, one per table family
//!        │
//!        ↓
//! db::models     row structs
//!        │
//!        ↓
//! PostgreSQL     schema in migrations/, applied at startup by crate::migrator
//! ```
//!
//! Anything that changes money or credits runs inside a transaction opened by the caller; the
//! repositories never begin or commit on their own.

pub mod errors;
pub mod handlers;
pub mod models;

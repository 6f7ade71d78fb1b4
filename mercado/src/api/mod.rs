//! API layer for HTTP request handling and data models.
//!
//! - **[`handlers`]**: Axum route handlers for all API endpoints
//! - **[`models`]**: Request/response data structures for API communication
//!
//! # API Structure
//!
//! - **Authentication** (`/auth/*`): Registration, login, verification, password resets
//! - **Account** (`/user/*`): Profile, credits, transactions, payouts
//! - **Content** (`/listings`, `/blog-posts`, `/vods`, `/forum/*`, `/wishlist`)
//! - **Money** (`/purchase/*`, `/checkout/*`, `/contests/*`, `/webhooks/payments`)
//! - **Back-office** (`/admin/*`): Moderation, payouts, credit adjustments, reports
//!
//! # OpenAPI Documentation
//!
//! All endpoints are annotated with `utoipa`. The rendered reference is served at `/docs`.

pub mod handlers;
pub mod models;

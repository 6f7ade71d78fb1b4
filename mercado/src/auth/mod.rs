//! Authentication and authorization.
//!
//! Users sign in with email and password through `/auth/login`. A successful login issues a
//! signed JWT that carries the user's role and capability flags; browsers receive it as an
//! HTTP-only cookie and other clients may send it as `Authorization: Bearer <token>`.
//!
//! # Authorization
//!
//! - **Role**: `USER` or `ADMIN`. Emails listed in `auth.admin_emails` are treated as admins too.
//! - **Capabilities**: independent flags for clients, content creators and service providers.
//! - **Ownership**: handlers compare the caller with the resource owner where it matters.
//!
//! # Modules
//!
//! - [`current_user`]: Extractors for getting the authenticated user in handlers
//! - [`gate`]: The admin middleware and the [`gate::Requires`] capability extractor
//! - [`password`]: Password hashing and verification using Argon2
//! - [`session`]: Session token and cookie handling
//!
//! # Usage in Handlers
//!
//! ```ignore
//! use mercado::auth::gate::{ContentCreator, Requires};
//!
//! async fn create_vod(
//!     State(state): State<AppState>,
//!     creator: Requires<ContentCreator>,
//!     Json(request): Json<VodCreate>,
//! ) -> Result<Json<VodResponse>> {
//!     // creator.user is the authenticated content creator
//! }
//! ```

pub mod current_user;
pub mod gate;
pub mod password;
pub mod session;

//! Extractor for the authenticated caller.
//!
//! A session is a JWT carried either in the session cookie (browsers) or in an
//! `Authorization: Bearer` header (scripts and tests). The token is trusted as issued; nothing is
//! looked up in the database on the request path.

use axum::{
    extract::{FromRequestParts, OptionalFromRequestParts},
    http::{header, request::Parts},
};
use tracing::{debug, instrument, trace};

use crate::{
    AppState,
    api::models::users::CurrentUser,
    auth::session,
    config::Config,
    errors::{Error, Result},
};

/// Session token from the `Authorization: Bearer` header, if any
fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
}

/// Session token from the session cookie, if any
fn cookie_token<'a>(parts: &'a Parts, config: &Config) -> Option<&'a str> {
    let cookie_name = &config.auth.native.session.cookie_name;
    parts
        .headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|h| h.to_str().ok())
        .flat_map(|h| h.split(';'))
        .filter_map(|cookie| cookie.trim().split_once('='))
        .find(|(name, _)| name == cookie_name)
        .map(|(_, value)| value)
}

/// Returns:
/// - None: no session credentials on the request
/// - Some(Ok(user)): a valid session
/// - Some(Err(error)): credentials present but invalid or expired
#[instrument(skip_all)]
fn authenticate(parts: &Parts, config: &Config) -> Option<Result<CurrentUser>> {
    let mut result = None;
    for token in [bearer_token(parts), cookie_token(parts, config)].into_iter().flatten() {
        match session::verify_session_token(token, config) {
            Ok(user) => return Some(Ok(user)),
            Err(e) => {
                trace!("Session token rejected: {e}");
                result = Some(Err(e));
            }
        }
    }
    result
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        // Already resolved by the admin gate
        if let Some(user) = parts.extensions.get::<CurrentUser>() {
            return Ok(user.clone());
        }

        match authenticate(parts, &state.config) {
            Some(Ok(user)) => {
                debug!("Authenticated user: {}", user.id);
                Ok(user)
            }
            Some(Err(Error::Unauthenticated { .. })) => Err(Error::Unauthenticated {
                message: Some("Session expired or invalid".to_string()),
            }),
            Some(Err(e)) => Err(e),
            None => Err(Error::Unauthenticated { message: None }),
        }
    }
}

/// Guest-capable endpoints take `Option<CurrentUser>`: a missing or stale session is a guest.
impl OptionalFromRequestParts<AppState> for CurrentUser {
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Option<Self>> {
        match <CurrentUser as FromRequestParts<AppState>>::from_request_parts(parts, state).await {
            Ok(user) => Ok(Some(user)),
            Err(Error::Unauthenticated { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

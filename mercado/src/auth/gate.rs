//! Authorization: the admin gate and capability-gated extractors.
//!
//! Every `/admin/*` route sits behind [`admin_gate`], applied once to the admin router. Outside
//! the admin area, handlers that need a marketplace capability take [`Requires<C>`] instead of
//! [`CurrentUser`], so the check cannot be forgotten in the handler body.

use std::marker::PhantomData;

use axum::{
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use tracing::{debug, instrument};

use crate::{AppState, api::models::users::CurrentUser, errors::Error};

/// A capability a caller may hold
pub trait Capability {
    /// Used in the 403 message
    const DESCRIPTION: &'static str;

    fn is_granted(user: &CurrentUser) -> bool;
}

/// May publish listings
pub struct Client;
/// May publish premium videos
pub struct ContentCreator;
/// May request payouts: content creators and service providers both earn
pub struct Provider;
/// Role ADMIN or allow-listed email
pub struct Admin;

impl Capability for Client {
    const DESCRIPTION: &'static str = "client";

    fn is_granted(user: &CurrentUser) -> bool {
        user.flags.is_client || user.is_admin
    }
}

impl Capability for ContentCreator {
    const DESCRIPTION: &'static str = "content creator";

    fn is_granted(user: &CurrentUser) -> bool {
        user.flags.is_content_creator || user.is_admin
    }
}

impl Capability for Provider {
    const DESCRIPTION: &'static str = "content creator or service provider";

    fn is_granted(user: &CurrentUser) -> bool {
        user.flags.is_content_creator || user.flags.is_service_provider
    }
}

impl Capability for Admin {
    const DESCRIPTION: &'static str = "admin";

    fn is_granted(user: &CurrentUser) -> bool {
        user.is_admin
    }
}

/// The authenticated caller, guaranteed to hold capability `C`
pub struct Requires<C> {
    pub user: CurrentUser,
    _capability: PhantomData<fn() -> C>,
}

impl<C: Capability> Requires<C> {
    pub fn check(user: CurrentUser) -> Result<Self, Error> {
        if C::is_granted(&user) {
            Ok(Self {
                user,
                _capability: PhantomData,
            })
        } else {
            Err(Error::InsufficientPermissions {
                action: "perform this action".to_string(),
                resource: format!("without the {} capability", C::DESCRIPTION),
            })
        }
    }
}

impl<C: Capability> FromRequestParts<AppState> for Requires<C> {
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let user = CurrentUser::from_request_parts(parts, state).await?;
        Self::check(user)
    }
}

/// Middleware for the admin router: 401 without a session, 403 unless the caller is an admin.
/// The resolved user is stored in the request extensions for the handler.
#[instrument(skip_all, fields(path = %request.uri().path()))]
pub async fn admin_gate(State(state): State<AppState>, request: Request, next: Next) -> Result<Response, Error> {
    let (mut parts, body) = request.into_parts();
    let user = CurrentUser::from_request_parts(&mut parts, &state).await?;
    let admin = Requires::<Admin>::check(user).map_err(|_| Error::InsufficientPermissions {
        action: "access".to_string(),
        resource: "the admin area".to_string(),
    })?;
    debug!(user_id = %admin.user.id, "Admin access granted");

    let mut request = Request::from_parts(parts, body);
    request.extensions_mut().insert(admin.user);
    Ok(next.run(request).await)
}

//! Request and response bodies for `/auth/*`.

use axum::{
    Json,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::users::UserResponse;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub display_name: Option<String>,
    /// Defaults to true
    pub is_client: Option<bool>,
    #[serde(default)]
    pub is_content_creator: bool,
    #[serde(default)]
    pub is_service_provider: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuthResponse {
    pub user: UserResponse,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ResetPasswordRequest {
    pub token_id: Uuid,
    pub token: String,
    pub new_password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct VerifyEmailRequest {
    pub token_id: Uuid,
    pub token: String,
}

/// A JSON body plus a `Set-Cookie` header carrying (or clearing) the session.
/// Without a cookie the body is sent as is.
pub struct WithSessionCookie<T> {
    pub status: StatusCode,
    pub body: T,
    pub cookie: Option<String>,
}

impl<T: Serialize> IntoResponse for WithSessionCookie<T> {
    fn into_response(self) -> Response {
        match self.cookie {
            Some(cookie) => (self.status, [(header::SET_COOKIE, cookie)], Json(self.body)).into_response(),
            None => (self.status, Json(self.body)).into_response(),
        }
    }
}

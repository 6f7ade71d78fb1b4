use axum::{Json, extract::State, http::StatusCode};
use chrono::Utc;
use tracing::{info, warn};

use crate::{
    AppState,
    api::models::{
        auth::{
            AuthResponse, ForgotPasswordRequest, LoginRequest, MessageResponse, RegisterRequest, ResetPasswordRequest, VerifyEmailRequest,
            WithSessionCookie,
        },
        users::{CurrentUser, Role, RoleFlags, UserResponse},
    },
    auth::{
        password::{self, Argon2Params},
        session,
    },
    config::Config,
    db::{
        handlers::{AuthTokens, Repository, Users},
        models::{
            auth_tokens::{AuthTokenCreateDBRequest, AuthTokenDBResponse, TokenPurpose},
            credits::CreditTransactionType,
            users::{UserCreateDBRequest, UserDBResponse, UserUpdateDBRequest},
        },
    },
    email::EmailService,
    errors::Error,
    ledger,
    types::UserId,
};

fn require_native_auth(config: &Config) -> Result<(), Error> {
    if !config.auth.native.enabled {
        return Err(Error::BadRequest {
            message: "Native authentication is disabled".to_string(),
        });
    }
    Ok(())
}

/// Fresh one-time token; returns the row and the raw secret to put in the email link
async fn issue_token(
    conn: &mut sqlx::PgConnection,
    config: &Config,
    user_id: UserId,
    purpose: TokenPurpose,
) -> Result<(AuthTokenDBResponse, String), Error> {
    let valid_for = match purpose {
        TokenPurpose::EmailVerification => config.auth.native.email_verification_token_duration,
        TokenPurpose::PasswordReset => config.auth.native.password_reset_token_duration,
    };
    let expires_at = Utc::now()
        + chrono::Duration::from_std(valid_for).map_err(|e| Error::Internal {
            operation: format!("token lifetime: {e}"),
        })?;

    let raw_token = password::generate_token_secret();
    let token = AuthTokens::new(conn)
        .create(&AuthTokenCreateDBRequest {
            user_id,
            purpose,
            raw_token: raw_token.clone(),
            expires_at,
            argon2_params: Argon2Params::from(&config.auth.native.password),
        })
        .await?;

    Ok((token, raw_token))
}

fn signed_in(user: &UserDBResponse, config: &Config) -> Result<String, Error> {
    let token = session::create_session_token(&CurrentUser::from(user), config)?;
    Ok(session::session_cookie(&token, config))
}

/// Register a new user account
#[utoipa::path(
    post,
    path = "/auth/register",
    request_body = RegisterRequest,
    tag = "auth",
    responses(
        (status = 201, description = "User registered successfully", body = AuthResponse),
        (status = 400, description = "Invalid input"),
        (status = 409, description = "User already exists"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<WithSessionCookie<AuthResponse>, Error> {
    let config = &state.config;
    require_native_auth(config)?;
    if !config.auth.native.allow_registration {
        return Err(Error::BadRequest {
            message: "User registration is disabled".to_string(),
        });
    }

    password::validate_password(&request.password, &config.auth.native.password)?;
    let email = request.email.trim().to_lowercase();
    let username = request.username.trim().to_string();
    if username.is_empty() || !email.contains('@') {
        return Err(Error::BadRequest {
            message: "A username and a valid email address are required".to_string(),
        });
    }

    let password_hash = password::hash_password(request.password, Argon2Params::from(&config.auth.native.password)).await?;

    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;

    if Users::new(&mut tx).get_user_by_email(&email).await?.is_some() {
        return Err(Error::Conflict {
            message: "An account with this email address already exists".to_string(),
        });
    }

    let mut user = Users::new(&mut tx)
        .create(&UserCreateDBRequest {
            username,
            email,
            display_name: request.display_name,
            password_hash: Some(password_hash),
            role: Role::User,
            flags: RoleFlags {
                is_client: request.is_client.unwrap_or(true),
                is_content_creator: request.is_content_creator,
                is_service_provider: request.is_service_provider,
            },
            email_verified: false,
        })
        .await?;

    let initial_credits = config.credits.initial_credits;
    if initial_credits > 0 {
        user.credits = ledger::credit(
            &mut tx,
            user.id,
            initial_credits,
            CreditTransactionType::AdminGrant,
            Some("Initial credits on account creation".to_string()),
            None,
        )
        .await?;
    }

    let (token, raw_token) = issue_token(&mut tx, config, user.id, TokenPurpose::EmailVerification).await?;

    tx.commit().await.map_err(|e| Error::Database(e.into()))?;
    info!(user_id = %user.id, "User registered");

    // The account exists either way; a lost email can be re-requested through password reset
    match EmailService::new(config) {
        Ok(email_service) => {
            if let Err(e) = email_service
                .send_verification_email(&user.email, user.display_name.as_deref(), &token.id, &raw_token)
                .await
            {
                warn!(user_id = %user.id, "Failed to send verification email: {e}");
            }
        }
        Err(e) => warn!("Email service unavailable: {e}"),
    }

    let cookie = if config.auth.native.require_email_verification {
        None
    } else {
        Some(signed_in(&user, config)?)
    };

    Ok(WithSessionCookie {
        status: StatusCode::CREATED,
        body: AuthResponse {
            user: UserResponse::from(user),
            message: "Registration successful".to_string(),
        },
        cookie,
    })
}

/// Login with email and password
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    tag = "auth",
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 401, description = "Invalid credentials"),
        (status = 403, description = "Email address not verified"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn login(State(state): State<AppState>, Json(request): Json<LoginRequest>) -> Result<WithSessionCookie<AuthResponse>, Error> {
    let config = &state.config;
    require_native_auth(config)?;

    let invalid = || Error::Unauthenticated {
        message: Some("Invalid email or password".to_string()),
    };

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let user = Users::new(&mut conn)
        .get_user_by_email(request.email.trim())
        .await?
        .ok_or_else(invalid)?;

    let hash = user.password_hash.clone().ok_or_else(invalid)?;
    if !password::verify_password(request.password, hash).await? {
        return Err(invalid());
    }

    if config.auth.native.require_email_verification && user.email_verified_at.is_none() {
        return Err(Error::InsufficientPermissions {
            action: "sign in".to_string(),
            resource: "before verifying your email address".to_string(),
        });
    }

    let cookie = signed_in(&user, config)?;
    Ok(WithSessionCookie {
        status: StatusCode::OK,
        body: AuthResponse {
            user: UserResponse::from(user),
            message: "Login successful".to_string(),
        },
        cookie: Some(cookie),
    })
}

/// Logout (clear session)
#[utoipa::path(
    post,
    path = "/auth/logout",
    tag = "auth",
    responses(
        (status = 200, description = "Logout successful", body = MessageResponse),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn logout(State(state): State<AppState>) -> WithSessionCookie<MessageResponse> {
    WithSessionCookie {
        status: StatusCode::OK,
        body: MessageResponse::new("Logout successful"),
        cookie: Some(session::clear_session_cookie(&state.config)),
    }
}

/// Request a password reset email
#[utoipa::path(
    post,
    path = "/auth/forgot-password",
    request_body = ForgotPasswordRequest,
    tag = "auth",
    responses(
        (status = 200, description = "Reset email sent if the account exists", body = MessageResponse),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(request): Json<ForgotPasswordRequest>,
) -> Result<Json<MessageResponse>, Error> {
    let config = &state.config;
    require_native_auth(config)?;

    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;

    // Same response whether or not the account exists
    let user = Users::new(&mut tx).get_user_by_email(request.email.trim()).await?;
    let issued = match user {
        Some(user) if user.password_hash.is_some() => {
            let (token, raw_token) = issue_token(&mut tx, config, user.id, TokenPurpose::PasswordReset).await?;
            Some((user, token, raw_token))
        }
        _ => None,
    };
    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    if let Some((user, token, raw_token)) = issued {
        let email_service = EmailService::new(config)?;
        if let Err(e) = email_service
            .send_password_reset_email(
                &user.email,
                user.display_name.as_deref(),
                &token.id,
                &raw_token,
                config.auth.native.password_reset_token_duration,
            )
            .await
        {
            warn!(user_id = %user.id, "Failed to send password reset email: {e}");
        }
    }

    Ok(Json(MessageResponse::new(
        "If an account with that email exists, a password reset link has been sent.",
    )))
}

/// Set a new password with a reset token
#[utoipa::path(
    post,
    path = "/auth/reset-password",
    request_body = ResetPasswordRequest,
    tag = "auth",
    responses(
        (status = 200, description = "Password reset successful", body = MessageResponse),
        (status = 400, description = "Invalid or expired token"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn reset_password(
    State(state): State<AppState>,
    Json(request): Json<ResetPasswordRequest>,
) -> Result<Json<MessageResponse>, Error> {
    let config = &state.config;
    require_native_auth(config)?;
    password::validate_password(&request.new_password, &config.auth.native.password)?;

    let new_hash = password::hash_password(request.new_password, Argon2Params::from(&config.auth.native.password)).await?;

    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;
    let token = AuthTokens::new(&mut tx)
        .find_valid(request.token_id, TokenPurpose::PasswordReset, &request.token)
        .await?
        .ok_or_else(|| Error::BadRequest {
            message: "Invalid or expired reset token".to_string(),
        })?;

    Users::new(&mut tx)
        .update(
            token.user_id,
            &UserUpdateDBRequest {
                password_hash: Some(new_hash),
                ..Default::default()
            },
        )
        .await?;

    // Invalidate all tokens for this user (including the current one) atomically
    AuthTokens::new(&mut tx)
        .invalidate_for_user(token.user_id, TokenPurpose::PasswordReset)
        .await?;
    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    info!(user_id = %token.user_id, "Password reset");
    Ok(Json(MessageResponse::new("Password has been reset successfully")))
}

/// Confirm an email address
#[utoipa::path(
    post,
    path = "/auth/verify",
    request_body = VerifyEmailRequest,
    tag = "auth",
    responses(
        (status = 200, description = "Email verified", body = MessageResponse),
        (status = 400, description = "Invalid or expired token"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn verify_email(State(state): State<AppState>, Json(request): Json<VerifyEmailRequest>) -> Result<Json<MessageResponse>, Error> {
    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;
    let token = AuthTokens::new(&mut tx)
        .find_valid(request.token_id, TokenPurpose::EmailVerification, &request.token)
        .await?
        .ok_or_else(|| Error::BadRequest {
            message: "Invalid or expired verification token".to_string(),
        })?;

    Users::new(&mut tx).mark_email_verified(token.user_id).await?;
    AuthTokens::new(&mut tx)
        .invalidate_for_user(token.user_id, TokenPurpose::EmailVerification)
        .await?;
    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    Ok(Json(MessageResponse::new("Email address verified")))
}

//! Self-service account endpoints under `/user/*`.

use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
};

use crate::{
    AppState,
    api::models::{
        auth::WithSessionCookie,
        credits::{CreditTransactionResponse, CreditsResponse},
        pagination::{PaginatedResponse, Pagination},
        payouts::{ListPayoutsQuery, PayoutOverview, PayoutRequestCreate, PayoutResponse},
        transactions::TransactionResponse,
        users::{CurrentUser, UpdateMeRequest, UserResponse},
    },
    auth::{
        gate::{Provider, Requires},
        session,
    },
    db::{
        handlers::{Credits, Payouts, Repository, Transactions, Users, payouts::PayoutFilter},
        models::users::UserUpdateDBRequest,
    },
    errors::{Error, Result},
    ledger,
};

fn user_not_found(user: &CurrentUser) -> Error {
    Error::NotFound {
        resource: "User".to_string(),
        id: user.id.to_string(),
    }
}

/// Get the signed-in user's profile
#[utoipa::path(
    get,
    path = "/user/me",
    tag = "user",
    responses(
        (status = 200, description = "Current user", body = UserResponse),
        (status = 401, description = "Not signed in"),
    ),
    security(("session" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn get_me(State(state): State<AppState>, current_user: CurrentUser) -> Result<Json<UserResponse>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let user = Users::new(&mut conn)
        .get_by_id(current_user.id)
        .await?
        .ok_or_else(|| user_not_found(&current_user))?;

    Ok(Json(UserResponse::from(user)))
}

/// Update display name and capability flags.
///
/// The session cookie is reissued so the flags carried by the token match the profile.
#[utoipa::path(
    patch,
    path = "/user/me",
    tag = "user",
    request_body = UpdateMeRequest,
    responses(
        (status = 200, description = "Updated profile", body = UserResponse),
        (status = 401, description = "Not signed in"),
    ),
    security(("session" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn update_me(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(request): Json<UpdateMeRequest>,
) -> Result<WithSessionCookie<UserResponse>> {
    let display_name = match request.display_name {
        Some(name) if name.trim().is_empty() => {
            return Err(Error::BadRequest {
                message: "Display name cannot be blank".to_string(),
            });
        }
        other => other.map(|n| n.trim().to_string()),
    };

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let user = Users::new(&mut conn)
        .update(
            current_user.id,
            &UserUpdateDBRequest {
                display_name,
                is_client: request.is_client,
                is_content_creator: request.is_content_creator,
                is_service_provider: request.is_service_provider,
                ..Default::default()
            },
        )
        .await?;

    let token = session::create_session_token(&CurrentUser::from(&user), &state.config)?;
    Ok(WithSessionCookie {
        status: StatusCode::OK,
        body: UserResponse::from(user),
        cookie: Some(session::session_cookie(&token, &state.config)),
    })
}

/// Credit balance and history, newest first
#[utoipa::path(
    get,
    path = "/user/credits",
    tag = "user",
    params(Pagination),
    responses(
        (status = 200, description = "Balance and credit history", body = CreditsResponse),
        (status = 401, description = "Not signed in"),
    ),
    security(("session" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn get_credits(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(pagination): Query<Pagination>,
) -> Result<Json<CreditsResponse>> {
    let (skip, limit) = pagination.params();
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut credits = Credits::new(&mut conn);

    let balance = credits.balance(current_user.id).await?;
    let history = credits.list_user_transactions(current_user.id, skip, limit).await?;
    let total = credits.count_user_transactions(current_user.id).await?;

    Ok(Json(CreditsResponse {
        balance,
        history: PaginatedResponse::new(
            history.into_iter().map(CreditTransactionResponse::from).collect(),
            total,
            skip,
            limit,
        ),
    }))
}

/// Transactions where the caller is the provider or the client
#[utoipa::path(
    get,
    path = "/user/transactions",
    tag = "user",
    params(Pagination),
    responses(
        (status = 200, description = "Transactions", body = PaginatedResponse<TransactionResponse>),
        (status = 401, description = "Not signed in"),
    ),
    security(("session" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn list_transactions(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(pagination): Query<Pagination>,
) -> Result<Json<PaginatedResponse<TransactionResponse>>> {
    let (skip, limit) = pagination.params();
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Transactions::new(&mut conn);

    let rows = repo.list_for_user(current_user.id, skip, limit).await?;
    let total = repo.count_for_user(current_user.id).await?;

    Ok(Json(PaginatedResponse::new(
        rows.into_iter().map(TransactionResponse::from).collect(),
        total,
        skip,
        limit,
    )))
}

/// Available balance and the caller's payout requests
#[utoipa::path(
    get,
    path = "/user/payouts",
    tag = "payouts",
    params(ListPayoutsQuery),
    responses(
        (status = 200, description = "Payout overview", body = PayoutOverview),
        (status = 401, description = "Not signed in"),
    ),
    security(("session" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn list_payouts(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<ListPayoutsQuery>,
) -> Result<Json<PayoutOverview>> {
    let (skip, limit) = query.pagination.params();
    let filter = PayoutFilter::new(skip, limit).provider(current_user.id).status(query.status);

    let available_balance = ledger::payouts::available_balance(&state.db, current_user.id).await?;

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut payouts = Payouts::new(&mut conn);
    let requests = payouts.list(&filter).await?;
    let total = payouts.count(&filter).await?;

    Ok(Json(PayoutOverview {
        available_balance,
        requests: PaginatedResponse::new(requests.into_iter().map(PayoutResponse::from).collect(), total, skip, limit),
    }))
}

/// Request a payout of accumulated earnings
#[utoipa::path(
    post,
    path = "/user/payouts/request",
    tag = "payouts",
    request_body = PayoutRequestCreate,
    responses(
        (status = 201, description = "Payout requested", body = PayoutResponse),
        (status = 400, description = "Amount invalid or not covered by unpaid earnings"),
        (status = 401, description = "Not signed in"),
        (status = 403, description = "Caller is neither a content creator nor a service provider"),
    ),
    security(("session" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn request_payout(
    State(state): State<AppState>,
    caller: Requires<Provider>,
    Json(request): Json<PayoutRequestCreate>,
) -> Result<(StatusCode, Json<PayoutResponse>)> {
    let payout = ledger::payouts::request_payout(&state.db, caller.user.id, request.into()).await?;
    Ok((StatusCode::CREATED, Json(PayoutResponse::from(payout))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::users::{Role, RoleFlags};
    use crate::config::CreditsConfig;
    use crate::db::models::{credits::CreditTransactionType, payouts::PayoutStatus, transactions::TransactionType};
    use crate::ledger::recorder::{ValueExchange, record_transaction};
    use crate::test_utils::{add_auth_headers, create_test_config, create_test_user, create_test_user_with_flags};
    use axum::{
        Router,
        routing::{get, post},
    };
    use axum_test::TestServer;
    use rust_decimal::Decimal;
    use sqlx::PgPool;

    fn server(pool: PgPool) -> TestServer {
        let state = AppState::builder().db(pool).config(create_test_config()).build();
        let app = Router::new()
            .route("/user/me", get(get_me).patch(update_me))
            .route("/user/credits", get(get_credits))
            .route("/user/transactions", get(list_transactions))
            .route("/user/payouts", get(list_payouts))
            .route("/user/payouts/request", post(request_payout))
            .with_state(state);
        TestServer::new(app).unwrap()
    }

    fn with_auth(mut request: axum_test::TestRequest, user: &crate::db::models::users::UserDBResponse) -> axum_test::TestRequest {
        for (key, value) in add_auth_headers(user) {
            request = request.add_header(key, value);
        }
        request
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_me_requires_session(pool: PgPool) {
        let server = server(pool.clone());
        server.get("/user/me").await.assert_status_unauthorized();

        let user = create_test_user(&pool, Role::User).await;
        let response = with_auth(server.get("/user/me"), &user).await;
        response.assert_status_ok();
        let body: UserResponse = response.json();
        assert_eq!(body.id, user.id);
        assert!(!body.is_pro);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_update_me_reissues_cookie(pool: PgPool) {
        let server = server(pool.clone());
        let user = create_test_user(&pool, Role::User).await;

        let response = with_auth(server.patch("/user/me"), &user)
            .json(&serde_json::json!({ "display_name": "Rosa", "is_service_provider": true }))
            .await;
        response.assert_status_ok();
        assert!(response.headers().get("set-cookie").is_some());

        let body: UserResponse = response.json();
        assert_eq!(body.display_name.as_deref(), Some("Rosa"));
        assert!(body.flags.is_service_provider);
        assert!(body.flags.is_client);

        with_auth(server.patch("/user/me"), &user)
            .json(&serde_json::json!({ "display_name": "  " }))
            .await
            .assert_status_bad_request();
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_credits_history(pool: PgPool) {
        let server = server(pool.clone());
        let user = create_test_user(&pool, Role::User).await;
        {
            let mut conn = pool.acquire().await.unwrap();
            ledger::credit(&mut conn, user.id, 300, CreditTransactionType::Purchase, None, None).await.unwrap();
            ledger::debit(&mut conn, user.id, 120, CreditTransactionType::BoostPurchase, None).await.unwrap();
        }

        let response = with_auth(server.get("/user/credits?limit=1"), &user).await;
        response.assert_status_ok();
        let body: CreditsResponse = response.json();
        assert_eq!(body.balance, 180);
        assert_eq!(body.history.total_count, 2);
        assert_eq!(body.history.data.len(), 1);
        assert_eq!(body.history.data[0].amount, -120);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_payout_flow_over_http(pool: PgPool) {
        let server = server(pool.clone());
        let provider = create_test_user_with_flags(
            &pool,
            Role::User,
            RoleFlags {
                is_client: false,
                is_content_creator: false,
                is_service_provider: true,
            },
        )
        .await;
        let client = create_test_user(&pool, Role::User).await;
        {
            let mut conn = pool.acquire().await.unwrap();
            for credits in [100, 200] {
                record_transaction(
                    &mut conn,
                    &CreditsConfig::default(),
                    &ValueExchange {
                        transaction_type: TransactionType::VodUnlock,
                        amount_credits: credits,
                        provider_id: provider.id,
                        client_id: client.id,
                        listing_id: None,
                    },
                )
                .await
                .unwrap();
            }
        }

        let overview: PayoutOverview = with_auth(server.get("/user/payouts"), &provider).await.json();
        assert_eq!(overview.available_balance, Decimal::new(3000, 2));
        assert_eq!(overview.requests.total_count, 0);

        // Clients cannot request payouts
        with_auth(server.post("/user/payouts/request"), &client)
            .json(&serde_json::json!({ "amount": "10.00", "method": "mbway" }))
            .await
            .assert_status_forbidden();

        with_auth(server.post("/user/payouts/request"), &provider)
            .json(&serde_json::json!({ "amount": "99.00", "method": "mbway" }))
            .await
            .assert_status_bad_request();

        let response = with_auth(server.post("/user/payouts/request"), &provider)
            .json(&serde_json::json!({ "amount": "10.00", "method": "mbway", "details": "+351 912 345 678" }))
            .await;
        response.assert_status(StatusCode::CREATED);
        let payout: PayoutResponse = response.json();
        assert_eq!(payout.status, PayoutStatus::Requested);
        assert_eq!(payout.attached_amount, Decimal::new(1000, 2));

        let overview: PayoutOverview = with_auth(server.get("/user/payouts"), &provider).await.json();
        assert_eq!(overview.available_balance, Decimal::new(2000, 2));
        assert_eq!(overview.requests.total_count, 1);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_transactions_are_scoped_to_caller(pool: PgPool) {
        let server = server(pool.clone());
        let provider = create_test_user(&pool, Role::User).await;
        let client = create_test_user(&pool, Role::User).await;
        let stranger = create_test_user(&pool, Role::User).await;
        {
            let mut conn = pool.acquire().await.unwrap();
            record_transaction(
                &mut conn,
                &CreditsConfig::default(),
                &ValueExchange {
                    transaction_type: TransactionType::VodUnlock,
                    amount_credits: 50,
                    provider_id: provider.id,
                    client_id: client.id,
                    listing_id: None,
                },
            )
            .await
            .unwrap();
        }

        for (user, expected) in [(&provider, 1), (&client, 1), (&stranger, 0)] {
            let page: PaginatedResponse<TransactionResponse> = with_auth(server.get("/user/transactions"), user).await.json();
            assert_eq!(page.total_count, expected);
        }
    }
}

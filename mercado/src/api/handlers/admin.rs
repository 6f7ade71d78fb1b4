//! Back-office endpoints under `/admin/*`.
//!
//! Every route here is mounted behind [`crate::auth::gate::admin_gate`], which puts the
//! authenticated admin into the request extensions.

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
};
use tracing::{info, warn};

use crate::{
    AppState,
    api::models::{
        admin::{LockThreadRequest, RejectRequest, ReportSummary},
        credits::{BalanceResponse, CreditAdjustment},
        forum::ThreadResponse,
        listings::{ListingResponse, ModerationQueueQuery},
        pagination::PaginatedResponse,
        payouts::{ListPayoutsQuery, PayoutResponse},
        users::{AdminUserUpdate, CurrentUser, ListUsersQuery, UserResponse},
    },
    db::{
        handlers::{Checkouts, Contests, Credits, Forum, Listings, Payouts, Repository, Transactions, Users, payouts::PayoutFilter, users::UserFilter},
        models::{
            contests::ContestStatus,
            credits::CreditTransactionType,
            listings::ListingStatus,
            payouts::PayoutRequestDBResponse,
            users::UserUpdateDBRequest,
        },
    },
    email::{EmailService, PayoutDecision},
    errors::{Error, Result},
    ledger,
    types::{ListingId, PayoutRequestId, ThreadId, UserId, abbrev_uuid},
};

// Users

/// Search and page through accounts
#[utoipa::path(
    get,
    path = "/admin/users",
    tag = "admin",
    params(ListUsersQuery),
    responses(
        (status = 200, description = "Users", body = PaginatedResponse<UserResponse>),
        (status = 401, description = "Not signed in"),
        (status = 403, description = "Not an admin"),
    ),
    security(("session" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn list_users(State(state): State<AppState>, Query(query): Query<ListUsersQuery>) -> Result<Json<PaginatedResponse<UserResponse>>> {
    let (skip, limit) = query.pagination.params();
    let filter = UserFilter::new(skip, limit).with_search(query.search.filter(|s| !s.trim().is_empty()));

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut users = Users::new(&mut conn);
    let page = users.list(&filter).await?;
    let total = users.count(&filter).await?;

    Ok(Json(PaginatedResponse::new(
        page.into_iter().map(UserResponse::from).collect(),
        total,
        skip,
        limit,
    )))
}

/// Change a user's role or capability flags
#[utoipa::path(
    patch,
    path = "/admin/users/{id}",
    tag = "admin",
    params(("id" = uuid::Uuid, Path, description = "User ID")),
    request_body = AdminUserUpdate,
    responses(
        (status = 200, description = "Updated user", body = UserResponse),
        (status = 400, description = "Admins cannot demote themselves"),
        (status = 404, description = "User not found"),
    ),
    security(("session" = []))
)]
#[tracing::instrument(skip_all, fields(user_id = %abbrev_uuid(&id)))]
pub async fn update_user(
    State(state): State<AppState>,
    Extension(admin): Extension<CurrentUser>,
    Path(id): Path<UserId>,
    Json(request): Json<AdminUserUpdate>,
) -> Result<Json<UserResponse>> {
    if id == admin.id && request.role.is_some_and(|role| role != admin.role) {
        return Err(Error::BadRequest {
            message: "You cannot change your own role".to_string(),
        });
    }

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let user = Users::new(&mut conn)
        .update(
            id,
            &UserUpdateDBRequest {
                role: request.role,
                is_client: request.is_client,
                is_content_creator: request.is_content_creator,
                is_service_provider: request.is_service_provider,
                ..Default::default()
            },
        )
        .await?;

    info!(admin = %abbrev_uuid(&admin.id), role = ?user.role, "User updated by admin");
    Ok(Json(UserResponse::from(user)))
}

/// Grant (positive) or remove (negative) credits
#[utoipa::path(
    post,
    path = "/admin/users/{id}/credits",
    tag = "admin",
    params(("id" = uuid::Uuid, Path, description = "User ID")),
    request_body = CreditAdjustment,
    responses(
        (status = 200, description = "New balance", body = BalanceResponse),
        (status = 400, description = "Zero amount, or removal larger than the balance"),
        (status = 404, description = "User not found"),
    ),
    security(("session" = []))
)]
#[tracing::instrument(skip_all, fields(user_id = %abbrev_uuid(&id), amount = request.amount))]
pub async fn adjust_credits(
    State(state): State<AppState>,
    Extension(admin): Extension<CurrentUser>,
    Path(id): Path<UserId>,
    Json(request): Json<CreditAdjustment>,
) -> Result<Json<BalanceResponse>> {
    if request.amount == 0 {
        return Err(Error::BadRequest {
            message: "Adjustment amount cannot be zero".to_string(),
        });
    }
    let removal = request.amount.checked_neg().ok_or_else(|| Error::BadRequest {
        message: "Adjustment amount is out of range".to_string(),
    })?;

    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;
    if Users::new(&mut tx).get_by_id(id).await?.is_none() {
        return Err(Error::NotFound {
            resource: "User".to_string(),
            id: id.to_string(),
        });
    }

    let description = request.description.or_else(|| Some(format!("Adjusted by {}", admin.username)));
    let balance = if request.amount > 0 {
        ledger::credit(&mut tx, id, request.amount, CreditTransactionType::AdminGrant, description, None).await?
    } else {
        ledger::debit(&mut tx, id, removal, CreditTransactionType::AdminRemoval, description).await?
    };
    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    info!(admin = %abbrev_uuid(&admin.id), balance, "Credits adjusted");
    Ok(Json(BalanceResponse { balance }))
}

// Listings

/// Moderation queue, oldest first
#[utoipa::path(
    get,
    path = "/admin/listings",
    tag = "admin",
    params(ModerationQueueQuery),
    responses(
        (status = 200, description = "Listings", body = PaginatedResponse<ListingResponse>),
    ),
    security(("session" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn list_listings(
    State(state): State<AppState>,
    Query(query): Query<ModerationQueueQuery>,
) -> Result<Json<PaginatedResponse<ListingResponse>>> {
    let (skip, limit) = query.pagination.params();
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut listings = Listings::new(&mut conn);

    let page = listings.list_by_status(query.status, skip, limit).await?;
    let total = listings.count_by_status(query.status).await?;

    Ok(Json(PaginatedResponse::new(
        page.into_iter().map(ListingResponse::from).collect(),
        total,
        skip,
        limit,
    )))
}

/// Move a pending listing to `status`; anything already moderated is `InvalidState`
async fn moderate_listing(state: &AppState, admin: &CurrentUser, id: ListingId, status: ListingStatus, note: Option<&str>) -> Result<ListingResponse> {
    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;
    let mut listings = Listings::new(&mut tx);

    let listing = listings.get_by_id(id).await?.ok_or_else(|| Error::NotFound {
        resource: "Listing".to_string(),
        id: id.to_string(),
    })?;
    if listing.status != ListingStatus::Pending {
        return Err(Error::InvalidState {
            message: format!("Listing was already moderated ({:?})", listing.status),
        });
    }

    let listing = listings.moderate(id, status, admin.id, note).await?;
    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    info!(listing_id = %abbrev_uuid(&id), ?status, "Listing moderated");
    Ok(ListingResponse::from(listing))
}

#[utoipa::path(
    post,
    path = "/admin/listings/{id}/approve",
    tag = "admin",
    params(("id" = uuid::Uuid, Path, description = "Listing ID")),
    responses(
        (status = 200, description = "Listing approved", body = ListingResponse),
        (status = 400, description = "Listing is not pending"),
        (status = 404, description = "Listing not found"),
    ),
    security(("session" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn approve_listing(
    State(state): State<AppState>,
    Extension(admin): Extension<CurrentUser>,
    Path(id): Path<ListingId>,
) -> Result<Json<ListingResponse>> {
    Ok(Json(moderate_listing(&state, &admin, id, ListingStatus::Approved, None).await?))
}

#[utoipa::path(
    post,
    path = "/admin/listings/{id}/reject",
    tag = "admin",
    params(("id" = uuid::Uuid, Path, description = "Listing ID")),
    request_body = RejectRequest,
    responses(
        (status = 200, description = "Listing rejected", body = ListingResponse),
        (status = 400, description = "Listing is not pending or reason missing"),
        (status = 404, description = "Listing not found"),
    ),
    security(("session" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn reject_listing(
    State(state): State<AppState>,
    Extension(admin): Extension<CurrentUser>,
    Path(id): Path<ListingId>,
    Json(request): Json<RejectRequest>,
) -> Result<Json<ListingResponse>> {
    let reason = request.reason.trim();
    if reason.is_empty() {
        return Err(Error::BadRequest {
            message: "A rejection reason is required".to_string(),
        });
    }
    Ok(Json(moderate_listing(&state, &admin, id, ListingStatus::Rejected, Some(reason)).await?))
}

// Payouts

#[utoipa::path(
    get,
    path = "/admin/payouts",
    tag = "admin",
    params(ListPayoutsQuery),
    responses(
        (status = 200, description = "Payout requests", body = PaginatedResponse<PayoutResponse>),
    ),
    security(("session" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn list_payouts(
    State(state): State<AppState>,
    Query(query): Query<ListPayoutsQuery>,
) -> Result<Json<PaginatedResponse<PayoutResponse>>> {
    let (skip, limit) = query.pagination.params();
    let filter = PayoutFilter::new(skip, limit).status(query.status);

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut payouts = Payouts::new(&mut conn);
    let page = payouts.list(&filter).await?;
    let total = payouts.count(&filter).await?;

    Ok(Json(PaginatedResponse::new(
        page.into_iter().map(PayoutResponse::from).collect(),
        total,
        skip,
        limit,
    )))
}

/// Email the provider about a decided payout. The decision is already committed, so failures
/// are only logged.
async fn notify_provider(state: &AppState, payout: &PayoutRequestDBResponse, decision: PayoutDecision<'_>) {
    let provider = match state.db.acquire().await {
        Ok(mut conn) => Users::new(&mut conn).get_by_id(payout.provider_id).await,
        Err(e) => Err(e.into()),
    };
    let provider = match provider {
        Ok(Some(user)) => user,
        Ok(None) => return,
        Err(e) => {
            warn!("Could not load payout provider: {e}");
            return;
        }
    };

    let sent = match EmailService::new(&state.config) {
        Ok(email) => {
            email
                .send_payout_decision(&provider.email, provider.display_name.as_deref(), payout.attached_amount, decision)
                .await
        }
        Err(e) => Err(e),
    };
    if let Err(e) = sent {
        warn!(payout_id = %abbrev_uuid(&payout.id), "Failed to send payout email: {e}");
    }
}

#[utoipa::path(
    post,
    path = "/admin/payouts/{id}/approve",
    tag = "admin",
    params(("id" = uuid::Uuid, Path, description = "Payout request ID")),
    responses(
        (status = 200, description = "Payout completed", body = PayoutResponse),
        (status = 400, description = "Payout already processed"),
        (status = 404, description = "Payout request not found"),
    ),
    security(("session" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn approve_payout(
    State(state): State<AppState>,
    Extension(admin): Extension<CurrentUser>,
    Path(id): Path<PayoutRequestId>,
) -> Result<Json<PayoutResponse>> {
    let payout = ledger::payouts::approve_payout(&state.db, id, admin.id).await?;
    notify_provider(&state, &payout, PayoutDecision::Approved).await;
    Ok(Json(PayoutResponse::from(payout)))
}

#[utoipa::path(
    post,
    path = "/admin/payouts/{id}/reject",
    tag = "admin",
    params(("id" = uuid::Uuid, Path, description = "Payout request ID")),
    request_body = RejectRequest,
    responses(
        (status = 200, description = "Payout rejected; its transactions return to the unpaid pool", body = PayoutResponse),
        (status = 400, description = "Payout already processed or reason missing"),
        (status = 404, description = "Payout request not found"),
    ),
    security(("session" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn reject_payout(
    State(state): State<AppState>,
    Extension(admin): Extension<CurrentUser>,
    Path(id): Path<PayoutRequestId>,
    Json(request): Json<RejectRequest>,
) -> Result<Json<PayoutResponse>> {
    let payout = ledger::payouts::reject_payout(&state.db, id, admin.id, &request.reason).await?;
    notify_provider(
        &state,
        &payout,
        PayoutDecision::Rejected {
            reason: request.reason.trim(),
        },
    )
    .await;
    Ok(Json(PayoutResponse::from(payout)))
}

// Forum

#[utoipa::path(
    post,
    path = "/admin/forum/threads/{id}/lock",
    tag = "admin",
    params(("id" = uuid::Uuid, Path, description = "Thread ID")),
    request_body = LockThreadRequest,
    responses(
        (status = 200, description = "Thread lock state updated", body = ThreadResponse),
        (status = 404, description = "Thread not found"),
    ),
    security(("session" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn lock_thread(
    State(state): State<AppState>,
    Path(id): Path<ThreadId>,
    request: Option<Json<LockThreadRequest>>,
) -> Result<Json<ThreadResponse>> {
    let locked = request.is_none_or(|Json(r)| r.locked);

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let thread = Forum::new(&mut conn).set_locked(id, locked).await?;

    Ok(Json(ThreadResponse::from(thread)))
}

// Reports

#[utoipa::path(
    get,
    path = "/admin/reports/summary",
    tag = "admin",
    responses(
        (status = 200, description = "Platform totals", body = ReportSummary),
    ),
    security(("session" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn report_summary(State(state): State<AppState>) -> Result<Json<ReportSummary>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;

    let user_count = Users::new(&mut conn).count(&UserFilter::new(0, 1)).await?;
    let outstanding_credits = Credits::new(&mut conn).outstanding_credits().await?;
    let totals = Transactions::new(&mut conn).totals().await?;
    let pending_listings = Listings::new(&mut conn).count_by_status(Some(ListingStatus::Pending)).await?;
    let open_contests = Contests::new(&mut conn).count(Some(ContestStatus::Open)).await?;
    let pending_checkouts = Checkouts::new(&mut conn).count_pending().await?;

    Ok(Json(ReportSummary {
        user_count,
        outstanding_credits,
        gross_cash: totals.gross_cash,
        platform_fees: totals.platform_fees,
        unpaid_provider_cash: totals.unpaid_cash,
        requested_provider_cash: totals.requested_cash,
        pending_listings,
        open_contests,
        pending_checkouts,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::users::{Role, RoleFlags};
    use crate::auth::gate::admin_gate;
    use crate::config::CreditsConfig;
    use crate::db::models::{
        forum::ThreadCreateDBRequest, listings::ListingCreateDBRequest, payouts::PayoutStatus, transactions::TransactionType,
        users::UserDBResponse,
    };
    use crate::ledger::{
        payouts::{PayoutInput, request_payout},
        recorder::{ValueExchange, record_transaction},
    };
    use crate::test_utils::{add_auth_headers, create_test_admin_user, create_test_config, create_test_user};
    use crate::types::Locale;
    use axum::{
        Router, middleware,
        routing::{get, patch, post},
    };
    use axum_test::{TestRequest, TestServer};
    use rust_decimal::Decimal;
    use sqlx::PgPool;

    fn server(pool: PgPool) -> TestServer {
        let state = AppState::builder().db(pool).config(create_test_config()).build();
        let app = Router::new()
            .route("/admin/users", get(list_users))
            .route("/admin/users/{id}", patch(update_user))
            .route("/admin/users/{id}/credits", post(adjust_credits))
            .route("/admin/listings", get(list_listings))
            .route("/admin/listings/{id}/approve", post(approve_listing))
            .route("/admin/listings/{id}/reject", post(reject_listing))
            .route("/admin/payouts", get(list_payouts))
            .route("/admin/payouts/{id}/approve", post(approve_payout))
            .route("/admin/payouts/{id}/reject", post(reject_payout))
            .route("/admin/forum/threads/{id}/lock", post(lock_thread))
            .route("/admin/reports/summary", get(report_summary))
            .route_layer(middleware::from_fn_with_state(state.clone(), admin_gate))
            .with_state(state);
        TestServer::new(app).unwrap()
    }

    fn with_auth(mut request: TestRequest, user: &UserDBResponse) -> TestRequest {
        for (key, value) in add_auth_headers(user) {
            request = request.add_header(key, value);
        }
        request
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_non_admins_are_refused(pool: PgPool) {
        let server = server(pool.clone());
        let user = create_test_user(&pool, Role::User).await;

        server.get("/admin/users").await.assert_status_unauthorized();
        with_auth(server.get("/admin/users"), &user).await.assert_status_forbidden();
        with_auth(server.get("/admin/reports/summary"), &user)
            .await
            .assert_status_forbidden();
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_user_management(pool: PgPool) {
        let server = server(pool.clone());
        let admin = create_test_admin_user(&pool).await;
        let user = create_test_user(&pool, Role::User).await;

        let page: PaginatedResponse<UserResponse> = with_auth(server.get(&format!("/admin/users?search={}", user.username)), &admin)
            .await
            .json();
        assert_eq!(page.total_count, 1);

        let updated: UserResponse = with_auth(server.patch(&format!("/admin/users/{}", user.id)), &admin)
            .json(&serde_json::json!({ "is_service_provider": true }))
            .await
            .json();
        assert!(updated.flags.is_service_provider);
        assert_eq!(updated.role, Role::User);

        with_auth(server.patch(&format!("/admin/users/{}", admin.id)), &admin)
            .json(&serde_json::json!({ "role": "USER" }))
            .await
            .assert_status_bad_request();
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_credit_adjustments(pool: PgPool) {
        let server = server(pool.clone());
        let admin = create_test_admin_user(&pool).await;
        let user = create_test_user(&pool, Role::User).await;
        let path = format!("/admin/users/{}/credits", user.id);

        let grant: BalanceResponse = with_auth(server.post(&path), &admin)
            .json(&serde_json::json!({ "amount": 100, "description": "Compensação" }))
            .await
            .json();
        assert_eq!(grant.balance, 100);

        let removal: BalanceResponse = with_auth(server.post(&path), &admin)
            .json(&serde_json::json!({ "amount": -40 }))
            .await
            .json();
        assert_eq!(removal.balance, 60);

        with_auth(server.post(&path), &admin)
            .json(&serde_json::json!({ "amount": -61 }))
            .await
            .assert_status_bad_request();
        with_auth(server.post(&path), &admin)
            .json(&serde_json::json!({ "amount": 0 }))
            .await
            .assert_status_bad_request();
        with_auth(server.post(&path), &admin)
            .json(&serde_json::json!({ "amount": i64::MIN }))
            .await
            .assert_status_bad_request();
        with_auth(server.post(&format!("/admin/users/{}/credits", uuid::Uuid::new_v4())), &admin)
            .json(&serde_json::json!({ "amount": 5 }))
            .await
            .assert_status_not_found();

        let mut conn = pool.acquire().await.unwrap();
        assert_eq!(Credits::new(&mut conn).balance(user.id).await.unwrap(), 60);
        let history = Credits::new(&mut conn).list_user_transactions(user.id, 0, 10).await.unwrap();
        assert_eq!(history.len(), 2);
        assert!(history.iter().any(|t| t.transaction_type == CreditTransactionType::AdminRemoval && t.amount == -40));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_listing_moderation(pool: PgPool) {
        let server = server(pool.clone());
        let admin = create_test_admin_user(&pool).await;
        let owner = create_test_user(&pool, Role::User).await;
        let mut ids = Vec::new();
        {
            let mut conn = pool.acquire().await.unwrap();
            for title in ["Casa", "Barco"] {
                let listing = Listings::new(&mut conn)
                    .create(&ListingCreateDBRequest {
                        owner_id: owner.id,
                        title: title.to_string(),
                        description: String::new(),
                        price: None,
                        category: "imoveis".to_string(),
                        locale: Locale::Pt,
                    })
                    .await
                    .unwrap();
                ids.push(listing.id);
            }
        }

        let queue: PaginatedResponse<ListingResponse> = with_auth(server.get("/admin/listings?status=PENDING"), &admin).await.json();
        assert_eq!(queue.total_count, 2);

        let approved: ListingResponse = with_auth(server.post(&format!("/admin/listings/{}/approve", ids[0])), &admin)
            .await
            .json();
        assert_eq!(approved.status, ListingStatus::Approved);
        with_auth(server.post(&format!("/admin/listings/{}/approve", ids[0])), &admin)
            .await
            .assert_status_bad_request();

        with_auth(server.post(&format!("/admin/listings/{}/reject", ids[1])), &admin)
            .json(&serde_json::json!({ "reason": " " }))
            .await
            .assert_status_bad_request();
        let rejected: ListingResponse = with_auth(server.post(&format!("/admin/listings/{}/reject", ids[1])), &admin)
            .json(&serde_json::json!({ "reason": "Fotos em falta" }))
            .await
            .json();
        assert_eq!(rejected.status, ListingStatus::Rejected);
        assert_eq!(rejected.moderation_note.as_deref(), Some("Fotos em falta"));

        let queue: PaginatedResponse<ListingResponse> = with_auth(server.get("/admin/listings?status=PENDING"), &admin).await.json();
        assert_eq!(queue.total_count, 0);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_payout_decisions_and_report(pool: PgPool) {
        let server = server(pool.clone());
        let admin = create_test_admin_user(&pool).await;
        let provider = crate::test_utils::create_test_user_with_flags(
            &pool,
            Role::User,
            RoleFlags {
                is_client: false,
                is_content_creator: true,
                is_service_provider: false,
            },
        )
        .await;
        let client = create_test_user(&pool, Role::User).await;
        {
            let mut conn = pool.acquire().await.unwrap();
            for credits in [100, 100] {
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
        let input = || PayoutInput {
            amount: Decimal::new(1000, 2),
            method: "iban".to_string(),
            details: "PT50 0000".to_string(),
        };
        let first = request_payout(&pool, provider.id, input()).await.unwrap();
        let second = request_payout(&pool, provider.id, input()).await.unwrap();

        let report: ReportSummary = with_auth(server.get("/admin/reports/summary"), &admin).await.json();
        assert_eq!(report.gross_cash, Decimal::new(2000, 2));
        assert_eq!(report.platform_fees, Decimal::new(400, 2));
        assert_eq!(report.requested_provider_cash, Decimal::new(2000, 2));
        assert_eq!(report.unpaid_provider_cash, Decimal::ZERO);

        let approved: PayoutResponse = with_auth(server.post(&format!("/admin/payouts/{}/approve", first.id)), &admin)
            .await
            .json();
        assert_eq!(approved.status, PayoutStatus::Completed);
        with_auth(server.post(&format!("/admin/payouts/{}/reject", first.id)), &admin)
            .json(&serde_json::json!({ "reason": "tarde demais" }))
            .await
            .assert_status_bad_request();

        let rejected: PayoutResponse = with_auth(server.post(&format!("/admin/payouts/{}/reject", second.id)), &admin)
            .json(&serde_json::json!({ "reason": "IBAN inválido" }))
            .await
            .json();
        assert_eq!(rejected.status, PayoutStatus::Rejected);

        let page: PaginatedResponse<PayoutResponse> = with_auth(server.get("/admin/payouts?status=REQUESTED"), &admin).await.json();
        assert_eq!(page.total_count, 0);

        let report: ReportSummary = with_auth(server.get("/admin/reports/summary"), &admin).await.json();
        assert_eq!(report.requested_provider_cash, Decimal::ZERO);
        assert_eq!(report.unpaid_provider_cash, Decimal::new(1000, 2));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_lock_thread(pool: PgPool) {
        let server = server(pool.clone());
        let admin = create_test_admin_user(&pool).await;
        let thread = {
            let mut conn = pool.acquire().await.unwrap();
            Forum::new(&mut conn)
                .create_thread(&ThreadCreateDBRequest {
                    author_id: admin.id,
                    title: "Regras".to_string(),
                    body: "Sejam simpáticos".to_string(),
                    locale: Locale::Pt,
                })
                .await
                .unwrap()
        };
        let path = format!("/admin/forum/threads/{}/lock", thread.id);

        let locked: ThreadResponse = with_auth(server.post(&path), &admin).await.json();
        assert!(locked.is_locked);

        let unlocked: ThreadResponse = with_auth(server.post(&path), &admin)
            .json(&serde_json::json!({ "locked": false }))
            .await
            .json();
        assert!(!unlocked.is_locked);

        with_auth(server.post(&format!("/admin/forum/threads/{}/lock", uuid::Uuid::new_v4())), &admin)
            .await
            .assert_status_not_found();
    }
}

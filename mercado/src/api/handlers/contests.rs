//! Contests: paid raffles with a fixed number of slots.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use rust_decimal::Decimal;

use crate::{
    AppState,
    api::{
        handlers::checkout::{payment_provider, persist_checkout, return_urls},
        models::{
            checkout::CheckoutResponse,
            contests::{ContestCreate, ContestResponse, ListContestsQuery},
            pagination::PaginatedResponse,
            users::CurrentUser,
        },
    },
    contests,
    db::{
        handlers::Contests,
        models::{
            checkouts::{CheckoutCreateDBRequest, CheckoutKind, CheckoutStatus},
            contests::{ContestCreateDBRequest, ContestStatus},
        },
    },
    errors::{Error, Result},
    payment_providers::ChargeRequest,
    types::ContestId,
};

/// List contests, newest first
#[utoipa::path(
    get,
    path = "/contests",
    tag = "contests",
    params(ListContestsQuery),
    responses(
        (status = 200, description = "Contests", body = PaginatedResponse<ContestResponse>),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn list_contests(
    State(state): State<AppState>,
    Query(query): Query<ListContestsQuery>,
) -> Result<Json<PaginatedResponse<ContestResponse>>> {
    let (skip, limit) = query.pagination.params();
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Contests::new(&mut conn);

    let contests = repo.list(query.status, skip, limit).await?;
    let total = repo.count(query.status).await?;
    let ids: Vec<ContestId> = contests.iter().map(|c| c.id).collect();
    let counts = repo.entry_counts(&ids).await?;

    let data = contests
        .into_iter()
        .map(|c| {
            let entries = counts.get(&c.id).copied().unwrap_or(0);
            ContestResponse::new(c, entries)
        })
        .collect();

    Ok(Json(PaginatedResponse::new(data, total, skip, limit)))
}

/// Get a contest with its entry count and, once resolved, the winner
#[utoipa::path(
    get,
    path = "/contests/{id}",
    tag = "contests",
    params(("id" = uuid::Uuid, Path, description = "Contest ID")),
    responses(
        (status = 200, description = "Contest", body = ContestResponse),
        (status = 404, description = "Contest not found"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn get_contest(State(state): State<AppState>, Path(id): Path<ContestId>) -> Result<Json<ContestResponse>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Contests::new(&mut conn);

    let contest = repo.get_by_id(id).await?.ok_or_else(|| Error::NotFound {
        resource: "Contest".to_string(),
        id: id.to_string(),
    })?;
    let entries = repo.count_entries(id).await?;
    let winner = match contest.status {
        ContestStatus::Resolved => repo.winner(id).await?,
        ContestStatus::Open => None,
    };

    Ok(Json(ContestResponse::new(contest, entries).with_winner(winner)))
}

/// Open a new contest; the caller becomes its creator
#[utoipa::path(
    post,
    path = "/contests",
    tag = "contests",
    request_body = ContestCreate,
    responses(
        (status = 201, description = "Contest opened", body = ContestResponse),
        (status = 400, description = "Invalid slots, price or title"),
        (status = 401, description = "Not signed in"),
    ),
    security(("session" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn create_contest(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(request): Json<ContestCreate>,
) -> Result<(StatusCode, Json<ContestResponse>)> {
    let max_slots = state.config.contests.max_slots;
    if request.total_slots < 1 || request.total_slots > max_slots {
        return Err(Error::BadRequest {
            message: format!("Total slots must be between 1 and {max_slots}"),
        });
    }
    if request.slot_price <= Decimal::ZERO {
        return Err(Error::BadRequest {
            message: "Slot price must be greater than zero".to_string(),
        });
    }
    if request.title.trim().is_empty() || request.prize.trim().is_empty() {
        return Err(Error::BadRequest {
            message: "Title and prize are required".to_string(),
        });
    }

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let contest = Contests::new(&mut conn)
        .create(&ContestCreateDBRequest {
            creator_id: current_user.id,
            title: request.title.trim().to_string(),
            description: request.description,
            prize: request.prize.trim().to_string(),
            total_slots: request.total_slots,
            slot_price: request.slot_price.round_dp(2),
        })
        .await?;

    Ok((StatusCode::CREATED, Json(ContestResponse::new(contest, 0))))
}

/// Buy a slot. The entry is only recorded once the payment is confirmed.
#[utoipa::path(
    post,
    path = "/contests/{id}/enter",
    tag = "contests",
    params(("id" = uuid::Uuid, Path, description = "Contest ID")),
    responses(
        (status = 200, description = "Checkout created for one slot", body = CheckoutResponse),
        (status = 400, description = "Contest closed, sold out, or already entered"),
        (status = 401, description = "Not signed in"),
        (status = 404, description = "Contest not found"),
        (status = 503, description = "Payment processor unavailable or not configured"),
    ),
    security(("session" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn enter_contest(
    State(state): State<AppState>,
    Path(id): Path<ContestId>,
    current_user: CurrentUser,
) -> Result<Json<CheckoutResponse>> {
    let contest = {
        let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
        contests::check_entry_allowed(&mut conn, id, current_user.id).await?
    };

    let provider = payment_provider(&state.config)?;
    let (success_url, cancel_url) = return_urls(&state.config, "contest");
    let created = provider
        .create_one_time_charge(&ChargeRequest {
            amount: contest.slot_price,
            description: format!("Contest slot: {}", contest.title),
            customer_email: current_user.email.clone(),
            success_url,
            cancel_url,
        })
        .await?;

    persist_checkout(
        &state,
        &CheckoutCreateDBRequest {
            kind: CheckoutKind::ContestEntry,
            item_key: contest.id.to_string(),
            amount: contest.slot_price,
            credits: 0,
            user_id: Some(current_user.id),
            email: current_user.email,
            listing_id: None,
            contest_id: Some(contest.id),
            payment_reference: created.payment_id.clone(),
        },
    )
    .await?;

    Ok(Json(CheckoutResponse {
        checkout_url: Some(created.checkout_url),
        payment_id: Some(created.payment_id),
        status: Some(CheckoutStatus::Pending),
        ..Default::default()
    }))
}

/// Draw the winner. Only the creator or an admin may resolve, and only once.
#[utoipa::path(
    post,
    path = "/contests/{id}/resolve",
    tag = "contests",
    params(("id" = uuid::Uuid, Path, description = "Contest ID")),
    responses(
        (status = 200, description = "Contest resolved", body = ContestResponse),
        (status = 400, description = "Already resolved or no entries"),
        (status = 401, description = "Not signed in"),
        (status = 403, description = "Caller is neither the creator nor an admin"),
        (status = 404, description = "Contest not found"),
    ),
    security(("session" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn resolve_contest(
    State(state): State<AppState>,
    Path(id): Path<ContestId>,
    current_user: CurrentUser,
) -> Result<Json<ContestResponse>> {
    let resolution = contests::resolve_contest(&state.db, id, &current_user).await?;
    contests::notify_winner(&state.db, &state.config, &resolution).await;

    let entries = {
        let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
        Contests::new(&mut conn).count_entries(id).await?
    };

    Ok(Json(
        ContestResponse::new(resolution.contest, entries).with_winner(Some(resolution.winner)),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::users::Role;
    use crate::db::{handlers::Checkouts, models::users::UserDBResponse};
    use crate::test_utils::{add_auth_headers, create_test_admin_user, create_test_config, create_test_user};
    use axum::{
        Router,
        routing::{get, post},
    };
    use axum_test::{TestRequest, TestServer};
    use sqlx::PgPool;

    fn server(pool: PgPool) -> TestServer {
        let state = AppState::builder().db(pool).config(create_test_config()).build();
        let app = Router::new()
            .route("/contests", get(list_contests).post(create_contest))
            .route("/contests/{id}", get(get_contest))
            .route("/contests/{id}/enter", post(enter_contest))
            .route("/contests/{id}/resolve", post(resolve_contest))
            .with_state(state);
        TestServer::new(app).unwrap()
    }

    fn with_auth(mut request: TestRequest, user: &UserDBResponse) -> TestRequest {
        for (key, value) in add_auth_headers(user) {
            request = request.add_header(key, value);
        }
        request
    }

    async fn open_contest(server: &TestServer, creator: &UserDBResponse, slots: i32) -> ContestResponse {
        let response = with_auth(server.post("/contests"), creator)
            .json(&serde_json::json!({
                "title": "Rifa de Natal",
                "prize": "Cabaz",
                "total_slots": slots,
                "slot_price": "2.50"
            }))
            .await;
        response.assert_status(StatusCode::CREATED);
        response.json()
    }

    async fn add_entry(pool: &PgPool, contest: ContestId, participant: &UserDBResponse) {
        let mut conn = pool.acquire().await.unwrap();
        Contests::new(&mut conn)
            .insert_entry(contest, participant.id, &format!("pay_{}", participant.id))
            .await
            .unwrap();
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_create_contest_validation(pool: PgPool) {
        let server = server(pool.clone());
        let creator = create_test_user(&pool, Role::User).await;

        for body in [
            serde_json::json!({ "title": "T", "prize": "P", "total_slots": 0, "slot_price": "1.00" }),
            serde_json::json!({ "title": "T", "prize": "P", "total_slots": 1_000_000, "slot_price": "1.00" }),
            serde_json::json!({ "title": "T", "prize": "P", "total_slots": 5, "slot_price": "0" }),
            serde_json::json!({ "title": " ", "prize": "P", "total_slots": 5, "slot_price": "1.00" }),
        ] {
            with_auth(server.post("/contests"), &creator)
                .json(&body)
                .await
                .assert_status_bad_request();
        }

        let contest = open_contest(&server, &creator, 3).await;
        assert_eq!(contest.status, ContestStatus::Open);
        assert_eq!(contest.entries_count, 0);
        assert_eq!(contest.slot_price, Decimal::new(250, 2));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_enter_creates_pending_checkout(pool: PgPool) {
        let server = server(pool.clone());
        let creator = create_test_user(&pool, Role::User).await;
        let buyer = create_test_user(&pool, Role::User).await;
        let contest = open_contest(&server, &creator, 1).await;
        let path = format!("/contests/{}/enter", contest.id);

        server.post(&path).await.assert_status_unauthorized();

        let response: CheckoutResponse = with_auth(server.post(&path), &buyer).await.json();
        let mut conn = pool.acquire().await.unwrap();
        let checkout = Checkouts::new(&mut conn)
            .get_by_reference(&response.payment_id.unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(checkout.kind, CheckoutKind::ContestEntry);
        assert_eq!(checkout.contest_id, Some(contest.id));
        assert_eq!(checkout.amount, Decimal::new(250, 2));
        drop(conn);

        // Once the only slot is paid, further attempts are refused up front
        add_entry(&pool, contest.id, &buyer).await;
        with_auth(server.post(&path), &buyer).await.assert_status_bad_request();
        let other = create_test_user(&pool, Role::User).await;
        with_auth(server.post(&path), &other).await.assert_status_bad_request();
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_resolve_once_by_creator_or_admin(pool: PgPool) {
        let server = server(pool.clone());
        let creator = create_test_user(&pool, Role::User).await;
        let stranger = create_test_user(&pool, Role::User).await;
        let admin = create_test_admin_user(&pool).await;
        let contest = open_contest(&server, &creator, 5).await;
        let path = format!("/contests/{}/resolve", contest.id);

        // No entries yet
        with_auth(server.post(&path), &creator).await.assert_status_bad_request();

        let a = create_test_user(&pool, Role::User).await;
        let b = create_test_user(&pool, Role::User).await;
        add_entry(&pool, contest.id, &a).await;
        add_entry(&pool, contest.id, &b).await;

        with_auth(server.post(&path), &stranger).await.assert_status_forbidden();

        let response = with_auth(server.post(&path), &admin).await;
        response.assert_status_ok();
        let resolved: ContestResponse = response.json();
        assert_eq!(resolved.status, ContestStatus::Resolved);
        assert_eq!(resolved.entries_count, 2);
        let winner = resolved.winner.unwrap();
        assert!(winner.is_winner);
        assert!([a.id, b.id].contains(&winner.participant_id));

        with_auth(server.post(&path), &creator).await.assert_status_bad_request();

        let fetched: ContestResponse = server.get(&format!("/contests/{}", contest.id)).await.json();
        assert_eq!(fetched.winner.unwrap().participant_id, winner.participant_id);

        let page: PaginatedResponse<ContestResponse> = server.get("/contests?status=RESOLVED").await.json();
        assert_eq!(page.total_count, 1);
        assert_eq!(page.data[0].entries_count, 2);
        let page: PaginatedResponse<ContestResponse> = server.get("/contests?status=OPEN").await.json();
        assert_eq!(page.total_count, 0);
    }
}

//! Classified listings: public catalogue, publication and owner removal.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use tracing::info;

use crate::{
    AppState,
    api::models::{
        listings::{ListListingsQuery, ListingCreate, ListingResponse},
        pagination::PaginatedResponse,
        users::CurrentUser,
    },
    auth::gate::{Client, Requires},
    db::{
        handlers::{Listings, listings::ListingFilter},
        models::{
            credits::CreditTransactionType,
            listings::{ListingCreateDBRequest, ListingStatus},
        },
    },
    errors::{Error, Result},
    ledger,
    types::{ListingId, abbrev_uuid},
};

fn listing_not_found(id: ListingId) -> Error {
    Error::NotFound {
        resource: "Listing".to_string(),
        id: id.to_string(),
    }
}

/// Approved listings, boosted first
#[utoipa::path(
    get,
    path = "/listings",
    tag = "listings",
    params(ListListingsQuery),
    responses(
        (status = 200, description = "Approved listings", body = PaginatedResponse<ListingResponse>),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn list_listings(
    State(state): State<AppState>,
    Query(query): Query<ListListingsQuery>,
) -> Result<Json<PaginatedResponse<ListingResponse>>> {
    let (skip, limit) = query.pagination.params();
    let filter = ListingFilter {
        category: query.category.filter(|c| !c.trim().is_empty()),
        locale: query.locale,
        skip,
        limit,
    };

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Listings::new(&mut conn);
    let listings = repo.list_public(&filter).await?;
    let total = repo.count_public(&filter).await?;

    Ok(Json(PaginatedResponse::new(
        listings.into_iter().map(ListingResponse::from).collect(),
        total,
        skip,
        limit,
    )))
}

/// Get a listing.
///
/// Listings that are not approved yet are only visible to their owner and to admins.
#[utoipa::path(
    get,
    path = "/listings/{id}",
    tag = "listings",
    params(("id" = uuid::Uuid, Path, description = "Listing ID")),
    responses(
        (status = 200, description = "Listing", body = ListingResponse),
        (status = 404, description = "Listing not found"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn get_listing(
    State(state): State<AppState>,
    Path(id): Path<ListingId>,
    current_user: Option<CurrentUser>,
) -> Result<Json<ListingResponse>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let listing = Listings::new(&mut conn).get_by_id(id).await?.ok_or_else(|| listing_not_found(id))?;

    let visible = listing.status == ListingStatus::Approved
        || current_user.is_some_and(|user| user.is_admin || user.id == listing.owner_id);
    if !visible {
        return Err(listing_not_found(id));
    }

    Ok(Json(ListingResponse::from(listing)))
}

/// Publish a listing for moderation.
///
/// When a listing fee is configured it is debited in the same transaction as the insert.
#[utoipa::path(
    post,
    path = "/listings",
    tag = "listings",
    request_body = ListingCreate,
    responses(
        (status = 201, description = "Listing created, pending moderation", body = ListingResponse),
        (status = 400, description = "Invalid listing or not enough credits for the fee"),
        (status = 401, description = "Not signed in"),
        (status = 403, description = "Caller does not have the client capability"),
    ),
    security(("session" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn create_listing(
    State(state): State<AppState>,
    caller: Requires<Client>,
    Json(request): Json<ListingCreate>,
) -> Result<(StatusCode, Json<ListingResponse>)> {
    let title = request.title.trim();
    let category = request.category.trim();
    if title.is_empty() || category.is_empty() {
        return Err(Error::BadRequest {
            message: "Title and category are required".to_string(),
        });
    }
    if request.price.is_some_and(|p| p.is_sign_negative()) {
        return Err(Error::BadRequest {
            message: "Price cannot be negative".to_string(),
        });
    }

    let fee = state.config.credits.listing_fee_credits;
    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;

    let listing = Listings::new(&mut tx)
        .create(&ListingCreateDBRequest {
            owner_id: caller.user.id,
            title: title.to_string(),
            description: request.description.trim().to_string(),
            price: request.price,
            category: category.to_lowercase(),
            locale: request.locale,
        })
        .await?;

    if fee > 0 {
        ledger::debit(
            &mut tx,
            caller.user.id,
            fee,
            CreditTransactionType::ListingFee,
            Some(format!("Listing fee: {}", listing.title)),
        )
        .await?;
    }

    tx.commit().await.map_err(|e| Error::Database(e.into()))?;
    info!(listing_id = %abbrev_uuid(&listing.id), fee, "Listing submitted");

    Ok((StatusCode::CREATED, Json(ListingResponse::from(listing))))
}

/// Delete one of the caller's listings
#[utoipa::path(
    delete,
    path = "/listings/{id}",
    tag = "listings",
    params(("id" = uuid::Uuid, Path, description = "Listing ID")),
    responses(
        (status = 204, description = "Listing deleted"),
        (status = 401, description = "Not signed in"),
        (status = 403, description = "Caller does not own the listing"),
        (status = 404, description = "Listing not found"),
    ),
    security(("session" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn delete_listing(State(state): State<AppState>, Path(id): Path<ListingId>, current_user: CurrentUser) -> Result<StatusCode> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Listings::new(&mut conn);

    let listing = repo.get_by_id(id).await?.ok_or_else(|| listing_not_found(id))?;
    if listing.owner_id != current_user.id && !current_user.is_admin {
        return Err(Error::InsufficientPermissions {
            action: "delete".to_string(),
            resource: "a listing owned by another user".to_string(),
        });
    }

    if !repo.delete(id).await? {
        return Err(listing_not_found(id));
    }

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::users::{Role, RoleFlags};
    use crate::db::handlers::Credits;
    use crate::db::models::users::UserDBResponse;
    use crate::test_utils::{add_auth_headers, create_test_admin_user, create_test_config, create_test_user, create_test_user_with_flags};
    use axum::{Router, routing::get};
    use axum_test::{TestRequest, TestServer};
    use sqlx::PgPool;

    fn server_with_fee(pool: PgPool, fee: i64) -> TestServer {
        let mut config = create_test_config();
        config.credits.listing_fee_credits = fee;
        let state = AppState::builder().db(pool).config(config).build();
        let app = Router::new()
            .route("/listings", get(list_listings).post(create_listing))
            .route("/listings/{id}", get(get_listing).delete(delete_listing))
            .with_state(state);
        TestServer::new(app).unwrap()
    }

    fn with_auth(mut request: TestRequest, user: &UserDBResponse) -> TestRequest {
        for (key, value) in add_auth_headers(user) {
            request = request.add_header(key, value);
        }
        request
    }

    async fn approve(pool: &PgPool, id: ListingId) {
        let admin = create_test_admin_user(pool).await;
        let mut conn = pool.acquire().await.unwrap();
        Listings::new(&mut conn)
            .moderate(id, ListingStatus::Approved, admin.id, None)
            .await
            .unwrap();
    }

    fn body(title: &str) -> serde_json::Value {
        serde_json::json!({ "title": title, "category": "Casa", "price": "45.50", "locale": "es" })
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_create_listing_is_pending_and_hidden(pool: PgPool) {
        let server = server_with_fee(pool.clone(), 0);
        let owner = create_test_user(&pool, Role::User).await;
        let stranger = create_test_user(&pool, Role::User).await;

        let response = with_auth(server.post("/listings"), &owner).json(&body("Sofá")).await;
        response.assert_status(StatusCode::CREATED);
        let listing: ListingResponse = response.json();
        assert_eq!(listing.status, ListingStatus::Pending);
        assert_eq!(listing.category, "casa");

        let page: PaginatedResponse<ListingResponse> = server.get("/listings").await.json();
        assert_eq!(page.total_count, 0);

        server.get(&format!("/listings/{}", listing.id)).await.assert_status_not_found();
        with_auth(server.get(&format!("/listings/{}", listing.id)), &stranger)
            .await
            .assert_status_not_found();
        with_auth(server.get(&format!("/listings/{}", listing.id)), &owner)
            .await
            .assert_status_ok();

        approve(&pool, listing.id).await;
        let page: PaginatedResponse<ListingResponse> = server.get("/listings?locale=es&category=casa").await.json();
        assert_eq!(page.total_count, 1);
        let page: PaginatedResponse<ListingResponse> = server.get("/listings?locale=pt").await.json();
        assert_eq!(page.total_count, 0);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_create_listing_requires_client_capability(pool: PgPool) {
        let server = server_with_fee(pool.clone(), 0);
        let creator = create_test_user_with_flags(
            &pool,
            Role::User,
            RoleFlags {
                is_client: false,
                is_content_creator: true,
                is_service_provider: false,
            },
        )
        .await;

        server.post("/listings").json(&body("Mesa")).await.assert_status_unauthorized();
        with_auth(server.post("/listings"), &creator)
            .json(&body("Mesa"))
            .await
            .assert_status_forbidden();
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_listing_fee_is_debited_atomically(pool: PgPool) {
        let server = server_with_fee(pool.clone(), 25);
        let owner = create_test_user(&pool, Role::User).await;

        // No credits: nothing is created
        with_auth(server.post("/listings"), &owner)
            .json(&body("Bicicleta"))
            .await
            .assert_status_bad_request();
        {
            let mut conn = pool.acquire().await.unwrap();
            assert_eq!(Listings::new(&mut conn).count_by_status(None).await.unwrap(), 0);
            ledger::credit(&mut conn, owner.id, 30, CreditTransactionType::AdminGrant, None, None)
                .await
                .unwrap();
        }

        with_auth(server.post("/listings"), &owner)
            .json(&body("Bicicleta"))
            .await
            .assert_status(StatusCode::CREATED);

        let mut conn = pool.acquire().await.unwrap();
        assert_eq!(Credits::new(&mut conn).balance(owner.id).await.unwrap(), 5);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_delete_listing_owner_only(pool: PgPool) {
        let server = server_with_fee(pool.clone(), 0);
        let owner = create_test_user(&pool, Role::User).await;
        let stranger = create_test_user(&pool, Role::User).await;

        let listing: ListingResponse = with_auth(server.post("/listings"), &owner).json(&body("Candeeiro")).await.json();
        let path = format!("/listings/{}", listing.id);

        with_auth(server.delete(&path), &stranger).await.assert_status_forbidden();
        with_auth(server.delete(&path), &owner).await.assert_status(StatusCode::NO_CONTENT);
        with_auth(server.delete(&path), &owner).await.assert_status_not_found();
    }
}

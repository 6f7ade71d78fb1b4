//! Wishlist of products from the external store.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};

use crate::{
    AppState,
    api::models::{
        users::CurrentUser,
        wishlist::{WishlistItemCreate, WishlistItemResponse},
    },
    commerce::CommerceClient,
    db::{errors::DbError, handlers::Wishlist},
    errors::{Error, Result},
};

/// The caller's wishlist with live price and stock.
///
/// Store fields are null when the store is not configured or a product could not be fetched.
#[utoipa::path(
    get,
    path = "/wishlist",
    tag = "wishlist",
    responses(
        (status = 200, description = "Wishlist items", body = [WishlistItemResponse]),
        (status = 401, description = "Not signed in"),
    ),
    security(("session" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn get_wishlist(State(state): State<AppState>, current_user: CurrentUser) -> Result<Json<Vec<WishlistItemResponse>>> {
    let items = {
        let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
        Wishlist::new(&mut conn).list(current_user.id).await?
    };

    let products = match CommerceClient::from_config(&state.config.commerce) {
        Some(store) if !items.is_empty() => {
            let ids: Vec<i64> = items.iter().map(|item| item.product_id).collect();
            store.products(&ids).await
        }
        _ => Default::default(),
    };

    Ok(Json(
        items
            .into_iter()
            .map(|item| {
                let product = products.get(&item.product_id);
                WishlistItemResponse::new(item, product)
            })
            .collect(),
    ))
}

/// Add a product
#[utoipa::path(
    post,
    path = "/wishlist/items",
    tag = "wishlist",
    request_body = WishlistItemCreate,
    responses(
        (status = 201, description = "Added", body = WishlistItemResponse),
        (status = 401, description = "Not signed in"),
        (status = 409, description = "Product already on the wishlist"),
    ),
    security(("session" = []))
)]
#[tracing::instrument(skip_all, fields(product_id = request.product_id))]
pub async fn add_item(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(request): Json<WishlistItemCreate>,
) -> Result<(StatusCode, Json<WishlistItemResponse>)> {
    if request.product_id <= 0 {
        return Err(Error::BadRequest {
            message: "Invalid product id".to_string(),
        });
    }
    let note = request.note.as_deref().map(str::trim).filter(|n| !n.is_empty());

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let item = match Wishlist::new(&mut conn).add(current_user.id, request.product_id, note).await {
        Ok(item) => item,
        Err(DbError::UniqueViolation { .. }) => {
            return Err(Error::Conflict {
                message: format!("Product {} is already on your wishlist", request.product_id),
            });
        }
        Err(e) => return Err(e.into()),
    };

    Ok((StatusCode::CREATED, Json(WishlistItemResponse::new(item, None))))
}

/// Remove a product
#[utoipa::path(
    delete,
    path = "/wishlist/items/{product_id}",
    tag = "wishlist",
    params(("product_id" = i64, Path, description = "Store product ID")),
    responses(
        (status = 204, description = "Removed"),
        (status = 401, description = "Not signed in"),
        (status = 404, description = "Product not on the wishlist"),
    ),
    security(("session" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn remove_item(State(state): State<AppState>, current_user: CurrentUser, Path(product_id): Path<i64>) -> Result<StatusCode> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    if !Wishlist::new(&mut conn).remove(current_user.id, product_id).await? {
        return Err(Error::NotFound {
            resource: "Wishlist item".to_string(),
            id: product_id.to_string(),
        });
    }

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::users::Role;
    use crate::config::Config;
    use crate::db::models::users::UserDBResponse;
    use crate::test_utils::{add_auth_headers, create_test_config, create_test_user};
    use axum::{
        Router,
        routing::{delete, get, post},
    };
    use axum_test::{TestRequest, TestServer};
    use rust_decimal::Decimal;
    use sqlx::PgPool;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{method, path},
    };

    fn server(pool: PgPool, config: Config) -> TestServer {
        let state = AppState::builder().db(pool).config(config).build();
        let app = Router::new()
            .route("/wishlist", get(get_wishlist))
            .route("/wishlist/items", post(add_item))
            .route("/wishlist/items/{product_id}", delete(remove_item))
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
    async fn test_add_duplicate_and_remove(pool: PgPool) {
        let server = server(pool.clone(), create_test_config());
        let user = create_test_user(&pool, Role::User).await;

        let response = with_auth(server.post("/wishlist/items"), &user)
            .json(&serde_json::json!({ "product_id": 7, "note": "prenda de anos" }))
            .await;
        response.assert_status(StatusCode::CREATED);

        with_auth(server.post("/wishlist/items"), &user)
            .json(&serde_json::json!({ "product_id": 7 }))
            .await
            .assert_status(StatusCode::CONFLICT);

        // Without a store every live field is null
        let items: Vec<WishlistItemResponse> = with_auth(server.get("/wishlist"), &user).await.json();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].note.as_deref(), Some("prenda de anos"));
        assert!(items[0].price.is_none() && items[0].in_stock.is_none());

        with_auth(server.delete("/wishlist/items/7"), &user)
            .await
            .assert_status(StatusCode::NO_CONTENT);
        with_auth(server.delete("/wishlist/items/7"), &user)
            .await
            .assert_status_not_found();
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_wishlist_enriched_from_store(pool: PgPool) {
        let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();
        let store = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/wp-json/wc/v3/products/11"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": 11,
                "name": "Azulejo",
                "price": "12.00",
                "stock_status": "instock"
            })))
            .mount(&store)
            .await;
        Mock::given(method("GET"))
            .and(path("/wp-json/wc/v3/products/12"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&store)
            .await;

        let mut config = create_test_config();
        config.commerce.base_url = Some(store.uri().parse().unwrap());
        let server = server(pool.clone(), config);
        let user = create_test_user(&pool, Role::User).await;
        for product_id in [11, 12] {
            with_auth(server.post("/wishlist/items"), &user)
                .json(&serde_json::json!({ "product_id": product_id }))
                .await
                .assert_status(StatusCode::CREATED);
        }

        let items: Vec<WishlistItemResponse> = with_auth(server.get("/wishlist"), &user).await.json();
        let azulejo = items.iter().find(|i| i.product_id == 11).unwrap();
        assert_eq!(azulejo.name.as_deref(), Some("Azulejo"));
        assert_eq!(azulejo.price, Some(Decimal::new(1200, 2)));
        assert_eq!(azulejo.in_stock, Some(true));

        let missing = items.iter().find(|i| i.product_id == 12).unwrap();
        assert!(missing.name.is_none() && missing.price.is_none());
    }
}

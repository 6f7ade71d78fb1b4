//! Credit-funded purchases.

use axum::{Json, extract::State, http::StatusCode};

use crate::{
    AppState,
    api::models::{
        purchases::{BoostPurchaseRequest, BoostPurchaseResponse, BoostResponse, VodUnlockRequest, VodUnlockResponse},
        users::CurrentUser,
    },
    db::handlers::{Boosts, Vods},
    errors::{Error, Result},
    ledger::{
        self,
        boosts::{BoostTerms, catalog_entry},
    },
};

/// Buy a boost with credits.
///
/// Price and duration come from the boost catalog; the target must belong to the caller.
#[utoipa::path(
    post,
    path = "/purchase/boost",
    tag = "purchases",
    request_body = BoostPurchaseRequest,
    responses(
        (status = 201, description = "Boost active", body = BoostPurchaseResponse),
        (status = 400, description = "Unknown boost type or not enough credits"),
        (status = 401, description = "Not signed in"),
        (status = 403, description = "Target belongs to someone else"),
        (status = 404, description = "Target not found"),
    ),
    security(("session" = []))
)]
#[tracing::instrument(skip_all, fields(boost_type = %request.boost_type))]
pub async fn purchase_boost(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(request): Json<BoostPurchaseRequest>,
) -> Result<(StatusCode, Json<BoostPurchaseResponse>)> {
    let terms = BoostTerms::from(catalog_entry(&state.config.boosts, &request.boost_type)?);

    let purchase = ledger::boosts::purchase_boost(&state.db, current_user.id, &request.boost_type, request.target.into(), terms).await?;

    Ok((
        StatusCode::CREATED,
        Json(BoostPurchaseResponse {
            boost: BoostResponse::from(purchase.boost),
            balance: purchase.balance,
        }),
    ))
}

/// Boosts bought by the caller, newest first
#[utoipa::path(
    get,
    path = "/purchase/boosts",
    tag = "purchases",
    responses(
        (status = 200, description = "Boosts bought by the caller", body = [BoostResponse]),
        (status = 401, description = "Not signed in"),
    ),
    security(("session" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn list_my_boosts(State(state): State<AppState>, current_user: CurrentUser) -> Result<Json<Vec<BoostResponse>>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let boosts = Boosts::new(&mut conn).list_purchased_by(current_user.id).await?;

    Ok(Json(boosts.into_iter().map(BoostResponse::from).collect()))
}

/// Unlock a premium video with credits
#[utoipa::path(
    post,
    path = "/purchase/vod",
    tag = "purchases",
    request_body = VodUnlockRequest,
    responses(
        (status = 201, description = "Video unlocked", body = VodUnlockResponse),
        (status = 400, description = "Already unlocked, own video, or not enough credits"),
        (status = 401, description = "Not signed in"),
        (status = 404, description = "Video not found"),
    ),
    security(("session" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn unlock_vod(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(request): Json<VodUnlockRequest>,
) -> Result<(StatusCode, Json<VodUnlockResponse>)> {
    let unlock = ledger::unlocks::unlock_vod(&state.db, &state.config.credits, current_user.id, request.vod_id).await?;

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let vod = Vods::new(&mut conn).get_by_id(unlock.vod_id).await?.ok_or_else(|| Error::NotFound {
        resource: "Video".to_string(),
        id: unlock.vod_id.to_string(),
    })?;

    Ok((
        StatusCode::CREATED,
        Json(VodUnlockResponse {
            vod_id: unlock.vod_id,
            transaction_id: unlock.transaction.id,
            balance: unlock.balance,
            media_url: vod.media_url,
        }),
    ))
}

//! Premium videos. The media URL is withheld unless the caller owns or has unlocked the video.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};

use crate::{
    AppState,
    api::models::{
        pagination::{PaginatedResponse, Pagination},
        users::CurrentUser,
        vods::{VodCreate, VodResponse},
    },
    auth::gate::{ContentCreator, Requires},
    db::{handlers::Vods, models::vods::VodCreateDBRequest},
    errors::{Error, Result},
    types::VodId,
};

/// List premium videos, newest first
#[utoipa::path(
    get,
    path = "/vods",
    tag = "vods",
    params(Pagination),
    responses(
        (status = 200, description = "Premium videos", body = PaginatedResponse<VodResponse>),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn list_vods(
    State(state): State<AppState>,
    Query(pagination): Query<Pagination>,
    current_user: Option<CurrentUser>,
) -> Result<Json<PaginatedResponse<VodResponse>>> {
    let (skip, limit) = pagination.params();
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Vods::new(&mut conn);

    let vods = repo.list(skip, limit).await?;
    let total = repo.count().await?;

    let mut data = Vec::with_capacity(vods.len());
    for vod in vods {
        let unlocked = match &current_user {
            Some(user) if user.id == vod.owner_id => true,
            Some(user) => repo.is_unlocked(vod.id, user.id).await?,
            None => false,
        };
        data.push(VodResponse::new(vod, unlocked));
    }

    Ok(Json(PaginatedResponse::new(data, total, skip, limit)))
}

/// Get a premium video
#[utoipa::path(
    get,
    path = "/vods/{id}",
    tag = "vods",
    params(("id" = uuid::Uuid, Path, description = "Video ID")),
    responses(
        (status = 200, description = "Premium video; media_url only for the owner or unlockers", body = VodResponse),
        (status = 404, description = "Video not found"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn get_vod(State(state): State<AppState>, Path(id): Path<VodId>, current_user: Option<CurrentUser>) -> Result<Json<VodResponse>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Vods::new(&mut conn);

    let vod = repo.get_by_id(id).await?.ok_or_else(|| Error::NotFound {
        resource: "Video".to_string(),
        id: id.to_string(),
    })?;

    let unlocked = match current_user {
        Some(user) if user.id == vod.owner_id => true,
        Some(user) => repo.is_unlocked(id, user.id).await?,
        None => false,
    };

    Ok(Json(VodResponse::new(vod, unlocked)))
}

/// Publish a premium video
#[utoipa::path(
    post,
    path = "/vods",
    tag = "vods",
    request_body = VodCreate,
    responses(
        (status = 201, description = "Video published", body = VodResponse),
        (status = 400, description = "Invalid video"),
        (status = 401, description = "Not signed in"),
        (status = 403, description = "Caller is not a content creator"),
    ),
    security(("session" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn create_vod(
    State(state): State<AppState>,
    caller: Requires<ContentCreator>,
    Json(request): Json<VodCreate>,
) -> Result<(StatusCode, Json<VodResponse>)> {
    if request.title.trim().is_empty() {
        return Err(Error::BadRequest {
            message: "Title is required".to_string(),
        });
    }
    if request.price_credits <= 0 {
        return Err(Error::BadRequest {
            message: "Price must be a positive number of credits".to_string(),
        });
    }
    if url::Url::parse(&request.media_url).is_err() {
        return Err(Error::BadRequest {
            message: "Media URL must be an absolute URL".to_string(),
        });
    }

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let vod = Vods::new(&mut conn)
        .create(&VodCreateDBRequest {
            owner_id: caller.user.id,
            title: request.title.trim().to_string(),
            description: request.description,
            price_credits: request.price_credits,
            media_url: request.media_url,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(VodResponse::new(vod, true))))
}

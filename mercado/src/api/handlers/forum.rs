use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};

use crate::{
    AppState,
    api::models::{
        forum::{ListThreadsQuery, PostCreate, PostResponse, ThreadCreate, ThreadDetailResponse, ThreadResponse},
        pagination::PaginatedResponse,
        users::CurrentUser,
    },
    db::{errors::DbError, handlers::Forum, models::forum::ThreadCreateDBRequest},
    errors::{Error, Result},
    types::ThreadId,
};

fn thread_not_found(id: ThreadId) -> Error {
    Error::NotFound {
        resource: "Thread".to_string(),
        id: id.to_string(),
    }
}

/// Threads ordered by latest activity
#[utoipa::path(
    get,
    path = "/forum/threads",
    tag = "forum",
    params(ListThreadsQuery),
    responses(
        (status = 200, description = "Threads", body = PaginatedResponse<ThreadResponse>),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn list_threads(
    State(state): State<AppState>,
    Query(query): Query<ListThreadsQuery>,
) -> Result<Json<PaginatedResponse<ThreadResponse>>> {
    let (skip, limit) = query.pagination.params();
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut forum = Forum::new(&mut conn);

    let threads = forum.list_threads(query.locale, skip, limit).await?;
    let total = forum.count_threads(query.locale).await?;

    Ok(Json(PaginatedResponse::new(
        threads.into_iter().map(ThreadResponse::from).collect(),
        total,
        skip,
        limit,
    )))
}

/// A thread and its replies
#[utoipa::path(
    get,
    path = "/forum/threads/{id}",
    tag = "forum",
    params(("id" = uuid::Uuid, Path, description = "Thread ID")),
    responses(
        (status = 200, description = "Thread with posts", body = ThreadDetailResponse),
        (status = 404, description = "Thread not found"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn get_thread(State(state): State<AppState>, Path(id): Path<ThreadId>) -> Result<Json<ThreadDetailResponse>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut forum = Forum::new(&mut conn);

    let thread = forum.get_thread(id).await?.ok_or_else(|| thread_not_found(id))?;
    let posts = forum.list_posts(id).await?;

    Ok(Json(ThreadDetailResponse {
        thread: ThreadResponse::from(thread),
        posts: posts.into_iter().map(PostResponse::from).collect(),
    }))
}

/// Start a thread
#[utoipa::path(
    post,
    path = "/forum/threads",
    tag = "forum",
    request_body = ThreadCreate,
    responses(
        (status = 201, description = "Thread created", body = ThreadResponse),
        (status = 400, description = "Title or body missing"),
        (status = 401, description = "Not signed in"),
    ),
    security(("session" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn create_thread(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(request): Json<ThreadCreate>,
) -> Result<(StatusCode, Json<ThreadResponse>)> {
    if request.title.trim().is_empty() || request.body.trim().is_empty() {
        return Err(Error::BadRequest {
            message: "Title and body are required".to_string(),
        });
    }

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let thread = Forum::new(&mut conn)
        .create_thread(&ThreadCreateDBRequest {
            author_id: current_user.id,
            title: request.title.trim().to_string(),
            body: request.body,
            locale: request.locale,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(ThreadResponse::from(thread))))
}

/// Reply to a thread
#[utoipa::path(
    post,
    path = "/forum/posts",
    tag = "forum",
    request_body = PostCreate,
    responses(
        (status = 201, description = "Reply posted", body = PostResponse),
        (status = 400, description = "Empty body or locked thread"),
        (status = 401, description = "Not signed in"),
        (status = 404, description = "Thread not found"),
    ),
    security(("session" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn create_post(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(request): Json<PostCreate>,
) -> Result<(StatusCode, Json<PostResponse>)> {
    if request.body.trim().is_empty() {
        return Err(Error::BadRequest {
            message: "Reply cannot be empty".to_string(),
        });
    }

    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;
    let post = match Forum::new(&mut tx).create_post(request.thread_id, current_user.id, &request.body).await {
        Ok(post) => post,
        Err(DbError::NotFound) => {
            return match Forum::new(&mut tx).get_thread(request.thread_id).await? {
                Some(_) => Err(Error::InvalidState {
                    message: "Thread is locked".to_string(),
                }),
                None => Err(thread_not_found(request.thread_id)),
            };
        }
        Err(e) => return Err(e.into()),
    };
    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    Ok((StatusCode::CREATED, Json(PostResponse::from(post))))
}

use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
};

use crate::{
    AppState,
    api::models::{
        blog_posts::{BlogPostCreate, BlogPostResponse},
        pagination::{PaginatedResponse, Pagination},
        users::CurrentUser,
    },
    db::{handlers::BlogPosts, models::blog_posts::BlogPostCreateDBRequest},
    errors::{Error, Result},
};

/// List blog posts, newest first
#[utoipa::path(
    get,
    path = "/blog-posts",
    tag = "blog",
    params(Pagination),
    responses(
        (status = 200, description = "Blog posts", body = PaginatedResponse<BlogPostResponse>),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn list_blog_posts(
    State(state): State<AppState>,
    Query(pagination): Query<Pagination>,
) -> Result<Json<PaginatedResponse<BlogPostResponse>>> {
    let (skip, limit) = pagination.params();
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = BlogPosts::new(&mut conn);

    let posts = repo.list(skip, limit).await?;
    let total = repo.count().await?;

    Ok(Json(PaginatedResponse::new(
        posts.into_iter().map(BlogPostResponse::from).collect(),
        total,
        skip,
        limit,
    )))
}

/// Publish a blog post
#[utoipa::path(
    post,
    path = "/blog-posts",
    tag = "blog",
    request_body = BlogPostCreate,
    responses(
        (status = 201, description = "Blog post created", body = BlogPostResponse),
        (status = 400, description = "Title or body missing"),
        (status = 401, description = "Not signed in"),
    ),
    security(("session" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn create_blog_post(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(request): Json<BlogPostCreate>,
) -> Result<(StatusCode, Json<BlogPostResponse>)> {
    if request.title.trim().is_empty() || request.body.trim().is_empty() {
        return Err(Error::BadRequest {
            message: "Title and body are required".to_string(),
        });
    }

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let post = BlogPosts::new(&mut conn)
        .create(&BlogPostCreateDBRequest {
            owner_id: current_user.id,
            title: request.title.trim().to_string(),
            body: request.body,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(BlogPostResponse::from(post))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::users::Role;
    use crate::test_utils::{add_auth_headers, create_test_config, create_test_user};
    use axum::{Router, routing::get};
    use axum_test::TestServer;
    use sqlx::PgPool;

    #[sqlx::test]
    #[test_log::test]
    async fn test_create_and_list_blog_posts(pool: PgPool) {
        let state = AppState::builder().db(pool.clone()).config(create_test_config()).build();
        let app = Router::new()
            .route("/blog-posts", get(list_blog_posts).post(create_blog_post))
            .with_state(state);
        let server = TestServer::new(app).unwrap();
        let user = create_test_user(&pool, Role::User).await;

        server
            .post("/blog-posts")
            .json(&serde_json::json!({ "title": "Olá", "body": "Primeiro post" }))
            .await
            .assert_status_unauthorized();

        let mut request = server.post("/blog-posts");
        for (key, value) in add_auth_headers(&user) {
            request = request.add_header(key, value);
        }
        let response = request.json(&serde_json::json!({ "title": "Olá", "body": "Primeiro post" })).await;
        response.assert_status(StatusCode::CREATED);
        let post: BlogPostResponse = response.json();
        assert_eq!(post.owner_id, user.id);

        let page: PaginatedResponse<BlogPostResponse> = server.get("/blog-posts").await.json();
        assert_eq!(page.total_count, 1);
        assert_eq!(page.data[0].title, "Olá");
    }
}

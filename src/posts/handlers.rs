use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Router,
};
use time::OffsetDateTime;
use tracing::instrument;
use uuid::Uuid;

use super::{
    dto::{CreateCommentRequest, CreatePostRequest, Pagination, PostWithComments},
    repo_types::{Comment, Post},
    services,
};
use crate::{
    auth::extractors::AuthUser,
    error::ApiError,
    extract::{Json, Path, Query},
    state::AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/posts", get(list_posts).post(create_post))
        .route("/comments/:post_id", post(create_comment))
}

#[instrument(skip(state))]
pub async fn list_posts(
    State(state): State<AppState>,
    Query(p): Query<Pagination>,
) -> Result<Json<Vec<PostWithComments>>, ApiError> {
    let (limit, offset) = p.clamped();
    let posts = services::list_with_comments(&state, limit, offset).await?;
    Ok(Json(posts))
}

#[instrument(skip(state, session, body), fields(username = %session.username))]
pub async fn create_post(
    State(state): State<AppState>,
    AuthUser(session): AuthUser,
    Json(body): Json<CreatePostRequest>,
) -> Result<(StatusCode, Json<Post>), ApiError> {
    let post = services::create_post(
        &state,
        &session.username,
        &body.content,
        OffsetDateTime::now_utc(),
    )
    .await?;
    Ok((StatusCode::CREATED, Json(post)))
}

#[instrument(skip(state, session, body), fields(username = %session.username))]
pub async fn create_comment(
    State(state): State<AppState>,
    AuthUser(session): AuthUser,
    Path(post_id): Path<String>,
    Json(body): Json<CreateCommentRequest>,
) -> Result<(StatusCode, Json<Comment>), ApiError> {
    let post_id = Uuid::parse_str(&post_id)
        .map_err(|_| ApiError::Validation("Invalid post ID".into()))?;
    let comment = services::create_comment(
        &state,
        &session.username,
        post_id,
        &body.content,
        OffsetDateTime::now_utc(),
    )
    .await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

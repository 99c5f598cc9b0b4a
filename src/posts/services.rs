use std::collections::HashMap;

use time::OffsetDateTime;
use tracing::info;
use uuid::Uuid;

use super::{
    dto::PostWithComments,
    repo_types::{Comment, Post},
};
use crate::{auth::services::current_user, error::ApiError, state::AppState};

const MAX_CONTENT_CHARS: usize = 10_000;

fn validate_content(content: &str) -> Result<&str, ApiError> {
    let content = content.trim();
    if content.is_empty() {
        return Err(ApiError::Validation("Content is required".into()));
    }
    if content.chars().count() > MAX_CONTENT_CHARS {
        return Err(ApiError::Validation("Content is too long".into()));
    }
    Ok(content)
}

pub async fn list_with_comments(
    state: &AppState,
    limit: i64,
    offset: i64,
) -> Result<Vec<PostWithComments>, ApiError> {
    let posts = state.posts.list_posts(limit, offset).await?;
    let ids: Vec<Uuid> = posts.iter().map(|p| p.id).collect();

    let mut by_post: HashMap<Uuid, Vec<Comment>> = HashMap::new();
    for c in state.posts.list_comments(&ids).await? {
        by_post.entry(c.post_id).or_default().push(c);
    }

    Ok(posts
        .into_iter()
        .map(|post| PostWithComments {
            comments: by_post.remove(&post.id).unwrap_or_default(),
            post,
        })
        .collect())
}

/// The author is always the session's user, never something from the body.
pub async fn create_post(
    state: &AppState,
    username: &str,
    content: &str,
    now: OffsetDateTime,
) -> Result<Post, ApiError> {
    let content = validate_content(content)?;
    let author = current_user(state, username).await?;
    let post = state.posts.create_post(author.id, content, now).await?;
    info!(post_id = %post.id, user_id = %author.id, "post created");
    Ok(post)
}

pub async fn create_comment(
    state: &AppState,
    username: &str,
    post_id: Uuid,
    content: &str,
    now: OffsetDateTime,
) -> Result<Comment, ApiError> {
    let content = validate_content(content)?;
    let author = current_user(state, username).await?;
    let comment = state
        .posts
        .create_comment(post_id, author.id, content, now)
        .await?
        .ok_or(ApiError::NotFound("Post"))?;
    info!(comment_id = %comment.id, %post_id, user_id = %author.id, "comment created");
    Ok(comment)
}

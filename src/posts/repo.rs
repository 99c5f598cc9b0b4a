use async_trait::async_trait;
use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use super::repo_types::{Comment, Post};
use crate::auth::repo::StoreError;

#[async_trait]
pub trait PostStore: Send + Sync {
    /// Newest first.
    async fn list_posts(&self, limit: i64, offset: i64) -> Result<Vec<Post>, StoreError>;
    /// Oldest first, for all of `post_ids`.
    async fn list_comments(&self, post_ids: &[Uuid]) -> Result<Vec<Comment>, StoreError>;
    async fn create_post(
        &self,
        user_id: Uuid,
        content: &str,
        now: OffsetDateTime,
    ) -> Result<Post, StoreError>;
    /// `None` when the post does not exist.
    async fn create_comment(
        &self,
        post_id: Uuid,
        user_id: Uuid,
        content: &str,
        now: OffsetDateTime,
    ) -> Result<Option<Comment>, StoreError>;
}

#[derive(Clone)]
pub struct PgPostStore {
    db: PgPool,
}

impl PgPostStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl PostStore for PgPostStore {
    async fn list_posts(&self, limit: i64, offset: i64) -> Result<Vec<Post>, StoreError> {
        let rows = sqlx::query_as::<_, Post>(
            r#"
            SELECT id, user_id, content, date_posted
              FROM posts
             ORDER BY date_posted DESC
             LIMIT $1 OFFSET $2
            "#,
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }

    async fn list_comments(&self, post_ids: &[Uuid]) -> Result<Vec<Comment>, StoreError> {
        if post_ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows = sqlx::query_as::<_, Comment>(
            r#"
            SELECT id, post_id, user_id, content, date_posted
              FROM comments
             WHERE post_id = ANY($1)
             ORDER BY date_posted ASC
            "#,
        )
        .bind(post_ids)
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }

    async fn create_post(
        &self,
        user_id: Uuid,
        content: &str,
        now: OffsetDateTime,
    ) -> Result<Post, StoreError> {
        let post = sqlx::query_as::<_, Post>(
            r#"
            INSERT INTO posts (user_id, content, date_posted)
            VALUES ($1, $2, $3)
            RETURNING id, user_id, content, date_posted
            "#,
        )
        .bind(user_id)
        .bind(content)
        .bind(now)
        .fetch_one(&self.db)
        .await?;
        Ok(post)
    }

    async fn create_comment(
        &self,
        post_id: Uuid,
        user_id: Uuid,
        content: &str,
        now: OffsetDateTime,
    ) -> Result<Option<Comment>, StoreError> {
        // Inserting via SELECT yields no row for an unknown post.
        let comment = sqlx::query_as::<_, Comment>(
            r#"
            INSERT INTO comments (post_id, user_id, content, date_posted)
            SELECT p.id, $2, $3, $4
              FROM posts p
             WHERE p.id = $1
            RETURNING id, post_id, user_id, content, date_posted
            "#,
        )
        .bind(post_id)
        .bind(user_id)
        .bind(content)
        .bind(now)
        .fetch_optional(&self.db)
        .await?;
        Ok(comment)
    }
}

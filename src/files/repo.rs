use async_trait::async_trait;
use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use super::repo_types::StoredFile;
use crate::auth::repo::StoreError;

#[async_trait]
pub trait FileStore: Send + Sync {
    async fn insert(
        &self,
        id: Uuid,
        user_id: Uuid,
        filename: &str,
        path: &str,
        now: OffsetDateTime,
    ) -> Result<StoredFile, StoreError>;
}

#[derive(Clone)]
pub struct PgFileStore {
    db: PgPool,
}

impl PgFileStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl FileStore for PgFileStore {
    async fn insert(
        &self,
        id: Uuid,
        user_id: Uuid,
        filename: &str,
        path: &str,
        now: OffsetDateTime,
    ) -> Result<StoredFile, StoreError> {
        let file = sqlx::query_as::<_, StoredFile>(
            r#"
            INSERT INTO files (id, user_id, filename, path, upload_date)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, user_id, filename, path, upload_date
            "#,
        )
        .bind(id)
        .bind(user_id)
        .bind(filename)
        .bind(path)
        .bind(now)
        .fetch_one(&self.db)
        .await?;
        Ok(file)
    }
}

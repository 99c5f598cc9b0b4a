use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// Metadata of an uploaded file; the bytes live in object storage.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct StoredFile {
    pub id: Uuid,
    pub user_id: Uuid,
    pub filename: String,
    pub path: String, // object storage key
    #[serde(with = "time::serde::rfc3339")]
    pub upload_date: OffsetDateTime,
}

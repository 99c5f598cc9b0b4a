use bytes::Bytes;
use serde::Serialize;
use time::OffsetDateTime;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::repo_types::StoredFile;
use crate::{auth::services::current_user, error::ApiError, state::AppState};

/// Lifetime of the download link returned after an upload.
const DOWNLOAD_URL_TTL_SECS: u64 = 30 * 60;
const MAX_FILENAME_CHARS: usize = 100;

#[derive(Debug, Serialize)]
pub struct UploadedFile {
    #[serde(flatten)]
    pub file: StoredFile,
    /// Absent when the download link could not be signed.
    pub url: Option<String>,
}

pub struct UploadItem<'a> {
    pub filename: &'a str,
    pub content_type: &'a str,
    pub body: Bytes,
}

/// Keeps `[A-Za-z0-9._-]`, replaces anything else and never starts with a dot.
pub fn sanitize_filename(name: &str) -> String {
    // Browsers on some platforms send the full client path.
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let cleaned: String = base
        .chars()
        .map(|c| match c {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '.' | '_' | '-' => c,
            _ => '_',
        })
        .take(MAX_FILENAME_CHARS)
        .collect();
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "file".to_string()
    } else {
        cleaned.to_string()
    }
}

fn object_key(user_id: Uuid, file_id: Uuid, filename: &str) -> String {
    format!("uploads/{}/{}-{}", user_id, file_id, filename)
}

pub async fn upload(
    state: &AppState,
    username: &str,
    item: UploadItem<'_>,
    now: OffsetDateTime,
) -> Result<UploadedFile, ApiError> {
    let owner = current_user(state, username).await?;
    let filename = sanitize_filename(item.filename);
    let id = Uuid::new_v4();
    let key = object_key(owner.id, id, &filename);

    state
        .storage
        .put_object(&key, item.body, item.content_type)
        .await
        .map_err(ApiError::Storage)?;

    let file = match state.files.insert(id, owner.id, &filename, &key, now).await {
        Ok(f) => f,
        Err(e) => {
            if let Err(cleanup) = state.storage.delete_object(&key).await {
                error!(error = %cleanup, %key, "failed to remove orphaned object");
            }
            return Err(e.into());
        }
    };

    // The upload is already durable; a missing link is not worth failing it.
    let url = match state.storage.presign_get(&key, DOWNLOAD_URL_TTL_SECS).await {
        Ok(url) => Some(url),
        Err(e) => {
            warn!(error = %e, %key, "failed to presign download url");
            None
        }
    };

    info!(file_id = %file.id, user_id = %owner.id, %key, "file uploaded");
    Ok(UploadedFile { file, url })
}

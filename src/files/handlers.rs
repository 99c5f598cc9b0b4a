use axum::{
    extract::{multipart::MultipartRejection, DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    routing::post,
    Router,
};
use time::OffsetDateTime;
use tracing::{instrument, warn};

use super::services::{self, UploadItem, UploadedFile};
use crate::{auth::extractors::AuthUser, error::ApiError, extract::Json, state::AppState};

pub fn routes(max_bytes: usize) -> Router<AppState> {
    Router::new()
        .route("/files", post(upload_file))
        .layer(DefaultBodyLimit::max(max_bytes))
}

/// POST /files (multipart), single field `file`.
#[instrument(skip(state, session, mp), fields(username = %session.username))]
pub async fn upload_file(
    State(state): State<AppState>,
    AuthUser(session): AuthUser,
    mp: Result<Multipart, MultipartRejection>,
) -> Result<(StatusCode, Json<UploadedFile>), ApiError> {
    let invalid = || ApiError::Validation("Invalid file".into());
    let mut mp = mp.map_err(|e| {
        warn!(error = %e, "not a multipart body");
        invalid()
    })?;

    while let Some(field) = mp.next_field().await.map_err(|e| {
        warn!(error = %e, "unreadable multipart body");
        invalid()
    })? {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field.file_name().unwrap_or("file").to_string();
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let body = field.bytes().await.map_err(|e| {
            warn!(error = %e, "failed to read upload");
            invalid()
        })?;

        let item = UploadItem {
            filename: &filename,
            content_type: &content_type,
            body,
        };
        let uploaded =
            services::upload(&state, &session.username, item, OffsetDateTime::now_utc()).await?;
        return Ok((StatusCode::CREATED, Json(uploaded)));
    }

    Err(invalid())
}

use axum::{
    async_trait,
    extract::{rejection::JsonRejection, FromRequest, FromRequestParts, Request},
    http::request::Parts,
    response::{IntoResponse, Response},
};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::ApiError;

/// [`axum::Json`] whose rejection is rendered in the API error shape.
pub struct Json<T>(pub T);

impl<T> IntoResponse for Json<T>
where
    T: serde::Serialize,
{
    fn into_response(self) -> Response {
        axum::Json(self.0).into_response()
    }
}

#[async_trait]
impl<T, S> FromRequest<S> for Json<T>
where
    T: serde::de::DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match axum::Json::<T>::from_request(req, state).await {
            Ok(axum::Json(inner)) => Ok(Json(inner)),
            Err(rejection) => {
                let reason = match &rejection {
                    JsonRejection::JsonDataError(e) => e.body_text(),
                    JsonRejection::JsonSyntaxError(e) => e.body_text(),
                    JsonRejection::MissingJsonContentType(_) => "missing json content type".into(),
                    other => other.body_text(),
                };
                debug!(%reason, "rejected request body");
                Err(ApiError::invalid_payload())
            }
        }
    }
}

/// [`axum::extract::Path`] rejecting with `400 {"error": "Invalid path parameter"}`.
pub struct Path<T>(pub T);

#[async_trait]
impl<T, S> FromRequestParts<S> for Path<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match axum::extract::Path::<T>::from_request_parts(parts, state).await {
            Ok(axum::extract::Path(inner)) => Ok(Path(inner)),
            Err(rejection) => {
                debug!(reason = %rejection.body_text(), "rejected path parameter");
                Err(ApiError::Validation("Invalid path parameter".into()))
            }
        }
    }
}

/// [`axum::extract::Query`] rejecting with `400 {"error": "Invalid query parameters"}`.
pub struct Query<T>(pub T);

#[async_trait]
impl<T, S> FromRequestParts<S> for Query<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match axum::extract::Query::<T>::from_request_parts(parts, state).await {
            Ok(axum::extract::Query(inner)) => Ok(Query(inner)),
            Err(rejection) => {
                debug!(reason = %rejection.body_text(), "rejected query string");
                Err(ApiError::Validation("Invalid query parameters".into()))
            }
        }
    }
}

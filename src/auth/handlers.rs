use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Router,
};
use time::OffsetDateTime;
use tracing::instrument;

use crate::{
    auth::{
        dto::{
            CheckInResponse, ForgotPasswordRequest, LoginRequest, MessageResponse,
            RegisterRequest, ResetPasswordRequest, TokenResponse, UpgradeRequest,
            UpgradeResponse,
        },
        extractors::AuthUser,
        repo_types::User,
        reset, services,
    },
    error::ApiError,
    extract::{Json, Path},
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/forgot-password", post(forgot_password))
        .route("/reset-password/:token", post(reset_password))
}

pub fn progression_routes() -> Router<AppState> {
    Router::new()
        .route("/check-in", post(check_in))
        .route("/upgrade", post(upgrade))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/me", get(get_me))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<User>), ApiError> {
    let user = services::register(&state, payload).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    let token = services::login(&state, payload, OffsetDateTime::now_utc()).await?;
    Ok(Json(TokenResponse { token }))
}

#[instrument(skip(state, payload))]
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(payload): Json<ForgotPasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    reset::request_reset(&state, &payload.email, OffsetDateTime::now_utc()).await?;
    Ok(Json(MessageResponse {
        message: "Password reset email sent",
    }))
}

#[instrument(skip(state, token, payload))]
pub async fn reset_password(
    State(state): State<AppState>,
    Path(token): Path<String>,
    Json(payload): Json<ResetPasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    reset::complete_reset(&state, &token, payload.password, OffsetDateTime::now_utc()).await?;
    Ok(Json(MessageResponse {
        message: "Password reset successfully",
    }))
}

#[instrument(skip(state, session), fields(username = %session.username))]
pub async fn check_in(
    State(state): State<AppState>,
    AuthUser(session): AuthUser,
) -> Result<Json<CheckInResponse>, ApiError> {
    let user = services::check_in(&state, &session.username, OffsetDateTime::now_utc()).await?;
    Ok(Json(CheckInResponse {
        points: user.points,
    }))
}

#[instrument(skip(state, session, payload), fields(username = %session.username))]
pub async fn upgrade(
    State(state): State<AppState>,
    AuthUser(session): AuthUser,
    Json(payload): Json<UpgradeRequest>,
) -> Result<Json<UpgradeResponse>, ApiError> {
    let user = services::upgrade(&state, &session.username, payload.points).await?;
    Ok(Json(UpgradeResponse {
        level: user.level,
        points: user.points,
    }))
}

#[instrument(skip(state, session), fields(username = %session.username))]
pub async fn get_me(
    State(state): State<AppState>,
    AuthUser(session): AuthUser,
) -> Result<Json<User>, ApiError> {
    let user = services::current_user(&state, &session.username).await?;
    Ok(Json(user))
}

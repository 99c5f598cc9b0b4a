use rand::{rngs::OsRng, RngCore};
use time::{Duration, OffsetDateTime};
use tracing::{debug, info, warn};

use crate::{
    auth::{password::hash_password_async, services::normalize_email, services::update_user},
    error::ApiError,
    state::AppState,
};

/// 256 bits of randomness, hex encoded.
const RESET_TOKEN_BYTES: usize = 32;

pub fn generate_reset_token() -> String {
    let mut buf = [0u8; RESET_TOKEN_BYTES];
    OsRng.fill_bytes(&mut buf);
    hex::encode(buf)
}

/// Stores a fresh reset token on the account owning `email` and hands it to
/// the notifier. Any previously pending token is replaced.
pub async fn request_reset(
    state: &AppState,
    email: &str,
    now: OffsetDateTime,
) -> Result<(), ApiError> {
    let email = normalize_email(email);
    let token = generate_reset_token();
    let expiry = now + Duration::minutes(state.config.reset_token_ttl_minutes);

    let users = state.users.as_ref();
    let lookup = email.as_str();
    let user = update_user(
        users,
        move || async move { users.find_by_email(lookup).await?.ok_or(ApiError::EmailNotFound) },
        |u| {
            if u.has_pending_reset() {
                debug!(user_id = %u.id, "replacing pending reset token");
            }
            u.set_reset_token(token.clone(), expiry);
            Ok(())
        },
    )
    .await?;

    info!(user_id = %user.id, "password reset requested");
    if let Err(e) = state.notifier.send_reset(&user.email, &token).await {
        warn!(user_id = %user.id, error = %e, "failed to deliver reset token");
    }
    Ok(())
}

/// Consumes `token` and replaces the password. The token is cleared in the
/// same save, so of two concurrent calls only the first can succeed.
pub async fn complete_reset(
    state: &AppState,
    token: &str,
    new_password: String,
    now: OffsetDateTime,
) -> Result<(), ApiError> {
    if new_password.is_empty() {
        return Err(ApiError::Validation("Password is required".into()));
    }

    let users = state.users.as_ref();
    if users.find_by_reset_token(token, now).await?.is_none() {
        return Err(ApiError::InvalidOrExpiredToken);
    }

    let password_hash = hash_password_async(new_password).await?;
    let user = update_user(
        users,
        move || async move {
            users
                .find_by_reset_token(token, now)
                .await?
                .ok_or(ApiError::InvalidOrExpiredToken)
        },
        |u| {
            u.password_hash = password_hash.clone();
            u.clear_reset_token();
            Ok(())
        },
    )
    .await?;

    info!(user_id = %user.id, "password reset completed");
    Ok(())
}

use std::future::Future;

use lazy_static::lazy_static;
use regex::Regex;
use time::OffsetDateTime;
use tracing::{debug, info, warn};

use crate::{
    auth::{
        dto::{LoginRequest, RegisterRequest},
        password::{hash_password_async, verify_dummy_async, verify_password_async},
        progression,
        repo::{StoreError, UserStore},
        repo_types::{NewUser, User},
    },
    error::ApiError,
    state::AppState,
};

/// How many times a read-modify-save is replayed after losing a race.
pub(crate) const MAX_SAVE_ATTEMPTS: usize = 5;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Loads a user, applies `mutate` and saves it, starting over from a fresh
/// read whenever the store reports the record changed underneath us.
/// `mutate` must leave the user untouched when it fails.
pub(crate) async fn update_user<L, Fut, M>(
    store: &dyn UserStore,
    load: L,
    mut mutate: M,
) -> Result<User, ApiError>
where
    L: Fn() -> Fut,
    Fut: Future<Output = Result<User, ApiError>>,
    M: FnMut(&mut User) -> Result<(), ApiError>,
{
    for attempt in 1..=MAX_SAVE_ATTEMPTS {
        let mut user = load().await?;
        mutate(&mut user)?;
        match store.save(&user).await {
            Ok(()) => {
                user.version += 1;
                return Ok(user);
            }
            Err(StoreError::Stale) => {
                debug!(user_id = %user.id, attempt, "user changed concurrently, retrying");
            }
            Err(e) => return Err(e.into()),
        }
    }
    warn!("giving up after {} conflicting saves", MAX_SAVE_ATTEMPTS);
    Err(ApiError::Contention)
}

pub async fn register(state: &AppState, payload: RegisterRequest) -> Result<User, ApiError> {
    let username = payload.username.trim().to_string();
    let email = normalize_email(&payload.email);

    if username.is_empty() {
        return Err(ApiError::Validation("Username is required".into()));
    }
    if !is_valid_email(&email) {
        warn!(%email, "invalid email");
        return Err(ApiError::Validation("Invalid email".into()));
    }
    if payload.password.is_empty() {
        return Err(ApiError::Validation("Password is required".into()));
    }

    // Advisory; the store's unique constraint has the final word.
    if state
        .users
        .find_by_username_or_email(&username, &email)
        .await?
        .is_some()
    {
        warn!(%username, %email, "username or email already registered");
        return Err(ApiError::Conflict);
    }

    let password_hash = hash_password_async(payload.password).await?;
    let user = state
        .users
        .create(NewUser {
            username,
            email,
            password_hash,
        })
        .await?;

    info!(user_id = %user.id, username = %user.username, "user registered");
    Ok(user)
}

/// Checks credentials, marks the user online and returns a session token.
pub async fn login(
    state: &AppState,
    payload: LoginRequest,
    now: OffsetDateTime,
) -> Result<String, ApiError> {
    let username = payload.username.trim();
    let Some(user) = state.users.find_by_username(username).await? else {
        verify_dummy_async(payload.password).await?;
        warn!(%username, "login unknown username");
        return Err(ApiError::InvalidCredentials);
    };

    if !verify_password_async(payload.password, user.password_hash.clone()).await? {
        warn!(user_id = %user.id, "login invalid password");
        return Err(ApiError::InvalidCredentials);
    }

    let users = state.users.as_ref();
    let id = user.id;
    let user = update_user(
        users,
        move || async move { users.find_by_id(id).await?.ok_or(ApiError::InvalidCredentials) },
        |u| {
            u.is_online = true;
            Ok(())
        },
    )
    .await?;

    let token = state
        .keys
        .issue_at(&user.username, now)
        .map_err(ApiError::Token)?;
    info!(user_id = %user.id, "user logged in");
    Ok(token)
}

/// The record behind a verified session. A token whose user is gone is
/// treated like an invalid one.
pub async fn current_user(state: &AppState, username: &str) -> Result<User, ApiError> {
    state
        .users
        .find_by_username(username)
        .await?
        .ok_or(ApiError::Unauthorized)
}

pub async fn check_in(
    state: &AppState,
    username: &str,
    now: OffsetDateTime,
) -> Result<User, ApiError> {
    let users = state.users.as_ref();
    let user = update_user(
        users,
        move || async move { users.find_by_username(username).await?.ok_or(ApiError::Unauthorized) },
        |u| Ok(progression::check_in(u, now)?),
    )
    .await?;
    info!(user_id = %user.id, points = user.points, "checked in");
    Ok(user)
}

pub async fn upgrade(state: &AppState, username: &str, cost: i64) -> Result<User, ApiError> {
    let users = state.users.as_ref();
    let user = update_user(
        users,
        move || async move { users.find_by_username(username).await?.ok_or(ApiError::Unauthorized) },
        |u| Ok(progression::upgrade(u, cost)?),
    )
    .await?;
    info!(user_id = %user.id, level = user.level, points = user.points, cost, "level upgraded");
    Ok(user)
}

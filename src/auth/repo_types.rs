use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// User record in the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String, // argon2 PHC string, never exposed in JSON
    pub is_online: bool,
    #[serde(with = "time::serde::rfc3339::option")]
    pub last_checkin: Option<OffsetDateTime>,
    pub points: i64,
    pub level: i32,
    #[serde(skip_serializing)]
    pub reset_token: Option<String>,
    #[serde(skip_serializing, with = "time::serde::rfc3339::option", default)]
    pub reset_token_expiry: Option<OffsetDateTime>,
    #[serde(skip_serializing, default)]
    pub version: i64, // bumped by every successful save
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Fields supplied at registration; everything else takes its default.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
}

impl User {
    pub const STARTING_POINTS: i64 = 0;
    pub const STARTING_LEVEL: i32 = 1;

    pub fn has_pending_reset(&self) -> bool {
        self.reset_token.is_some() && self.reset_token_expiry.is_some()
    }

    pub fn set_reset_token(&mut self, token: String, expiry: OffsetDateTime) {
        self.reset_token = Some(token);
        self.reset_token_expiry = Some(expiry);
    }

    pub fn clear_reset_token(&mut self) {
        self.reset_token = None;
        self.reset_token_expiry = None;
    }
}

#[cfg(test)]
pub(crate) fn sample_user(username: &str) -> User {
    User {
        id: Uuid::new_v4(),
        username: username.to_string(),
        email: format!("{username}@x.com"),
        password_hash: String::new(),
        is_online: false,
        last_checkin: None,
        points: User::STARTING_POINTS,
        level: User::STARTING_LEVEL,
        reset_token: None,
        reset_token_expiry: None,
        version: 0,
        created_at: OffsetDateTime::now_utc(),
    }
}

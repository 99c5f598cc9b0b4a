use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// JWT payload as it travels on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // username
    pub iat: i64,    // issued at (unix timestamp)
    pub exp: i64,    // expires at (unix timestamp)
    pub iss: String, // issuer
    pub aud: String, // audience
}

/// Verified identity of the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionClaims {
    pub username: String,
    pub issued_at: OffsetDateTime,
    pub expires_at: OffsetDateTime,
}

impl TryFrom<Claims> for SessionClaims {
    type Error = time::error::ComponentRange;

    fn try_from(c: Claims) -> Result<Self, Self::Error> {
        Ok(Self {
            username: c.sub,
            issued_at: OffsetDateTime::from_unix_timestamp(c.iat)?,
            expires_at: OffsetDateTime::from_unix_timestamp(c.exp)?,
        })
    }
}

use std::fmt;

use chrono::DateTime;
use chrono::Duration;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;
use uuid::Uuid;

/// Which of the two token classes a token belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    /// Presented on every protected request, validated statelessly.
    Access,
    /// Used only to mint new access tokens, checked against stored state.
    Refresh,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Access => write!(f, "access"),
            TokenKind::Refresh => write!(f, "refresh"),
        }
    }
}

/// Token payload.
///
/// Every field except `email` is required when decoding; a token missing any
/// of them is rejected as malformed. Access tokens carry the email, refresh
/// tokens carry only the subject.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    /// Subject (user identifier)
    pub sub: String,

    /// Email of the subject, access tokens only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    /// Token class
    pub kind: TokenKind,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration time (Unix timestamp)
    pub exp: i64,

    /// Unique token identifier
    pub jti: String,
}

impl Claims {
    /// Build access token claims.
    ///
    /// # Arguments
    /// * `subject` - Unique user identifier
    /// * `email` - Email of the user
    /// * `ttl` - Time until the token expires
    pub fn access(subject: impl ToString, email: impl Into<String>, ttl: Duration) -> Self {
        Self::issued_now(subject, Some(email.into()), TokenKind::Access, ttl)
    }

    /// Build refresh token claims.
    ///
    /// # Arguments
    /// * `subject` - Unique user identifier
    /// * `ttl` - Time until the token expires
    pub fn refresh(subject: impl ToString, ttl: Duration) -> Self {
        Self::issued_now(subject, None, TokenKind::Refresh, ttl)
    }

    fn issued_now(
        subject: impl ToString,
        email: Option<String>,
        kind: TokenKind,
        ttl: Duration,
    ) -> Self {
        let now = Utc::now();

        Self {
            sub: subject.to_string(),
            email,
            kind,
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
            jti: Uuid::new_v4().to_string(),
        }
    }

    /// Expiration as a timestamp.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.exp, 0)
    }

    /// Check if token is expired. A token is expired from the `exp` second on.
    pub fn is_expired(&self, current_timestamp: i64) -> bool {
        current_timestamp >= self.exp
    }
}

use chrono::Duration;

use crate::password::PasswordError;
use crate::password::PasswordHasher;
use crate::token::Claims;
use crate::token::TokenCodec;
use crate::token::TokenError;
use crate::token::TokenKind;

/// Lifetimes of the two token classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenLifetimes {
    pub access: Duration,
    pub refresh: Duration,
}

impl Default for TokenLifetimes {
    fn default() -> Self {
        Self {
            access: Duration::hours(24),
            refresh: Duration::days(7),
        }
    }
}

/// Authentication coordinator combining password verification and token issuance.
///
/// Owns the password hasher, the token codec and the token lifetimes so that
/// callers only deal with subjects, emails and token strings.
pub struct Authenticator {
    password_hasher: PasswordHasher,
    token_codec: TokenCodec,
    lifetimes: TokenLifetimes,
}

/// Freshly minted access token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessToken {
    pub token: String,
    /// Seconds until the token expires
    pub expires_in: i64,
}

/// Access and refresh token issued together on login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    /// Seconds until the access token expires
    pub expires_in: i64,
}

/// Authentication operation errors.
#[derive(Debug, thiserror::Error)]
pub enum AuthenticationError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Password error: {0}")]
    PasswordError(#[from] PasswordError),

    #[error("Token error: {0}")]
    TokenError(#[from] TokenError),
}

impl Authenticator {
    /// Create a new authenticator with the default cost factor and lifetimes.
    ///
    /// # Arguments
    /// * `secret` - Secret key for token signing
    pub fn new(secret: &[u8]) -> Self {
        Self::with_settings(secret, PasswordHasher::new(), TokenLifetimes::default())
    }

    /// Create an authenticator with an explicit hasher and token lifetimes.
    ///
    /// # Arguments
    /// * `secret` - Secret key for token signing
    /// * `password_hasher` - Hasher configured with the desired cost
    /// * `lifetimes` - Access and refresh token lifetimes
    pub fn with_settings(
        secret: &[u8],
        password_hasher: PasswordHasher,
        lifetimes: TokenLifetimes,
    ) -> Self {
        Self {
            password_hasher,
            token_codec: TokenCodec::new(secret),
            lifetimes,
        }
    }

    /// Configured token lifetimes.
    pub fn lifetimes(&self) -> TokenLifetimes {
        self.lifetimes
    }

    /// Hash a password for storage.
    ///
    /// # Errors
    /// * `PasswordError` - Hashing operation failed
    pub fn hash_password(&self, password: &str) -> Result<String, PasswordError> {
        self.password_hasher.hash(password)
    }

    /// Check a password against a stored hash.
    ///
    /// # Errors
    /// * `PasswordError` - Stored hash is invalid
    pub fn verify_password(&self, password: &str, stored_hash: &str) -> Result<bool, PasswordError> {
        self.password_hasher.verify(password, stored_hash)
    }

    /// Verify credentials and issue an access/refresh token pair.
    ///
    /// # Arguments
    /// * `password` - Plaintext password to verify
    /// * `stored_hash` - Stored password hash
    /// * `subject` - Identifier placed in both tokens
    /// * `email` - Email placed in the access token
    ///
    /// # Errors
    /// * `InvalidCredentials` - Password does not match
    /// * `PasswordError` - Password verification failed
    /// * `TokenError` - Token generation failed
    pub fn authenticate(
        &self,
        password: &str,
        stored_hash: &str,
        subject: &str,
        email: &str,
    ) -> Result<TokenPair, AuthenticationError> {
        if !self.password_hasher.verify(password, stored_hash)? {
            return Err(AuthenticationError::InvalidCredentials);
        }

        Ok(self.issue_token_pair(subject, email)?)
    }

    /// Issue an access/refresh token pair without password verification.
    ///
    /// # Errors
    /// * `EncodingFailed` - Token generation failed
    pub fn issue_token_pair(&self, subject: &str, email: &str) -> Result<TokenPair, TokenError> {
        let access = self.issue_access_token(subject, email)?;
        let refresh_token = self
            .token_codec
            .issue(&Claims::refresh(subject, self.lifetimes.refresh))?;

        Ok(TokenPair {
            access_token: access.token,
            refresh_token,
            expires_in: access.expires_in,
        })
    }

    /// Issue an access token.
    ///
    /// # Errors
    /// * `EncodingFailed` - Token generation failed
    pub fn issue_access_token(&self, subject: &str, email: &str) -> Result<AccessToken, TokenError> {
        let token = self
            .token_codec
            .issue(&Claims::access(subject, email, self.lifetimes.access))?;

        Ok(AccessToken {
            token,
            expires_in: self.lifetimes.access.num_seconds(),
        })
    }

    /// Validate a bearer access token.
    ///
    /// # Errors
    /// * `TokenError` - Signature, structure, expiry, or kind check failed
    pub fn validate_access_token(&self, token: &str) -> Result<Claims, TokenError> {
        self.token_codec.verify_kind(token, TokenKind::Access)
    }

    /// Validate a refresh token's signature, structure, expiry and kind.
    ///
    /// Does not check the token against stored state.
    ///
    /// # Errors
    /// * `TokenError` - Signature, structure, expiry, or kind check failed
    pub fn validate_refresh_token(&self, token: &str) -> Result<Claims, TokenError> {
        self.token_codec.verify_kind(token, TokenKind::Refresh)
    }
}

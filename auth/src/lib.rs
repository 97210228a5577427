//! Authentication utilities library
//!
//! Provides the credential and token primitives used by the auth service:
//! - Password hashing (bcrypt, configurable cost)
//! - Token issuance and verification (HS256 JWT with typed claims)
//! - Authentication coordination (token pairs, per-kind validation)
//!
//! # Examples
//!
//! ## Password Hashing
//! ```
//! use auth::PasswordHasher;
//!
//! let hasher = PasswordHasher::with_cost(4).unwrap();
//! let hash = hasher.hash("my_password").unwrap();
//! let is_valid = hasher.verify("my_password", &hash).unwrap();
//! assert!(is_valid);
//! ```
//!
//! ## Tokens
//! ```
//! use auth::{Claims, TokenCodec};
//! use chrono::Duration;
//!
//! let codec = TokenCodec::new(b"secret_key_at_least_32_bytes_long!");
//! let claims = Claims::refresh("user123", Duration::days(7));
//! let token = codec.issue(&claims).unwrap();
//! let decoded = codec.verify(&token).unwrap();
//! assert_eq!(decoded.sub, "user123");
//! ```
//!
//! ## Complete Authentication Flow
//! ```
//! use auth::{Authenticator, PasswordHasher, TokenLifetimes};
//!
//! let auth = Authenticator::with_settings(
//!     b"secret_key_at_least_32_bytes_long!",
//!     PasswordHasher::with_cost(4).unwrap(),
//!     TokenLifetimes::default(),
//! );
//!
//! // Register: hash password
//! let hash = auth.hash_password("password123").unwrap();
//!
//! // Login: verify and issue tokens
//! let pair = auth
//!     .authenticate("password123", &hash, "user123", "alice@x.com")
//!     .unwrap();
//!
//! // Validate tokens
//! let access = auth.validate_access_token(&pair.access_token).unwrap();
//! let refresh = auth.validate_refresh_token(&pair.refresh_token).unwrap();
//! assert_eq!(access.sub, refresh.sub);
//! ```

pub mod authenticator;
pub mod password;
pub mod token;

// Re-export commonly used items
pub use authenticator::AccessToken;
pub use authenticator::AuthenticationError;
pub use authenticator::Authenticator;
pub use authenticator::TokenLifetimes;
pub use authenticator::TokenPair;
pub use password::PasswordError;
pub use password::PasswordHasher;
pub use token::Claims;
pub use token::TokenCodec;
pub use token::TokenError;
pub use token::TokenKind;

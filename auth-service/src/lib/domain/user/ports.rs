use async_trait::async_trait;
use auth::AccessToken;
use auth::TokenPair;

use crate::domain::user::models::ChangePasswordCommand;
use crate::domain::user::models::LoginCommand;
use crate::domain::user::models::ProfileUpdate;
use crate::domain::user::models::ProfileView;
use crate::domain::user::models::RegisterCommand;
use crate::domain::user::models::User;
use crate::domain::user::models::UserId;
use crate::user::errors::AuthError;

/// Port for authentication service operations.
#[async_trait]
pub trait AuthServicePort: Send + Sync + 'static {
    /// Register a new active user.
    ///
    /// # Arguments
    /// * `command` - Validated command containing email, password, and names
    ///
    /// # Returns
    /// Created user entity
    ///
    /// # Errors
    /// * `DuplicateEmail` - Email is registered, whether or not the account is active
    /// * `StoreUnavailable` - Store operation failed
    async fn register(&self, command: RegisterCommand) -> Result<User, AuthError>;

    /// Authenticate an active user and start a new session.
    ///
    /// Overwrites any refresh token stored for the user.
    ///
    /// # Returns
    /// Access token, refresh token, and access token lifetime in seconds
    ///
    /// # Errors
    /// * `InvalidCredentials` - Unknown or inactive email, or wrong password
    /// * `StoreUnavailable` - Store operation failed
    async fn login(&self, command: LoginCommand) -> Result<TokenPair, AuthError>;

    /// Mint a new access token from the session's refresh token.
    ///
    /// The refresh token is not rotated.
    ///
    /// # Errors
    /// * `InvalidToken` - Signature, structure, expiry, or kind check failed
    /// * `UserNotFound` - Token subject does not resolve to a stored user
    /// * `TokenRevoked` - Token is not the one currently stored for the user
    /// * `StoreUnavailable` - Store operation failed
    async fn refresh_token(&self, refresh_token: &str) -> Result<AccessToken, AuthError>;

    /// End the user's session by clearing the stored refresh token.
    ///
    /// Idempotent.
    ///
    /// # Errors
    /// * `UserNotFound` - User does not exist
    /// * `StoreUnavailable` - Store operation failed
    async fn logout(&self, id: &UserId) -> Result<(), AuthError>;

    /// Retrieve the profile of a user.
    ///
    /// # Errors
    /// * `UserNotFound` - User does not exist
    /// * `StoreUnavailable` - Store operation failed
    async fn get_profile(&self, id: &UserId) -> Result<ProfileView, AuthError>;

    /// Apply a partial profile update.
    ///
    /// # Returns
    /// Profile after the update
    ///
    /// # Errors
    /// * `UserNotFound` - User does not exist
    /// * `StoreUnavailable` - Store operation failed
    async fn update_profile(
        &self,
        id: &UserId,
        update: ProfileUpdate,
    ) -> Result<ProfileView, AuthError>;

    /// Replace the password after checking the current one.
    ///
    /// # Errors
    /// * `UserNotFound` - User does not exist
    /// * `InvalidCredentials` - Current password does not match
    /// * `StoreUnavailable` - Store operation failed
    async fn change_password(
        &self,
        id: &UserId,
        command: ChangePasswordCommand,
    ) -> Result<(), AuthError>;

    /// Soft-deactivate the account. The user can no longer log in.
    ///
    /// # Errors
    /// * `UserNotFound` - User does not exist
    /// * `StoreUnavailable` - Store operation failed
    async fn deactivate_account(&self, id: &UserId) -> Result<(), AuthError>;
}

/// Persistence operations for user credential state.
///
/// Every operation is atomic for a single record.
#[async_trait]
pub trait UserRepository: Send + Sync + 'static {
    /// Persist new user to storage.
    ///
    /// # Errors
    /// * `DuplicateEmail` - Email is already registered
    /// * `StoreUnavailable` - Store operation failed
    async fn create(&self, user: User) -> Result<User, AuthError>;

    /// Retrieve user by email address.
    ///
    /// # Arguments
    /// * `email` - Email address, matched exactly
    /// * `active_only` - Skip deactivated users
    ///
    /// # Returns
    /// Optional user entity (None if not found)
    ///
    /// # Errors
    /// * `StoreUnavailable` - Store operation failed
    async fn find_by_email(&self, email: &str, active_only: bool)
        -> Result<Option<User>, AuthError>;

    /// Retrieve user by identifier, active or not.
    ///
    /// # Returns
    /// Optional user entity (None if not found)
    ///
    /// # Errors
    /// * `StoreUnavailable` - Store operation failed
    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, AuthError>;

    /// Check whether any user, active or not, has this email.
    ///
    /// # Errors
    /// * `StoreUnavailable` - Store operation failed
    async fn exists_by_email(&self, email: &str) -> Result<bool, AuthError>;

    /// Overwrite the stored refresh token. An empty token clears the session.
    ///
    /// # Errors
    /// * `UserNotFound` - User does not exist
    /// * `StoreUnavailable` - Store operation failed
    async fn update_refresh_token(&self, id: &UserId, token: &str) -> Result<(), AuthError>;

    /// Record a login at the current time.
    ///
    /// # Errors
    /// * `StoreUnavailable` - Store operation failed
    async fn update_last_login(&self, id: &UserId) -> Result<(), AuthError>;

    /// Apply a partial profile update.
    ///
    /// # Returns
    /// User entity after the update
    ///
    /// # Errors
    /// * `UserNotFound` - User does not exist
    /// * `StoreUnavailable` - Store operation failed
    async fn update_fields(&self, id: &UserId, update: &ProfileUpdate) -> Result<User, AuthError>;

    /// Replace the stored password hash.
    ///
    /// # Errors
    /// * `UserNotFound` - User does not exist
    /// * `StoreUnavailable` - Store operation failed
    async fn update_password(&self, id: &UserId, password_hash: &str) -> Result<(), AuthError>;

    /// Mark the user inactive.
    ///
    /// # Errors
    /// * `UserNotFound` - User does not exist
    /// * `StoreUnavailable` - Store operation failed
    async fn deactivate(&self, id: &UserId) -> Result<(), AuthError>;
}

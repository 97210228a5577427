use std::sync::Arc;

use async_trait::async_trait;
use auth::AccessToken;
use auth::AuthenticationError;
use auth::Authenticator;
use auth::TokenError;
use auth::TokenPair;

use crate::domain::user::models::ChangePasswordCommand;
use crate::domain::user::models::LoginCommand;
use crate::domain::user::models::ProfileUpdate;
use crate::domain::user::models::ProfileView;
use crate::domain::user::models::RegisterCommand;
use crate::domain::user::models::User;
use crate::domain::user::models::UserId;
use crate::user::errors::AuthError;
use crate::user::ports::AuthServicePort;
use crate::user::ports::UserRepository;

/// Domain service implementation for authentication operations.
///
/// Concrete implementation of AuthServicePort with dependency injection. Holds
/// no state of its own: sessions live in the repository's stored refresh token.
pub struct AuthService<UR>
where
    UR: UserRepository,
{
    repository: Arc<UR>,
    authenticator: Arc<Authenticator>,
}

impl<UR> AuthService<UR>
where
    UR: UserRepository,
{
    /// Create a new auth service with injected dependencies.
    ///
    /// # Arguments
    /// * `repository` - Credential store implementation
    /// * `authenticator` - Password hasher and token codec
    pub fn new(repository: Arc<UR>, authenticator: Arc<Authenticator>) -> Self {
        Self {
            repository,
            authenticator,
        }
    }

    /// Run password hashing or verification off the async worker threads.
    async fn run_blocking<T, F>(&self, task: F) -> Result<T, AuthError>
    where
        F: FnOnce(&Authenticator) -> T + Send + 'static,
        T: Send + 'static,
    {
        let authenticator = Arc::clone(&self.authenticator);

        tokio::task::spawn_blocking(move || task(&authenticator))
            .await
            .map_err(|e| AuthError::Internal(format!("Password task failed: {}", e)))
    }

    async fn find_user(&self, id: &UserId) -> Result<User, AuthError> {
        self.repository
            .find_by_id(id)
            .await?
            .ok_or_else(|| AuthError::UserNotFound(id.to_string()))
    }
}

fn token_generation_failed(err: TokenError) -> AuthError {
    AuthError::Internal(format!("Token generation failed: {}", err))
}

#[async_trait]
impl<UR> AuthServicePort for AuthService<UR>
where
    UR: UserRepository,
{
    async fn register(&self, command: RegisterCommand) -> Result<User, AuthError> {
        let RegisterCommand {
            email,
            password,
            first_name,
            last_name,
        } = command;

        if self.repository.exists_by_email(email.as_str()).await? {
            return Err(AuthError::DuplicateEmail(email.as_str().to_string()));
        }

        let password_hash = self
            .run_blocking(move |authenticator| authenticator.hash_password(password.as_str()))
            .await?
            .map_err(|e| AuthError::Internal(format!("Password hashing failed: {}", e)))?;

        let created_user = self
            .repository
            .create(User::new(email, password_hash, first_name, last_name))
            .await?;

        tracing::info!(user_id = %created_user.id, "User registered");

        Ok(created_user)
    }

    async fn login(&self, command: LoginCommand) -> Result<TokenPair, AuthError> {
        let LoginCommand { email, password } = command;

        let user = self
            .repository
            .find_by_email(email.as_str(), true)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        let subject = user.id.to_string();
        let stored_hash = user.password_hash.clone();
        let user_email = user.email.as_str().to_string();

        let tokens = self
            .run_blocking(move |authenticator| {
                authenticator.authenticate(password.as_str(), &stored_hash, &subject, &user_email)
            })
            .await?
            .map_err(|e| match e {
                AuthenticationError::InvalidCredentials => AuthError::InvalidCredentials,
                AuthenticationError::PasswordError(err) => {
                    AuthError::Internal(format!("Password verification failed: {}", err))
                }
                AuthenticationError::TokenError(err) => token_generation_failed(err),
            })?;

        self.repository
            .update_refresh_token(&user.id, &tokens.refresh_token)
            .await?;

        if let Err(e) = self.repository.update_last_login(&user.id).await {
            tracing::warn!(user_id = %user.id, error = %e, "Failed to record last login");
        }

        tracing::info!(user_id = %user.id, "User logged in");

        Ok(tokens)
    }

    async fn refresh_token(&self, refresh_token: &str) -> Result<AccessToken, AuthError> {
        let claims = self.authenticator.validate_refresh_token(refresh_token)?;

        let user_id = UserId::from_string(&claims.sub).map_err(|e| {
            AuthError::InvalidToken(TokenError::Malformed(format!("Invalid subject: {}", e)))
        })?;

        let user = self.find_user(&user_id).await?;

        if user.refresh_token.is_empty() || user.refresh_token != refresh_token {
            tracing::warn!(user_id = %user.id, "Revoked refresh token presented");
            return Err(AuthError::TokenRevoked);
        }

        self.authenticator
            .issue_access_token(&user.id.to_string(), user.email.as_str())
            .map_err(token_generation_failed)
    }

    async fn logout(&self, id: &UserId) -> Result<(), AuthError> {
        self.repository.update_refresh_token(id, "").await?;

        tracing::info!(user_id = %id, "User logged out");

        Ok(())
    }

    async fn get_profile(&self, id: &UserId) -> Result<ProfileView, AuthError> {
        self.find_user(id).await.map(|user| ProfileView::from(&user))
    }

    async fn update_profile(
        &self,
        id: &UserId,
        update: ProfileUpdate,
    ) -> Result<ProfileView, AuthError> {
        self.repository
            .update_fields(id, &update)
            .await
            .map(|user| ProfileView::from(&user))
    }

    async fn change_password(
        &self,
        id: &UserId,
        command: ChangePasswordCommand,
    ) -> Result<(), AuthError> {
        let user = self.find_user(id).await?;

        let ChangePasswordCommand {
            current_password,
            new_password,
        } = command;
        let stored_hash = user.password_hash;

        let new_hash = self
            .run_blocking(move |authenticator| {
                match authenticator.verify_password(&current_password, &stored_hash) {
                    Ok(true) => authenticator
                        .hash_password(new_password.as_str())
                        .map_err(|e| AuthError::Internal(format!("Password hashing failed: {}", e))),
                    Ok(false) => Err(AuthError::InvalidCredentials),
                    Err(e) => Err(AuthError::Internal(format!(
                        "Password verification failed: {}",
                        e
                    ))),
                }
            })
            .await??;

        self.repository.update_password(id, &new_hash).await?;

        tracing::info!(user_id = %id, "Password changed");

        Ok(())
    }

    async fn deactivate_account(&self, id: &UserId) -> Result<(), AuthError> {
        self.repository.deactivate(id).await?;

        tracing::info!(user_id = %id, "Account deactivated");

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use auth::PasswordHasher;
    use auth::TokenLifetimes;
    use chrono::Utc;
    use mockall::mock;
    use mockall::predicate::*;

    use super::*;
    use crate::domain::user::models::EmailAddress;
    use crate::domain::user::models::Password;
    use crate::domain::user::models::PersonName;

    mock! {
        pub TestUserRepository {}

        #[async_trait]
        impl UserRepository for TestUserRepository {
            async fn create(&self, user: User) -> Result<User, AuthError>;
            async fn find_by_email(&self, email: &str, active_only: bool) -> Result<Option<User>, AuthError>;
            async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, AuthError>;
            async fn exists_by_email(&self, email: &str) -> Result<bool, AuthError>;
            async fn update_refresh_token(&self, id: &UserId, token: &str) -> Result<(), AuthError>;
            async fn update_last_login(&self, id: &UserId) -> Result<(), AuthError>;
            async fn update_fields(&self, id: &UserId, update: &ProfileUpdate) -> Result<User, AuthError>;
            async fn update_password(&self, id: &UserId, password_hash: &str) -> Result<(), AuthError>;
            async fn deactivate(&self, id: &UserId) -> Result<(), AuthError>;
        }
    }

    fn test_authenticator() -> Arc<Authenticator> {
        Arc::new(Authenticator::with_settings(
            b"test_secret_key_at_least_32_bytes!",
            PasswordHasher::with_cost(PasswordHasher::MIN_COST).unwrap(),
            TokenLifetimes::default(),
        ))
    }

    fn stored_user(authenticator: &Authenticator, password: &str) -> User {
        User {
            id: UserId::new(),
            email: EmailAddress::new("alice@x.com".to_string()).unwrap(),
            password_hash: authenticator.hash_password(password).unwrap(),
            first_name: "Alice".to_string(),
            last_name: "A".to_string(),
            active: true,
            refresh_token: String::new(),
            last_login: None,
            created_at: Utc::now(),
        }
    }

    fn login_command(email: &str, password: &str) -> LoginCommand {
        LoginCommand {
            email: EmailAddress::new(email.to_string()).unwrap(),
            password: Password::new(password.to_string()).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_register_success() {
        let mut repository = MockTestUserRepository::new();

        repository
            .expect_exists_by_email()
            .with(eq("alice@x.com"))
            .times(1)
            .returning(|_| Ok(false));

        repository
            .expect_create()
            .withf(|user| {
                user.email.as_str() == "alice@x.com"
                    && user.password_hash.starts_with("$2b$")
                    && user.password_hash != "password123"
                    && user.active
                    && user.refresh_token.is_empty()
            })
            .times(1)
            .returning(|user| Ok(user));

        let authenticator = test_authenticator();
        let service = AuthService::new(Arc::new(repository), Arc::clone(&authenticator));

        let command = RegisterCommand::new(
            EmailAddress::new("alice@x.com".to_string()).unwrap(),
            Password::new("password123".to_string()).unwrap(),
            PersonName::new("Alice".to_string()).unwrap(),
            PersonName::new("A".to_string()).unwrap(),
        );

        let user = service.register(command).await.expect("Registration failed");
        assert_eq!(user.first_name, "Alice");
        assert!(authenticator
            .verify_password("password123", &user.password_hash)
            .unwrap());
    }

    #[tokio::test]
    async fn test_register_duplicate_email() {
        let mut repository = MockTestUserRepository::new();

        repository
            .expect_exists_by_email()
            .times(1)
            .returning(|_| Ok(true));
        repository.expect_create().times(0);

        let service = AuthService::new(Arc::new(repository), test_authenticator());

        let command = RegisterCommand::new(
            EmailAddress::new("alice@x.com".to_string()).unwrap(),
            Password::new("password123".to_string()).unwrap(),
            PersonName::new("Alice".to_string()).unwrap(),
            PersonName::new("A".to_string()).unwrap(),
        );

        let result = service.register(command).await;
        assert!(matches!(result, Err(AuthError::DuplicateEmail(_))));
    }

    #[tokio::test]
    async fn test_login_success_stores_refresh_token() {
        let authenticator = test_authenticator();
        let user = stored_user(&authenticator, "password123");
        let user_id = user.id;

        let mut repository = MockTestUserRepository::new();
        let returned_user = user.clone();
        repository
            .expect_find_by_email()
            .with(eq("alice@x.com"), eq(true))
            .times(1)
            .returning(move |_, _| Ok(Some(returned_user.clone())));
        repository
            .expect_update_refresh_token()
            .withf(move |id, token| *id == user_id && !token.is_empty())
            .times(1)
            .returning(|_, _| Ok(()));
        repository
            .expect_update_last_login()
            .withf(move |id| *id == user_id)
            .times(1)
            .returning(|_| Ok(()));

        let service = AuthService::new(Arc::new(repository), Arc::clone(&authenticator));

        let tokens = service
            .login(login_command("alice@x.com", "password123"))
            .await
            .expect("Login failed");

        assert_eq!(tokens.expires_in, 24 * 60 * 60);

        let claims = authenticator
            .validate_access_token(&tokens.access_token)
            .unwrap();
        assert_eq!(claims.sub, user_id.to_string());
        assert_eq!(claims.email.as_deref(), Some("alice@x.com"));
        let expected_exp = Utc::now().timestamp() + 24 * 60 * 60;
        assert!((claims.exp - expected_exp).abs() <= 5);
    }

    #[tokio::test]
    async fn test_login_survives_last_login_failure() {
        let authenticator = test_authenticator();
        let user = stored_user(&authenticator, "password123");

        let mut repository = MockTestUserRepository::new();
        repository
            .expect_find_by_email()
            .returning(move |_, _| Ok(Some(user.clone())));
        repository
            .expect_update_refresh_token()
            .returning(|_, _| Ok(()));
        repository
            .expect_update_last_login()
            .times(1)
            .returning(|_| Err(AuthError::StoreUnavailable("timeout".to_string())));

        let service = AuthService::new(Arc::new(repository), authenticator);

        let result = service
            .login(login_command("alice@x.com", "password123"))
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_login_unknown_email_and_wrong_password_are_indistinguishable() {
        let authenticator = test_authenticator();
        let user = stored_user(&authenticator, "password123");

        let mut repository = MockTestUserRepository::new();
        repository
            .expect_find_by_email()
            .with(eq("alice@x.com"), eq(true))
            .returning(move |_, _| Ok(Some(user.clone())));
        repository
            .expect_find_by_email()
            .with(eq("nobody@x.com"), eq(true))
            .returning(|_, _| Ok(None));
        repository.expect_update_refresh_token().times(0);
        repository.expect_update_last_login().times(0);

        let service = AuthService::new(Arc::new(repository), authenticator);

        let wrong_password = service
            .login(login_command("alice@x.com", "wrong_password"))
            .await
            .unwrap_err();
        let unknown_email = service
            .login(login_command("nobody@x.com", "password123"))
            .await
            .unwrap_err();

        assert!(matches!(wrong_password, AuthError::InvalidCredentials));
        assert!(matches!(unknown_email, AuthError::InvalidCredentials));
        assert_eq!(wrong_password.to_string(), unknown_email.to_string());
    }

    #[tokio::test]
    async fn test_login_store_failure_propagates() {
        let authenticator = test_authenticator();
        let user = stored_user(&authenticator, "password123");

        let mut repository = MockTestUserRepository::new();
        repository
            .expect_find_by_email()
            .returning(move |_, _| Ok(Some(user.clone())));
        repository
            .expect_update_refresh_token()
            .returning(|_, _| Err(AuthError::StoreUnavailable("connection reset".to_string())));
        repository.expect_update_last_login().times(0);

        let service = AuthService::new(Arc::new(repository), authenticator);

        let result = service
            .login(login_command("alice@x.com", "password123"))
            .await;
        assert!(matches!(result, Err(AuthError::StoreUnavailable(_))));
    }

    #[tokio::test]
    async fn test_refresh_token_success() {
        let authenticator = test_authenticator();
        let mut user = stored_user(&authenticator, "password123");
        let tokens = authenticator
            .issue_token_pair(&user.id.to_string(), user.email.as_str())
            .unwrap();
        user.refresh_token = tokens.refresh_token.clone();
        let user_id = user.id;

        let mut repository = MockTestUserRepository::new();
        repository
            .expect_find_by_id()
            .withf(move |id| *id == user_id)
            .times(2)
            .returning(move |_| Ok(Some(user.clone())));

        let service = AuthService::new(Arc::new(repository), Arc::clone(&authenticator));

        // No rotation: the same refresh token keeps working
        for _ in 0..2 {
            let access = service
                .refresh_token(&tokens.refresh_token)
                .await
                .expect("Refresh failed");
            assert_eq!(access.expires_in, 24 * 60 * 60);

            let claims = authenticator.validate_access_token(&access.token).unwrap();
            assert_eq!(claims.sub, user_id.to_string());
        }
    }

    #[tokio::test]
    async fn test_refresh_token_revoked() {
        let authenticator = test_authenticator();
        let mut user = stored_user(&authenticator, "password123");
        let old = authenticator
            .issue_token_pair(&user.id.to_string(), user.email.as_str())
            .unwrap();
        let new = authenticator
            .issue_token_pair(&user.id.to_string(), user.email.as_str())
            .unwrap();
        user.refresh_token = new.refresh_token;

        let mut repository = MockTestUserRepository::new();
        repository
            .expect_find_by_id()
            .returning(move |_| Ok(Some(user.clone())));

        let service = AuthService::new(Arc::new(repository), authenticator);

        let result = service.refresh_token(&old.refresh_token).await;
        assert!(matches!(result, Err(AuthError::TokenRevoked)));
    }

    #[tokio::test]
    async fn test_refresh_token_after_logout_is_revoked() {
        let authenticator = test_authenticator();
        let user = stored_user(&authenticator, "password123");
        let tokens = authenticator
            .issue_token_pair(&user.id.to_string(), user.email.as_str())
            .unwrap();

        let mut repository = MockTestUserRepository::new();
        repository
            .expect_find_by_id()
            .returning(move |_| Ok(Some(user.clone())));

        let service = AuthService::new(Arc::new(repository), authenticator);

        let result = service.refresh_token(&tokens.refresh_token).await;
        assert!(matches!(result, Err(AuthError::TokenRevoked)));
    }

    #[tokio::test]
    async fn test_refresh_token_invalid() {
        let mut repository = MockTestUserRepository::new();
        repository.expect_find_by_id().times(0);

        let service = AuthService::new(Arc::new(repository), test_authenticator());

        let result = service.refresh_token("invalid.token.here").await;
        assert!(matches!(result, Err(AuthError::InvalidToken(_))));
    }

    #[tokio::test]
    async fn test_refresh_token_rejects_access_token() {
        let authenticator = test_authenticator();
        let tokens = authenticator
            .issue_token_pair(&UserId::new().to_string(), "alice@x.com")
            .unwrap();

        let mut repository = MockTestUserRepository::new();
        repository.expect_find_by_id().times(0);

        let service = AuthService::new(Arc::new(repository), authenticator);

        let result = service.refresh_token(&tokens.access_token).await;
        assert!(matches!(
            result,
            Err(AuthError::InvalidToken(TokenError::WrongKind { .. }))
        ));
    }

    #[tokio::test]
    async fn test_refresh_token_unknown_user() {
        let authenticator = test_authenticator();
        let tokens = authenticator
            .issue_token_pair(&UserId::new().to_string(), "alice@x.com")
            .unwrap();

        let mut repository = MockTestUserRepository::new();
        repository
            .expect_find_by_id()
            .times(1)
            .returning(|_| Ok(None));

        let service = AuthService::new(Arc::new(repository), authenticator);

        let result = service.refresh_token(&tokens.refresh_token).await;
        assert!(matches!(result, Err(AuthError::UserNotFound(_))));
    }

    #[tokio::test]
    async fn test_refresh_token_inactive_user_still_accepted() {
        let authenticator = test_authenticator();
        let mut user = stored_user(&authenticator, "password123");
        let tokens = authenticator
            .issue_token_pair(&user.id.to_string(), user.email.as_str())
            .unwrap();
        user.refresh_token = tokens.refresh_token.clone();
        user.active = false;

        let mut repository = MockTestUserRepository::new();
        repository
            .expect_find_by_id()
            .returning(move |_| Ok(Some(user.clone())));

        let service = AuthService::new(Arc::new(repository), authenticator);

        assert!(service.refresh_token(&tokens.refresh_token).await.is_ok());
    }

    #[tokio::test]
    async fn test_logout_clears_refresh_token() {
        let user_id = UserId::new();

        let mut repository = MockTestUserRepository::new();
        repository
            .expect_update_refresh_token()
            .withf(move |id, token| *id == user_id && token.is_empty())
            .times(2)
            .returning(|_, _| Ok(()));

        let service = AuthService::new(Arc::new(repository), test_authenticator());

        assert!(service.logout(&user_id).await.is_ok());
        assert!(service.logout(&user_id).await.is_ok());
    }

    #[tokio::test]
    async fn test_logout_unknown_user() {
        let mut repository = MockTestUserRepository::new();
        repository
            .expect_update_refresh_token()
            .returning(|id, _| Err(AuthError::UserNotFound(id.to_string())));

        let service = AuthService::new(Arc::new(repository), test_authenticator());

        let result = service.logout(&UserId::new()).await;
        assert!(matches!(result, Err(AuthError::UserNotFound(_))));
    }

    #[tokio::test]
    async fn test_get_profile() {
        let authenticator = test_authenticator();
        let user = stored_user(&authenticator, "password123");
        let user_id = user.id;

        let mut repository = MockTestUserRepository::new();
        repository
            .expect_find_by_id()
            .withf(move |id| *id == user_id)
            .times(1)
            .returning(move |_| Ok(Some(user.clone())));

        let service = AuthService::new(Arc::new(repository), authenticator);

        let profile = service.get_profile(&user_id).await.unwrap();
        assert_eq!(
            profile,
            ProfileView {
                email: "alice@x.com".to_string(),
                display_name: "Alice A".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_get_profile_not_found() {
        let mut repository = MockTestUserRepository::new();
        repository
            .expect_find_by_id()
            .times(1)
            .returning(|_| Ok(None));

        let service = AuthService::new(Arc::new(repository), test_authenticator());

        let result = service.get_profile(&UserId::new()).await;
        assert!(matches!(result, Err(AuthError::UserNotFound(_))));
    }

    #[tokio::test]
    async fn test_update_profile_partial() {
        let authenticator = test_authenticator();
        let user = stored_user(&authenticator, "password123");
        let user_id = user.id;

        let mut repository = MockTestUserRepository::new();
        repository
            .expect_update_fields()
            .withf(move |id, update| {
                *id == user_id
                    && update.first_name.as_deref() == Some("Alicia")
                    && update.last_name.is_none()
            })
            .times(1)
            .returning(move |_, update| {
                let mut updated = user.clone();
                update.apply_to(&mut updated);
                Ok(updated)
            });

        let service = AuthService::new(Arc::new(repository), authenticator);

        let profile = service
            .update_profile(&user_id, ProfileUpdate::new(Some("Alicia".to_string()), None))
            .await
            .unwrap();
        assert_eq!(profile.display_name, "Alicia A");
    }

    #[tokio::test]
    async fn test_change_password_success() {
        let authenticator = test_authenticator();
        let user = stored_user(&authenticator, "password123");
        let user_id = user.id;

        let mut repository = MockTestUserRepository::new();
        repository
            .expect_find_by_id()
            .returning(move |_| Ok(Some(user.clone())));

        let verifier = Arc::clone(&authenticator);
        repository
            .expect_update_password()
            .withf(move |id, hash| {
                *id == user_id && verifier.verify_password("new_password", hash).unwrap()
            })
            .times(1)
            .returning(|_, _| Ok(()));

        let service = AuthService::new(Arc::new(repository), authenticator);

        let command = ChangePasswordCommand {
            current_password: "password123".to_string(),
            new_password: Password::new("new_password".to_string()).unwrap(),
        };
        assert!(service.change_password(&user_id, command).await.is_ok());
    }

    #[tokio::test]
    async fn test_change_password_wrong_current() {
        let authenticator = test_authenticator();
        let user = stored_user(&authenticator, "password123");
        let user_id = user.id;

        let mut repository = MockTestUserRepository::new();
        repository
            .expect_find_by_id()
            .returning(move |_| Ok(Some(user.clone())));
        repository.expect_update_password().times(0);

        let service = AuthService::new(Arc::new(repository), authenticator);

        let command = ChangePasswordCommand {
            current_password: "not_my_password".to_string(),
            new_password: Password::new("new_password".to_string()).unwrap(),
        };
        let result = service.change_password(&user_id, command).await;
        assert!(matches!(result, Err(AuthError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn test_deactivate_account() {
        let user_id = UserId::new();

        let mut repository = MockTestUserRepository::new();
        repository
            .expect_deactivate()
            .withf(move |id| *id == user_id)
            .times(1)
            .returning(|_| Ok(()));

        let service = AuthService::new(Arc::new(repository), test_authenticator());

        assert!(service.deactivate_account(&user_id).await.is_ok());
    }
}

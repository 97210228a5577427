use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::domain::user::models::ProfileUpdate;
use crate::domain::user::models::User;
use crate::domain::user::models::UserId;
use crate::domain::user::ports::UserRepository;
use crate::user::errors::AuthError;

/// Process-local user store.
///
/// Used when no database is configured and by the integration tests. Clones
/// share the same underlying map.
#[derive(Debug, Clone, Default)]
pub struct InMemoryUserRepository {
    users: Arc<RwLock<HashMap<UserId, User>>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run a mutation against one stored user.
    async fn modify<T>(
        &self,
        id: &UserId,
        mutate: impl FnOnce(&mut User) -> T + Send,
    ) -> Result<T, AuthError> {
        let mut users = self.users.write().await;
        let user = users
            .get_mut(id)
            .ok_or_else(|| AuthError::UserNotFound(id.to_string()))?;

        Ok(mutate(user))
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn create(&self, user: User) -> Result<User, AuthError> {
        let mut users = self.users.write().await;

        // Email uniqueness holds under the write lock
        if users.values().any(|u| u.email == user.email) {
            return Err(AuthError::DuplicateEmail(user.email.as_str().to_string()));
        }

        users.insert(user.id, user.clone());

        Ok(user)
    }

    async fn find_by_email(
        &self,
        email: &str,
        active_only: bool,
    ) -> Result<Option<User>, AuthError> {
        let users = self.users.read().await;

        Ok(users
            .values()
            .find(|u| u.email.as_str() == email && (u.active || !active_only))
            .cloned())
    }

    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, AuthError> {
        Ok(self.users.read().await.get(id).cloned())
    }

    async fn exists_by_email(&self, email: &str) -> Result<bool, AuthError> {
        let users = self.users.read().await;

        Ok(users.values().any(|u| u.email.as_str() == email))
    }

    async fn update_refresh_token(&self, id: &UserId, token: &str) -> Result<(), AuthError> {
        self.modify(id, |user| user.refresh_token = token.to_string())
            .await
    }

    async fn update_last_login(&self, id: &UserId) -> Result<(), AuthError> {
        self.modify(id, |user| user.last_login = Some(Utc::now()))
            .await
    }

    async fn update_fields(&self, id: &UserId, update: &ProfileUpdate) -> Result<User, AuthError> {
        self.modify(id, |user| {
            update.apply_to(user);
            user.clone()
        })
        .await
    }

    async fn update_password(&self, id: &UserId, password_hash: &str) -> Result<(), AuthError> {
        self.modify(id, |user| user.password_hash = password_hash.to_string())
            .await
    }

    async fn deactivate(&self, id: &UserId) -> Result<(), AuthError> {
        self.modify(id, |user| user.active = false).await
    }
}

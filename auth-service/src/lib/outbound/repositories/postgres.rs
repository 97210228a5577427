use async_trait::async_trait;
use chrono::DateTime;
use chrono::Utc;
use sqlx::postgres::PgRow;
use sqlx::FromRow;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::user::models::EmailAddress;
use crate::domain::user::models::ProfileUpdate;
use crate::domain::user::models::User;
use crate::domain::user::models::UserId;
use crate::domain::user::ports::UserRepository;
use crate::user::errors::AuthError;

const USER_COLUMNS: &str =
    "id, email, password_hash, first_name, last_name, active, refresh_token, last_login, created_at";

#[derive(FromRow)]
struct UserRow {
    id: Uuid,
    email: String,
    password_hash: String,
    first_name: String,
    last_name: String,
    active: bool,
    refresh_token: String,
    last_login: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = AuthError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(User {
            id: UserId(row.id),
            email: EmailAddress::new(row.email).map_err(|e| {
                AuthError::Internal(format!("Stored email for user {} is invalid: {}", row.id, e))
            })?,
            password_hash: row.password_hash,
            first_name: row.first_name,
            last_name: row.last_name,
            active: row.active,
            refresh_token: row.refresh_token,
            last_login: row.last_login,
            created_at: row.created_at,
        })
    }
}

fn store_error(e: sqlx::Error) -> AuthError {
    AuthError::StoreUnavailable(e.to_string())
}

fn user_from_row(row: Option<PgRow>) -> Result<Option<User>, AuthError> {
    match row {
        Some(r) => {
            let row = UserRow::from_row(&r).map_err(store_error)?;
            Ok(Some(User::try_from(row)?))
        }
        None => Ok(None),
    }
}

pub struct PostgresUserRepository {
    pool: PgPool,
}

impl PostgresUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    async fn create(&self, user: User) -> Result<User, AuthError> {
        sqlx::query(
            r#"
            INSERT INTO users (id, email, password_hash, first_name, last_name, active, refresh_token, last_login, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(user.id.0)
        .bind(user.email.as_str())
        .bind(&user.password_hash)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(user.active)
        .bind(&user.refresh_token)
        .bind(user.last_login)
        .bind(user.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let Some(db_err) = e.as_database_error() {
                if db_err.is_unique_violation() && db_err.constraint() == Some("users_email_key") {
                    return AuthError::DuplicateEmail(user.email.as_str().to_string());
                }
            }
            store_error(e)
        })?;

        Ok(user)
    }

    async fn find_by_email(
        &self,
        email: &str,
        active_only: bool,
    ) -> Result<Option<User>, AuthError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM users WHERE email = $1 AND (active OR NOT $2)",
            USER_COLUMNS
        ))
        .bind(email)
        .bind(active_only)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_error)?;

        user_from_row(row)
    }

    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, AuthError> {
        let row = sqlx::query(&format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS))
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await
            .map_err(store_error)?;

        user_from_row(row)
    }

    async fn exists_by_email(&self, email: &str) -> Result<bool, AuthError> {
        sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM users WHERE email = $1)")
            .bind(email)
            .fetch_one(&self.pool)
            .await
            .map_err(store_error)
    }

    async fn update_refresh_token(&self, id: &UserId, token: &str) -> Result<(), AuthError> {
        let result = sqlx::query("UPDATE users SET refresh_token = $2 WHERE id = $1")
            .bind(id.0)
            .bind(token)
            .execute(&self.pool)
            .await
            .map_err(store_error)?;

        if result.rows_affected() == 0 {
            return Err(AuthError::UserNotFound(id.to_string()));
        }

        Ok(())
    }

    async fn update_last_login(&self, id: &UserId) -> Result<(), AuthError> {
        sqlx::query("UPDATE users SET last_login = $2 WHERE id = $1")
            .bind(id.0)
            .bind(Utc::now())
            .execute(&self.pool)
            .await
            .map_err(store_error)?;

        Ok(())
    }

    async fn update_fields(&self, id: &UserId, update: &ProfileUpdate) -> Result<User, AuthError> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE users
            SET first_name = COALESCE($2, first_name), last_name = COALESCE($3, last_name)
            WHERE id = $1
            RETURNING {}
            "#,
            USER_COLUMNS
        ))
        .bind(id.0)
        .bind(update.first_name.as_deref())
        .bind(update.last_name.as_deref())
        .fetch_optional(&self.pool)
        .await
        .map_err(store_error)?;

        user_from_row(row)?.ok_or_else(|| AuthError::UserNotFound(id.to_string()))
    }

    async fn update_password(&self, id: &UserId, password_hash: &str) -> Result<(), AuthError> {
        let result = sqlx::query("UPDATE users SET password_hash = $2 WHERE id = $1")
            .bind(id.0)
            .bind(password_hash)
            .execute(&self.pool)
            .await
            .map_err(store_error)?;

        if result.rows_affected() == 0 {
            return Err(AuthError::UserNotFound(id.to_string()));
        }

        Ok(())
    }

    async fn deactivate(&self, id: &UserId) -> Result<(), AuthError> {
        let result = sqlx::query("UPDATE users SET active = FALSE WHERE id = $1")
            .bind(id.0)
            .execute(&self.pool)
            .await
            .map_err(store_error)?;

        if result.rows_affected() == 0 {
            return Err(AuthError::UserNotFound(id.to_string()));
        }

        Ok(())
    }
}

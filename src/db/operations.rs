use async_trait::async_trait;
use chrono::Utc;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::db::models::{normalize_email, NewUser, User, UserUpdate};
use crate::error::AppError;

const USER_COLUMNS: &str =
    "id, email, full_name, hashed_password, is_active, is_superuser, created_at, updated_at";

/// Point lookups and writes against the `users` table.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn get_user_by_id(&self, id: Uuid) -> Result<Option<User>, AppError>;

    /// Case-insensitive lookup.
    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, AppError>;

    /// Fails with `DatabaseError::Duplicate` when the email is taken.
    async fn create_user(&self, user: NewUser) -> Result<User, AppError>;

    async fn list_users(&self, skip: i64, limit: i64) -> Result<Vec<User>, AppError>;

    async fn update_user(&self, id: Uuid, update: UserUpdate) -> Result<Option<User>, AppError>;

    async fn set_active(&self, id: Uuid, active: bool) -> Result<Option<User>, AppError>;
}

pub struct PgUserStore {
    pool: Arc<PgPool>,
}

impl PgUserStore {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    pub async fn connect_with_options(
        url: &str,
        max_connections: u32,
        acquire_timeout: Duration,
    ) -> Result<PgPool, AppError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(acquire_timeout)
            .connect(url)
            .await?;

        Ok(pool)
    }

    pub async fn run_migrations(&self) -> Result<(), AppError> {
        sqlx::migrate!("./migrations").run(self.pool.as_ref()).await?;
        Ok(())
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn get_user_by_id(&self, id: Uuid) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(user)
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE lower(email) = $1"
        ))
        .bind(normalize_email(email))
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(user)
    }

    async fn create_user(&self, user: NewUser) -> Result<User, AppError> {
        let now = Utc::now();
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (id, email, full_name, hashed_password, is_active, is_superuser, created_at, updated_at)
            VALUES ($1, $2, $3, $4, TRUE, FALSE, $5, $5)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(normalize_email(&user.email))
        .bind(&user.full_name)
        .bind(&user.hashed_password)
        .bind(now)
        .fetch_one(self.pool.as_ref())
        .await?;

        Ok(user)
    }

    async fn list_users(&self, skip: i64, limit: i64) -> Result<Vec<User>, AppError> {
        let users = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY created_at, id OFFSET $1 LIMIT $2"
        ))
        .bind(skip)
        .bind(limit)
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(users)
    }

    async fn update_user(&self, id: Uuid, update: UserUpdate) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
            SET email = COALESCE($2, email),
                full_name = COALESCE($3, full_name),
                hashed_password = COALESCE($4, hashed_password),
                updated_at = $5
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(update.email.as_deref().map(normalize_email))
        .bind(update.full_name)
        .bind(update.hashed_password)
        .bind(Utc::now())
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(user)
    }

    async fn set_active(&self, id: Uuid, active: bool) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET is_active = $2, updated_at = $3 WHERE id = $1 RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .bind(active)
        .bind(Utc::now())
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(user)
    }
}

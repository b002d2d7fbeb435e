use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::auth::password::PasswordHasher;
use crate::auth::token::{TokenCodec, TokenType};
use crate::db::{NewUser, User, UserStore, UserUpdate};
use crate::error::{AppError, AuthError, DatabaseError};

#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: &'static str,
    /// Access token lifetime in seconds.
    pub expires_in: i64,
}

/// Fields accepted on registration, already validated by the handler.
#[derive(Debug, Clone)]
pub struct Registration {
    pub email: String,
    pub password: String,
    pub full_name: Option<String>,
}

/// Fields a user may change on their own profile.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub password: Option<String>,
}

pub struct AuthService {
    users: Arc<dyn UserStore>,
    hasher: PasswordHasher,
    tokens: TokenCodec,
}

impl AuthService {
    pub fn new(users: Arc<dyn UserStore>, hasher: PasswordHasher, tokens: TokenCodec) -> Self {
        Self { users, hasher, tokens }
    }

    pub fn tokens(&self) -> &TokenCodec {
        &self.tokens
    }

    pub async fn register(&self, registration: Registration) -> Result<User, AppError> {
        if self.users.get_user_by_email(&registration.email).await?.is_some() {
            return Err(AppError::BadRequest("Email already registered".into()));
        }

        let hashed_password = self.hash_password(registration.password).await?;
        let new_user = NewUser::new(&registration.email, hashed_password, registration.full_name);

        // The unique index still guards the race between lookup and insert
        match self.users.create_user(new_user).await {
            Ok(user) => {
                tracing::info!(user_id = %user.id, "Registered new user");
                Ok(user)
            }
            Err(AppError::DatabaseError(DatabaseError::Duplicate)) => {
                Err(AppError::BadRequest("Email already registered".into()))
            }
            Err(e) => Err(e),
        }
    }

    /// Unknown email and wrong password both answer `InvalidCredentials`,
    /// after the same amount of hashing work.
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<User, AppError> {
        let user = self.users.get_user_by_email(email).await?;

        let hasher = self.hasher.clone();
        let password = password.to_string();
        let stored_hash = user.as_ref().map(|u| u.hashed_password.clone());
        let valid = tokio::task::spawn_blocking(move || match stored_hash {
            Some(hash) => hasher.verify(&password, &hash),
            None => hasher.verify_dummy(&password),
        })
        .await?;

        match user {
            Some(user) if valid => {
                if !user.is_active {
                    return Err(AuthError::InactiveUser.into());
                }
                Ok(user)
            }
            _ => Err(AuthError::InvalidCredentials.into()),
        }
    }

    pub fn create_token_pair(&self, user: &User) -> Result<TokenPair, AppError> {
        let subject = user.id.to_string();
        Ok(TokenPair {
            access_token: self.tokens.issue_access(&subject)?,
            refresh_token: self.tokens.issue_refresh(&subject)?,
            token_type: "bearer",
            expires_in: self.tokens.access_ttl().num_seconds(),
        })
    }

    /// Rotate a refresh token into a fresh pair. The presented token stays
    /// valid until its own expiry since nothing is stored server side.
    pub async fn refresh(&self, refresh_token: &str) -> Result<(User, TokenPair), AppError> {
        let user = self.resolve_token(refresh_token, TokenType::Refresh).await?;
        let pair = self.create_token_pair(&user)?;
        tracing::info!(user_id = %user.id, "Refreshed token pair");
        Ok((user, pair))
    }

    /// Resolve an access token to its active user.
    pub async fn current_user(&self, access_token: &str) -> Result<User, AppError> {
        self.resolve_token(access_token, TokenType::Access).await
    }

    pub async fn update_profile(&self, user: &User, update: ProfileUpdate) -> Result<User, AppError> {
        if let Some(email) = update.email.as_deref() {
            if let Some(existing) = self.users.get_user_by_email(email).await? {
                if existing.id != user.id {
                    return Err(AppError::BadRequest("Email already registered".into()));
                }
            }
        }

        let hashed_password = match update.password {
            Some(password) => Some(self.hash_password(password).await?),
            None => None,
        };
        let changes = UserUpdate {
            email: update.email,
            full_name: update.full_name,
            hashed_password,
        };
        if changes.is_empty() {
            return Ok(user.clone());
        }

        match self.users.update_user(user.id, changes).await {
            Ok(Some(updated)) => Ok(updated),
            Ok(None) => Err(AppError::NotFound("User not found".into())),
            Err(AppError::DatabaseError(DatabaseError::Duplicate)) => {
                Err(AppError::BadRequest("Email already registered".into()))
            }
            Err(e) => Err(e),
        }
    }

    pub async fn deactivate(&self, actor: &User, user_id: Uuid) -> Result<User, AppError> {
        if !actor.is_superuser {
            return Err(AppError::PermissionDenied);
        }

        let user = self
            .users
            .set_active(user_id, false)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".into()))?;
        tracing::info!(user_id = %user.id, actor_id = %actor.id, "Deactivated user");
        Ok(user)
    }

    async fn resolve_token(&self, token: &str, expected: TokenType) -> Result<User, AppError> {
        let claims = self.tokens.decode(token, expected)?;
        let user_id = Uuid::parse_str(&claims.sub).map_err(|_| AuthError::InvalidToken)?;

        let user = self
            .users
            .get_user_by_id(user_id)
            .await?
            .ok_or(AuthError::InvalidToken)?;

        if !user.is_active {
            return Err(AuthError::InactiveUser.into());
        }
        Ok(user)
    }

    async fn hash_password(&self, password: String) -> Result<String, AppError> {
        let hasher = self.hasher.clone();
        tokio::task::spawn_blocking(move || hasher.hash(&password)).await?
    }
}

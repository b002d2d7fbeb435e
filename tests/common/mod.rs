#![allow(dead_code)]

use actix_web::web;
use async_trait::async_trait;
use chrono::Utc;
use gr8diy_api::cache::{CounterHit, CounterStore};
use gr8diy_api::db::{normalize_email, NewUser, User, UserStore, UserUpdate};
use gr8diy_api::error::{CacheError, DatabaseError};
use gr8diy_api::{AppError, AppState, MemoryCounterStore, Settings};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use uuid::Uuid;

pub const API: &str = "/api/v1";

/// In-memory stand-in for the Postgres store.
#[derive(Default)]
pub struct MemoryUserStore {
    users: RwLock<HashMap<Uuid, User>>,
}

impl MemoryUserStore {
    pub async fn make_superuser(&self, email: &str) {
        let mut users = self.users.write().await;
        let email = normalize_email(email);
        if let Some(user) = users.values_mut().find(|u| u.email == email) {
            user.is_superuser = true;
        }
    }

    pub async fn id_of(&self, email: &str) -> Uuid {
        let email = normalize_email(email);
        self.users
            .read()
            .await
            .values()
            .find(|u| u.email == email)
            .map(|u| u.id)
            .expect("user exists")
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn get_user_by_id(&self, id: Uuid) -> Result<Option<User>, AppError> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let email = normalize_email(email);
        Ok(self.users.read().await.values().find(|u| u.email == email).cloned())
    }

    async fn create_user(&self, user: NewUser) -> Result<User, AppError> {
        let mut users = self.users.write().await;
        let email = normalize_email(&user.email);
        if users.values().any(|u| u.email == email) {
            return Err(DatabaseError::Duplicate.into());
        }
        let now = Utc::now();
        let created = User {
            id: Uuid::new_v4(),
            email,
            full_name: user.full_name,
            hashed_password: user.hashed_password,
            is_active: true,
            is_superuser: false,
            created_at: now,
            updated_at: now,
        };
        users.insert(created.id, created.clone());
        Ok(created)
    }

    async fn list_users(&self, skip: i64, limit: i64) -> Result<Vec<User>, AppError> {
        let mut users: Vec<User> = self.users.read().await.values().cloned().collect();
        users.sort_by_key(|u| (u.created_at, u.id));
        Ok(users
            .into_iter()
            .skip(skip as usize)
            .take(limit as usize)
            .collect())
    }

    async fn update_user(&self, id: Uuid, update: UserUpdate) -> Result<Option<User>, AppError> {
        let mut users = self.users.write().await;
        if let Some(email) = update.email.as_deref().map(normalize_email) {
            if users.values().any(|u| u.email == email && u.id != id) {
                return Err(DatabaseError::Duplicate.into());
            }
        }
        Ok(users.get_mut(&id).map(|user| {
            if let Some(email) = update.email {
                user.email = normalize_email(&email);
            }
            if let Some(full_name) = update.full_name {
                user.full_name = Some(full_name);
            }
            if let Some(hash) = update.hashed_password {
                user.hashed_password = hash;
            }
            user.updated_at = Utc::now();
            user.clone()
        }))
    }

    async fn set_active(&self, id: Uuid, active: bool) -> Result<Option<User>, AppError> {
        Ok(self.users.write().await.get_mut(&id).map(|user| {
            user.is_active = active;
            user.updated_at = Utc::now();
            user.clone()
        }))
    }
}

/// A counting store whose backend is always down.
pub struct UnreachableCounterStore;

#[async_trait]
impl CounterStore for UnreachableCounterStore {
    async fn hit(&self, _key: &str, _window: Duration) -> Result<CounterHit, CacheError> {
        Err(CacheError::ConnectionError("Connection refused (os error 111)".into()))
    }

    async fn ping(&self) -> Result<(), CacheError> {
        Err(CacheError::ConnectionError("Connection refused (os error 111)".into()))
    }
}

pub struct TestContext {
    pub state: web::Data<AppState>,
    pub users: Arc<MemoryUserStore>,
}

pub fn context_with(settings: Settings, counters: Option<Arc<dyn CounterStore>>) -> TestContext {
    let users = Arc::new(MemoryUserStore::default());
    let state = AppState::from_parts(settings, users.clone(), counters)
        .expect("Failed to build test state");
    TestContext {
        state: web::Data::new(state),
        users,
    }
}

pub fn context() -> TestContext {
    let settings = Settings::new_for_test().expect("Failed to load test config");
    context_with(settings, Some(Arc::new(MemoryCounterStore::new())))
}

pub fn path(route: &str) -> String {
    format!("{}{}", API, route)
}

pub fn register_request(email: &str, password: &str) -> actix_web::test::TestRequest {
    actix_web::test::TestRequest::post()
        .uri(&path("/auth/register"))
        .set_json(serde_json::json!({
            "email": email,
            "password": password,
            "full_name": "Test Maker"
        }))
}

pub fn login_request(email: &str, password: &str) -> actix_web::test::TestRequest {
    actix_web::test::TestRequest::post()
        .uri(&path("/auth/login"))
        .set_json(serde_json::json!({
            "email": email,
            "password": password
        }))
}

pub fn bearer(token: &str) -> (actix_web::http::header::HeaderName, String) {
    (actix_web::http::header::AUTHORIZATION, format!("Bearer {}", token))
}

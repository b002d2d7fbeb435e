pub mod auth;
pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod users;

use std::sync::Arc;
use std::time::Duration;
use actix_web::{web, HttpResponse};
use actix_web::middleware::from_fn;
use sqlx::PgPool;
use tracing::{info, warn};

pub use error::AppError;
pub type Result<T> = std::result::Result<T, AppError>;
pub use crate::config::Settings;

pub use auth::{AuthService, PasswordHasher, RateLimitConfig, RateLimiter, TokenCodec};
pub use cache::{CounterStore, MemoryCounterStore, RedisCounterStore};
pub use db::{PgUserStore, User, UserStore};

use crate::config::RateLimitBackend;

/// Application state shared across all workers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Settings>,
    pub db_pool: Option<Arc<PgPool>>,
    pub users: Arc<dyn UserStore>,
    pub counters: Option<Arc<dyn CounterStore>>,
    pub auth_service: Arc<AuthService>,
    pub rate_limiter: Arc<RateLimiter>,
}

impl AppState {
    /// Connect Postgres (required) and the counting store (optional: without
    /// it the rate limiter fails open).
    pub async fn new(config: Settings) -> Result<Self> {
        let pool = PgUserStore::connect_with_options(
            &config.database.url,
            config.database.max_connections,
            Duration::from_secs(config.database.acquire_timeout_secs),
        )
        .await?;
        let pool = Arc::new(pool);
        let store = PgUserStore::new(pool.clone());

        if config.database.run_migrations {
            store.run_migrations().await?;
            info!("Database migrations applied");
        }

        let counters: Option<Arc<dyn CounterStore>> = match config.rate_limit.backend {
            RateLimitBackend::Memory => {
                info!("Using in-process rate limit counters");
                Some(Arc::new(MemoryCounterStore::new()))
            }
            RateLimitBackend::Redis => match RedisCounterStore::connect(&config.redis.url).await {
                Ok(redis) => {
                    info!("Connected to Redis");
                    Some(Arc::new(redis))
                }
                Err(e) => {
                    warn!("Failed to connect to Redis, rate limiting will fail open: {}", e);
                    None
                }
            },
        };

        let mut state = Self::from_parts(config, Arc::new(store), counters)?;
        state.db_pool = Some(pool);
        Ok(state)
    }

    /// Assemble the services over already constructed stores.
    pub fn from_parts(
        config: Settings,
        users: Arc<dyn UserStore>,
        counters: Option<Arc<dyn CounterStore>>,
    ) -> Result<Self> {
        let hasher = PasswordHasher::new(config.auth.bcrypt_cost)?;
        let tokens = TokenCodec::from_config(&config.auth)?;
        let auth_service = AuthService::new(users.clone(), hasher, tokens);
        let rate_limiter = RateLimiter::new(counters.clone(), RateLimitConfig::from_settings(&config));

        Ok(Self {
            config: Arc::new(config),
            db_pool: None,
            users,
            counters,
            auth_service: Arc::new(auth_service),
            rate_limiter: Arc::new(rate_limiter),
        })
    }

    pub async fn shutdown(&self) -> Result<()> {
        if let Some(pool) = &self.db_pool {
            pool.close().await;
        }
        Ok(())
    }
}

/// Malformed JSON bodies answer with the standard error envelope.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(64 * 1024)
        .error_handler(|err, _req| AppError::ValidationError(err.to_string()).into())
}

pub fn query_config() -> web::QueryConfig {
    web::QueryConfig::default()
        .error_handler(|err, _req| AppError::ValidationError(err.to_string()).into())
}

/// A path segment that does not parse names no resource.
pub fn path_config() -> web::PathConfig {
    web::PathConfig::default().error_handler(|err, req| {
        tracing::debug!("Unparseable path {}: {}", req.path(), err);
        AppError::NotFound("Resource not found".into()).into()
    })
}

/// `/auth` and `/users` routes, mounted under the API prefix.
pub fn api_routes(cfg: &mut web::ServiceConfig) {
    use crate::auth::handlers::{login, logout, refresh, register};
    use crate::users::handlers::{deactivate_user, list_users, read_me, update_me};

    cfg.service(
        web::scope("/auth")
            .route("/register", web::post().to(register))
            .route("/login", web::post().to(login))
            .route("/refresh", web::post().to(refresh))
            .route("/logout", web::post().to(logout)),
    )
    .service(
        web::scope("/users")
            .route("", web::get().to(list_users))
            .route("/", web::get().to(list_users))
            .route("/me", web::get().to(read_me))
            .route("/me", web::patch().to(update_me))
            .route("/{id}/deactivate", web::post().to(deactivate_user)),
    );
}

/// Every route of the service. The API scope runs behind the rate limiter.
pub fn configure(api_prefix: String) -> impl FnOnce(&mut web::ServiceConfig) {
    move |cfg| {
        cfg.app_data(json_config())
            .app_data(query_config())
            .app_data(path_config())
            .route("/", web::get().to(root))
            .route("/health", web::get().to(health_check))
            .service(
                web::scope(&api_prefix)
                    .wrap(from_fn(middleware::rate_limit))
                    .configure(api_routes),
            );
    }
}

pub async fn root(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "message": format!("Welcome to {}", state.config.app_name),
        "version": state.config.app_version,
    }))
}

/// Health check endpoint handler
/// Returns a JSON response with server status, timestamp and Redis reachability
pub async fn health_check(state: web::Data<AppState>) -> HttpResponse {
    let redis = match (&state.config.rate_limit.backend, &state.counters) {
        (RateLimitBackend::Memory, _) => "not_configured",
        (RateLimitBackend::Redis, None) => "disconnected",
        (RateLimitBackend::Redis, Some(counters)) => match counters.ping().await {
            Ok(()) => "connected",
            Err(e) => {
                warn!("Redis health check failed: {}", e);
                "error"
            }
        },
    };

    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "redis": redis,
    }))
}

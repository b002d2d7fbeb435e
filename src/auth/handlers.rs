use actix_web::cookie::{time::Duration as CookieDuration, Cookie, SameSite};
use actix_web::{web, HttpRequest, HttpResponse};
use serde::{Deserialize, Serialize};
use tracing::info;
use validator::Validate;

use crate::auth::service::{Registration, TokenPair};
use crate::db::UserResponse;
use crate::error::{AppError, AuthError};
use crate::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[validate(length(min = 8, max = 72, message = "Password must be between 8 and 72 characters"))]
    pub password: String,
    #[serde(alias = "display_name")]
    #[validate(length(max = 255))]
    pub full_name: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

impl From<&TokenPair> for AuthResponse {
    fn from(pair: &TokenPair) -> Self {
        Self {
            access_token: pair.access_token.clone(),
            token_type: pair.token_type.to_string(),
            expires_in: pair.expires_in,
        }
    }
}

fn cookie_path(state: &AppState) -> String {
    format!("{}/auth", state.config.server.api_prefix.trim_end_matches('/'))
}

/// HttpOnly, SameSite=Lax, Secure in production.
fn refresh_cookie(state: &AppState, token: String) -> Cookie<'static> {
    let max_age = state.auth_service.tokens().refresh_ttl().num_seconds();
    Cookie::build(state.config.auth.refresh_cookie_name.clone(), token)
        .path(cookie_path(state))
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(state.config.is_production())
        .max_age(CookieDuration::seconds(max_age))
        .finish()
}

fn removal_cookie(state: &AppState) -> Cookie<'static> {
    let mut cookie = Cookie::build(state.config.auth.refresh_cookie_name.clone(), "")
        .path(cookie_path(state))
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(state.config.is_production())
        .finish();
    cookie.make_removal();
    cookie
}

fn token_response(state: &AppState, pair: TokenPair) -> HttpResponse {
    let body = AuthResponse::from(&pair);
    HttpResponse::Ok()
        .cookie(refresh_cookie(state, pair.refresh_token))
        .json(body)
}

pub async fn register(
    req: web::Json<RegisterRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    req.validate()?;
    let req = req.into_inner();

    let user = state
        .auth_service
        .register(Registration {
            email: req.email,
            password: req.password,
            full_name: req.full_name,
        })
        .await?;

    Ok(HttpResponse::Created().json(UserResponse::from(&user)))
}

pub async fn login(
    req: web::Json<LoginRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    // Shape errors answer like bad credentials so nothing about the account leaks
    if req.validate().is_err() {
        return Err(AuthError::InvalidCredentials.into());
    }

    let user = state.auth_service.authenticate(&req.email, &req.password).await?;
    let pair = state.auth_service.create_token_pair(&user)?;
    info!(user_id = %user.id, "Login successful");

    Ok(token_response(&state, pair))
}

/// The refresh token comes from the JSON body when present, else the cookie.
pub async fn refresh(
    http_req: HttpRequest,
    body: Option<web::Json<RefreshRequest>>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let token = body
        .and_then(|b| b.into_inner().refresh_token)
        .filter(|t| !t.is_empty())
        .or_else(|| {
            http_req
                .cookie(&state.config.auth.refresh_cookie_name)
                .map(|c| c.value().to_string())
                .filter(|t| !t.is_empty())
        })
        .ok_or(AuthError::MissingToken)?;

    let (_, pair) = state.auth_service.refresh(&token).await?;
    Ok(token_response(&state, pair))
}

/// Clears the refresh cookie. Already issued tokens stay valid until they
/// expire because no server-side revocation list exists.
pub async fn logout(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok()
        .cookie(removal_cookie(&state))
        .json(serde_json::json!({
            "message": "Successfully logged out"
        }))
}

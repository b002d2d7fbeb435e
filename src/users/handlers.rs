use actix_web::{web, HttpResponse};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::auth::service::ProfileUpdate;
use crate::auth::AuthenticatedUser;
use crate::db::UserResponse;
use crate::error::AppError;
use crate::AppState;

const MAX_PAGE_SIZE: i64 = 100;

#[derive(Debug, Deserialize)]
pub struct ListUsersQuery {
    #[serde(default)]
    pub skip: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    MAX_PAGE_SIZE
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateMeRequest {
    #[validate(email(message = "Invalid email address"))]
    pub email: Option<String>,
    #[validate(length(max = 255))]
    pub full_name: Option<String>,
    #[validate(length(min = 8, max = 72, message = "Password must be between 8 and 72 characters"))]
    pub password: Option<String>,
}

pub async fn read_me(user: AuthenticatedUser) -> HttpResponse {
    HttpResponse::Ok().json(UserResponse::from(&*user))
}

pub async fn update_me(
    user: AuthenticatedUser,
    req: web::Json<UpdateMeRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    req.validate()?;
    let req = req.into_inner();

    let updated = state
        .auth_service
        .update_profile(
            &user,
            ProfileUpdate {
                email: req.email,
                full_name: req.full_name,
                password: req.password,
            },
        )
        .await?;

    tracing::info!(user_id = %updated.id, "Updated profile");
    Ok(HttpResponse::Ok().json(UserResponse::from(&updated)))
}

pub async fn list_users(
    _user: AuthenticatedUser,
    query: web::Query<ListUsersQuery>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let skip = query.skip.max(0);
    let limit = query.limit.clamp(1, MAX_PAGE_SIZE);

    let users = state.users.list_users(skip, limit).await?;
    let body: Vec<UserResponse> = users.iter().map(UserResponse::from).collect();
    Ok(HttpResponse::Ok().json(body))
}

pub async fn deactivate_user(
    user: AuthenticatedUser,
    path: web::Path<Uuid>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let target = state
        .auth_service
        .deactivate(&user, path.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(UserResponse::from(&target)))
}

//! services/api/src/web/users.rs
//!
//! User account endpoints. Passwords are hashed before they reach the store and
//! no response ever carries the hash.

use axum::{extract::State, http::StatusCode, response::IntoResponse};
use learnstake_core::domain::{NewUser, Role, UserChanges};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::web::{
    auth::hash_password,
    extract::{ApiJson, ApiPath},
    protocol::{ApiResponse, DeletedView, RegisterUserRequest, UpdateUserRequest, UserView},
    state::AppState,
};

fn required(value: Option<String>, field: &str) -> ApiResult<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::validation(format!("{} is required", field)))
}

fn parse_role(raw: &str) -> ApiResult<Role> {
    raw.parse::<Role>().map_err(ApiError::Validation)
}

/// POST /api/users/register
#[utoipa::path(
    post,
    path = "/api/users/register",
    request_body = RegisterUserRequest,
    responses(
        (status = 201, description = "User created", body = UserView),
        (status = 400, description = "Missing field or email already registered")
    ),
    tag = "users"
)]
pub async fn register_user_handler(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<RegisterUserRequest>,
) -> ApiResult<impl IntoResponse> {
    let name = required(req.name, "name")?;
    let email = required(req.email, "email")?;
    let password = req
        .password
        .filter(|p| !p.is_empty())
        .ok_or_else(|| ApiError::validation("password is required"))?;
    let role = match req.role.as_deref() {
        Some(raw) => parse_role(raw)?,
        None => Role::default(),
    };

    if state.db.find_user_by_email(&email).await?.is_some() {
        return Err(ApiError::validation("User already exists"));
    }

    let user = state
        .db
        .create_user(NewUser {
            name,
            email,
            phone: req.phone,
            hashed_password: hash_password(&password)?,
            role,
        })
        .await?;
    info!("Registered user {} with role {}", user.id, user.role);

    Ok((
        StatusCode::CREATED,
        ApiResponse::ok("User registered successfully.", UserView::from(user)),
    ))
}

/// GET /api/users/all
#[utoipa::path(
    get,
    path = "/api/users/all",
    responses((status = 200, description = "All users", body = [UserView])),
    tag = "users"
)]
pub async fn list_users_handler(
    State(state): State<Arc<AppState>>,
) -> ApiResult<impl IntoResponse> {
    let users = state.db.list_users().await?;
    let views: Vec<UserView> = users.into_iter().map(UserView::from).collect();
    Ok(ApiResponse::ok("Users retrieved successfully.", views))
}

/// GET /api/users/{id}
#[utoipa::path(
    get,
    path = "/api/users/{id}",
    params(("id" = Uuid, Path, description = "User id")),
    responses(
        (status = 200, description = "The user", body = UserView),
        (status = 404, description = "User not found")
    ),
    tag = "users"
)]
pub async fn get_user_handler(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let user = state.db.get_user_by_id(id).await?;
    Ok(ApiResponse::ok("User retrieved successfully.", UserView::from(user)))
}

/// PUT /api/users/update/{id}
#[utoipa::path(
    put,
    path = "/api/users/update/{id}",
    params(("id" = Uuid, Path, description = "User id")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "Updated user", body = UserView),
        (status = 400, description = "Invalid field or email taken"),
        (status = 404, description = "User not found")
    ),
    tag = "users"
)]
pub async fn update_user_handler(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<UpdateUserRequest>,
) -> ApiResult<impl IntoResponse> {
    state.db.get_user_by_id(id).await?;

    let name = req.name.map(|n| n.trim().to_string());
    if matches!(&name, Some(n) if n.is_empty()) {
        return Err(ApiError::validation("name cannot be blank"));
    }

    let email = req.email.map(|e| e.trim().to_string());
    if let Some(email) = &email {
        if email.is_empty() {
            return Err(ApiError::validation("email cannot be blank"));
        }
        if let Some(other) = state.db.find_user_by_email(email).await? {
            if other.id != id {
                return Err(ApiError::validation("Email is already in use"));
            }
        }
    }

    let role = req.role.as_deref().map(parse_role).transpose()?;
    let hashed_password = match req.password.as_deref() {
        Some(password) if !password.is_empty() => Some(hash_password(password)?),
        _ => None,
    };

    let user = state
        .db
        .update_user(
            id,
            UserChanges {
                name,
                email,
                phone: req.phone,
                hashed_password,
                role,
            },
        )
        .await?;
    info!("Updated user {}", id);
    Ok(ApiResponse::ok("User updated successfully.", UserView::from(user)))
}

/// DELETE /api/users/delete/{id}
#[utoipa::path(
    delete,
    path = "/api/users/delete/{id}",
    params(("id" = Uuid, Path, description = "User id")),
    responses(
        (status = 200, description = "User deleted", body = DeletedView),
        (status = 404, description = "User not found")
    ),
    tag = "users"
)]
pub async fn delete_user_handler(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<impl IntoResponse> {
    state.db.delete_user(id).await?;
    info!("Deleted user {}", id);
    Ok(ApiResponse::ok("User deleted", DeletedView { id }))
}

//! services/api/src/web/auth.rs
//!
//! Authentication endpoints: login and token verification, plus the password
//! hashing helpers shared with the user handlers.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{extract::State, http::HeaderMap, response::IntoResponse};
use learnstake_core::ports::PortError;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::error::{ApiError, ApiResult};
use crate::web::{
    extract::ApiJson,
    middleware::extract_token,
    protocol::{ApiResponse, LoginData, LoginRequest, TokenData, UserSummary},
    state::AppState,
    token::{issue_token, verify_token},
};

//=========================================================================================
// Password Helpers
//=========================================================================================

pub(crate) fn hash_password(password: &str) -> ApiResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| {
            error!("Failed to hash password: {:?}", e);
            ApiError::Internal("Failed to hash password".to_string())
        })
}

fn password_matches(password: &str, hashed: &str) -> ApiResult<bool> {
    let parsed_hash = PasswordHash::new(hashed).map_err(|e| {
        error!("Failed to parse password hash: {:?}", e);
        ApiError::Internal("Authentication error".to_string())
    })?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

//=========================================================================================
// Handlers
//=========================================================================================

/// POST /api/auth/login - Exchange admin credentials for a one-hour token
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = LoginData),
        (status = 400, description = "Email or password missing"),
        (status = 401, description = "Invalid password"),
        (status = 403, description = "Account is not an admin"),
        (status = 404, description = "User not found")
    ),
    tag = "auth"
)]
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> ApiResult<impl IntoResponse> {
    if req.email.trim().is_empty() || req.password.is_empty() {
        return Err(ApiError::validation("Email and password are required"));
    }

    // 1. Get user by email
    let user = state
        .db
        .get_user_credentials_by_email(req.email.trim())
        .await
        .map_err(|e| match e {
            PortError::NotFound(_) => ApiError::NotFound("User not found".to_string()),
            other => other.into(),
        })?;

    // 2. Only privileged accounts may log in
    if !user.role.is_privileged() {
        warn!("Login refused for non-admin account {}", user.user_id);
        return Err(ApiError::Forbidden(
            "Only admin users are allowed to log in".to_string(),
        ));
    }

    // 3. Verify password
    if !password_matches(&req.password, &user.hashed_password)? {
        return Err(ApiError::Unauthenticated("Invalid password".to_string()));
    }

    // 4. Issue the token
    let token = issue_token(&user, &state.config.jwt_secret)?;
    info!("User {} logged in", user.user_id);

    Ok(ApiResponse::ok(
        "Login successful",
        LoginData {
            token,
            user: UserSummary {
                id: user.user_id,
                email: user.email,
                role: user.role.to_string(),
            },
        },
    ))
}

/// POST /api/auth/verify-token - Check a token and return its claims
#[utoipa::path(
    post,
    path = "/api/auth/verify-token",
    responses(
        (status = 200, description = "Token is valid", body = TokenData),
        (status = 401, description = "Token missing, expired or wrongly signed")
    ),
    params(
        ("x-auth-token" = Option<String>, Header, description = "The token; `Authorization` is also accepted.")
    ),
    tag = "auth"
)]
pub async fn verify_token_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> ApiResult<impl IntoResponse> {
    let token = extract_token(&headers)
        .ok_or_else(|| ApiError::Unauthenticated("No token provided".to_string()))?;
    let claims = verify_token(token, &state.config.jwt_secret)?;
    Ok(ApiResponse::ok("Token is valid", TokenData::from(claims)))
}

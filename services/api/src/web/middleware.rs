//! services/api/src/web/middleware.rs
//!
//! Authentication middleware for protecting routes.

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::debug;

use crate::error::ApiError;
use crate::web::{state::AppState, token::verify_token};

/// Header some clients use instead of `Authorization`.
pub const AUTH_TOKEN_HEADER: &str = "x-auth-token";

/// Strips an optional `Bearer` scheme. A bare scheme leaves an empty token.
fn strip_bearer(value: &str) -> &str {
    let value = value.trim();
    match value.get(..6) {
        Some(scheme)
            if scheme.eq_ignore_ascii_case("bearer")
                && value[6..].chars().next().map_or(true, char::is_whitespace) =>
        {
            value[6..].trim()
        }
        _ => value,
    }
}

/// Pulls the raw token out of `Authorization` (with or without a `Bearer ` prefix)
/// or, failing that, out of `x-auth-token`. Empty values count as absent.
pub fn extract_token(headers: &HeaderMap) -> Option<&str> {
    let from_authorization = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(strip_bearer)
        .filter(|token| !token.is_empty());

    from_authorization.or_else(|| {
        headers
            .get(AUTH_TOKEN_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|token| !token.is_empty())
    })
}

/// Middleware that validates the bearer token and attaches the caller's identity.
///
/// If valid, inserts an `AuthUser` into request extensions for handlers to use.
/// If missing or invalid, returns 401 Unauthenticated.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    // 1. Extract the token
    let token = extract_token(req.headers()).ok_or_else(|| {
        debug!("Rejected {} {}: no token", req.method(), req.uri().path());
        ApiError::Unauthenticated("No token, authorization denied".to_string())
    })?;

    // 2. Verify signature and expiry
    let claims = verify_token(token, &state.config.jwt_secret)?;
    let user = claims.auth_user()?;

    // 3. Insert the identity into request extensions
    req.extensions_mut().insert(user);

    // 4. Continue to the handler
    Ok(next.run(req).await)
}

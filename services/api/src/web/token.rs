//! services/api/src/web/token.rs
//!
//! Issues and verifies the signed bearer credential handed out at login.
//! Tokens are HS256 JWTs that expire one hour after issue.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use learnstake_core::domain::{Role, UserCredentials};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};
use uuid::Uuid;

use crate::error::ApiError;

/// How long an issued token stays valid.
pub const TOKEN_LIFETIME_MINUTES: i64 = 60;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Claims {
    /// The user id.
    pub sub: Uuid,
    pub role: String,
    pub iat: i64,
    pub exp: i64,
}

/// The identity the auth guard attaches to a request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub role: Role,
}

pub fn issue_token(user: &UserCredentials, secret: &str) -> Result<String, ApiError> {
    let now = Utc::now();
    let claims = Claims {
        sub: user.user_id,
        role: user.role.as_str().to_string(),
        iat: now.timestamp(),
        exp: (now + Duration::minutes(TOKEN_LIFETIME_MINUTES)).timestamp(),
    };
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| {
        error!("Failed to sign token: {:?}", e);
        ApiError::Internal("Failed to sign token".to_string())
    })
}

/// Checks signature and expiry. Every failure maps to the same `Unauthenticated` error.
pub fn verify_token(token: &str, secret: &str) -> Result<Claims, ApiError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|e| {
        debug!("Rejected token: {}", e);
        ApiError::Unauthenticated("Token is not valid".to_string())
    })
}

impl Claims {
    pub fn auth_user(&self) -> Result<AuthUser, ApiError> {
        let role = self
            .role
            .parse::<Role>()
            .map_err(|_| ApiError::Unauthenticated("Token is not valid".to_string()))?;
        Ok(AuthUser {
            user_id: self.sub,
            role,
        })
    }
}

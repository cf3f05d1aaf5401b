use std::time::{Duration, SystemTime, UNIX_EPOCH};

use axum::{extract::FromRequestParts, http::header};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::{error::AppError, gateway::ProfileGateway, models::UserProfile, state::AppState};

/// Claims issued by the auth provider. `sub` is the user id.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
}

#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: String,
}

/// Signs a token for `user_id` valid for `ttl`.
pub fn issue_token(secret: &str, user_id: &str, ttl: Duration) -> Result<String, AppError> {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    let claims = Claims {
        sub: user_id.to_string(),
        exp: (now + ttl).as_secs() as usize,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|err| AppError::Internal(anyhow::anyhow!("failed to sign token: {err}")))
}

pub fn verify_token(secret: &str, token: &str) -> Result<AuthUser, AppError> {
    let decoded = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| AppError::Unauthorized("Invalid or expired token".into()))?;

    let user_id = decoded.claims.sub.trim();
    if user_id.is_empty() {
        return Err(AppError::Unauthorized("Invalid user id in token".into()));
    }
    Ok(AuthUser {
        user_id: user_id.to_string(),
    })
}

/// Verifies `token` and checks that it was issued to `user_id`.
pub fn verify_token_for(secret: &str, token: &str, user_id: &str) -> Result<AuthUser, AppError> {
    let user = verify_token(secret, token)?;
    if user.user_id != user_id.trim() {
        return Err(AppError::Unauthorized(format!(
            "token was issued to {}",
            user.user_id
        )));
    }
    Ok(user)
}

/// Loads the caller's profile and rejects non-admins.
pub async fn ensure_admin(state: &AppState, user: &AuthUser) -> Result<UserProfile, AppError> {
    let profile = state.gateway.find_profile(&user.user_id).await?;
    match profile {
        Some(profile) if profile.is_admin => Ok(profile),
        _ => {
            tracing::warn!(user_id = %user.user_id, "admin access denied");
            Err(AppError::Forbidden)
        }
    }
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;
    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .ok_or_else(|| AppError::Unauthorized("Missing Authorization header".into()))?;

        let auth_str = auth_header
            .to_str()
            .map_err(|_| AppError::Unauthorized("Invalid Authorization header".into()))?;

        let token = auth_str
            .strip_prefix("Bearer ")
            .ok_or_else(|| AppError::Unauthorized("Invalid Authorization scheme".into()))?
            .trim();

        verify_token(&state.config.jwt_secret, token)
    }
}

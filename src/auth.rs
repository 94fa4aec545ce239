use anyhow::Context;
use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

use crate::{error::ApiError, AppState};

/// Claims carried inside a bearer token.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct TokenClaims {
    pub user_id: Uuid,
    pub username: String,
    pub issued_at: u64,
}

// Wire format of a token before base64: the serialized claims plus an
// HMAC-SHA256 over those exact bytes.
#[derive(Serialize, Deserialize, Debug)]
struct SignedToken {
    body: Vec<u8>,
    hmac: Vec<u8>,
}

fn unix_now() -> anyhow::Result<u64> {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .context("system clock before unix epoch")?;
    Ok(now.as_secs())
}

/// Issues a signed bearer token for the given user.
pub fn mint_token(user_id: Uuid, username: &str, key: &str) -> anyhow::Result<String> {
    let claims = TokenClaims {
        user_id,
        username: username.to_string(),
        issued_at: unix_now()?,
    };
    sign_claims(&claims, key)
}

fn sign_claims(claims: &TokenClaims, key: &str) -> anyhow::Result<String> {
    let body = serde_json::to_vec(claims)?;
    let hmac = hmac_sha256::HMAC::mac(&body, key.as_bytes()).to_vec();
    let token = serde_json::to_vec(&SignedToken { body, hmac })?;
    Ok(base64::encode(token))
}

/// Verifies a bearer token and returns its claims. Any failure, whether a
/// malformed token, a bad signature or an expired issue time, maps to
/// `Unauthenticated` so callers cannot distinguish the cases.
pub fn verify_token(token: &str, key: &str, ttl_seconds: u64) -> Result<TokenClaims, ApiError> {
    let raw = base64::decode(token).map_err(|_| ApiError::Unauthenticated)?;
    let signed: SignedToken =
        serde_json::from_slice(&raw).map_err(|_| ApiError::Unauthenticated)?;

    let expected = hmac_sha256::HMAC::mac(&signed.body, key.as_bytes());
    if !constant_time_eq::constant_time_eq(&expected, &signed.hmac) {
        return Err(ApiError::Unauthenticated);
    }

    let claims: TokenClaims =
        serde_json::from_slice(&signed.body).map_err(|_| ApiError::Unauthenticated)?;
    let now = unix_now().map_err(|_| ApiError::Unauthenticated)?;
    if claims.issued_at.saturating_add(ttl_seconds) < now {
        return Err(ApiError::Unauthenticated);
    }
    Ok(claims)
}

pub fn hash_password(password: &str) -> anyhow::Result<String> {
    bcrypt::hash(password, bcrypt::DEFAULT_COST).context("failed to hash password")
}

pub fn verify_password(password: &str, hash: &str) -> anyhow::Result<bool> {
    bcrypt::verify(password, hash).context("failed to verify password")
}

/// Minimal structural email check: one `@`, a non-empty local part and a
/// domain with an interior dot.
pub fn valid_email(email: &str) -> bool {
    let mut parts = email.splitn(2, '@');
    let local = parts.next().unwrap_or("");
    let domain = parts.next().unwrap_or("");
    if local.is_empty() || domain.is_empty() {
        return false;
    }
    let dot = match domain.find('.') {
        Some(i) => i,
        None => return false,
    };
    dot > 0 && dot < domain.len() - 1 && !domain.contains('@')
}

/// Extracted from the `Authorization: Bearer` header when the token
/// verifies. Handlers take this as an argument to require authentication.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
    pub username: String,
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);

        let header_value = parts
            .headers
            .get(header::AUTHORIZATION)
            .ok_or(ApiError::Unauthenticated)?
            .to_str()
            .map_err(|_| ApiError::Unauthenticated)?;
        let token = header_value
            .strip_prefix("Bearer ")
            .ok_or(ApiError::Unauthenticated)?;

        let claims = verify_token(
            token,
            &app_state.config.token_key,
            app_state.config.token_ttl_seconds,
        )?;

        Ok(AuthenticatedUser {
            user_id: claims.user_id,
            username: claims.username,
        })
    }
}

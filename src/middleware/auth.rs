// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! JWT session middleware.
//!
//! Sessions are stateless HS256 tokens minted at register, login, and
//! Google sign-in. Handlers downstream of [`require_auth`] read the
//! [`Session`] extension; role checks against the live profile happen in
//! the service layer, not here.

use crate::error::AppError;
use crate::models::{UserProfile, UserRole};
use crate::AppState;
use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Session cookie name.
pub const SESSION_COOKIE: &str = "rollcall_token";

/// Session token lifetime in seconds (30 days).
const SESSION_TTL_SECS: usize = 30 * 24 * 60 * 60;

/// JWT claims structure.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (user ID in the identity store)
    pub sub: String,
    /// Role snapshot taken when the token was minted
    pub role: UserRole,
    /// Account email
    pub email: String,
    /// Display name
    pub name: String,
    /// Expiration time (Unix timestamp)
    pub exp: usize,
    /// Issued at (Unix timestamp)
    pub iat: usize,
}

/// Authenticated session extracted from a JWT.
///
/// The role here is the snapshot from mint time. Admin operations that
/// must not trust a stale snapshot re-read the profile document instead.
#[derive(Debug, Clone)]
pub struct Session {
    pub user_id: String,
    pub role: UserRole,
    pub email: String,
    pub name: String,
}

/// Middleware that requires a valid session token.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    // Try cookie first, then header
    let token = if let Some(cookie) = jar.get(SESSION_COOKIE) {
        cookie.value().to_string()
    } else {
        let auth_header = request
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok());

        match auth_header {
            Some(h) if h.starts_with("Bearer ") => h[7..].to_string(),
            _ => return Err(AppError::Unauthorized),
        }
    };

    let session = decode_session_token(&token, &state.config.jwt_signing_key)?;
    request.extensions_mut().insert(session);

    Ok(next.run(request).await)
}

/// Decode and validate a session token.
pub fn decode_session_token(token: &str, signing_key: &[u8]) -> Result<Session, AppError> {
    let key = DecodingKey::from_secret(signing_key);
    let validation = Validation::new(Algorithm::HS256);

    let token_data =
        decode::<Claims>(token, &key, &validation).map_err(|_| AppError::InvalidToken)?;

    Ok(Session {
        user_id: token_data.claims.sub,
        role: token_data.claims.role,
        email: token_data.claims.email,
        name: token_data.claims.name,
    })
}

/// Create a session JWT for a user.
pub fn create_session_token(profile: &UserProfile, signing_key: &[u8]) -> anyhow::Result<String> {
    use jsonwebtoken::{encode, EncodingKey, Header};
    use std::time::{SystemTime, UNIX_EPOCH};

    let now = SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs() as usize;

    let claims = Claims {
        sub: profile.uid.clone(),
        role: profile.role,
        email: profile.email.clone(),
        name: profile.name.clone(),
        iat: now,
        exp: now + SESSION_TTL_SECS,
    };

    Ok(encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(signing_key),
    )?)
}

// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Authentication routes: registration, login, Google sign-in, session
//! hydration, and password reset.

use axum::{
    extract::State,
    http::HeaderMap,
    routing::{get, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

use crate::error::{AppError, Result};
use crate::middleware::{create_session_token, Session};
use crate::models::{PublicUser, UserRole};
use crate::routes::{request_meta, validate_payload, MessageResponse};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/google", post(google_sign_in))
        .route("/auth/password-reset", post(password_reset))
}

/// Routes that need a valid session; layered with `require_auth` in
/// routes/mod.rs.
pub fn session_routes() -> Router<Arc<AppState>> {
    Router::new().route("/auth/session", get(get_session))
}

// ─── Registration ────────────────────────────────────────────

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterPayload {
    #[validate(length(min = 1, max = 100, message = "Name is required"))]
    pub name: String,
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
    #[validate(must_match(other = "password", message = "Passwords do not match"))]
    pub confirm_password: String,
}

#[derive(Serialize)]
pub struct RegisterResponse {
    pub success: bool,
    #[serde(flatten)]
    pub outcome: crate::services::RegisterOutcome,
}

/// Register a new password account.
async fn register(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<RegisterPayload>,
) -> Result<Json<RegisterResponse>> {
    validate_payload(&payload)?;
    let meta = request_meta(&headers);

    let outcome = state
        .account
        .register(&payload.name, &payload.email, &payload.password, &meta)
        .await?;

    Ok(Json(RegisterResponse {
        success: true,
        outcome,
    }))
}

// ─── Login ───────────────────────────────────────────────────

#[derive(Debug, Deserialize, Validate)]
pub struct LoginPayload {
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Serialize)]
pub struct AuthResponse {
    pub success: bool,
    pub user: PublicUser,
    pub token: String,
}

/// Password login. Issues the session token.
async fn login(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<LoginPayload>,
) -> Result<Json<AuthResponse>> {
    validate_payload(&payload)?;
    let meta = request_meta(&headers);

    let profile = state
        .account
        .login(&payload.email, &payload.password, &meta)
        .await?;

    let token =
        create_session_token(&profile, &state.config.jwt_signing_key).map_err(AppError::Internal)?;

    Ok(Json(AuthResponse {
        success: true,
        user: profile.into(),
        token,
    }))
}

// ─── Google Sign-In ──────────────────────────────────────────

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct GoogleAuthPayload {
    #[validate(length(min = 1, message = "Missing ID token"))]
    pub id_token: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GoogleAuthResponse {
    pub success: bool,
    pub user_id: String,
    pub email: String,
    pub role: UserRole,
    pub token: String,
}

/// Google sign-in with an ID token from the client-side OAuth flow.
async fn google_sign_in(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<GoogleAuthPayload>,
) -> Result<Json<GoogleAuthResponse>> {
    validate_payload(&payload)?;
    let meta = request_meta(&headers);

    let profile = state.account.google_sign_in(&payload.id_token, &meta).await?;

    let token =
        create_session_token(&profile, &state.config.jwt_signing_key).map_err(AppError::Internal)?;

    Ok(Json(GoogleAuthResponse {
        success: true,
        user_id: profile.uid,
        email: profile.email,
        role: profile.role,
        token,
    }))
}

// ─── Session Hydration ───────────────────────────────────────

/// The session-bridge user shape.
#[derive(Serialize)]
pub struct SessionUser {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: UserRole,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

#[derive(Serialize)]
pub struct SessionResponse {
    pub success: bool,
    pub user: SessionUser,
    pub token: String,
}

/// Current session, hydrated from the live profile.
///
/// Re-reads the profile on every call so role, name, and photo changes
/// surface without a re-login, and re-issues the token from the fresh
/// profile for the same reason.
async fn get_session(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
) -> Result<Json<SessionResponse>> {
    let profile = state
        .db
        .get_user(&session.user_id)
        .await?
        .ok_or(AppError::Unauthorized)?;

    let token =
        create_session_token(&profile, &state.config.jwt_signing_key).map_err(AppError::Internal)?;

    Ok(Json(SessionResponse {
        success: true,
        user: SessionUser {
            id: profile.uid,
            name: profile.name,
            email: profile.email,
            role: profile.role,
            bio: profile.bio,
            image: profile.photo_url,
        },
        token,
    }))
}

// ─── Password Reset ──────────────────────────────────────────

#[derive(Debug, Deserialize, Validate)]
pub struct PasswordResetPayload {
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
}

/// Request a password-reset email.
///
/// The reply is the same whether or not the address exists.
async fn password_reset(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<PasswordResetPayload>,
) -> Result<Json<MessageResponse>> {
    validate_payload(&payload)?;
    let meta = request_meta(&headers);

    state
        .account
        .request_password_reset(&payload.email, &meta)
        .await?;

    Ok(Json(MessageResponse {
        success: true,
        message: "If that email exists, a password reset link has been sent".to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_payload_rejects_password_mismatch() {
        let payload = RegisterPayload {
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            password: "correct-horse".to_string(),
            confirm_password: "battery-staple".to_string(),
        };
        assert!(payload.validate().is_err());
    }

    #[test]
    fn register_payload_rejects_short_password() {
        let payload = RegisterPayload {
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            password: "short".to_string(),
            confirm_password: "short".to_string(),
        };
        assert!(payload.validate().is_err());
    }

    #[test]
    fn register_payload_accepts_valid_input() {
        let payload = RegisterPayload {
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            password: "correct-horse".to_string(),
            confirm_password: "correct-horse".to_string(),
        };
        assert!(payload.validate().is_ok());
    }

    #[test]
    fn login_payload_rejects_bad_email() {
        let payload = LoginPayload {
            email: "not-an-email".to_string(),
            password: "whatever".to_string(),
        };
        assert!(payload.validate().is_err());
    }
}

// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! API routes for authenticated users.

use axum::{
    extract::{Query, State},
    http::HeaderMap,
    routing::{get, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

use crate::error::Result;
use crate::middleware::Session;
use crate::models::PublicUser;
use crate::routes::{parse_kind, request_meta, validate_payload};
use crate::services::{ActivityFeed, ExportBundle, ProfileUpdates};
use crate::AppState;

/// API routes (require authentication via JWT).
/// The auth middleware is applied in routes/mod.rs for these routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/me", get(get_me).patch(update_me))
        .route("/api/activity", get(get_activity))
        .route("/api/account/delete", post(delete_account))
        .route("/api/export", get(export_data))
}

// ─── User Profile ────────────────────────────────────────────

#[derive(Serialize)]
pub struct UserResponse {
    pub success: bool,
    pub user: PublicUser,
}

/// Get the caller's profile.
async fn get_me(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
) -> Result<Json<UserResponse>> {
    let profile = state
        .db
        .get_user(&session.user_id)
        .await?
        .ok_or_else(|| crate::error::AppError::NotFound("User not found".to_string()))?;

    Ok(Json(UserResponse {
        success: true,
        user: profile.into(),
    }))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfilePayload {
    #[validate(length(min = 1, max = 100, message = "Name cannot be empty"))]
    pub name: Option<String>,
    #[validate(length(max = 500, message = "Bio is too long"))]
    pub bio: Option<String>,
    #[serde(rename = "photoURL")]
    #[validate(url(message = "Invalid photo URL"))]
    pub photo_url: Option<String>,
}

/// Update the caller's own profile.
async fn update_me(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
    headers: HeaderMap,
    Json(payload): Json<UpdateProfilePayload>,
) -> Result<Json<UserResponse>> {
    validate_payload(&payload)?;
    let meta = request_meta(&headers);

    let updates = ProfileUpdates {
        name: payload.name,
        bio: payload.bio,
        photo_url: payload.photo_url,
    };

    let profile = state
        .account
        .update_own_profile(&session, updates, &meta)
        .await?;

    Ok(Json(UserResponse {
        success: true,
        user: profile.into(),
    }))
}

// ─── Activity History ────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityQuery {
    pub limit: Option<u32>,
    pub start_after: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub description: Option<String>,
}

#[derive(Serialize)]
pub struct FeedResponse {
    pub success: bool,
    #[serde(flatten)]
    pub feed: ActivityFeed,
}

/// The caller's own activity history, newest first.
async fn get_activity(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
    Query(query): Query<ActivityQuery>,
) -> Result<Json<FeedResponse>> {
    let kind = parse_kind(query.kind.as_deref())?;

    let feed = state
        .activity
        .user_logs(
            &session,
            query.limit,
            query.start_after.as_deref(),
            kind,
            query.description.as_deref(),
        )
        .await?;

    Ok(Json(FeedResponse {
        success: true,
        feed,
    }))
}

// ─── Account Deletion ────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteAccountPayload {
    #[serde(default = "default_true")]
    pub immediate_delete: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteAccountResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub should_redirect: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Request deletion of the caller's account.
///
/// With `immediateDelete` (the default) the deletion pipeline runs
/// before the response; the UI is told to clear the session and
/// redirect. The request body is optional.
async fn delete_account(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
    headers: HeaderMap,
    payload: Option<Json<DeleteAccountPayload>>,
) -> Result<Json<DeleteAccountResponse>> {
    let immediate = payload.map(|Json(p)| p.immediate_delete).unwrap_or(true);
    let meta = request_meta(&headers);

    tracing::info!(uid = %session.user_id, immediate, "User-initiated account deletion");

    let redirect = state
        .account
        .request_deletion(&session, immediate, &meta)
        .await?;

    let response = if redirect {
        DeleteAccountResponse {
            success: true,
            should_redirect: Some(true),
            message: None,
        }
    } else {
        DeleteAccountResponse {
            success: true,
            should_redirect: None,
            message: Some(
                "Your deletion request has been received and will be processed".to_string(),
            ),
        }
    };

    Ok(Json(response))
}

// ─── Data Export ─────────────────────────────────────────────

#[derive(Serialize)]
pub struct ExportResponse {
    pub success: bool,
    pub export: ExportBundle,
}

/// Export the caller's profile, activity history, and deletion request.
async fn export_data(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
    headers: HeaderMap,
) -> Result<Json<ExportResponse>> {
    let meta = request_meta(&headers);
    let export = state.account.export_data(&session, &meta).await?;

    Ok(Json(ExportResponse {
        success: true,
        export,
    }))
}

// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Admin routes: user management, the activity feed, and the pending-
//! deletion sweep.
//!
//! Authorization lives in the service layer. Most operations re-read the
//! caller's profile per call; the activity feed and the deletion sweep
//! check the session role claim instead.

use axum::{
    extract::{Path, Query, State},
    routing::{get, patch, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

use crate::error::{AppError, Result};
use crate::middleware::Session;
use crate::models::{AccountStatus, PublicUser, UserRole};
use crate::routes::{parse_kind, validate_payload, MessageResponse};
use crate::services::{ActivityFeed, SweepSummary, UserUpdates};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/admin/users", get(list_users).post(create_user))
        .route("/admin/users/search", get(search_users))
        .route("/admin/users/{uid}", patch(update_user).delete(delete_user))
        .route("/admin/users/{uid}/role", patch(update_role))
        .route("/admin/activity", get(all_activity))
        .route("/admin/deletions/process", post(process_deletions))
}

// ─── User Listing & Search ───────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

#[derive(Serialize)]
pub struct UsersResponse {
    pub success: bool,
    pub users: Vec<PublicUser>,
}

/// List users, newest first.
async fn list_users(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
    Query(query): Query<PageQuery>,
) -> Result<Json<UsersResponse>> {
    let users = state
        .account
        .fetch_users(&session, query.limit, query.offset)
        .await?;

    Ok(Json(UsersResponse {
        success: true,
        users,
    }))
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

/// Prefix search on user names.
async fn search_users(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<UsersResponse>> {
    let q = query
        .q
        .as_deref()
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .ok_or_else(|| AppError::Validation("Missing search query".to_string()))?;

    let users = state
        .account
        .search_users(&session, q, query.limit, query.offset)
        .await?;

    Ok(Json(UsersResponse {
        success: true,
        users,
    }))
}

// ─── User Creation ───────────────────────────────────────────

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserPayload {
    #[validate(length(min = 1, max = 100, message = "Name is required"))]
    pub name: String,
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
    pub role: Option<String>,
}

#[derive(Serialize)]
pub struct UserActionResponse {
    pub success: bool,
    pub user: PublicUser,
}

/// Create an account on the caller's behalf.
async fn create_user(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
    Json(payload): Json<CreateUserPayload>,
) -> Result<Json<UserActionResponse>> {
    validate_payload(&payload)?;
    let role = parse_role(payload.role.as_deref().unwrap_or("user"))?;

    let user = state
        .account
        .create_user(
            &session,
            &payload.name,
            &payload.email,
            &payload.password,
            role,
        )
        .await?;

    Ok(Json(UserActionResponse {
        success: true,
        user,
    }))
}

// ─── User Updates ────────────────────────────────────────────

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserPayload {
    #[validate(length(min = 1, max = 100, message = "Name cannot be empty"))]
    pub name: Option<String>,
    #[validate(length(max = 500, message = "Bio is too long"))]
    pub bio: Option<String>,
    #[serde(rename = "photoURL")]
    #[validate(url(message = "Invalid photo URL"))]
    pub photo_url: Option<String>,
    pub status: Option<String>,
}

/// Edit another user's profile fields.
async fn update_user(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
    Path(uid): Path<String>,
    Json(payload): Json<UpdateUserPayload>,
) -> Result<Json<UserActionResponse>> {
    validate_payload(&payload)?;

    let status = payload.status.as_deref().map(parse_status).transpose()?;
    let updates = UserUpdates {
        name: payload.name,
        bio: payload.bio,
        photo_url: payload.photo_url,
        status,
    };

    let user = state.account.update_user(&session, &uid, updates).await?;

    Ok(Json(UserActionResponse {
        success: true,
        user,
    }))
}

#[derive(Debug, Deserialize)]
pub struct UpdateRolePayload {
    pub role: String,
}

/// Change another user's role.
async fn update_role(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
    Path(uid): Path<String>,
    Json(payload): Json<UpdateRolePayload>,
) -> Result<Json<UserActionResponse>> {
    let user = state
        .account
        .update_user_role(&session, &uid, &payload.role)
        .await?;

    Ok(Json(UserActionResponse {
        success: true,
        user,
    }))
}

/// Delete another user's account.
async fn delete_user(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
    Path(uid): Path<String>,
) -> Result<Json<MessageResponse>> {
    state.account.delete_user_as_admin(&session, &uid).await?;

    Ok(Json(MessageResponse {
        success: true,
        message: "User deleted".to_string(),
    }))
}

// ─── Activity Feed ───────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminActivityQuery {
    pub limit: Option<u32>,
    pub start_after: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub user_id: Option<String>,
}

#[derive(Serialize)]
pub struct FeedResponse {
    pub success: bool,
    #[serde(flatten)]
    pub feed: ActivityFeed,
}

/// Activity across all users, newest first.
async fn all_activity(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
    Query(query): Query<AdminActivityQuery>,
) -> Result<Json<FeedResponse>> {
    let kind = parse_kind(query.kind.as_deref())?;

    let feed = state
        .activity
        .all_logs(
            &session,
            query.limit,
            query.start_after.as_deref(),
            kind,
            query.user_id.as_deref(),
        )
        .await?;

    Ok(Json(FeedResponse {
        success: true,
        feed,
    }))
}

// ─── Deletion Sweep ──────────────────────────────────────────

#[derive(Serialize)]
pub struct SweepResponse {
    pub success: bool,
    #[serde(flatten)]
    pub summary: SweepSummary,
}

/// Process every pending deletion request.
async fn process_deletions(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
) -> Result<Json<SweepResponse>> {
    let summary = state.account.process_pending_deletions(&session).await?;

    Ok(Json(SweepResponse {
        success: true,
        summary,
    }))
}

// ─── Helpers ─────────────────────────────────────────────────

fn parse_role(raw: &str) -> Result<UserRole> {
    UserRole::parse(raw).ok_or_else(|| AppError::Validation(format!("Invalid role: {}", raw)))
}

fn parse_status(raw: &str) -> Result<AccountStatus> {
    match raw {
        "active" => Ok(AccountStatus::Active),
        "disabled" => Ok(AccountStatus::Disabled),
        _ => Err(AppError::Validation(format!("Invalid status: {}", raw))),
    }
}

// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod account;
pub mod activity_log;
pub mod identity;
pub mod storage;
pub mod token_verifier;

pub use account::{
    AccountService, ExportBundle, ProfileUpdates, RegisterOutcome, RequestMeta, SweepSummary,
    UserUpdates,
};
pub use activity_log::{ActivityFeed, ActivityLogService};
pub use identity::{IdentityService, IdentityUser};
pub use storage::StorageService;
pub use token_verifier::{GoogleIdentity, GoogleTokenVerifier};

use crate::db::FirestoreDb;
use crate::error::AppError;
use crate::middleware::Session;
use crate::models::UserProfile;

/// Re-read the caller's profile and require the admin role.
///
/// The role inside the session token is a snapshot from mint time. Admin
/// mutations check the live profile instead, so a demoted admin loses
/// access when the profile changes rather than when the token expires.
pub async fn require_admin(db: &FirestoreDb, session: &Session) -> Result<UserProfile, AppError> {
    let profile = db
        .get_user(&session.user_id)
        .await?
        .ok_or(AppError::Unauthorized)?;

    if !profile.is_admin() {
        return Err(AppError::Unauthorized);
    }

    Ok(profile)
}

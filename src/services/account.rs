// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Account lifecycle service.
//!
//! Registration, sign-in, admin user management, and the best-effort
//! account deletion pipeline across the three backends: the Firestore
//! profile, the Identity Store credential, and the Cloud Storage profile
//! image. Cross-backend writes are sequential with no shared
//! transaction; the deletion pipeline records its progress on the
//! `DeletionRequest` document so a partial run stays visible.

use std::sync::Arc;

use futures_util::StreamExt;
use serde::Serialize;

use crate::db::FirestoreDb;
use crate::error::{AppError, Result};
use crate::middleware::Session;
use crate::models::{
    metadata_keys, AccountStatus, ActivityKind, ActivityLogEntry, ActivityStatus, AuthProvider,
    DeletionRequest, DeletionStatus, NewActivity, PublicUser, UserProfile, UserRole,
};
use crate::services::{
    require_admin, ActivityLogService, GoogleIdentity, GoogleTokenVerifier, IdentityService,
    IdentityUser, StorageService,
};
use crate::time_utils;

/// Default page size for admin user listings.
pub const DEFAULT_USERS_LIMIT: u32 = 50;

/// Hard cap for admin user listings.
pub const MAX_USERS_LIMIT: u32 = 100;

/// Concurrent identity lookups during search enrichment.
const MAX_CONCURRENT_LOOKUPS: usize = 8;

/// Request origin captured for the audit trail.
#[derive(Debug, Clone, Default)]
pub struct RequestMeta {
    pub ip_address: Option<String>,
    pub device: Option<String>,
}

/// Outcome of a successful registration.
///
/// No session token here: the account starts unverified and the caller
/// is expected to run the verification flow before logging in.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterOutcome {
    pub user_id: String,
    pub email: String,
    pub role: UserRole,
    pub requires_verification: bool,
}

/// Counters from one admin deletion sweep.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct SweepSummary {
    pub processed: u32,
    pub errors: u32,
}

/// Everything the service holds about one account, bundled for export.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportBundle {
    pub exported_at: String,
    pub user: PublicUser,
    pub activity: Vec<ActivityLogEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deletion_request: Option<DeletionRequest>,
}

/// Admin-editable profile fields. `None` leaves a field untouched.
#[derive(Debug, Clone, Default)]
pub struct UserUpdates {
    pub name: Option<String>,
    pub bio: Option<String>,
    pub photo_url: Option<String>,
    pub status: Option<AccountStatus>,
}

/// Self-service profile fields.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdates {
    pub name: Option<String>,
    pub bio: Option<String>,
    pub photo_url: Option<String>,
}

/// Account lifecycle operations.
#[derive(Clone)]
pub struct AccountService {
    db: FirestoreDb,
    identity: IdentityService,
    storage: StorageService,
    verifier: Arc<GoogleTokenVerifier>,
    activity: ActivityLogService,
}

impl AccountService {
    pub fn new(
        db: FirestoreDb,
        identity: IdentityService,
        storage: StorageService,
        verifier: Arc<GoogleTokenVerifier>,
        activity: ActivityLogService,
    ) -> Self {
        Self {
            db,
            identity,
            storage,
            verifier,
            activity,
        }
    }

    // ─── Registration & Sign-In ──────────────────────────────────

    /// Register a new password account.
    ///
    /// Creates the credential first so a taken email fails before anything
    /// else is written, then the profile, then the role claim for the
    /// bootstrap admin.
    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
        meta: &RequestMeta,
    ) -> Result<RegisterOutcome> {
        let uid = self.identity.sign_up(email, password).await?;

        let role = self.first_user_role().await?;

        // Redundant bcrypt hash next to the credential, kept for the
        // internal credential-verification debug path.
        let password_hash = bcrypt::hash(password, bcrypt::DEFAULT_COST)
            .map_err(|e| anyhow::anyhow!("Password hashing failed: {}", e))?;

        let now = time_utils::now_rfc3339();
        let profile = UserProfile {
            uid: uid.clone(),
            email: email.to_string(),
            name: name.to_string(),
            role,
            photo_url: None,
            bio: None,
            password_hash: Some(password_hash),
            email_verified: false,
            status: AccountStatus::Active,
            provider: AuthProvider::Password,
            created_at: now.clone(),
            updated_at: now.clone(),
            last_login_at: now,
        };
        self.db.upsert_user(&profile).await?;

        if role == UserRole::Admin {
            self.identity.set_role_claim(&uid, UserRole::Admin).await?;
        }

        self.activity
            .record(
                NewActivity::new(
                    uid.clone(),
                    ActivityKind::Register,
                    "User registered",
                    ActivityStatus::Success,
                )
                .with_metadata(metadata_keys::PROVIDER, "password")
                .with_metadata(metadata_keys::EMAIL, email)
                .with_origin(meta.ip_address.clone(), meta.device.clone()),
            )
            .await;

        tracing::info!(uid = %uid, role = %role, "User registered");

        Ok(RegisterOutcome {
            user_id: uid,
            email: email.to_string(),
            role,
            requires_verification: true,
        })
    }

    /// Password login. All credential failures collapse into one message
    /// so the response never reveals which half was wrong.
    pub async fn login(
        &self,
        email: &str,
        password: &str,
        meta: &RequestMeta,
    ) -> Result<UserProfile> {
        let uid = self.identity.sign_in(email, password).await?;

        // A credential without a profile should not happen; keep the
        // outward message uniform anyway.
        let Some(mut profile) = self.db.get_user(&uid).await? else {
            tracing::warn!(uid = %uid, "Credential verified but profile document missing");
            return Err(AppError::Validation(
                AppError::INVALID_CREDENTIALS.to_string(),
            ));
        };

        if profile.is_disabled() {
            return Err(AppError::Validation("Account is disabled".to_string()));
        }

        // Plain update, deliberately not transactional.
        profile.last_login_at = time_utils::now_rfc3339();
        self.db.upsert_user(&profile).await?;

        self.activity
            .record(
                NewActivity::new(
                    uid,
                    ActivityKind::Login,
                    "User logged in",
                    ActivityStatus::Success,
                )
                .with_metadata(metadata_keys::PROVIDER, "password")
                .with_origin(meta.ip_address.clone(), meta.device.clone()),
            )
            .await;

        Ok(profile)
    }

    /// Google sign-in with an ID token from the client.
    ///
    /// First sign-in creates the credential and profile; later sign-ins
    /// merge missing name/photo inside a Firestore transaction so a
    /// concurrent profile edit is not clobbered with stale OAuth values.
    pub async fn google_sign_in(&self, id_token: &str, meta: &RequestMeta) -> Result<UserProfile> {
        let google = self.verifier.verify(id_token).await?;

        let Some(user) = self.identity.lookup_by_email(&google.email).await? else {
            return self.create_google_account(&google, meta).await;
        };

        if user.disabled {
            return Err(AppError::Validation("Account is disabled".to_string()));
        }

        match self
            .db
            .merge_google_login(
                &user.local_id,
                google.name.as_deref(),
                google.picture.as_deref(),
            )
            .await
        {
            Ok(profile) => {
                self.activity
                    .record(
                        NewActivity::new(
                            profile.uid.clone(),
                            ActivityKind::Login,
                            "User logged in",
                            ActivityStatus::Success,
                        )
                        .with_metadata(metadata_keys::PROVIDER, "google")
                        .with_origin(meta.ip_address.clone(), meta.device.clone()),
                    )
                    .await;
                Ok(profile)
            }
            // Credential exists but the profile never got written; repair
            // by finishing the first-sign-in path.
            Err(AppError::NotFound(_)) => {
                self.create_google_profile(&user.local_id, &google, meta).await
            }
            Err(e) => Err(e),
        }
    }

    /// Brand-new Google user: credential plus profile.
    async fn create_google_account(
        &self,
        google: &GoogleIdentity,
        meta: &RequestMeta,
    ) -> Result<UserProfile> {
        let name = google.name.clone().unwrap_or_else(|| google.email.clone());
        let uid = self
            .identity
            .create_account(&google.email, &name, google.picture.as_deref(), true)
            .await?;

        self.create_google_profile(&uid, google, meta).await
    }

    /// Write the profile half of a Google first sign-in.
    async fn create_google_profile(
        &self,
        uid: &str,
        google: &GoogleIdentity,
        meta: &RequestMeta,
    ) -> Result<UserProfile> {
        let role = self.first_user_role().await?;

        let now = time_utils::now_rfc3339();
        let profile = UserProfile {
            uid: uid.to_string(),
            email: google.email.clone(),
            name: google.name.clone().unwrap_or_else(|| google.email.clone()),
            role,
            photo_url: google.picture.clone(),
            bio: None,
            password_hash: None,
            email_verified: true,
            status: AccountStatus::Active,
            provider: AuthProvider::Google,
            created_at: now.clone(),
            updated_at: now.clone(),
            last_login_at: now,
        };
        self.db.upsert_user(&profile).await?;

        if role == UserRole::Admin {
            self.identity.set_role_claim(uid, UserRole::Admin).await?;
        }

        self.activity
            .record(
                NewActivity::new(
                    uid.to_string(),
                    ActivityKind::Register,
                    "User registered",
                    ActivityStatus::Success,
                )
                .with_metadata(metadata_keys::PROVIDER, "google")
                .with_metadata(metadata_keys::EMAIL, google.email.as_str())
                .with_origin(meta.ip_address.clone(), meta.device.clone()),
            )
            .await;

        tracing::info!(uid = %uid, role = %role, "Google user registered");

        Ok(profile)
    }

    /// First account ever created becomes the admin.
    ///
    /// The emptiness probe and the later profile write are not
    /// transactional; two simultaneous first registrations can both
    /// observe an empty collection. Accepted as a bootstrap-window race.
    async fn first_user_role(&self) -> Result<UserRole> {
        if self.db.users_collection_empty().await? {
            Ok(UserRole::Admin)
        } else {
            Ok(UserRole::User)
        }
    }

    // ─── Password Reset ──────────────────────────────────────────

    /// Ask the Identity Store to send a reset email.
    ///
    /// The outward reply is identical whether or not the address exists;
    /// only genuine backend failures surface.
    pub async fn request_password_reset(&self, email: &str, meta: &RequestMeta) -> Result<()> {
        let Some(user) = self.identity.lookup_by_email(email).await? else {
            tracing::debug!("Password reset requested for unknown email");
            return Ok(());
        };

        match self.identity.send_password_reset(email).await {
            Ok(()) | Err(AppError::NotFound(_)) => {}
            Err(e) => return Err(e),
        }

        self.activity
            .record(
                NewActivity::new(
                    user.local_id,
                    ActivityKind::PasswordResetRequested,
                    "Password reset requested",
                    ActivityStatus::Pending,
                )
                .with_metadata(metadata_keys::EMAIL, email)
                .with_origin(meta.ip_address.clone(), meta.device.clone()),
            )
            .await;

        Ok(())
    }

    // ─── Account Deletion ────────────────────────────────────────

    /// File a deletion request for the calling account.
    ///
    /// Returns true when the deletion already ran (the immediate path) and
    /// the UI should clear the session and redirect.
    pub async fn request_deletion(
        &self,
        session: &Session,
        immediate: bool,
        meta: &RequestMeta,
    ) -> Result<bool> {
        let request = DeletionRequest {
            user_id: session.user_id.clone(),
            email: session.email.clone(),
            requested_at: time_utils::now_rfc3339(),
            status: DeletionStatus::Pending,
            completed_at: None,
        };
        self.db.set_deletion_request(&request).await?;

        self.activity
            .record(
                NewActivity::new(
                    session.user_id.clone(),
                    ActivityKind::DeletionRequest,
                    "Account deletion requested",
                    ActivityStatus::Pending,
                )
                .with_origin(meta.ip_address.clone(), meta.device.clone()),
            )
            .await;

        if !immediate {
            return Ok(false);
        }

        if !self.process_account_deletion(&session.user_id).await {
            return Err(anyhow::anyhow!(
                "Immediate account deletion failed for {}",
                session.user_id
            )
            .into());
        }

        Ok(true)
    }

    /// Run the best-effort deletion pipeline for one uid.
    ///
    /// Order is profile, credential, then the storage object. There is no
    /// atomicity across the backends; progress lands on the
    /// `DeletionRequest` document instead. Returns false when a mandatory
    /// step failed.
    pub async fn process_account_deletion(&self, uid: &str) -> bool {
        let mut request = match self.db.get_deletion_request(uid).await {
            Ok(Some(request)) => request,
            // Invoked directly without a prior request; synthesize one so
            // progress still gets recorded.
            Ok(None) => DeletionRequest {
                user_id: uid.to_string(),
                email: String::new(),
                requested_at: time_utils::now_rfc3339(),
                status: DeletionStatus::Pending,
                completed_at: None,
            },
            Err(e) => {
                tracing::error!(uid = %uid, error = %e, "Failed to load deletion request");
                return false;
            }
        };

        request.status = DeletionStatus::Processing;
        if let Err(e) = self.db.set_deletion_request(&request).await {
            tracing::warn!(uid = %uid, error = %e, "Failed to mark deletion request processing");
        }

        match self.delete_profile_and_credential(uid).await {
            Ok(()) => {
                // Optional step; the storage client already tolerates a
                // missing object.
                if let Err(e) = self.storage.delete_profile_image(uid).await {
                    tracing::warn!(uid = %uid, error = %e, "Profile image cleanup failed");
                }

                request.status = DeletionStatus::Completed;
                request.completed_at = Some(time_utils::now_rfc3339());
                if let Err(e) = self.db.set_deletion_request(&request).await {
                    tracing::warn!(uid = %uid, error = %e, "Failed to mark deletion request completed");
                }

                self.activity
                    .record(NewActivity::new(
                        uid.to_string(),
                        ActivityKind::DeletionCompleted,
                        "Account deletion completed",
                        ActivityStatus::Completed,
                    ))
                    .await;

                tracing::info!(uid = %uid, "Account deleted");
                true
            }
            Err(e) => {
                tracing::error!(uid = %uid, error = %e, "Account deletion failed");

                request.status = DeletionStatus::Failed;
                if let Err(e) = self.db.set_deletion_request(&request).await {
                    tracing::warn!(uid = %uid, error = %e, "Failed to mark deletion request failed");
                }

                self.activity
                    .record(NewActivity::new(
                        uid.to_string(),
                        ActivityKind::DeletionFailed,
                        "Account deletion failed",
                        ActivityStatus::Failed,
                    ))
                    .await;

                false
            }
        }
    }

    /// The two mandatory deletion steps. Both tolerate already-deleted
    /// targets so a retry after a partial failure can still finish.
    async fn delete_profile_and_credential(&self, uid: &str) -> Result<()> {
        self.db.delete_user(uid).await?;

        match self.identity.delete_account(uid).await {
            Ok(()) | Err(AppError::NotFound(_)) => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Admin sweep over every pending deletion request.
    ///
    /// The gate here is the session role claim. Successes get overwritten
    /// from `completed` to `processed` with a fresh timestamp: the marker
    /// for "swept by the admin job" as opposed to "deleted immediately by
    /// the user".
    pub async fn process_pending_deletions(&self, session: &Session) -> Result<SweepSummary> {
        if session.role != UserRole::Admin {
            return Err(AppError::Unauthorized);
        }

        let pending = self.db.pending_deletion_requests().await?;
        let total = pending.len();

        let mut processed = 0u32;
        let mut errors = 0u32;

        for mut request in pending {
            if !self.process_account_deletion(&request.user_id).await {
                errors += 1;
                continue;
            }

            request.status = DeletionStatus::Processed;
            request.completed_at = Some(time_utils::now_rfc3339());
            match self.db.set_deletion_request(&request).await {
                Ok(()) => processed += 1,
                Err(e) => {
                    tracing::error!(
                        uid = %request.user_id,
                        error = %e,
                        "Failed to mark deletion request processed"
                    );
                    errors += 1;
                }
            }
        }

        tracing::info!(total, processed, errors, "Deletion sweep finished");

        Ok(SweepSummary { processed, errors })
    }

    /// Delete another user's account on an admin's behalf.
    pub async fn delete_user_as_admin(&self, session: &Session, uid: &str) -> Result<()> {
        let admin = require_admin(&self.db, session).await?;

        let target = self
            .db
            .get_user(uid)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        // Image first, best effort; then the two mandatory deletes.
        if let Err(e) = self.storage.delete_profile_image(uid).await {
            tracing::warn!(uid = %uid, error = %e, "Profile image cleanup failed");
        }

        self.db.delete_user(uid).await?;
        match self.identity.delete_account(uid).await {
            Ok(()) | Err(AppError::NotFound(_)) => {}
            Err(e) => return Err(e),
        }

        self.activity
            .record(
                NewActivity::new(
                    admin.uid.clone(),
                    ActivityKind::AdminAction,
                    "admin_deleted_user",
                    ActivityStatus::Success,
                )
                .with_metadata(metadata_keys::TARGET_USER, uid)
                .with_metadata(metadata_keys::EMAIL, target.email.as_str()),
            )
            .await;

        tracing::info!(admin = %admin.uid, uid = %uid, "Admin deleted user");
        Ok(())
    }

    // ─── Admin User Management ───────────────────────────────────

    /// Create an account on an admin's behalf.
    pub async fn create_user(
        &self,
        session: &Session,
        name: &str,
        email: &str,
        password: &str,
        role: UserRole,
    ) -> Result<PublicUser> {
        let admin = require_admin(&self.db, session).await?;

        let uid = self
            .identity
            .create_account_with_password(email, name, password, false)
            .await?;

        if role == UserRole::Admin {
            self.identity.set_role_claim(&uid, UserRole::Admin).await?;
        }

        let now = time_utils::now_rfc3339();
        let profile = UserProfile {
            uid: uid.clone(),
            email: email.to_string(),
            name: name.to_string(),
            role,
            photo_url: None,
            bio: None,
            password_hash: None,
            email_verified: false,
            status: AccountStatus::Active,
            provider: AuthProvider::Password,
            created_at: now.clone(),
            updated_at: now.clone(),
            last_login_at: now,
        };
        self.db.upsert_user(&profile).await?;

        self.activity
            .record(
                NewActivity::new(
                    admin.uid.clone(),
                    ActivityKind::AdminAction,
                    "admin_created_user",
                    ActivityStatus::Success,
                )
                .with_metadata(metadata_keys::TARGET_USER, uid.as_str())
                .with_metadata(metadata_keys::EMAIL, email),
            )
            .await;

        Ok(profile.into())
    }

    /// List users, newest first.
    pub async fn fetch_users(
        &self,
        session: &Session,
        limit: Option<u32>,
        offset: Option<u32>,
    ) -> Result<Vec<PublicUser>> {
        require_admin(&self.db, session).await?;

        let limit = clamp_users_limit(limit);
        let offset = offset.unwrap_or(0);

        let users = self.db.list_users(limit, offset).await?;
        Ok(users.into_iter().map(PublicUser::from).collect())
    }

    /// Prefix search on name with live identity enrichment.
    ///
    /// Rows whose identity lookup fails keep their stored values; one
    /// broken account must not empty the whole result page.
    pub async fn search_users(
        &self,
        session: &Session,
        query: &str,
        limit: Option<u32>,
        offset: Option<u32>,
    ) -> Result<Vec<PublicUser>> {
        require_admin(&self.db, session).await?;

        let limit = clamp_users_limit(limit);
        let offset = offset.unwrap_or(0);

        let profiles = self.db.search_users_by_name(query, limit, offset).await?;
        let identity = &self.identity;

        let users = futures_util::stream::iter(profiles)
            .map(|profile| async move {
                let looked_up = identity.lookup_by_uid(&profile.uid).await;
                enrich_profile(profile, looked_up)
            })
            .buffered(MAX_CONCURRENT_LOOKUPS)
            .collect::<Vec<PublicUser>>()
            .await;

        Ok(users)
    }

    /// Change another user's role.
    pub async fn update_user_role(
        &self,
        session: &Session,
        uid: &str,
        role_raw: &str,
    ) -> Result<PublicUser> {
        let admin = require_admin(&self.db, session).await?;

        if uid == admin.uid {
            return Err(AppError::Forbidden(
                "You cannot change your own role".to_string(),
            ));
        }

        let role = UserRole::parse(role_raw)
            .ok_or_else(|| AppError::Validation(format!("Invalid role: {}", role_raw)))?;

        let mut target = self
            .db
            .get_user(uid)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        let old_role = target.role;
        target.role = role;
        target.updated_at = time_utils::now_rfc3339();

        self.db.upsert_user(&target).await?;
        self.identity.set_role_claim(uid, role).await?;

        self.activity
            .record(
                NewActivity::new(
                    admin.uid.clone(),
                    ActivityKind::AdminAction,
                    "admin_updated_role",
                    ActivityStatus::Success,
                )
                .with_metadata(metadata_keys::TARGET_USER, uid)
                .with_metadata(metadata_keys::OLD_ROLE, old_role.as_str())
                .with_metadata(metadata_keys::NEW_ROLE, role.as_str()),
            )
            .await;

        tracing::info!(admin = %admin.uid, uid = %uid, role = %role, "Role updated");
        Ok(target.into())
    }

    /// Edit another user's profile fields.
    pub async fn update_user(
        &self,
        session: &Session,
        uid: &str,
        updates: UserUpdates,
    ) -> Result<PublicUser> {
        let admin = require_admin(&self.db, session).await?;

        let mut target = self
            .db
            .get_user(uid)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        let display_changed = updates.name.is_some() || updates.photo_url.is_some();
        let status_changed = updates.status.is_some_and(|status| status != target.status);

        if let Some(name) = updates.name {
            target.name = name;
        }
        if let Some(bio) = updates.bio {
            target.bio = Some(bio);
        }
        if let Some(photo_url) = updates.photo_url {
            target.photo_url = Some(photo_url);
        }
        if let Some(status) = updates.status {
            target.status = status;
        }
        target.updated_at = time_utils::now_rfc3339();

        self.db.upsert_user(&target).await?;

        // Keep the Identity Store record in step with what changed.
        if display_changed {
            self.identity
                .update_display(uid, Some(&target.name), target.photo_url.as_deref())
                .await?;
        }
        if status_changed {
            self.identity
                .set_disabled(uid, target.status == AccountStatus::Disabled)
                .await?;
        }

        self.activity
            .record(
                NewActivity::new(
                    admin.uid.clone(),
                    ActivityKind::AdminAction,
                    "admin_updated_user",
                    ActivityStatus::Success,
                )
                .with_metadata(metadata_keys::TARGET_USER, uid),
            )
            .await;

        Ok(target.into())
    }

    // ─── Self-Service Profile ────────────────────────────────────

    /// Update the caller's own profile.
    pub async fn update_own_profile(
        &self,
        session: &Session,
        updates: ProfileUpdates,
        meta: &RequestMeta,
    ) -> Result<UserProfile> {
        let mut profile = self
            .db
            .get_user(&session.user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        if let Some(name) = updates.name {
            profile.name = name;
        }
        if let Some(bio) = updates.bio {
            profile.bio = Some(bio);
        }
        if let Some(photo_url) = updates.photo_url {
            profile.photo_url = Some(photo_url);
        }
        profile.updated_at = time_utils::now_rfc3339();

        self.db.upsert_user(&profile).await?;

        self.activity
            .record(
                NewActivity::new(
                    session.user_id.clone(),
                    ActivityKind::ProfileUpdate,
                    "Profile updated",
                    ActivityStatus::Success,
                )
                .with_origin(meta.ip_address.clone(), meta.device.clone()),
            )
            .await;

        Ok(profile)
    }

    /// Bundle the caller's profile, activity history, and deletion
    /// request into one export document.
    pub async fn export_data(&self, session: &Session, meta: &RequestMeta) -> Result<ExportBundle> {
        let profile = self
            .db
            .get_user(&session.user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        let activity = self.db.all_activity_for_user(&session.user_id).await?;
        let deletion_request = self.db.get_deletion_request(&session.user_id).await?;

        self.activity
            .record(
                NewActivity::new(
                    session.user_id.clone(),
                    ActivityKind::DataExport,
                    "Account data exported",
                    ActivityStatus::Success,
                )
                .with_origin(meta.ip_address.clone(), meta.device.clone()),
            )
            .await;

        Ok(ExportBundle {
            exported_at: time_utils::now_rfc3339(),
            user: profile.into(),
            activity,
            deletion_request,
        })
    }
}

/// Clamp a requested page size into `1..=MAX_USERS_LIMIT`.
fn clamp_users_limit(limit: Option<u32>) -> u32 {
    limit.unwrap_or(DEFAULT_USERS_LIMIT).clamp(1, MAX_USERS_LIMIT)
}

/// Overlay live identity fields onto a stored profile.
fn enrich_profile(
    profile: UserProfile,
    looked_up: Result<Option<IdentityUser>>,
) -> PublicUser {
    let mut user = PublicUser::from(profile);

    match looked_up {
        Ok(Some(identity)) => {
            if let Some(name) = identity.display_name {
                user.name = name;
            }
            if let Some(email) = identity.email {
                user.email = email;
            }
            if identity.photo_url.is_some() {
                user.photo_url = identity.photo_url;
            }
            user.email_verified = identity.email_verified;
        }
        Ok(None) => {}
        Err(e) => {
            tracing::warn!(uid = %user.id, error = %e, "Identity lookup failed during search");
        }
    }

    user
}

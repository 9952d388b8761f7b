// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper with typed operations.
//!
//! Provides high-level operations for:
//! - Users (profile storage)
//! - Activity logs (append-only audit trail)
//! - Deletion requests (account-removal lifecycle)

use crate::db::collections;
use crate::error::AppError;
use crate::models::{ActivityKind, ActivityLogEntry, DeletionRequest, DeletionStatus, UserProfile};

/// One page of activity-log entries.
///
/// `next_cursor` is the document ID of the last returned entry; feeding it
/// back as `start_after` resumes exactly after that row.
#[derive(Debug, Clone)]
pub struct ActivityPage {
    pub entries: Vec<ActivityLogEntry>,
    pub next_cursor: Option<String>,
    pub has_more: bool,
}

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: Option<firestore::FirestoreDb>,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        // If the emulator environment variable is set, use unauthenticated connection
        // to avoid local credential warnings and leakage.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        // Use ExternalJwtFunctionSource to provide a dummy token without needing async-trait
        // or a custom TokenSource implementation struct.
        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a mock Firestore client for testing (offline mode).
    ///
    /// All database operations will return an error if called.
    pub fn new_mock() -> Self {
        Self { client: None }
    }

    /// Helper to get the client or return an error if offline.
    fn get_client(&self) -> Result<&firestore::FirestoreDb, AppError> {
        self.client
            .as_ref()
            .ok_or_else(|| AppError::Database("Database not connected (offline mode)".to_string()))
    }

    // ─── User Operations ─────────────────────────────────────────

    /// Get a user profile by uid.
    pub async fn get_user(&self, uid: &str) -> Result<Option<UserProfile>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::USERS)
            .obj()
            .one(uid)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get a user profile by email address.
    ///
    /// Email uniqueness is enforced by the Identity Store, so at most one
    /// document matches.
    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<UserProfile>, AppError> {
        let email = email.to_string();
        let mut matches: Vec<UserProfile> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::USERS)
            .filter(move |q| q.field("email").eq(email.clone()))
            .limit(1)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(matches.pop())
    }

    /// Create or update a user profile.
    pub async fn upsert_user(&self, user: &UserProfile) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::USERS)
            .document_id(&user.uid)
            .object(user)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Delete a user profile. No-op if the document does not exist.
    pub async fn delete_user(&self, uid: &str) -> Result<(), AppError> {
        self.get_client()?
            .fluent()
            .delete()
            .from(collections::USERS)
            .document_id(uid)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Check whether any user profile exists yet.
    ///
    /// Check-then-act: two concurrent first registrations can both see an
    /// empty collection and both end up admin. An operator demotes one.
    pub async fn users_collection_empty(&self) -> Result<bool, AppError> {
        let probe: Vec<UserProfile> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::USERS)
            .limit(1)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(probe.is_empty())
    }

    /// List user profiles, newest first, with limit/offset paging.
    pub async fn list_users(&self, limit: u32, offset: u32) -> Result<Vec<UserProfile>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .from(collections::USERS)
            .order_by([("createdAt", firestore::FirestoreQueryDirection::Descending)])
            .limit(limit)
            .offset(offset)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Search user profiles by display-name prefix.
    ///
    /// Firestore has no substring search; the `[prefix, prefix + U+F8FF]`
    /// range is the standard prefix-match idiom.
    pub async fn search_users_by_name(
        &self,
        prefix: &str,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<UserProfile>, AppError> {
        let lower = prefix.to_string();
        let upper = format!("{}\u{f8ff}", prefix);
        self.get_client()?
            .fluent()
            .select()
            .from(collections::USERS)
            .filter(move |q| {
                q.for_all([
                    q.field("name").greater_than_or_equal(lower.clone()),
                    q.field("name").less_than_or_equal(upper.clone()),
                ])
            })
            .order_by([("name", firestore::FirestoreQueryDirection::Ascending)])
            .limit(limit)
            .offset(offset)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    // ─── Google Sign-In Merge ────────────────────────────────────

    /// Merge a Google sign-in into an existing profile atomically.
    ///
    /// Fills in `name`/`photo_url` only where the profile is missing them
    /// and stamps `last_login_at`. Runs in a transaction so a concurrent
    /// profile edit is not silently overwritten with stale fields.
    pub async fn merge_google_login(
        &self,
        uid: &str,
        name: Option<&str>,
        photo_url: Option<&str>,
    ) -> Result<UserProfile, AppError> {
        let mut transaction = self
            .get_client()?
            .begin_transaction()
            .await
            .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

        let current: Option<UserProfile> = self
            .get_client()?
            .fluent()
            .select()
            .by_id_in(collections::USERS)
            .obj()
            .one(uid)
            .await
            .map_err(|e| {
                AppError::Database(format!("Failed to read profile in transaction: {}", e))
            })?;

        let Some(mut profile) = current else {
            let _ = transaction.rollback().await;
            return Err(AppError::NotFound(format!("User {} not found", uid)));
        };

        let now = crate::time_utils::now_rfc3339();
        let mut merged = false;

        if profile.name.is_empty() {
            if let Some(name) = name {
                profile.name = name.to_string();
                merged = true;
            }
        }
        if profile.photo_url.is_none() && photo_url.is_some() {
            profile.photo_url = photo_url.map(|url| url.to_string());
            merged = true;
        }
        if merged {
            profile.updated_at = now.clone();
        }
        profile.last_login_at = now;

        self.get_client()?
            .fluent()
            .update()
            .in_col(collections::USERS)
            .document_id(uid)
            .object(&profile)
            .add_to_transaction(&mut transaction)
            .map_err(|e| {
                AppError::Database(format!("Failed to add profile to transaction: {}", e))
            })?;

        transaction
            .commit()
            .await
            .map_err(|e| AppError::Database(format!("Transaction commit failed: {}", e)))?;

        tracing::debug!(uid, merged, "Google login merged into profile");

        Ok(profile)
    }

    // ─── Activity Log Operations ─────────────────────────────────

    /// Append one activity-log entry.
    ///
    /// The entry ID doubles as the document ID, so retried appends are
    /// idempotent.
    pub async fn append_activity(&self, entry: &ActivityLogEntry) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::ACTIVITY_LOGS)
            .document_id(&entry.id)
            .object(entry)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Get a single activity-log entry by ID (cursor resolution).
    pub async fn get_activity_entry(
        &self,
        id: &str,
    ) -> Result<Option<ActivityLogEntry>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::ACTIVITY_LOGS)
            .obj()
            .one(id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Query activity logs with optional filters and cursor pagination.
    ///
    /// Ordering is `(timestamp desc, id desc)`; the ID tiebreak makes the
    /// ordering total so pages never overlap or skip rows. `start_after`
    /// names the last entry of the previous page by document ID; an ID
    /// that does not resolve is a validation error.
    pub async fn query_activity_logs(
        &self,
        user_id: Option<&str>,
        kind: Option<ActivityKind>,
        description: Option<&str>,
        limit: u32,
        start_after: Option<&str>,
    ) -> Result<ActivityPage, AppError> {
        let cursor = match start_after {
            Some(id) => {
                let entry = self
                    .get_activity_entry(id)
                    .await?
                    .ok_or_else(|| AppError::Validation(format!("Unknown cursor: {}", id)))?;
                Some((entry.timestamp, entry.id))
            }
            None => None,
        };

        let user_id = user_id.map(str::to_string);
        let kind_name = kind.map(|k| k.as_str());
        let description = description.map(str::to_string);

        let query = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::ACTIVITY_LOGS)
            .filter(move |q| {
                q.for_all([
                    user_id
                        .as_ref()
                        .and_then(|uid| q.field("userId").eq(uid.clone())),
                    kind_name.and_then(|kind| q.field("type").eq(kind)),
                    description
                        .as_ref()
                        .and_then(|text| q.field("description").eq(text.clone())),
                ])
            })
            .order_by([
                ("timestamp", firestore::FirestoreQueryDirection::Descending),
                ("id", firestore::FirestoreQueryDirection::Descending),
            ])
            // Fetch one extra row to learn whether another page exists.
            .limit(limit + 1);

        let query = if let Some((timestamp, id)) = cursor {
            query.start_at(firestore::FirestoreQueryCursor::AfterValue(vec![
                (&timestamp).into(),
                (&id).into(),
            ]))
        } else {
            query
        };

        let mut entries: Vec<ActivityLogEntry> = query
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let has_more = entries.len() as u32 > limit;
        if has_more {
            entries.truncate(limit as usize);
        }
        let next_cursor = if has_more {
            entries.last().map(|entry| entry.id.clone())
        } else {
            None
        };

        Ok(ActivityPage {
            entries,
            next_cursor,
            has_more,
        })
    }

    /// Get every activity-log entry for one user, newest first (export).
    pub async fn all_activity_for_user(
        &self,
        uid: &str,
    ) -> Result<Vec<ActivityLogEntry>, AppError> {
        let uid = uid.to_string();
        self.get_client()?
            .fluent()
            .select()
            .from(collections::ACTIVITY_LOGS)
            .filter(move |q| q.field("userId").eq(uid.clone()))
            .order_by([
                ("timestamp", firestore::FirestoreQueryDirection::Descending),
                ("id", firestore::FirestoreQueryDirection::Descending),
            ])
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    // ─── Deletion Request Operations ─────────────────────────────

    /// Get the deletion request for a user, if any.
    pub async fn get_deletion_request(
        &self,
        uid: &str,
    ) -> Result<Option<DeletionRequest>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::DELETION_REQUESTS)
            .obj()
            .one(uid)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create or update a deletion request (keyed by uid).
    pub async fn set_deletion_request(&self, request: &DeletionRequest) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::DELETION_REQUESTS)
            .document_id(&request.user_id)
            .object(request)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// List all deletion requests still waiting to be processed, oldest
    /// first.
    pub async fn pending_deletion_requests(&self) -> Result<Vec<DeletionRequest>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .from(collections::DELETION_REQUESTS)
            .filter(|q| q.field("status").eq(DeletionStatus::Pending.as_str()))
            .order_by([(
                "requestedAt",
                firestore::FirestoreQueryDirection::Ascending,
            )])
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}

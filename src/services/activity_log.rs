// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Activity-log service.
//!
//! Append-only audit trail over `activityLogs`. Writes go through
//! [`ActivityLogService::record`], which never fails the calling
//! operation: a dropped audit row is logged and swallowed. Reads come in
//! two shapes, the caller's own history and the admin feed, both using
//! cursor pagination so rows never shift between pages while new entries
//! arrive at the head.

use std::collections::{HashMap, HashSet};

use futures_util::StreamExt;
use serde::Serialize;
use uuid::Uuid;

use crate::db::FirestoreDb;
use crate::error::{AppError, Result};
use crate::middleware::Session;
use crate::models::{ActivityKind, ActivityLogEntry, NewActivity, UserRole};
use crate::services::IdentityService;
use crate::time_utils;

/// Page size when the caller does not send one.
pub const DEFAULT_LIMIT: u32 = 20;

/// Hard cap on page size.
pub const MAX_LIMIT: u32 = 100;

/// Concurrent identity lookups while enriching the admin feed.
const MAX_CONCURRENT_LOOKUPS: usize = 8;

/// One feed row: the stored entry plus the owner's current email.
///
/// The email comes from the identity store at read time, not from the
/// stored row, so address changes show up in old entries too.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityLogView {
    #[serde(flatten)]
    pub entry: ActivityLogEntry,
    pub user_email: String,
}

/// One page of feed rows.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityFeed {
    pub entries: Vec<ActivityLogView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
    pub has_more: bool,
}

/// Append-only audit trail reader and writer.
#[derive(Clone)]
pub struct ActivityLogService {
    db: FirestoreDb,
    identity: IdentityService,
}

impl ActivityLogService {
    pub fn new(db: FirestoreDb, identity: IdentityService) -> Self {
        Self { db, identity }
    }

    /// Append one audit entry. Returns the entry ID, or `None` when the
    /// write failed.
    ///
    /// Auditing is best effort: the account operation that triggered the
    /// entry has already happened, so a failed write here must not undo
    /// or fail it. The error is logged and swallowed.
    pub async fn record(&self, activity: NewActivity) -> Option<String> {
        let entry = ActivityLogEntry {
            id: Uuid::new_v4().to_string(),
            user_id: activity.user_id,
            kind: activity.kind,
            description: activity.description,
            status: activity.status,
            timestamp: time_utils::now_rfc3339(),
            metadata: activity.metadata,
            ip_address: activity.ip_address,
            device: activity.device,
            location: activity.location,
        };

        match self.db.append_activity(&entry).await {
            Ok(()) => Some(entry.id),
            Err(e) => {
                tracing::error!(
                    user_id = %entry.user_id,
                    kind = %entry.kind.as_str(),
                    error = %e,
                    "Failed to append activity log entry"
                );
                None
            }
        }
    }

    /// The caller's own history, newest first.
    pub async fn user_logs(
        &self,
        session: &Session,
        limit: Option<u32>,
        start_after: Option<&str>,
        kind: Option<ActivityKind>,
        description: Option<&str>,
    ) -> Result<ActivityFeed> {
        let limit = clamp_limit(limit);

        let page = self
            .db
            .query_activity_logs(
                Some(&session.user_id),
                kind,
                description,
                limit,
                start_after,
            )
            .await?;

        // All rows belong to the caller, so one lookup covers the page.
        // The session email is the fallback when the lookup comes back
        // empty or the identity store is unreachable.
        let email = match self.identity.lookup_by_uid(&session.user_id).await {
            Ok(Some(user)) => user.email.unwrap_or_else(|| session.email.clone()),
            Ok(None) => session.email.clone(),
            Err(e) => {
                tracing::warn!(user_id = %session.user_id, error = %e, "Identity lookup failed");
                session.email.clone()
            }
        };

        let entries = page
            .entries
            .into_iter()
            .map(|entry| ActivityLogView {
                entry,
                user_email: email.clone(),
            })
            .collect();

        Ok(ActivityFeed {
            entries,
            next_cursor: page.next_cursor,
            has_more: page.has_more,
        })
    }

    /// The admin feed across all users, newest first, optionally narrowed
    /// to one user.
    ///
    /// This gate checks the session's role claim, not the live profile.
    pub async fn all_logs(
        &self,
        session: &Session,
        limit: Option<u32>,
        start_after: Option<&str>,
        kind: Option<ActivityKind>,
        user_id: Option<&str>,
    ) -> Result<ActivityFeed> {
        if session.role != UserRole::Admin {
            return Err(AppError::Unauthorized);
        }

        let limit = clamp_limit(limit);

        let page = self
            .db
            .query_activity_logs(user_id, kind, None, limit, start_after)
            .await?;

        let emails = self.emails_for_page(&page.entries).await;

        let entries = page
            .entries
            .into_iter()
            .map(|entry| {
                let user_email = emails.get(&entry.user_id).cloned().unwrap_or_default();
                ActivityLogView { entry, user_email }
            })
            .collect();

        Ok(ActivityFeed {
            entries,
            next_cursor: page.next_cursor,
            has_more: page.has_more,
        })
    }

    /// Resolve current emails for every distinct uid on the page.
    ///
    /// A uid whose lookup fails or whose account no longer exists maps to
    /// an empty string; one dead account must not take down the feed.
    async fn emails_for_page(&self, entries: &[ActivityLogEntry]) -> HashMap<String, String> {
        let uids: HashSet<String> = entries.iter().map(|e| e.user_id.clone()).collect();
        let identity = &self.identity;

        futures_util::stream::iter(uids)
            .map(|uid| async move {
                let email = match identity.lookup_by_uid(&uid).await {
                    Ok(Some(user)) => user.email.unwrap_or_default(),
                    Ok(None) => String::new(),
                    Err(e) => {
                        tracing::warn!(user_id = %uid, error = %e, "Identity lookup failed");
                        String::new()
                    }
                };
                (uid, email)
            })
            .buffer_unordered(MAX_CONCURRENT_LOOKUPS)
            .collect()
            .await
    }
}

/// Clamp a requested page size into `1..=MAX_LIMIT`.
fn clamp_limit(limit: Option<u32>) -> u32 {
    limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
}

// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Activity-log model: the append-only audit trail.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// What happened. Closed set; new kinds are added here, never free-form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    Login,
    Register,
    ProfileUpdate,
    PasswordResetRequested,
    PasswordResetCompleted,
    DeletionRequest,
    DeletionCompleted,
    DeletionFailed,
    AdminAction,
    DataExport,
}

impl ActivityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityKind::Login => "login",
            ActivityKind::Register => "register",
            ActivityKind::ProfileUpdate => "profile_update",
            ActivityKind::PasswordResetRequested => "password_reset_requested",
            ActivityKind::PasswordResetCompleted => "password_reset_completed",
            ActivityKind::DeletionRequest => "deletion_request",
            ActivityKind::DeletionCompleted => "deletion_completed",
            ActivityKind::DeletionFailed => "deletion_failed",
            ActivityKind::AdminAction => "admin_action",
            ActivityKind::DataExport => "data_export",
        }
    }

    /// Parse a kind name (used for the `kind` query filter).
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "login" => Some(ActivityKind::Login),
            "register" => Some(ActivityKind::Register),
            "profile_update" => Some(ActivityKind::ProfileUpdate),
            "password_reset_requested" => Some(ActivityKind::PasswordResetRequested),
            "password_reset_completed" => Some(ActivityKind::PasswordResetCompleted),
            "deletion_request" => Some(ActivityKind::DeletionRequest),
            "deletion_completed" => Some(ActivityKind::DeletionCompleted),
            "deletion_failed" => Some(ActivityKind::DeletionFailed),
            "admin_action" => Some(ActivityKind::AdminAction),
            "data_export" => Some(ActivityKind::DataExport),
            _ => None,
        }
    }
}

/// Outcome attached to a log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityStatus {
    Success,
    Failed,
    Pending,
    Completed,
    Warning,
}

/// Known metadata keys. The bag stays loosely typed, but anything a test
/// or the UI depends on must be listed here.
pub mod metadata_keys {
    pub const PROVIDER: &str = "provider";
    pub const EMAIL: &str = "email";
    pub const TARGET_USER: &str = "targetUser";
    pub const OLD_ROLE: &str = "oldRole";
    pub const NEW_ROLE: &str = "newRole";
}

/// One audit record in Firestore (`activityLogs/{id}`).
///
/// Immutable once written: no update path exists anywhere in the crate.
/// Field names stay camelCase on the wire and in storage, matching the
/// dashboard that reads them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityLogEntry {
    /// Random ID (also used as document ID and as the pagination tiebreak)
    pub id: String,
    /// Owning user's uid
    pub user_id: String,
    /// What happened
    #[serde(rename = "type")]
    pub kind: ActivityKind,
    /// Human-readable description
    pub description: String,
    /// Outcome
    pub status: ActivityStatus,
    /// Server-side write time (RFC3339); the primary sort key
    pub timestamp: String,
    /// Loosely-typed side channel; see [`metadata_keys`]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<HashMap<String, serde_json::Value>>,
    /// Request origin, when the caller supplied it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

/// Inputs for appending one entry. The writer fills in `id` and
/// `timestamp` itself so callers cannot backdate the trail.
#[derive(Debug, Clone)]
pub struct NewActivity {
    pub user_id: String,
    pub kind: ActivityKind,
    pub description: String,
    pub status: ActivityStatus,
    pub metadata: Option<HashMap<String, serde_json::Value>>,
    pub ip_address: Option<String>,
    pub device: Option<String>,
    pub location: Option<String>,
}

impl NewActivity {
    /// Shorthand for the common case: no metadata, no request context.
    pub fn new(
        user_id: impl Into<String>,
        kind: ActivityKind,
        description: impl Into<String>,
        status: ActivityStatus,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            kind,
            description: description.into(),
            status,
            metadata: None,
            ip_address: None,
            device: None,
            location: None,
        }
    }

    pub fn with_metadata(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.metadata
            .get_or_insert_with(HashMap::new)
            .insert(key.to_string(), value.into());
        self
    }

    /// Attach the request origin (client IP, user agent).
    pub fn with_origin(mut self, ip_address: Option<String>, device: Option<String>) -> Self {
        self.ip_address = ip_address;
        self.device = device;
        self
    }
}

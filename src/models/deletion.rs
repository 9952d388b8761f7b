// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Account-deletion request model.

use serde::{Deserialize, Serialize};

/// Lifecycle of a deletion request.
///
/// The per-user path ends at `Completed`. The admin sweep stamps every
/// request it touches `Processed` afterwards, including ones that were
/// already `Completed`; the overwrite is deliberate so "the sweep saw
/// this" is visible in the stored record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeletionStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Processed,
}

impl DeletionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeletionStatus::Pending => "pending",
            DeletionStatus::Processing => "processing",
            DeletionStatus::Completed => "completed",
            DeletionStatus::Failed => "failed",
            DeletionStatus::Processed => "processed",
        }
    }
}

/// One request in Firestore (`deletionRequests/{uid}`). Keyed by uid,
/// so a user asking twice just refreshes their existing request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletionRequest {
    /// Same as the document ID
    pub user_id: String,
    /// Email at request time; kept so the audit trail survives the
    /// profile delete
    pub email: String,
    pub requested_at: String,
    pub status: DeletionStatus,
    pub completed_at: Option<String>,
}

//! Database layer (Firestore).

pub mod firestore;

pub use firestore::{ActivityPage, FirestoreDb};

/// Collection names as constants.
pub mod collections {
    pub const USERS: &str = "users";
    /// Append-only audit trail (keyed by entry id)
    pub const ACTIVITY_LOGS: &str = "activityLogs";
    /// Deletion requests (keyed by uid)
    pub const DELETION_REQUESTS: &str = "deletionRequests";
}

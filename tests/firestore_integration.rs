// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore integration tests.
//!
//! These tests require the Firestore emulator to be running.
//! Run with: ./scripts/test-with-emulator.sh
//!
//! The emulator provides a clean state for each test run.

use rollcall::error::AppError;
use rollcall::models::{
    AccountStatus, ActivityKind, ActivityLogEntry, ActivityStatus, AuthProvider, DeletionRequest,
    DeletionStatus, UserProfile, UserRole,
};
use rollcall::time_utils::format_utc_rfc3339;

mod common;
use common::test_db;

/// Generate a unique uid for test isolation.
fn unique_uid(prefix: &str) -> String {
    use std::time::{SystemTime, UNIX_EPOCH};
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    format!("{}-{}", prefix, nanos)
}

/// Helper to create a basic test profile.
fn test_profile(uid: &str, name: &str) -> UserProfile {
    UserProfile {
        uid: uid.to_string(),
        email: format!("{}@example.com", uid),
        name: name.to_string(),
        role: UserRole::User,
        photo_url: None,
        bio: None,
        password_hash: None,
        email_verified: false,
        status: AccountStatus::Active,
        provider: AuthProvider::Password,
        created_at: "2026-01-01T00:00:00.000000Z".to_string(),
        updated_at: "2026-01-01T00:00:00.000000Z".to_string(),
        last_login_at: "2026-01-01T00:00:00.000000Z".to_string(),
    }
}

/// Helper to build an activity entry with a deterministic timestamp.
///
/// The sequence number feeds both the timestamp and the ID so the
/// `(timestamp desc, id desc)` ordering is fully predictable.
fn test_entry(uid: &str, seq: u32, kind: ActivityKind) -> ActivityLogEntry {
    let base = chrono::DateTime::from_timestamp(1_760_000_000 + seq as i64, 0).unwrap();
    ActivityLogEntry {
        id: format!("{}-entry-{:04}", uid, seq),
        user_id: uid.to_string(),
        kind,
        description: format!("Event number {}", seq),
        status: ActivityStatus::Success,
        timestamp: format_utc_rfc3339(base),
        metadata: None,
        ip_address: None,
        device: None,
        location: None,
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// USER PROFILE TESTS
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_profile_upsert_and_get() {
    require_emulator!();

    let db = test_db().await;
    let uid = unique_uid("profile");

    let before = db.get_user(&uid).await.unwrap();
    assert!(before.is_none(), "Profile should not exist before creation");

    let mut profile = test_profile(&uid, "Create Me");
    profile.bio = Some("Hello there".to_string());
    db.upsert_user(&profile).await.unwrap();

    let fetched = db.get_user(&uid).await.unwrap().expect("Profile missing");
    assert_eq!(fetched.uid, uid);
    assert_eq!(fetched.name, "Create Me");
    assert_eq!(fetched.bio.as_deref(), Some("Hello there"));
    assert_eq!(fetched.role, UserRole::User);
    assert_eq!(fetched.status, AccountStatus::Active);
}

#[tokio::test]
async fn test_profile_lookup_by_email() {
    require_emulator!();

    let db = test_db().await;
    let uid = unique_uid("by-email");

    let profile = test_profile(&uid, "Email Lookup");
    db.upsert_user(&profile).await.unwrap();

    let found = db.get_user_by_email(&profile.email).await.unwrap();
    assert_eq!(found.expect("No profile for email").uid, uid);

    let missing = db
        .get_user_by_email("nobody-with-this@example.com")
        .await
        .unwrap();
    assert!(missing.is_none());
}

#[tokio::test]
async fn test_profile_update_overwrites_fields() {
    require_emulator!();

    let db = test_db().await;
    let uid = unique_uid("update");

    db.upsert_user(&test_profile(&uid, "Old Name")).await.unwrap();

    let mut updated = test_profile(&uid, "New Name");
    updated.role = UserRole::Admin;
    updated.status = AccountStatus::Disabled;
    db.upsert_user(&updated).await.unwrap();

    let fetched = db.get_user(&uid).await.unwrap().unwrap();
    assert_eq!(fetched.name, "New Name");
    assert_eq!(fetched.role, UserRole::Admin);
    assert!(fetched.is_disabled());
}

#[tokio::test]
async fn test_profile_delete_is_idempotent() {
    require_emulator!();

    let db = test_db().await;
    let uid = unique_uid("delete");

    db.upsert_user(&test_profile(&uid, "Delete Me")).await.unwrap();
    assert!(db.get_user(&uid).await.unwrap().is_some());

    db.delete_user(&uid).await.unwrap();
    assert!(db.get_user(&uid).await.unwrap().is_none());

    // Deleting again must not fail.
    db.delete_user(&uid).await.unwrap();
}

#[tokio::test]
async fn test_users_collection_not_empty_after_insert() {
    require_emulator!();

    let db = test_db().await;
    let uid = unique_uid("first-user");

    db.upsert_user(&test_profile(&uid, "Seed")).await.unwrap();

    // Other tests may have seeded users too; all we can assert on a
    // shared emulator is the non-empty side of the probe.
    assert!(!db.users_collection_empty().await.unwrap());
}

#[tokio::test]
async fn test_search_users_by_name_prefix() {
    require_emulator!();

    let db = test_db().await;
    let uid_a = unique_uid("search-a");
    let uid_b = unique_uid("search-b");

    // The prefix itself must be unique per run or earlier runs pollute
    // the result set.
    let prefix = format!("Zx{}", unique_uid("p"));

    db.upsert_user(&test_profile(&uid_a, &format!("{} Alpha", prefix)))
        .await
        .unwrap();
    db.upsert_user(&test_profile(&uid_b, "Completely Different"))
        .await
        .unwrap();

    let hits = db.search_users_by_name(&prefix, 10, 0).await.unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].uid, uid_a);
}

#[tokio::test]
async fn test_merge_google_login_fills_missing_fields_only() {
    require_emulator!();

    let db = test_db().await;
    let uid = unique_uid("merge");

    let mut profile = test_profile(&uid, "");
    profile.provider = AuthProvider::Google;
    db.upsert_user(&profile).await.unwrap();

    let merged = db
        .merge_google_login(&uid, Some("Google Name"), Some("https://example.com/p.jpg"))
        .await
        .unwrap();
    assert_eq!(merged.name, "Google Name");
    assert_eq!(merged.photo_url.as_deref(), Some("https://example.com/p.jpg"));

    // A second merge with different values must not clobber anything.
    let again = db
        .merge_google_login(&uid, Some("Other Name"), Some("https://example.com/q.jpg"))
        .await
        .unwrap();
    assert_eq!(again.name, "Google Name");
    assert_eq!(again.photo_url.as_deref(), Some("https://example.com/p.jpg"));
}

#[tokio::test]
async fn test_merge_google_login_missing_profile_is_not_found() {
    require_emulator!();

    let db = test_db().await;
    let uid = unique_uid("merge-missing");

    let err = db.merge_google_login(&uid, Some("Name"), None).await;
    assert!(matches!(err, Err(AppError::NotFound(_))));
}

// ═══════════════════════════════════════════════════════════════════════════
// ACTIVITY LOG TESTS
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_activity_append_and_get() {
    require_emulator!();

    let db = test_db().await;
    let uid = unique_uid("activity");

    let entry = test_entry(&uid, 1, ActivityKind::Login);
    db.append_activity(&entry).await.unwrap();

    let fetched = db
        .get_activity_entry(&entry.id)
        .await
        .unwrap()
        .expect("Entry missing");
    assert_eq!(fetched.user_id, uid);
    assert_eq!(fetched.kind, ActivityKind::Login);
    assert_eq!(fetched.timestamp, entry.timestamp);
}

#[tokio::test]
async fn test_activity_pagination_covers_all_pages_without_overlap() {
    require_emulator!();

    let db = test_db().await;
    let uid = unique_uid("paging");

    for seq in 0..25 {
        db.append_activity(&test_entry(&uid, seq, ActivityKind::Login))
            .await
            .unwrap();
    }

    let mut seen = Vec::new();

    let page1 = db
        .query_activity_logs(Some(&uid), None, None, 10, None)
        .await
        .unwrap();
    assert_eq!(page1.entries.len(), 10);
    assert!(page1.has_more);
    let cursor1 = page1.next_cursor.clone().expect("Missing cursor");
    seen.extend(page1.entries.iter().map(|e| e.id.clone()));

    let page2 = db
        .query_activity_logs(Some(&uid), None, None, 10, Some(&cursor1))
        .await
        .unwrap();
    assert_eq!(page2.entries.len(), 10);
    assert!(page2.has_more);
    let cursor2 = page2.next_cursor.clone().expect("Missing cursor");
    seen.extend(page2.entries.iter().map(|e| e.id.clone()));

    let page3 = db
        .query_activity_logs(Some(&uid), None, None, 10, Some(&cursor2))
        .await
        .unwrap();
    assert_eq!(page3.entries.len(), 5);
    assert!(!page3.has_more);
    assert!(page3.next_cursor.is_none());
    seen.extend(page3.entries.iter().map(|e| e.id.clone()));

    // 25 unique IDs: no page overlapped and none were skipped.
    let unique: std::collections::HashSet<_> = seen.iter().collect();
    assert_eq!(unique.len(), 25);

    // Newest first throughout.
    let timestamps: Vec<_> = page1
        .entries
        .iter()
        .chain(&page2.entries)
        .chain(&page3.entries)
        .map(|e| e.timestamp.clone())
        .collect();
    let mut sorted = timestamps.clone();
    sorted.sort_by(|a, b| b.cmp(a));
    assert_eq!(timestamps, sorted);
}

#[tokio::test]
async fn test_activity_filter_by_kind() {
    require_emulator!();

    let db = test_db().await;
    let uid = unique_uid("kind-filter");

    db.append_activity(&test_entry(&uid, 1, ActivityKind::Login))
        .await
        .unwrap();
    db.append_activity(&test_entry(&uid, 2, ActivityKind::ProfileUpdate))
        .await
        .unwrap();
    db.append_activity(&test_entry(&uid, 3, ActivityKind::Login))
        .await
        .unwrap();

    let page = db
        .query_activity_logs(Some(&uid), Some(ActivityKind::Login), None, 10, None)
        .await
        .unwrap();
    assert_eq!(page.entries.len(), 2);
    assert!(page.entries.iter().all(|e| e.kind == ActivityKind::Login));
}

#[tokio::test]
async fn test_activity_filter_by_description() {
    require_emulator!();

    let db = test_db().await;
    let uid = unique_uid("desc-filter");

    db.append_activity(&test_entry(&uid, 1, ActivityKind::Login))
        .await
        .unwrap();
    db.append_activity(&test_entry(&uid, 2, ActivityKind::Login))
        .await
        .unwrap();

    let page = db
        .query_activity_logs(Some(&uid), None, Some("Event number 2"), 10, None)
        .await
        .unwrap();
    assert_eq!(page.entries.len(), 1);
    assert_eq!(page.entries[0].description, "Event number 2");
}

#[tokio::test]
async fn test_activity_unknown_cursor_is_validation_error() {
    require_emulator!();

    let db = test_db().await;
    let uid = unique_uid("bad-cursor");

    let err = db
        .query_activity_logs(Some(&uid), None, None, 10, Some("no-such-entry-id"))
        .await;
    assert!(matches!(err, Err(AppError::Validation(msg)) if msg.contains("no-such-entry-id")));
}

#[tokio::test]
async fn test_all_activity_for_user_is_scoped_and_ordered() {
    require_emulator!();

    let db = test_db().await;
    let uid = unique_uid("export-scope");
    let other = unique_uid("export-other");

    for seq in 0..3 {
        db.append_activity(&test_entry(&uid, seq, ActivityKind::Login))
            .await
            .unwrap();
    }
    db.append_activity(&test_entry(&other, 0, ActivityKind::Login))
        .await
        .unwrap();

    let entries = db.all_activity_for_user(&uid).await.unwrap();
    assert_eq!(entries.len(), 3);
    assert!(entries.iter().all(|e| e.user_id == uid));
    assert!(entries[0].timestamp >= entries[1].timestamp);
    assert!(entries[1].timestamp >= entries[2].timestamp);
}

// ═══════════════════════════════════════════════════════════════════════════
// DELETION REQUEST TESTS
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_deletion_request_round_trip() {
    require_emulator!();

    let db = test_db().await;
    let uid = unique_uid("del-request");

    assert!(db.get_deletion_request(&uid).await.unwrap().is_none());

    let request = DeletionRequest {
        user_id: uid.clone(),
        email: format!("{}@example.com", uid),
        requested_at: "2026-02-01T00:00:00.000000Z".to_string(),
        status: DeletionStatus::Pending,
        completed_at: None,
    };
    db.set_deletion_request(&request).await.unwrap();

    let fetched = db
        .get_deletion_request(&uid)
        .await
        .unwrap()
        .expect("Request missing");
    assert_eq!(fetched.status, DeletionStatus::Pending);
    assert_eq!(fetched.email, request.email);
    assert!(fetched.completed_at.is_none());
}

#[tokio::test]
async fn test_pending_list_excludes_finished_requests() {
    require_emulator!();

    let db = test_db().await;
    let uid_pending = unique_uid("del-pending");
    let uid_done = unique_uid("del-done");

    db.set_deletion_request(&DeletionRequest {
        user_id: uid_pending.clone(),
        email: format!("{}@example.com", uid_pending),
        requested_at: "2026-02-01T00:00:00.000000Z".to_string(),
        status: DeletionStatus::Pending,
        completed_at: None,
    })
    .await
    .unwrap();

    db.set_deletion_request(&DeletionRequest {
        user_id: uid_done.clone(),
        email: format!("{}@example.com", uid_done),
        requested_at: "2026-02-01T00:00:00.000000Z".to_string(),
        status: DeletionStatus::Completed,
        completed_at: Some("2026-02-02T00:00:00.000000Z".to_string()),
    })
    .await
    .unwrap();

    let pending = db.pending_deletion_requests().await.unwrap();
    assert!(pending.iter().any(|r| r.user_id == uid_pending));
    assert!(pending.iter().all(|r| r.user_id != uid_done));
    assert!(pending.iter().all(|r| r.status == DeletionStatus::Pending));
}

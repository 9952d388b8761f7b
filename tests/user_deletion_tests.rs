// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Integration tests for the account-deletion lifecycle.
//!
//! The request state machine is exercised against the Firestore emulator.
//! The full deletion path (profile, credential, audit trail) additionally
//! needs the Identity Toolkit emulator and skips itself unless
//! FIREBASE_AUTH_EMULATOR_HOST is set as well.
//!
//! The sweep touches every pending request in the store, so everything
//! that runs a sweep lives in one sequential test; otherwise parallel
//! tests would process each other's requests mid-assertion.

use rollcall::config::Config;
use rollcall::middleware::Session;
use rollcall::models::{DeletionRequest, DeletionStatus, UserRole};
use rollcall::services::{
    AccountService, ActivityLogService, GoogleTokenVerifier, IdentityService, RequestMeta,
    StorageService,
};
use std::sync::Arc;

mod common;
use common::test_db;

fn identity_emulator_available() -> bool {
    std::env::var("FIREBASE_AUTH_EMULATOR_HOST").is_ok()
}

/// Skip test unless both emulators are reachable.
macro_rules! require_both_emulators {
    () => {
        require_emulator!();
        if !identity_emulator_available() {
            eprintln!("⚠️  Skipping: FIREBASE_AUTH_EMULATOR_HOST not set");
            return;
        }
    };
}

fn unique_suffix() -> u128 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos()
}

/// Build the account service against live emulators; storage stays mocked
/// because image cleanup is best effort and never blocks a deletion.
async fn emulator_account_service() -> AccountService {
    let config = Config::test_default();
    let db = test_db().await;
    let identity = IdentityService::new(&config.gcp_project_id, &config.identity_api_key)
        .await
        .expect("Failed to connect to Identity Toolkit emulator");
    let storage = StorageService::new_mock();
    let verifier =
        Arc::new(GoogleTokenVerifier::new(&config).expect("Failed to build token verifier"));
    let activity = ActivityLogService::new(db.clone(), identity.clone());

    AccountService::new(db, identity, storage, verifier, activity)
}

fn session_for(uid: &str, email: &str, role: UserRole) -> Session {
    Session {
        user_id: uid.to_string(),
        role,
        email: email.to_string(),
        name: "Lifecycle Test".to_string(),
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// REQUEST STATE MACHINE (Firestore emulator only)
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_request_states_round_trip_through_store() {
    require_emulator!();

    let db = test_db().await;
    let uid = format!("state-machine-{}", unique_suffix());

    let mut request = DeletionRequest {
        user_id: uid.clone(),
        email: format!("{}@example.com", uid),
        requested_at: "2026-02-01T00:00:00.000000Z".to_string(),
        status: DeletionStatus::Pending,
        completed_at: None,
    };
    db.set_deletion_request(&request).await.unwrap();

    for status in [
        DeletionStatus::Processing,
        DeletionStatus::Completed,
        DeletionStatus::Processed,
    ] {
        request.status = status;
        db.set_deletion_request(&request).await.unwrap();

        let stored = db.get_deletion_request(&uid).await.unwrap().unwrap();
        assert_eq!(stored.status, status);
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// FULL LIFECYCLE (both emulators)
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_deletion_lifecycle_end_to_end() {
    require_both_emulators!();

    let service = emulator_account_service().await;
    let db = test_db().await;
    let meta = RequestMeta::default();

    // ── Immediate deletion ──────────────────────────────────────
    let email_a = format!("delete-me-{}@example.com", unique_suffix());
    let outcome_a = service
        .register("Delete Me", &email_a, "longenough", &meta)
        .await
        .expect("Registration failed");
    let uid_a = outcome_a.user_id.clone();
    assert!(db.get_user(&uid_a).await.unwrap().is_some());

    let session_a = session_for(&uid_a, &email_a, outcome_a.role);
    let deleted = service
        .request_deletion(&session_a, true, &meta)
        .await
        .expect("Deletion request failed");
    assert!(deleted, "Immediate deletion should report completion");

    // Profile gone, request completed and stamped.
    assert!(db.get_user(&uid_a).await.unwrap().is_none());
    let request_a = db.get_deletion_request(&uid_a).await.unwrap().unwrap();
    assert_eq!(request_a.status, DeletionStatus::Completed);
    assert!(request_a.completed_at.is_some());

    // The audit trail recorded both the request and the completion,
    // still attributed to the deleted user.
    let entries = db.all_activity_for_user(&uid_a).await.unwrap();
    let kinds: Vec<&str> = entries.iter().map(|e| e.kind.as_str()).collect();
    assert!(kinds.contains(&"deletion_request"));
    assert!(kinds.contains(&"deletion_completed"));

    // ── Deferred deletion, then the admin sweep ─────────────────
    let email_b = format!("defer-me-{}@example.com", unique_suffix());
    let outcome_b = service
        .register("Defer Me", &email_b, "longenough", &meta)
        .await
        .unwrap();
    let uid_b = outcome_b.user_id.clone();

    let session_b = session_for(&uid_b, &email_b, outcome_b.role);
    let deleted = service
        .request_deletion(&session_b, false, &meta)
        .await
        .unwrap();
    assert!(!deleted, "Deferred request must not delete anything yet");

    assert!(db.get_user(&uid_b).await.unwrap().is_some());
    let request_b = db.get_deletion_request(&uid_b).await.unwrap().unwrap();
    assert_eq!(request_b.status, DeletionStatus::Pending);

    let admin = session_for("sweep-admin", "admin@example.com", UserRole::Admin);
    let summary = service.process_pending_deletions(&admin).await.unwrap();
    assert!(summary.processed >= 1);

    // The sweep stamps everything it handled `processed`, not
    // `completed`, and the deferred account is now gone.
    let request_b = db.get_deletion_request(&uid_b).await.unwrap().unwrap();
    assert_eq!(request_b.status, DeletionStatus::Processed);
    assert!(request_b.completed_at.is_some());
    assert!(db.get_user(&uid_b).await.unwrap().is_none());

    // ── Re-processing an already-deleted account ────────────────
    // Neither the profile nor the credential exists any more; both
    // absences are tolerated and the run still reports success.
    assert!(service.process_account_deletion(&uid_a).await);
}

#[tokio::test]
async fn test_sweep_rejects_non_admin_session() {
    // The role gate fires before any backend access, so offline mocks
    // are enough here.
    let config = Config::test_default();
    let db = common::test_db_offline();
    let identity = IdentityService::new_mock();
    let storage = StorageService::new_mock();
    let verifier =
        Arc::new(GoogleTokenVerifier::new(&config).expect("Failed to build token verifier"));
    let activity = ActivityLogService::new(db.clone(), identity.clone());
    let service = AccountService::new(db, identity, storage, verifier, activity);

    let user = session_for("not-admin", "user@example.com", UserRole::User);
    assert!(service.process_pending_deletions(&user).await.is_err());
}

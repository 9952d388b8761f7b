// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use rollcall::config::Config;
use rollcall::db::FirestoreDb;
use rollcall::middleware::create_session_token;
use rollcall::models::{AccountStatus, AuthProvider, UserProfile, UserRole};
use rollcall::routes::create_router;
use rollcall::services::{
    AccountService, ActivityLogService, GoogleTokenVerifier, IdentityService, StorageService,
};
use rollcall::AppState;
use std::sync::Arc;

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// Create a mock database connection (offline).
#[allow(dead_code)]
pub fn test_db_offline() -> FirestoreDb {
    FirestoreDb::new_mock()
}

/// Create a test app with offline mock dependencies.
/// Returns the router and the shared state.
#[allow(dead_code)]
pub fn create_test_app() -> (axum::Router, Arc<AppState>) {
    let config = Config::test_default();
    let db = test_db_offline();
    let identity = IdentityService::new_mock();
    let storage = StorageService::new_mock();
    let verifier =
        Arc::new(GoogleTokenVerifier::new(&config).expect("Failed to build token verifier"));

    let activity = ActivityLogService::new(db.clone(), identity.clone());
    let account = AccountService::new(
        db.clone(),
        identity,
        storage,
        verifier,
        activity.clone(),
    );

    let state = Arc::new(AppState {
        config,
        db,
        account,
        activity,
    });

    (create_router(state.clone()), state)
}

/// Build a profile fixture for token minting.
#[allow(dead_code)]
pub fn test_profile(uid: &str, role: UserRole) -> UserProfile {
    UserProfile {
        uid: uid.to_string(),
        email: format!("{}@example.com", uid),
        name: format!("Test {}", uid),
        role,
        photo_url: None,
        bio: None,
        password_hash: None,
        email_verified: true,
        status: AccountStatus::Active,
        provider: AuthProvider::Password,
        created_at: "2026-01-01T00:00:00.000000Z".to_string(),
        updated_at: "2026-01-01T00:00:00.000000Z".to_string(),
        last_login_at: "2026-01-01T00:00:00.000000Z".to_string(),
    }
}

/// Mint a session token for a profile with the given signing key.
#[allow(dead_code)]
pub fn session_token(profile: &UserProfile, signing_key: &[u8]) -> String {
    create_session_token(profile, signing_key).expect("Failed to mint session token")
}

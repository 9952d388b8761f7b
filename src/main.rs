// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Rollcall API Server
//!
//! Account lifecycle and activity-audit backend: registration, login,
//! Google sign-in, admin user management, account deletion, and the
//! append-only activity log.

use rollcall::{
    config::Config,
    db::FirestoreDb,
    services::{
        AccountService, ActivityLogService, GoogleTokenVerifier, IdentityService, StorageService,
    },
    AppState,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging for GCP
    init_logging();

    // Load configuration from environment
    let config = Config::from_env().expect("Failed to load configuration");
    tracing::info!(port = config.port, "Starting Rollcall API");

    // Initialize Firestore database
    let db = FirestoreDb::new(&config.gcp_project_id)
        .await
        .expect("Failed to connect to Firestore");

    // Initialize the Identity Store client
    let identity = IdentityService::new(&config.gcp_project_id, &config.identity_api_key)
        .await
        .expect("Failed to initialize Identity Store client");

    // Initialize Cloud Storage (profile-image cleanup)
    let storage = StorageService::new(&config.storage_bucket)
        .await
        .expect("Failed to initialize Cloud Storage client");

    // Google ID token verifier for the sign-in flow
    let verifier =
        Arc::new(GoogleTokenVerifier::new(&config).expect("Failed to initialize token verifier"));

    let activity = ActivityLogService::new(db.clone(), identity.clone());
    let account = AccountService::new(
        db.clone(),
        identity,
        storage,
        verifier,
        activity.clone(),
    );

    // Build shared state
    let state = Arc::new(AppState {
        config: config.clone(),
        db,
        account,
        activity,
    });

    // Build router
    let app = rollcall::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging (GCP-compliant).
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("rollcall=debug".parse().unwrap())
                .add_directive("info".parse().unwrap()),
        )
        .with(format)
        .init();
}

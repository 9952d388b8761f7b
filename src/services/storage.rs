// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Cloud Storage service for profile-image cleanup.
//!
//! Account deletion only ever removes objects, so this wraps the one JSON
//! API call we need instead of pulling in a full storage SDK.

use crate::error::AppError;
use std::sync::Arc;

/// Cloud Storage client.
#[derive(Clone)]
pub struct StorageService {
    http: reqwest::Client,
    base_url: String,
    bucket: String,
    /// None when talking to an emulator or in mock mode.
    token_generator: Option<Arc<gcloud_sdk::GoogleAuthTokenGenerator>>,
    mock: bool,
}

impl StorageService {
    /// Create a new Cloud Storage client for the given bucket.
    ///
    /// For local development, set STORAGE_EMULATOR_HOST.
    pub async fn new(bucket: &str) -> Result<Self, AppError> {
        if let Ok(host) = std::env::var("STORAGE_EMULATOR_HOST") {
            tracing::info!(host = %host, "Using Cloud Storage emulator");
            return Ok(Self {
                http: reqwest::Client::new(),
                base_url: format!("http://{}/storage/v1", host),
                bucket: bucket.to_string(),
                token_generator: None,
                mock: false,
            });
        }

        let token_generator = gcloud_sdk::GoogleAuthTokenGenerator::new(
            gcloud_sdk::TokenSourceType::Default,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
        )
        .await
        .map_err(|e| AppError::Storage(format!("Failed to init Cloud Storage auth: {}", e)))?;

        tracing::info!(bucket, "Connected to Cloud Storage");

        Ok(Self {
            http: reqwest::Client::new(),
            base_url: "https://storage.googleapis.com/storage/v1".to_string(),
            bucket: bucket.to_string(),
            token_generator: Some(Arc::new(token_generator)),
            mock: false,
        })
    }

    /// Create a mock storage client for testing (offline mode).
    ///
    /// Deletes succeed without doing anything, matching the best-effort
    /// role storage cleanup plays in account deletion.
    pub fn new_mock() -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: "https://storage.googleapis.com/storage/v1".to_string(),
            bucket: "mock".to_string(),
            token_generator: None,
            mock: true,
        }
    }

    /// Delete one object from the bucket. A missing object is success.
    pub async fn delete_object(&self, object_path: &str) -> Result<(), AppError> {
        if self.mock {
            tracing::debug!(object = object_path, "Mock storage delete (no-op)");
            return Ok(());
        }

        let url = format!(
            "{}/b/{}/o/{}",
            self.base_url,
            self.bucket,
            urlencoding::encode(object_path)
        );

        let mut request = self.http.delete(&url);
        if let Some(generator) = &self.token_generator {
            let token = generator.create_token().await.map_err(|e| {
                AppError::Storage(format!("Failed to obtain access token: {}", e))
            })?;
            request = request.header(reqwest::header::AUTHORIZATION, token.header_value());
        }

        let response = request
            .send()
            .await
            .map_err(|e| AppError::Storage(format!("Delete request failed: {}", e)))?;

        let status = response.status();
        if status.is_success() || status == reqwest::StatusCode::NOT_FOUND {
            tracing::debug!(
                object = object_path,
                found = status.is_success(),
                "Storage object delete"
            );
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(AppError::Storage(format!("HTTP {}: {}", status, body)))
    }

    /// Delete the stored profile image for a user, if any.
    pub async fn delete_profile_image(&self, uid: &str) -> Result<(), AppError> {
        self.delete_object(&format!("users/{}/profile.jpg", uid))
            .await
    }
}

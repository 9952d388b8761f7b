//! Application configuration loaded from environment variables.
//!
//! Secrets are read once at startup and cached in memory. On Cloud Run the
//! secret bindings inject them as environment variables, so no Secret
//! Manager round-trips are needed at runtime.

use std::env;

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // --- Environment Variables (non-sensitive) ---
    /// GCP project ID (Firestore + Identity Toolkit tenant)
    pub gcp_project_id: String,
    /// Frontend URL for CORS and post-auth redirects
    pub frontend_url: String,
    /// Cloud Storage bucket holding profile images
    pub storage_bucket: String,
    /// Server port
    pub port: u16,

    /// OAuth client ID expected as the audience of Google ID tokens
    pub google_client_id: String,

    // --- Secrets (injected by the platform) ---
    /// Identity Toolkit web API key (used by the sign-in endpoints)
    pub identity_api_key: String,
    /// JWT signing key for session tokens (raw bytes)
    pub jwt_signing_key: Vec<u8>,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let gcp_project_id =
            env::var("GCP_PROJECT_ID").unwrap_or_else(|_| "local-dev".to_string());

        // Firebase projects get a default bucket named after the project.
        let storage_bucket = env::var("STORAGE_BUCKET")
            .unwrap_or_else(|_| format!("{}.appspot.com", gcp_project_id));

        Ok(Self {
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
            google_client_id: env::var("GOOGLE_CLIENT_ID")
                .map_err(|_| ConfigError::Missing("GOOGLE_CLIENT_ID"))?,
            identity_api_key: env::var("IDENTITY_API_KEY")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("IDENTITY_API_KEY"))?,
            jwt_signing_key: env::var("JWT_SIGNING_KEY")
                .map_err(|_| ConfigError::Missing("JWT_SIGNING_KEY"))?
                .into_bytes(),
            gcp_project_id,
            storage_bucket,
        })
    }

    /// Default config for tests only.
    pub fn test_default() -> Self {
        Self {
            gcp_project_id: "test-project".to_string(),
            frontend_url: "http://localhost:3000".to_string(),
            storage_bucket: "test-project.appspot.com".to_string(),
            port: 8080,
            google_client_id: "test-client-id.apps.googleusercontent.com".to_string(),
            identity_api_key: "test_api_key".to_string(),
            jwt_signing_key: b"test_jwt_key_32_bytes_minimum!!!".to_vec(),
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),
}

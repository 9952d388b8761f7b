// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Identity Toolkit REST client (the Identity Store).
//!
//! Handles:
//! - Credential sign-up and password sign-in (API-key endpoints)
//! - Account lookup, update, and deletion (admin endpoints)
//! - Role custom claims
//! - Password-reset mail dispatch
//!
//! Upstream error codes are translated into `AppError` variants here, at
//! the boundary, so nothing above this layer ever string-matches them.

use crate::error::AppError;
use crate::models::UserRole;
use serde::Deserialize;
use std::sync::Arc;

const PRODUCTION_BASE_URL: &str = "https://identitytoolkit.googleapis.com/v1";

/// Identity Toolkit client.
#[derive(Clone)]
pub struct IdentityService {
    http: reqwest::Client,
    base_url: String,
    project_id: String,
    api_key: String,
    /// None when talking to the emulator (which accepts a dummy owner
    /// token) or in mock mode.
    token_generator: Option<Arc<gcloud_sdk::GoogleAuthTokenGenerator>>,
    mock: bool,
}

impl IdentityService {
    /// Create a new Identity Toolkit client.
    ///
    /// For local development, set FIREBASE_AUTH_EMULATOR_HOST.
    pub async fn new(project_id: &str, api_key: &str) -> Result<Self, AppError> {
        if let Ok(host) = std::env::var("FIREBASE_AUTH_EMULATOR_HOST") {
            tracing::info!(host = %host, "Using Identity Toolkit emulator");
            return Ok(Self {
                http: reqwest::Client::new(),
                base_url: format!("http://{}/identitytoolkit.googleapis.com/v1", host),
                project_id: project_id.to_string(),
                api_key: api_key.to_string(),
                token_generator: None,
                mock: false,
            });
        }

        let token_generator = gcloud_sdk::GoogleAuthTokenGenerator::new(
            gcloud_sdk::TokenSourceType::Default,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
        )
        .await
        .map_err(|e| AppError::Identity(format!("Failed to init Identity Toolkit auth: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Identity Toolkit");

        Ok(Self {
            http: reqwest::Client::new(),
            base_url: PRODUCTION_BASE_URL.to_string(),
            project_id: project_id.to_string(),
            api_key: api_key.to_string(),
            token_generator: Some(Arc::new(token_generator)),
            mock: false,
        })
    }

    /// Create a mock Identity Toolkit client for testing (offline mode).
    ///
    /// All identity operations will return an error if called.
    pub fn new_mock() -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: PRODUCTION_BASE_URL.to_string(),
            project_id: "mock".to_string(),
            api_key: "mock".to_string(),
            token_generator: None,
            mock: true,
        }
    }

    fn ensure_online(&self) -> Result<(), AppError> {
        if self.mock {
            return Err(AppError::Identity(
                "Identity Store not connected (offline mode)".to_string(),
            ));
        }
        Ok(())
    }

    // ─── Credential Endpoints (API key) ──────────────────────────

    /// Create a password credential. The returned uid keys everything
    /// else we store about the user.
    pub async fn sign_up(&self, email: &str, password: &str) -> Result<String, AppError> {
        self.ensure_online()?;

        let body = serde_json::json!({
            "email": email,
            "password": password,
            "returnSecureToken": true,
        });

        let response: SignUpResponse = self.post_api("signUp", &body).await?;
        Ok(response.local_id)
    }

    /// Verify a password credential for sign-in.
    ///
    /// All of "no such email", "wrong password", and "account disabled"
    /// collapse into the same invalid-credentials error so responses do
    /// not reveal which accounts exist.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<String, AppError> {
        self.ensure_online()?;

        let body = serde_json::json!({
            "email": email,
            "password": password,
            "returnSecureToken": true,
        });

        match self
            .post_api::<SignInResponse>("signInWithPassword", &body)
            .await
        {
            Ok(response) => Ok(response.local_id),
            Err(AppError::NotFound(_)) => {
                Err(AppError::Validation(AppError::INVALID_CREDENTIALS.to_string()))
            }
            Err(e) => Err(e),
        }
    }

    /// Ask the Identity Store to send a password-reset mail.
    ///
    /// Propagates `NotFound` for unknown emails; the caller decides
    /// whether that distinction may reach the client.
    pub async fn send_password_reset(&self, email: &str) -> Result<(), AppError> {
        self.ensure_online()?;

        let body = serde_json::json!({
            "requestType": "PASSWORD_RESET",
            "email": email,
        });

        let _: serde_json::Value = self.post_api("sendOobCode", &body).await?;
        Ok(())
    }

    // ─── Admin Endpoints (OAuth) ─────────────────────────────────

    /// Look up an account by email. Returns None when no account exists.
    pub async fn lookup_by_email(&self, email: &str) -> Result<Option<IdentityUser>, AppError> {
        self.ensure_online()?;

        let body = serde_json::json!({ "email": [email] });

        let path = format!("projects/{}/accounts:lookup", self.project_id);
        match self.post_admin::<LookupResponse>(&path, &body).await {
            Ok(mut response) => Ok(response.users.pop()),
            // Some deployments answer USER_NOT_FOUND instead of an empty list
            Err(AppError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Look up an account by uid. Returns None when no account exists.
    pub async fn lookup_by_uid(&self, uid: &str) -> Result<Option<IdentityUser>, AppError> {
        self.ensure_online()?;

        let body = serde_json::json!({ "localId": [uid] });

        let path = format!("projects/{}/accounts:lookup", self.project_id);
        match self.post_admin::<LookupResponse>(&path, &body).await {
            Ok(mut response) => Ok(response.users.pop()),
            Err(AppError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Create an account as an admin (the Google sign-in path, where no
    /// password exists and the email arrives pre-verified).
    pub async fn create_account(
        &self,
        email: &str,
        name: &str,
        photo_url: Option<&str>,
        email_verified: bool,
    ) -> Result<String, AppError> {
        self.ensure_online()?;

        let mut body = serde_json::json!({
            "email": email,
            "displayName": name,
            "emailVerified": email_verified,
        });
        if let Some(url) = photo_url {
            body["photoUrl"] = serde_json::Value::String(url.to_string());
        }

        let path = format!("projects/{}/accounts", self.project_id);
        let response: SignUpResponse = self.post_admin(&path, &body).await?;
        Ok(response.local_id)
    }

    /// Create an account with a password as an admin (admin user creation).
    pub async fn create_account_with_password(
        &self,
        email: &str,
        name: &str,
        password: &str,
        email_verified: bool,
    ) -> Result<String, AppError> {
        self.ensure_online()?;

        let body = serde_json::json!({
            "email": email,
            "displayName": name,
            "password": password,
            "emailVerified": email_verified,
        });

        let path = format!("projects/{}/accounts", self.project_id);
        let response: SignUpResponse = self.post_admin(&path, &body).await?;
        Ok(response.local_id)
    }

    /// Set the role custom claim on an account.
    pub async fn set_role_claim(&self, uid: &str, role: UserRole) -> Result<(), AppError> {
        self.ensure_online()?;

        let claims = serde_json::json!({ "role": role.as_str() }).to_string();
        let body = serde_json::json!({
            "localId": uid,
            "customAttributes": claims,
        });

        let path = format!("projects/{}/accounts:update", self.project_id);
        let _: serde_json::Value = self.post_admin(&path, &body).await?;

        tracing::debug!(uid, role = role.as_str(), "Role claim updated");
        Ok(())
    }

    /// Update the display name and/or photo of an account.
    pub async fn update_display(
        &self,
        uid: &str,
        name: Option<&str>,
        photo_url: Option<&str>,
    ) -> Result<(), AppError> {
        self.ensure_online()?;

        let mut body = serde_json::json!({ "localId": uid });
        if let Some(name) = name {
            body["displayName"] = serde_json::Value::String(name.to_string());
        }
        if let Some(url) = photo_url {
            body["photoUrl"] = serde_json::Value::String(url.to_string());
        }

        let path = format!("projects/{}/accounts:update", self.project_id);
        let _: serde_json::Value = self.post_admin(&path, &body).await?;
        Ok(())
    }

    /// Enable or disable an account.
    pub async fn set_disabled(&self, uid: &str, disabled: bool) -> Result<(), AppError> {
        self.ensure_online()?;

        let body = serde_json::json!({
            "localId": uid,
            "disableUser": disabled,
        });

        let path = format!("projects/{}/accounts:update", self.project_id);
        let _: serde_json::Value = self.post_admin(&path, &body).await?;

        tracing::info!(uid, disabled, "Account disable flag updated");
        Ok(())
    }

    /// Delete an account. `NotFound` for a uid that no longer exists.
    pub async fn delete_account(&self, uid: &str) -> Result<(), AppError> {
        self.ensure_online()?;

        let body = serde_json::json!({ "localId": uid });

        let path = format!("projects/{}/accounts:delete", self.project_id);
        let _: serde_json::Value = self.post_admin(&path, &body).await?;
        Ok(())
    }

    // ─── Request Helpers ─────────────────────────────────────────

    /// POST to an API-key endpoint (`accounts:{action}?key=...`).
    async fn post_api<T: for<'de> Deserialize<'de>>(
        &self,
        action: &str,
        body: &serde_json::Value,
    ) -> Result<T, AppError> {
        let url = format!("{}/accounts:{}?key={}", self.base_url, action, self.api_key);

        let response = self
            .http
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| AppError::Identity(format!("Request failed: {}", e)))?;

        Self::check_response_json(response).await
    }

    /// POST to a project-scoped admin endpoint with an OAuth token.
    async fn post_admin<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<T, AppError> {
        let url = format!("{}/{}", self.base_url, path);
        let auth_header = self.admin_auth_header().await?;

        let response = self
            .http
            .post(&url)
            .header(reqwest::header::AUTHORIZATION, auth_header)
            .json(body)
            .send()
            .await
            .map_err(|e| AppError::Identity(format!("Request failed: {}", e)))?;

        Self::check_response_json(response).await
    }

    async fn admin_auth_header(&self) -> Result<String, AppError> {
        match &self.token_generator {
            Some(generator) => {
                let token = generator.create_token().await.map_err(|e| {
                    AppError::Identity(format!("Failed to obtain access token: {}", e))
                })?;
                Ok(token.header_value())
            }
            // The emulator accepts any owner token
            None => Ok("Bearer owner".to_string()),
        }
    }

    /// Check response status, mapping Identity Toolkit error codes, and
    /// parse the JSON body.
    async fn check_response_json<T: for<'de> Deserialize<'de>>(
        response: reqwest::Response,
    ) -> Result<T, AppError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Self::map_error(status, &body));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::Identity(format!("JSON parse error: {}", e)))
    }

    /// Translate an Identity Toolkit error payload into an `AppError`.
    fn map_error(status: reqwest::StatusCode, body: &str) -> AppError {
        let message = serde_json::from_str::<ApiErrorBody>(body)
            .map(|parsed| parsed.error.message)
            .unwrap_or_default();

        // Codes sometimes carry a suffix ("WEAK_PASSWORD : ..."); match on
        // the bare code.
        let code = message.split(':').next().unwrap_or("").trim();

        match code {
            "EMAIL_EXISTS" => AppError::Conflict(AppError::EMAIL_IN_USE.to_string()),
            "EMAIL_NOT_FOUND" => AppError::NotFound("No account for that email".to_string()),
            "USER_NOT_FOUND" => AppError::NotFound("No account for that uid".to_string()),
            "INVALID_PASSWORD" | "INVALID_LOGIN_CREDENTIALS" | "USER_DISABLED" => {
                AppError::Validation(AppError::INVALID_CREDENTIALS.to_string())
            }
            "WEAK_PASSWORD" => AppError::Validation("Password is too weak".to_string()),
            "INVALID_EMAIL" => AppError::Validation("Invalid email address".to_string()),
            _ => AppError::Identity(format!("HTTP {}: {}", status, body)),
        }
    }
}

/// One account record from the Identity Store.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityUser {
    pub local_id: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub photo_url: Option<String>,
    #[serde(default)]
    pub email_verified: bool,
    #[serde(default)]
    pub disabled: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignUpResponse {
    local_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignInResponse {
    local_id: String,
}

#[derive(Debug, Deserialize)]
struct LookupResponse {
    #[serde(default)]
    users: Vec<IdentityUser>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    fn error_body(code: &str) -> String {
        serde_json::json!({ "error": { "code": 400, "message": code } }).to_string()
    }

    #[test]
    fn email_exists_maps_to_conflict() {
        let err = IdentityService::map_error(StatusCode::BAD_REQUEST, &error_body("EMAIL_EXISTS"));
        assert!(matches!(err, AppError::Conflict(msg) if msg == AppError::EMAIL_IN_USE));
    }

    #[test]
    fn credential_failures_collapse() {
        for code in ["INVALID_PASSWORD", "INVALID_LOGIN_CREDENTIALS", "USER_DISABLED"] {
            let err = IdentityService::map_error(StatusCode::BAD_REQUEST, &error_body(code));
            assert!(
                err.is_invalid_credentials(),
                "{} should collapse to invalid credentials",
                code
            );
        }
    }

    #[test]
    fn code_with_suffix_still_matches() {
        let err = IdentityService::map_error(
            StatusCode::BAD_REQUEST,
            &error_body("WEAK_PASSWORD : Password should be at least 6 characters"),
        );
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn unknown_code_degrades_to_identity_error() {
        let err = IdentityService::map_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            &error_body("SOMETHING_NEW"),
        );
        assert!(matches!(err, AppError::Identity(_)));
    }

    #[test]
    fn mock_mode_refuses_calls() {
        let service = IdentityService::new_mock();
        assert!(service.ensure_online().is_err());
    }
}

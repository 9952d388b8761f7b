//! User profile model for storage.
//!
//! The profile document mirrors the Identity Store account (same uid) and
//! carries the application-level fields the Identity Store does not:
//! role, bio, status, and bookkeeping timestamps.

use serde::{Deserialize, Serialize};

/// Application role. The first account ever created becomes `Admin`;
/// everyone after that starts as `User`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    User,
    Admin,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::User => "user",
            UserRole::Admin => "admin",
        }
    }

    /// Parse a role name, accepting only the closed set.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "user" => Some(UserRole::User),
            "admin" => Some(UserRole::Admin),
            _ => None,
        }
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Account status. Disabled accounts keep their data but cannot log in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    Active,
    Disabled,
}

/// How the account was created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthProvider {
    Password,
    Google,
}

/// User profile stored in Firestore (`users/{uid}`).
///
/// Field names stay camelCase in storage, matching the dashboard that
/// reads the documents directly. Never serialized into API responses;
/// responses go through [`PublicUser`] so `passwordHash` cannot leak.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    /// Identity Store uid (also used as document ID)
    pub uid: String,
    /// Email address (unique via the Identity Store)
    pub email: String,
    /// Display name
    pub name: String,
    /// Application role
    pub role: UserRole,
    /// Profile picture URL
    #[serde(rename = "photoURL")]
    pub photo_url: Option<String>,
    /// Free-form bio
    pub bio: Option<String>,
    /// Redundant bcrypt hash, kept for the internal credential-verification
    /// debug path. Only present for password registrations.
    pub password_hash: Option<String>,
    /// Mirrors the Identity Store's verification flag at last sync
    pub email_verified: bool,
    /// Account status
    pub status: AccountStatus,
    /// How the account was created
    pub provider: AuthProvider,
    /// When the profile was created (RFC3339)
    pub created_at: String,
    /// Last profile mutation (RFC3339)
    pub updated_at: String,
    /// Last successful login (RFC3339)
    pub last_login_at: String,
}

impl UserProfile {
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    pub fn is_disabled(&self) -> bool {
        self.status == AccountStatus::Disabled
    }
}

/// API-facing view of a user profile.
///
/// The one place `UserProfile` becomes response JSON; `passwordHash`
/// deliberately has no field here.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: String,
    pub email: String,
    pub name: String,
    pub role: UserRole,
    #[serde(rename = "photoURL")]
    pub photo_url: Option<String>,
    pub bio: Option<String>,
    pub email_verified: bool,
    pub status: AccountStatus,
    pub provider: AuthProvider,
    pub created_at: String,
    pub updated_at: String,
    pub last_login_at: String,
}

impl From<UserProfile> for PublicUser {
    fn from(profile: UserProfile) -> Self {
        Self {
            id: profile.uid,
            email: profile.email,
            name: profile.name,
            role: profile.role,
            photo_url: profile.photo_url,
            bio: profile.bio,
            email_verified: profile.email_verified,
            status: profile.status,
            provider: profile.provider,
            created_at: profile.created_at,
            updated_at: profile.updated_at,
            last_login_at: profile.last_login_at,
        }
    }
}

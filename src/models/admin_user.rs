//! Administrator model.
//!
//! Administrators manage a single community through the web console and
//! sign in with username and password.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Row from a tenant's `admin_users` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AdminUser {
    pub id: Uuid,
    pub username: String,

    /// bcrypt hash, see `services::auth_service::hash_password`
    pub password_hash: String,

    pub full_name: String,
    pub created_at: DateTime<Utc>,
}

/// `POST /{tenant}/api/auth/login` body.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// `POST /{tenant}/api/auth/phone` body.
#[derive(Debug, Deserialize)]
pub struct PhoneLoginRequest {
    /// Firebase ID token obtained after phone OTP
    pub id_token: String,
}

/// Summary of the current session for `GET /{tenant}/api/auth/me`.
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub subject: Uuid,
    pub tenant: String,
    pub role: crate::services::auth_service::Role,
    pub display_name: String,
}

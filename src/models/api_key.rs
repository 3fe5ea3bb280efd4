//! Platform API key model.
//!
//! API keys authenticate platform operators who provision and retire tenants.
//! They are stored in `public.api_keys` as SHA-256 hashes, never in plaintext.

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Represents an API key record from the database.
///
/// # Database Table
///
/// Maps to the `public.api_keys` table with columns:
/// - `id`: Unique identifier (UUID)
/// - `key_hash`: SHA-256 hash of the actual API key
/// - `label`: Operator or integration the key was issued to
/// - `is_active`: Whether the key is currently valid
/// - `created_at`: When the key was created
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ApiKey {
    pub id: Uuid,

    /// SHA-256 hash of the actual API key (64 hex characters)
    pub key_hash: String,

    pub label: String,

    /// Inactive keys are rejected during authentication
    pub is_active: bool,

    pub created_at: DateTime<Utc>,
}

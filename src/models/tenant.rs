//! Tenant registry models and the schema identifier type.
//!
//! Every residential community is a tenant with its own PostgreSQL schema.
//! The registry lives in `public.tenants`; tenant data tables are addressed
//! only through [`TenantSchema`], which guarantees the schema part of every
//! dynamically built table reference is a safe identifier.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Prefix applied to tenant names to form schema names.
pub const SCHEMA_PREFIX: &str = "tenant_";

const MAX_TENANT_NAME_LEN: usize = 40;

/// First path segments already used by non-tenant routes.
const RESERVED_NAMES: &[&str] = &["api", "health", "uploads"];

/// Represents a tenant record from `public.tenants`.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct Tenant {
    /// Tenant id, sent by clients in the `homeID` header
    pub id: Uuid,

    /// URL path segment, unique
    pub name: String,

    pub display_name: String,

    /// Schema holding this tenant's tables (`tenant_<name>`)
    pub schema_name: String,

    /// Inactive tenants are not resolvable
    pub is_active: bool,

    pub created_at: DateTime<Utc>,
}

/// A validated PostgreSQL schema name for one tenant.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TenantSchema(String);

impl TenantSchema {
    /// Derive the schema for a tenant name, validating the name.
    pub fn for_tenant(name: &str) -> Option<Self> {
        if !is_valid_tenant_name(name) {
            return None;
        }
        Some(Self(format!("{SCHEMA_PREFIX}{name}")))
    }

    /// Accept a stored schema name if it has the shape `for_tenant` produces.
    pub fn parse(schema_name: &str) -> Option<Self> {
        schema_name
            .strip_prefix(SCHEMA_PREFIX)
            .and_then(Self::for_tenant)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Quoted schema identifier, e.g. `"tenant_oakwood"`.
    pub fn quoted(&self) -> String {
        format!("\"{}\"", self.0)
    }

    /// Schema-qualified table reference, e.g. `"tenant_oakwood".events`.
    ///
    /// `table` must be a static table name from this crate, never user input.
    pub fn table(&self, table: &'static str) -> String {
        format!("{}.{}", self.quoted(), table)
    }
}

/// Tenant names: lowercase letter first, then lowercase letters, digits or `_`,
/// and not one of the reserved route prefixes.
pub fn is_valid_tenant_name(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };

    (2..=MAX_TENANT_NAME_LEN).contains(&name.len())
        && !RESERVED_NAMES.contains(&name)
        && first.is_ascii_lowercase()
        && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

/// Request body for provisioning a new tenant.
///
/// # JSON Example
///
/// ```json
/// {
///   "name": "oakwood",
///   "display_name": "Oakwood Residences",
///   "admin_username": "manager",
///   "admin_password": "correct horse battery staple"
/// }
/// ```
#[derive(Debug, Deserialize)]
pub struct CreateTenantRequest {
    pub name: String,
    pub display_name: String,

    /// First administrator seeded into the new schema
    pub admin_username: String,
    pub admin_password: String,
}

/// Response body for tenant endpoints.
#[derive(Debug, Serialize)]
pub struct TenantResponse {
    pub id: Uuid,
    pub name: String,
    pub display_name: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<Tenant> for TenantResponse {
    fn from(tenant: Tenant) -> Self {
        Self {
            id: tenant.id,
            name: tenant.name,
            display_name: tenant.display_name,
            is_active: tenant.is_active,
            created_at: tenant.created_at,
        }
    }
}

//! Tenant resolution and provisioning.
//!
//! The tenant table maps tenant names (the `{tenant}` path segment) to their
//! registry row and schema. It is warmed at startup and filled lazily: a miss
//! queries `public.tenants` for that one name. Provisioning and deactivation
//! keep the table in step with the registry.

use crate::db::{self, DbPool};
use crate::error::AppError;
use crate::models::tenant::{CreateTenantRequest, Tenant, TenantSchema, is_valid_tenant_name};
use crate::services::auth_service::{BCRYPT_COST, hash_password, validate_password};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

const TENANT_COLUMNS: &str = "id, name, display_name, schema_name, is_active, created_at";

/// A tenant that passed resolution: active, with a validated schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTenant {
    pub id: Uuid,
    pub name: String,
    pub display_name: String,
    pub schema: TenantSchema,
}

impl TryFrom<Tenant> for ResolvedTenant {
    type Error = AppError;

    fn try_from(tenant: Tenant) -> Result<Self, Self::Error> {
        if !tenant.is_active {
            return Err(AppError::TenantNotFound);
        }
        let schema = TenantSchema::parse(&tenant.schema_name).ok_or_else(|| {
            tracing::warn!(tenant = %tenant.name, schema = %tenant.schema_name, "tenant has an invalid schema name");
            AppError::TenantNotFound
        })?;

        Ok(Self {
            id: tenant.id,
            name: tenant.name,
            display_name: tenant.display_name,
            schema,
        })
    }
}

/// In-memory `name -> tenant` lookup.
#[derive(Debug, Clone, Default)]
pub struct TenantTable {
    entries: Arc<RwLock<HashMap<String, ResolvedTenant>>>,
}

impl TenantTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, name: &str) -> Option<ResolvedTenant> {
        self.entries.read().await.get(name).cloned()
    }

    pub async fn insert(&self, tenant: ResolvedTenant) {
        self.entries
            .write()
            .await
            .insert(tenant.name.clone(), tenant);
    }

    pub async fn evict(&self, name: &str) {
        self.entries.write().await.remove(name);
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Replace the table with every active tenant in the registry.
    pub async fn reload(&self, pool: &DbPool) -> Result<usize, AppError> {
        let tenants = sqlx::query_as::<_, Tenant>(&format!(
            "SELECT {TENANT_COLUMNS} FROM tenants WHERE is_active = true"
        ))
        .fetch_all(pool)
        .await?;

        let fresh: HashMap<String, ResolvedTenant> = tenants
            .into_iter()
            .filter_map(|t| ResolvedTenant::try_from(t).ok())
            .map(|t| (t.name.clone(), t))
            .collect();
        let count = fresh.len();

        *self.entries.write().await = fresh;
        tracing::info!(count, "tenant table loaded");
        Ok(count)
    }

    /// Resolve a tenant name, consulting the registry on a miss.
    ///
    /// Names that cannot be valid never reach the database.
    pub async fn resolve(&self, pool: &DbPool, name: &str) -> Result<ResolvedTenant, AppError> {
        if !is_valid_tenant_name(name) {
            return Err(AppError::TenantNotFound);
        }
        if let Some(tenant) = self.get(name).await {
            return Ok(tenant);
        }

        let tenant = sqlx::query_as::<_, Tenant>(&format!(
            "SELECT {TENANT_COLUMNS} FROM tenants WHERE name = $1 AND is_active = true"
        ))
        .bind(name)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::TenantNotFound)?;

        let resolved = ResolvedTenant::try_from(tenant)?;
        self.insert(resolved.clone()).await;
        tracing::debug!(tenant = name, "tenant resolved from registry");
        Ok(resolved)
    }
}

/// Create a tenant: registry row, schema, and first admin in one transaction.
///
/// # Errors
///
/// - `InvalidRequest`: bad name, empty display name, or weak admin password
/// - `Conflict`: a tenant with that name already exists (active or not)
pub async fn create_tenant(
    pool: &DbPool,
    table: &TenantTable,
    request: CreateTenantRequest,
) -> Result<Tenant, AppError> {
    let schema = TenantSchema::for_tenant(&request.name).ok_or_else(|| {
        AppError::InvalidRequest(
            "name must be 2-40 lowercase letters, digits or underscores, starting with a letter"
                .to_string(),
        )
    })?;
    if request.display_name.trim().is_empty() {
        return Err(AppError::InvalidRequest(
            "display_name must not be empty".to_string(),
        ));
    }
    if request.admin_username.trim().is_empty() {
        return Err(AppError::InvalidRequest(
            "admin_username must not be empty".to_string(),
        ));
    }
    validate_password(&request.admin_password)?;
    let password_hash = hash_password(&request.admin_password, BCRYPT_COST).await?;

    let mut tx = pool.begin().await?;

    let tenant = sqlx::query_as::<_, Tenant>(&format!(
        r#"
        INSERT INTO tenants (name, display_name, schema_name)
        VALUES ($1, $2, $3)
        RETURNING {TENANT_COLUMNS}
        "#
    ))
    .bind(&request.name)
    .bind(request.display_name.trim())
    .bind(schema.as_str())
    .fetch_one(&mut *tx)
    .await?;

    db::provision_tenant_schema(&mut *tx, &schema).await?;

    sqlx::query(&format!(
        "INSERT INTO {} (username, password_hash, full_name) VALUES ($1, $2, $3)",
        schema.table("admin_users")
    ))
    .bind(request.admin_username.trim())
    .bind(password_hash)
    .bind(request.display_name.trim())
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    table.insert(ResolvedTenant::try_from(tenant.clone())?).await;
    tracing::info!(tenant = %tenant.name, id = %tenant.id, "tenant created");

    Ok(tenant)
}

/// List active tenants, newest first.
pub async fn list_tenants(pool: &DbPool) -> Result<Vec<Tenant>, AppError> {
    let tenants = sqlx::query_as::<_, Tenant>(&format!(
        "SELECT {TENANT_COLUMNS} FROM tenants WHERE is_active = true ORDER BY created_at DESC, id DESC"
    ))
    .fetch_all(pool)
    .await?;

    Ok(tenants)
}

pub async fn get_tenant(pool: &DbPool, name: &str) -> Result<Tenant, AppError> {
    sqlx::query_as::<_, Tenant>(&format!(
        "SELECT {TENANT_COLUMNS} FROM tenants WHERE name = $1 AND is_active = true"
    ))
    .bind(name)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::TenantNotFound)
}

/// Deactivate a tenant (soft delete). The schema and its data are kept.
pub async fn deactivate_tenant(
    pool: &DbPool,
    table: &TenantTable,
    name: &str,
) -> Result<(), AppError> {
    let result =
        sqlx::query("UPDATE tenants SET is_active = false WHERE name = $1 AND is_active = true")
            .bind(name)
            .execute(pool)
            .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::TenantNotFound);
    }

    table.evict(name).await;
    tracing::info!(tenant = name, "tenant deactivated");
    Ok(())
}

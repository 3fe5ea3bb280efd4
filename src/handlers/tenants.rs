//! Platform endpoints for tenant provisioning.
//!
//! - POST /api/tenants - Create tenant, schema and first admin
//! - GET /api/tenants - List active tenants
//! - GET /api/tenants/{name} - Get one tenant
//! - DELETE /api/tenants/{name} - Deactivate tenant

use crate::{
    error::AppError,
    middleware::platform::PlatformContext,
    models::tenant::{CreateTenantRequest, TenantResponse},
    services::tenant_service,
    state::AppState,
};
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};

/// Provision a new tenant.
///
/// # Response
///
/// - **201 Created**: the tenant; its `id` is the `homeID` clients must send
/// - **400**: invalid name, display name or admin password
/// - **409**: name already taken
pub async fn create_tenant(
    State(state): State<AppState>,
    Extension(operator): Extension<PlatformContext>,
    Json(request): Json<CreateTenantRequest>,
) -> Result<impl IntoResponse, AppError> {
    let tenant = tenant_service::create_tenant(&state.pool, &state.tenants, request).await?;
    tracing::info!(tenant = %tenant.name, operator = %operator.label, api_key_id = %operator.api_key_id, "tenant provisioned");

    Ok((StatusCode::CREATED, Json(TenantResponse::from(tenant))))
}

pub async fn list_tenants(
    State(state): State<AppState>,
) -> Result<Json<Vec<TenantResponse>>, AppError> {
    let tenants = tenant_service::list_tenants(&state.pool).await?;
    Ok(Json(tenants.into_iter().map(Into::into).collect()))
}

pub async fn get_tenant(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<TenantResponse>, AppError> {
    let tenant = tenant_service::get_tenant(&state.pool, &name).await?;
    Ok(Json(tenant.into()))
}

/// Deactivate a tenant (soft delete).
///
/// Returns 204 No Content. The tenant stops resolving immediately; its
/// schema is left in place.
pub async fn delete_tenant(
    State(state): State<AppState>,
    Extension(operator): Extension<PlatformContext>,
    Path(name): Path<String>,
) -> Result<StatusCode, AppError> {
    tenant_service::deactivate_tenant(&state.pool, &state.tenants, &name).await?;
    tracing::info!(tenant = %name, operator = %operator.label, "tenant deactivated by operator");

    Ok(StatusCode::NO_CONTENT)
}

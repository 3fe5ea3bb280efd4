//! Tenant resolution middleware.
//!
//! Every tenant route has the shape `/{tenant}/api/...` and must carry a
//! `homeID` header with the tenant id. This middleware:
//! 1. Resolves `{tenant}` through the tenant table
//! 2. Checks the `homeID` header against the resolved tenant id
//! 3. Inserts the `ResolvedTenant` into the request extensions

use crate::{error::AppError, services::tenant_service::ResolvedTenant, state::AppState};
use axum::{
    extract::{Path, Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use std::collections::HashMap;
use uuid::Uuid;

/// Header carrying the tenant id. Header names are case-insensitive.
pub const HOME_ID_HEADER: &str = "homeid";

pub async fn tenant_middleware(
    State(state): State<AppState>,
    Path(params): Path<HashMap<String, String>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let name = params.get("tenant").ok_or(AppError::TenantNotFound)?;
    let tenant = state.tenants.resolve(&state.pool, name).await?;

    check_home_id(request.headers(), &tenant)?;

    tracing::debug!(tenant = %tenant.name, "tenant resolved");
    request.extensions_mut().insert(tenant);

    Ok(next.run(request).await)
}

/// The `homeID` header must be present, a UUID, and equal to the tenant id.
pub fn check_home_id(headers: &HeaderMap, tenant: &ResolvedTenant) -> Result<(), AppError> {
    let raw = headers
        .get(HOME_ID_HEADER)
        .ok_or(AppError::MissingHomeId)?
        .to_str()
        .map_err(|_| AppError::InvalidHomeId)?;

    let home_id = Uuid::parse_str(raw.trim()).map_err(|_| AppError::InvalidHomeId)?;
    if home_id != tenant.id {
        tracing::warn!(tenant = %tenant.name, %home_id, "homeID does not match tenant");
        return Err(AppError::TenantMismatch);
    }

    Ok(())
}

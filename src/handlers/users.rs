//! Resident management HTTP handlers.
//!
//! - GET /{tenant}/api/users - List residents (admin)
//! - POST /{tenant}/api/users - Create resident (admin)
//! - GET /{tenant}/api/users/me - Own profile (resident)
//! - GET /{tenant}/api/users/{id} - Get resident (admin)
//! - PUT /{tenant}/api/users/{id} - Update resident (admin)
//! - DELETE /{tenant}/api/users/{id} - Delete resident (admin)

use crate::{
    error::AppError,
    middleware::auth::Session,
    models::Pagination,
    models::user::{CreateUserRequest, UpdateUserRequest, User},
    services::tenant_service::ResolvedTenant,
    services::user_service,
    state::AppState,
};
use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

pub async fn list_users(
    State(state): State<AppState>,
    Extension(tenant): Extension<ResolvedTenant>,
    Extension(session): Extension<Session>,
    Query(page): Query<Pagination>,
) -> Result<Json<Vec<User>>, AppError> {
    session.require_admin()?;

    let users = user_service::list_users(&state.pool, &tenant.schema, &page).await?;
    Ok(Json(users))
}

/// Create a resident.
///
/// # Request Body
///
/// ```json
/// {
///   "full_name": "Ana Lima",
///   "phone_number": "+351912345678",
///   "unit_number": "B-204"
/// }
/// ```
///
/// # Response
///
/// - **201 Created**: the resident
/// - **400**: invalid name, phone number or email
/// - **409**: phone number already registered in this tenant
pub async fn create_user(
    State(state): State<AppState>,
    Extension(tenant): Extension<ResolvedTenant>,
    Extension(session): Extension<Session>,
    Json(request): Json<CreateUserRequest>,
) -> Result<impl IntoResponse, AppError> {
    session.require_admin()?;

    let user = user_service::create_user(&state.pool, &tenant.schema, request).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// Profile of the signed-in resident.
pub async fn get_me(
    State(state): State<AppState>,
    Extension(tenant): Extension<ResolvedTenant>,
    Extension(session): Extension<Session>,
) -> Result<Json<User>, AppError> {
    let user_id = session.require_resident()?;

    let user = user_service::get_user(&state.pool, &tenant.schema, user_id).await?;
    Ok(Json(user))
}

pub async fn get_user(
    State(state): State<AppState>,
    Extension(tenant): Extension<ResolvedTenant>,
    Extension(session): Extension<Session>,
    Path((_, user_id)): Path<(String, Uuid)>,
) -> Result<Json<User>, AppError> {
    session.require_admin()?;

    let user = user_service::get_user(&state.pool, &tenant.schema, user_id).await?;
    Ok(Json(user))
}

/// Partial update; only fields present in the body change.
pub async fn update_user(
    State(state): State<AppState>,
    Extension(tenant): Extension<ResolvedTenant>,
    Extension(session): Extension<Session>,
    Path((_, user_id)): Path<(String, Uuid)>,
    Json(request): Json<UpdateUserRequest>,
) -> Result<Json<User>, AppError> {
    session.require_admin()?;

    let user = user_service::update_user(&state.pool, &tenant.schema, user_id, request).await?;
    Ok(Json(user))
}

pub async fn delete_user(
    State(state): State<AppState>,
    Extension(tenant): Extension<ResolvedTenant>,
    Extension(session): Extension<Session>,
    Path((_, user_id)): Path<(String, Uuid)>,
) -> Result<StatusCode, AppError> {
    session.require_admin()?;

    user_service::delete_user(&state.pool, &tenant.schema, user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

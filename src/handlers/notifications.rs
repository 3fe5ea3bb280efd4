//! Notification HTTP handlers.
//!
//! - GET /{tenant}/api/notifications - Admins see all; residents see broadcasts and their own
//! - POST /{tenant}/api/notifications - Create and push (admin)
//! - GET /{tenant}/api/notifications/{id} - Get notification
//! - POST /{tenant}/api/notifications/{id}/read - Mark as read (resident)
//! - DELETE /{tenant}/api/notifications/{id} - Delete notification (admin)

use crate::{
    error::AppError,
    middleware::auth::Session,
    models::Pagination,
    models::notification::{CreateNotificationRequest, Notification},
    services::notification_service,
    services::tenant_service::ResolvedTenant,
    state::AppState,
};
use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use uuid::Uuid;

/// List notifications for the caller.
///
/// Admins receive every notification with its `delivery_status`; residents
/// receive broadcasts plus their own, each with a `read` flag.
pub async fn list_notifications(
    State(state): State<AppState>,
    Extension(tenant): Extension<ResolvedTenant>,
    Extension(session): Extension<Session>,
    Query(page): Query<Pagination>,
) -> Result<Response, AppError> {
    if session.is_admin() {
        let all = notification_service::list_all(&state.pool, &tenant.schema, &page).await?;
        return Ok(Json(all).into_response());
    }

    let mine = notification_service::list_for_resident(
        &state.pool,
        &tenant.schema,
        session.subject,
        &page,
    )
    .await?;
    Ok(Json(mine).into_response())
}

/// Create a notification.
///
/// # Request Body
///
/// ```json
/// {
///   "title": "Water shut-off",
///   "body": "Maintenance on Tuesday 9:00-12:00",
///   "recipient_id": null
/// }
/// ```
///
/// # Response
///
/// - **201 Created**: the stored notification
/// - **400**: empty title or body
/// - **404**: `recipient_id` is not a resident of this tenant
///
/// When a push gateway is configured, delivery starts in the background.
pub async fn create_notification(
    State(state): State<AppState>,
    Extension(tenant): Extension<ResolvedTenant>,
    Extension(session): Extension<Session>,
    Json(request): Json<CreateNotificationRequest>,
) -> Result<impl IntoResponse, AppError> {
    let admin_id = session.require_admin()?;

    let notification =
        notification_service::create_notification(&state.pool, &tenant.schema, admin_id, request)
            .await?;

    if let Some(push) = &state.push {
        push.spawn_delivery(
            state.pool.clone(),
            tenant.schema.clone(),
            tenant.name.clone(),
            notification.clone(),
        );
    }

    Ok((StatusCode::CREATED, Json(notification)))
}

pub async fn get_notification(
    State(state): State<AppState>,
    Extension(tenant): Extension<ResolvedTenant>,
    Extension(session): Extension<Session>,
    Path((_, notification_id)): Path<(String, Uuid)>,
) -> Result<Json<Notification>, AppError> {
    let viewer = (!session.is_admin()).then_some(session.subject);

    let notification =
        notification_service::get_notification(&state.pool, &tenant.schema, notification_id, viewer)
            .await?;
    Ok(Json(notification))
}

/// Mark a notification as read. Idempotent; returns 204 No Content.
pub async fn mark_read(
    State(state): State<AppState>,
    Extension(tenant): Extension<ResolvedTenant>,
    Extension(session): Extension<Session>,
    Path((_, notification_id)): Path<(String, Uuid)>,
) -> Result<StatusCode, AppError> {
    let user_id = session.require_resident()?;

    notification_service::mark_read(&state.pool, &tenant.schema, notification_id, user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete_notification(
    State(state): State<AppState>,
    Extension(tenant): Extension<ResolvedTenant>,
    Extension(session): Extension<Session>,
    Path((_, notification_id)): Path<(String, Uuid)>,
) -> Result<StatusCode, AppError> {
    session.require_admin()?;

    notification_service::delete_notification(&state.pool, &tenant.schema, notification_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

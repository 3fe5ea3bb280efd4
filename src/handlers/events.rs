//! Event HTTP handlers.
//!
//! - GET /{tenant}/api/events - List events
//! - POST /{tenant}/api/events - Create event (admin)
//! - GET /{tenant}/api/events/{id} - Get event
//! - PUT /{tenant}/api/events/{id} - Update event (admin)
//! - DELETE /{tenant}/api/events/{id} - Delete event (admin)
//! - POST /{tenant}/api/events/{id}/join - Join event (resident)
//! - POST /{tenant}/api/events/{id}/leave - Leave event (resident)
//! - GET /{tenant}/api/events/{id}/participants - List participants (admin)
//! - PUT /{tenant}/api/events/{id}/image - Upload event image (admin)

use crate::{
    error::AppError,
    middleware::auth::Session,
    models::event::{CreateEventRequest, Event, EventQuery, Participant, UpdateEventRequest},
    services::event_service,
    services::storage::{event_image_key, image_extension},
    services::tenant_service::ResolvedTenant,
    state::AppState,
};
use axum::{
    Extension, Json,
    body::Bytes,
    extract::{Path, Query, State, rejection::BytesRejection},
    http::{HeaderMap, StatusCode, header::CONTENT_TYPE},
    response::IntoResponse,
};
use uuid::Uuid;

/// List events, soonest first.
///
/// # Query Parameters
///
/// - `upcoming=true`: only events that have not started yet
/// - `limit` / `offset`: pagination (default 50, max 200)
pub async fn list_events(
    State(state): State<AppState>,
    Extension(tenant): Extension<ResolvedTenant>,
    Query(query): Query<EventQuery>,
) -> Result<Json<Vec<Event>>, AppError> {
    let events = event_service::list_events(&state.pool, &tenant.schema, &query).await?;
    Ok(Json(events))
}

/// Create an event.
///
/// # Request Body
///
/// ```json
/// {
///   "title": "Summer BBQ",
///   "location": "Courtyard",
///   "starts_at": "2026-07-04T17:00:00Z",
///   "ends_at": "2026-07-04T21:00:00Z",
///   "max_participants": 40
/// }
/// ```
///
/// # Response
///
/// - **201 Created**: the event with `current_participants` = 0
/// - **400**: empty title, `ends_at` not after `starts_at`, or `max_participants` < 1
/// - **403**: caller is not an admin
pub async fn create_event(
    State(state): State<AppState>,
    Extension(tenant): Extension<ResolvedTenant>,
    Extension(session): Extension<Session>,
    Json(request): Json<CreateEventRequest>,
) -> Result<impl IntoResponse, AppError> {
    let admin_id = session.require_admin()?;

    let event = event_service::create_event(&state.pool, &tenant.schema, admin_id, request).await?;
    Ok((StatusCode::CREATED, Json(event)))
}

pub async fn get_event(
    State(state): State<AppState>,
    Extension(tenant): Extension<ResolvedTenant>,
    Path((_, event_id)): Path<(String, Uuid)>,
) -> Result<Json<Event>, AppError> {
    let event = event_service::get_event(&state.pool, &tenant.schema, event_id).await?;
    Ok(Json(event))
}

/// Partial update. `max_participants` cannot drop below the residents already joined.
pub async fn update_event(
    State(state): State<AppState>,
    Extension(tenant): Extension<ResolvedTenant>,
    Extension(session): Extension<Session>,
    Path((_, event_id)): Path<(String, Uuid)>,
    Json(request): Json<UpdateEventRequest>,
) -> Result<Json<Event>, AppError> {
    session.require_admin()?;

    let event = event_service::update_event(&state.pool, &tenant.schema, event_id, request).await?;
    Ok(Json(event))
}

pub async fn delete_event(
    State(state): State<AppState>,
    Extension(tenant): Extension<ResolvedTenant>,
    Extension(session): Extension<Session>,
    Path((_, event_id)): Path<(String, Uuid)>,
) -> Result<StatusCode, AppError> {
    session.require_admin()?;

    event_service::delete_event(&state.pool, &tenant.schema, event_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Join an event as the signed-in resident.
///
/// # Response
///
/// - **200 OK**: the event with the updated participant count
/// - **404**: event not found
/// - **409**: event full (`event_full`) or already joined (`conflict`)
pub async fn join_event(
    State(state): State<AppState>,
    Extension(tenant): Extension<ResolvedTenant>,
    Extension(session): Extension<Session>,
    Path((_, event_id)): Path<(String, Uuid)>,
) -> Result<Json<Event>, AppError> {
    let user_id = session.require_resident()?;

    let event = event_service::join_event(&state.pool, &tenant.schema, event_id, user_id).await?;
    Ok(Json(event))
}

pub async fn leave_event(
    State(state): State<AppState>,
    Extension(tenant): Extension<ResolvedTenant>,
    Extension(session): Extension<Session>,
    Path((_, event_id)): Path<(String, Uuid)>,
) -> Result<Json<Event>, AppError> {
    let user_id = session.require_resident()?;

    let event = event_service::leave_event(&state.pool, &tenant.schema, event_id, user_id).await?;
    Ok(Json(event))
}

pub async fn list_participants(
    State(state): State<AppState>,
    Extension(tenant): Extension<ResolvedTenant>,
    Extension(session): Extension<Session>,
    Path((_, event_id)): Path<(String, Uuid)>,
) -> Result<Json<Vec<Participant>>, AppError> {
    session.require_admin()?;

    let participants =
        event_service::list_participants(&state.pool, &tenant.schema, event_id).await?;
    Ok(Json(participants))
}

/// Upload the event image.
///
/// The request body is the raw image; `Content-Type` must be one of
/// `image/png`, `image/jpeg`, `image/webp` or `image/gif`.
///
/// # Response
///
/// - **200 OK**: the event with its new `image_url`
/// - **400**: unsupported content type or empty body
/// - **404**: event not found
/// - **413**: image larger than `MAX_IMAGE_BYTES` (`payload_too_large`)
pub async fn upload_image(
    State(state): State<AppState>,
    Extension(tenant): Extension<ResolvedTenant>,
    Extension(session): Extension<Session>,
    Path((_, event_id)): Path<(String, Uuid)>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<Event>, AppError> {
    session.require_admin()?;

    // The route's body limit is `max_image_bytes`; anything over it surfaces here
    let body = body.map_err(|rejection| {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            AppError::PayloadTooLarge(state.max_image_bytes)
        } else {
            AppError::InvalidRequest(rejection.body_text())
        }
    })?;

    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    let extension = image_extension(content_type).ok_or_else(|| {
        AppError::InvalidRequest("Content-Type must be image/png, image/jpeg, image/webp or image/gif".to_string())
    })?;

    if body.is_empty() {
        return Err(AppError::InvalidRequest("image body is empty".to_string()));
    }
    if body.len() > state.max_image_bytes {
        return Err(AppError::PayloadTooLarge(state.max_image_bytes));
    }

    // Fail before writing to storage when the event does not exist
    event_service::get_event(&state.pool, &tenant.schema, event_id).await?;

    let key = event_image_key(&tenant.schema, event_id, extension);
    let url = state.images.put(&key, content_type, body).await?;

    let event = event_service::set_image_url(&state.pool, &tenant.schema, event_id, &url).await?;
    Ok(Json(event))
}

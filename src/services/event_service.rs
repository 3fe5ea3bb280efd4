//! Event service - reads and writes against a tenant's `events` table.
//!
//! # Participation
//!
//! Joining and leaving change two tables. Both happen inside one PostgreSQL
//! transaction with the event row locked (`FOR UPDATE`), so concurrent joins
//! cannot push `current_participants` past `max_participants`.
//!
//! Locks are always taken resident first, then event. Resident deletion
//! follows the same order, so it never interleaves with a join or leave.

use crate::{
    db::DbPool,
    error::AppError,
    models::event::{CreateEventRequest, Event, EventQuery, Participant, UpdateEventRequest},
    models::tenant::TenantSchema,
};
use sqlx::PgConnection;
use uuid::Uuid;

const EVENT_COLUMNS: &str = "id, title, description, location, image_url, starts_at, ends_at, \
     max_participants, current_participants, created_by, created_at, updated_at";

/// List events ordered by start time.
pub async fn list_events(
    pool: &DbPool,
    schema: &TenantSchema,
    query: &EventQuery,
) -> Result<Vec<Event>, AppError> {
    let (limit, offset) = query.pagination().bounds();
    let filter = if query.upcoming {
        "WHERE starts_at >= NOW()"
    } else {
        ""
    };

    let events = sqlx::query_as::<_, Event>(&format!(
        "SELECT {EVENT_COLUMNS} FROM {} {filter} ORDER BY starts_at ASC, id ASC LIMIT $1 OFFSET $2",
        schema.table("events")
    ))
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    Ok(events)
}

pub async fn get_event(pool: &DbPool, schema: &TenantSchema, id: Uuid) -> Result<Event, AppError> {
    sqlx::query_as::<_, Event>(&format!(
        "SELECT {EVENT_COLUMNS} FROM {} WHERE id = $1",
        schema.table("events")
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::EventNotFound)
}

/// Create an event; it starts with no participants.
pub async fn create_event(
    pool: &DbPool,
    schema: &TenantSchema,
    created_by: Uuid,
    request: CreateEventRequest,
) -> Result<Event, AppError> {
    request.validate()?;

    let event = sqlx::query_as::<_, Event>(&format!(
        r#"
        INSERT INTO {} (title, description, location, starts_at, ends_at, max_participants, created_by)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING {EVENT_COLUMNS}
        "#,
        schema.table("events")
    ))
    .bind(request.title.trim())
    .bind(request.description)
    .bind(request.location)
    .bind(request.starts_at)
    .bind(request.ends_at)
    .bind(request.max_participants)
    .bind(created_by)
    .fetch_one(pool)
    .await?;

    tracing::info!(schema = schema.as_str(), event_id = %event.id, "event created");
    Ok(event)
}

/// Apply a partial update.
///
/// The row is locked while the merged values are validated so a concurrent
/// join cannot slip in under a shrinking `max_participants`.
pub async fn update_event(
    pool: &DbPool,
    schema: &TenantSchema,
    id: Uuid,
    request: UpdateEventRequest,
) -> Result<Event, AppError> {
    let events = schema.table("events");
    let mut tx = pool.begin().await?;

    let current = sqlx::query_as::<_, Event>(&format!(
        "SELECT {EVENT_COLUMNS} FROM {events} WHERE id = $1 FOR UPDATE"
    ))
    .bind(id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or(AppError::EventNotFound)?;

    let merged = request.apply(&current)?;

    let event = sqlx::query_as::<_, Event>(&format!(
        r#"
        UPDATE {events}
        SET title = $2,
            description = $3,
            location = $4,
            starts_at = $5,
            ends_at = $6,
            max_participants = $7,
            updated_at = NOW()
        WHERE id = $1
        RETURNING {EVENT_COLUMNS}
        "#
    ))
    .bind(id)
    .bind(merged.title.trim())
    .bind(merged.description)
    .bind(merged.location)
    .bind(merged.starts_at)
    .bind(merged.ends_at)
    .bind(merged.max_participants)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(event)
}

pub async fn delete_event(pool: &DbPool, schema: &TenantSchema, id: Uuid) -> Result<(), AppError> {
    let result = sqlx::query(&format!("DELETE FROM {} WHERE id = $1", schema.table("events")))
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::EventNotFound);
    }

    tracing::info!(schema = schema.as_str(), event_id = %id, "event deleted");
    Ok(())
}

/// Add a resident to an event.
///
/// # Process
///
/// 1. Lock the event row
/// 2. Reject when full or when the resident already joined
/// 3. Insert the participant and increment the counter
/// 4. Commit
pub async fn join_event(
    pool: &DbPool,
    schema: &TenantSchema,
    event_id: Uuid,
    user_id: Uuid,
) -> Result<Event, AppError> {
    let events = schema.table("events");
    let participants = schema.table("event_participants");

    let mut tx = pool.begin().await?;

    lock_active_resident(&mut *tx, schema, user_id).await?;

    let event = sqlx::query_as::<_, Event>(&format!(
        "SELECT {EVENT_COLUMNS} FROM {events} WHERE id = $1 FOR UPDATE"
    ))
    .bind(event_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or(AppError::EventNotFound)?;

    let already_joined: bool = sqlx::query_scalar(&format!(
        "SELECT EXISTS(SELECT 1 FROM {participants} WHERE event_id = $1 AND user_id = $2)"
    ))
    .bind(event_id)
    .bind(user_id)
    .fetch_one(&mut *tx)
    .await?;

    if already_joined {
        tx.rollback().await?;
        return Err(AppError::Conflict("Already joined this event".to_string()));
    }

    if event.is_full() {
        tx.rollback().await?;
        return Err(AppError::EventFull);
    }

    sqlx::query(&format!(
        "INSERT INTO {participants} (event_id, user_id) VALUES ($1, $2)"
    ))
    .bind(event_id)
    .bind(user_id)
    .execute(&mut *tx)
    .await?;

    let event = sqlx::query_as::<_, Event>(&format!(
        r#"
        UPDATE {events}
        SET current_participants = current_participants + 1,
            updated_at = NOW()
        WHERE id = $1
        RETURNING {EVENT_COLUMNS}
        "#
    ))
    .bind(event_id)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;

    tracing::info!(schema = schema.as_str(), %event_id, %user_id, "resident joined event");
    Ok(event)
}

/// Remove a resident from an event they joined.
pub async fn leave_event(
    pool: &DbPool,
    schema: &TenantSchema,
    event_id: Uuid,
    user_id: Uuid,
) -> Result<Event, AppError> {
    let events = schema.table("events");
    let participants = schema.table("event_participants");

    let mut tx = pool.begin().await?;

    lock_active_resident(&mut *tx, schema, user_id).await?;

    sqlx::query(&format!("SELECT id FROM {events} WHERE id = $1 FOR UPDATE"))
        .bind(event_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(AppError::EventNotFound)?;

    let removed = sqlx::query(&format!(
        "DELETE FROM {participants} WHERE event_id = $1 AND user_id = $2"
    ))
    .bind(event_id)
    .bind(user_id)
    .execute(&mut *tx)
    .await?
    .rows_affected();

    if removed == 0 {
        tx.rollback().await?;
        return Err(AppError::InvalidRequest(
            "Not a participant of this event".to_string(),
        ));
    }

    let event = sqlx::query_as::<_, Event>(&format!(
        r#"
        UPDATE {events}
        SET current_participants = GREATEST(current_participants - 1, 0),
            updated_at = NOW()
        WHERE id = $1
        RETURNING {EVENT_COLUMNS}
        "#
    ))
    .bind(event_id)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;

    tracing::info!(schema = schema.as_str(), %event_id, %user_id, "resident left event");
    Ok(event)
}

/// Share-lock an active resident's row until the transaction ends.
///
/// A deleted or deactivated resident is `UserNotFound`, which keeps the
/// participant insert from failing on the foreign key.
async fn lock_active_resident(
    conn: &mut PgConnection,
    schema: &TenantSchema,
    user_id: Uuid,
) -> Result<(), AppError> {
    let active = sqlx::query_scalar::<_, bool>(&format!(
        "SELECT is_active FROM {} WHERE id = $1 FOR SHARE",
        schema.table("users")
    ))
    .bind(user_id)
    .fetch_optional(&mut *conn)
    .await?;

    match active {
        Some(true) => Ok(()),
        _ => Err(AppError::UserNotFound),
    }
}

/// Residents who joined an event, in join order.
pub async fn list_participants(
    pool: &DbPool,
    schema: &TenantSchema,
    event_id: Uuid,
) -> Result<Vec<Participant>, AppError> {
    // Distinguish "no participants" from "no such event"
    get_event(pool, schema, event_id).await?;

    let participants = sqlx::query_as::<_, Participant>(&format!(
        r#"
        SELECT p.user_id, u.full_name, u.unit_number, p.joined_at
        FROM {} p
        JOIN {} u ON u.id = p.user_id
        WHERE p.event_id = $1
        ORDER BY p.joined_at ASC, p.user_id ASC
        "#,
        schema.table("event_participants"),
        schema.table("users")
    ))
    .bind(event_id)
    .fetch_all(pool)
    .await?;

    Ok(participants)
}

/// Point an event at a newly stored image.
pub async fn set_image_url(
    pool: &DbPool,
    schema: &TenantSchema,
    event_id: Uuid,
    image_url: &str,
) -> Result<Event, AppError> {
    sqlx::query_as::<_, Event>(&format!(
        r#"
        UPDATE {}
        SET image_url = $2,
            updated_at = NOW()
        WHERE id = $1
        RETURNING {EVENT_COLUMNS}
        "#,
        schema.table("events")
    ))
    .bind(event_id)
    .bind(image_url)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::EventNotFound)
}

//! Resident and administrator lookups against a tenant schema.

use crate::{
    db::DbPool,
    error::AppError,
    models::Pagination,
    models::admin_user::AdminUser,
    models::tenant::TenantSchema,
    models::user::{CreateUserRequest, UpdateUserRequest, User},
};
use uuid::Uuid;

const USER_COLUMNS: &str =
    "id, full_name, phone_number, email, unit_number, is_active, created_at, updated_at";

/// List residents alphabetically.
pub async fn list_users(
    pool: &DbPool,
    schema: &TenantSchema,
    page: &Pagination,
) -> Result<Vec<User>, AppError> {
    let (limit, offset) = page.bounds();

    let users = sqlx::query_as::<_, User>(&format!(
        "SELECT {USER_COLUMNS} FROM {} ORDER BY full_name ASC, id ASC LIMIT $1 OFFSET $2",
        schema.table("users")
    ))
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    Ok(users)
}

pub async fn get_user(pool: &DbPool, schema: &TenantSchema, id: Uuid) -> Result<User, AppError> {
    sqlx::query_as::<_, User>(&format!(
        "SELECT {USER_COLUMNS} FROM {} WHERE id = $1",
        schema.table("users")
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::UserNotFound)
}

/// Active resident registered with `phone_number`, used by phone login.
pub async fn find_active_by_phone(
    pool: &DbPool,
    schema: &TenantSchema,
    phone_number: &str,
) -> Result<User, AppError> {
    sqlx::query_as::<_, User>(&format!(
        "SELECT {USER_COLUMNS} FROM {} WHERE phone_number = $1 AND is_active = true",
        schema.table("users")
    ))
    .bind(phone_number)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::UserNotFound)
}

/// Create a resident. A duplicate phone number surfaces as `Conflict`.
pub async fn create_user(
    pool: &DbPool,
    schema: &TenantSchema,
    request: CreateUserRequest,
) -> Result<User, AppError> {
    request.validate()?;

    let user = sqlx::query_as::<_, User>(&format!(
        r#"
        INSERT INTO {} (full_name, phone_number, email, unit_number)
        VALUES ($1, $2, $3, $4)
        RETURNING {USER_COLUMNS}
        "#,
        schema.table("users")
    ))
    .bind(request.full_name.trim())
    .bind(&request.phone_number)
    .bind(request.email)
    .bind(request.unit_number)
    .fetch_one(pool)
    .await?;

    tracing::info!(schema = schema.as_str(), user_id = %user.id, "resident created");
    Ok(user)
}

pub async fn update_user(
    pool: &DbPool,
    schema: &TenantSchema,
    id: Uuid,
    request: UpdateUserRequest,
) -> Result<User, AppError> {
    request.validate()?;

    sqlx::query_as::<_, User>(&format!(
        r#"
        UPDATE {}
        SET full_name = COALESCE($2, full_name),
            phone_number = COALESCE($3, phone_number),
            email = COALESCE($4, email),
            unit_number = COALESCE($5, unit_number),
            is_active = COALESCE($6, is_active),
            updated_at = NOW()
        WHERE id = $1
        RETURNING {USER_COLUMNS}
        "#,
        schema.table("users")
    ))
    .bind(id)
    .bind(request.full_name.as_deref().map(str::trim))
    .bind(request.phone_number)
    .bind(request.email)
    .bind(request.unit_number)
    .bind(request.is_active)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::UserNotFound)
}

/// Delete a resident. Their participations cascade away, so the counters of
/// the events they had joined are decremented in the same transaction.
///
/// The resident row is locked first; joins and leaves share-lock it before
/// touching an event, so none can slip in between the count and the delete.
pub async fn delete_user(pool: &DbPool, schema: &TenantSchema, id: Uuid) -> Result<(), AppError> {
    let mut tx = pool.begin().await?;

    sqlx::query(&format!(
        "SELECT id FROM {} WHERE id = $1 FOR UPDATE",
        schema.table("users")
    ))
    .bind(id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or(AppError::UserNotFound)?;

    sqlx::query(&format!(
        r#"
        UPDATE {}
        SET current_participants = GREATEST(current_participants - 1, 0),
            updated_at = NOW()
        WHERE id IN (SELECT event_id FROM {} WHERE user_id = $1)
        "#,
        schema.table("events"),
        schema.table("event_participants")
    ))
    .bind(id)
    .execute(&mut *tx)
    .await?;

    sqlx::query(&format!("DELETE FROM {} WHERE id = $1", schema.table("users")))
        .bind(id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    tracing::info!(schema = schema.as_str(), user_id = %id, "resident deleted");
    Ok(())
}

pub async fn find_admin_by_username(
    pool: &DbPool,
    schema: &TenantSchema,
    username: &str,
) -> Result<Option<AdminUser>, AppError> {
    let admin = sqlx::query_as::<_, AdminUser>(&format!(
        "SELECT id, username, password_hash, full_name, created_at FROM {} WHERE username = $1",
        schema.table("admin_users")
    ))
    .bind(username)
    .fetch_optional(pool)
    .await?;

    Ok(admin)
}

/// Admin behind a session. A deleted admin invalidates the session token.
pub async fn get_admin(pool: &DbPool, schema: &TenantSchema, id: Uuid) -> Result<AdminUser, AppError> {
    sqlx::query_as::<_, AdminUser>(&format!(
        "SELECT id, username, password_hash, full_name, created_at FROM {} WHERE id = $1",
        schema.table("admin_users")
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::InvalidToken)
}

//! Resident data models and API request/response types.

use crate::error::AppError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Represents a resident record from a tenant's `users` table.
///
/// Residents sign in on mobile with phone OTP, so `phone_number` is unique
/// within a tenant and stored in E.164 form.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct User {
    pub id: Uuid,
    pub full_name: String,
    pub phone_number: String,
    pub email: Option<String>,

    /// Apartment or house identifier within the community
    pub unit_number: Option<String>,

    /// Inactive residents cannot sign in
    pub is_active: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request body for creating a resident.
///
/// # JSON Example
///
/// ```json
/// {
///   "full_name": "Ana Lima",
///   "phone_number": "+351912345678",
///   "email": "ana@example.com",
///   "unit_number": "B-204"
/// }
/// ```
#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub full_name: String,
    pub phone_number: String,
    pub email: Option<String>,
    pub unit_number: Option<String>,
}

/// Partial update; absent fields keep their value.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateUserRequest {
    pub full_name: Option<String>,
    pub phone_number: Option<String>,
    pub email: Option<String>,
    pub unit_number: Option<String>,
    pub is_active: Option<bool>,
}

impl CreateUserRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        validate_full_name(&self.full_name)?;
        validate_phone_number(&self.phone_number)?;
        if let Some(email) = &self.email {
            validate_email(email)?;
        }
        Ok(())
    }
}

impl UpdateUserRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        if let Some(name) = &self.full_name {
            validate_full_name(name)?;
        }
        if let Some(phone) = &self.phone_number {
            validate_phone_number(phone)?;
        }
        if let Some(email) = &self.email {
            validate_email(email)?;
        }
        Ok(())
    }
}

fn validate_full_name(name: &str) -> Result<(), AppError> {
    if name.trim().is_empty() {
        return Err(AppError::InvalidRequest(
            "full_name must not be empty".to_string(),
        ));
    }
    Ok(())
}

/// E.164: `+` followed by 8 to 15 digits, first digit non-zero.
pub fn validate_phone_number(phone: &str) -> Result<(), AppError> {
    let valid = phone
        .strip_prefix('+')
        .is_some_and(|digits| {
            (8..=15).contains(&digits.len())
                && !digits.starts_with('0')
                && digits.chars().all(|c| c.is_ascii_digit())
        });

    if !valid {
        return Err(AppError::InvalidRequest(
            "phone_number must be in E.164 format, e.g. +14155550123".to_string(),
        ));
    }
    Ok(())
}

fn validate_email(email: &str) -> Result<(), AppError> {
    let valid = email
        .split_once('@')
        .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'));

    if !valid {
        return Err(AppError::InvalidRequest("email is not valid".to_string()));
    }
    Ok(())
}

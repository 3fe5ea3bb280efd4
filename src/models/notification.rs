//! Notification models.
//!
//! A notification is either broadcast to every resident of a tenant
//! (`recipient_id` is NULL) or addressed to one resident. When a push gateway
//! is configured, each new notification is also delivered there with a
//! signed payload, and the outcome is recorded in `delivery_status`.

use crate::error::AppError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Row from a tenant's `notifications` table.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct Notification {
    pub id: Uuid,
    pub title: String,
    pub body: String,

    /// `None` for broadcasts
    pub recipient_id: Option<Uuid>,

    pub created_by: Option<Uuid>,

    /// One of `stored`, `delivered`, `failed`
    pub delivery_status: String,

    pub created_at: DateTime<Utc>,
}

/// A notification as seen by one resident, with their read state.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct NotificationView {
    pub id: Uuid,
    pub title: String,
    pub body: String,
    pub recipient_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub read: bool,
}

/// Request body for creating a notification.
///
/// # JSON Example
///
/// ```json
/// {
///   "title": "Water shut-off",
///   "body": "Maintenance on Tuesday 9:00-12:00",
///   "recipient_id": null
/// }
/// ```
#[derive(Debug, Deserialize)]
pub struct CreateNotificationRequest {
    pub title: String,
    pub body: String,
    #[serde(default)]
    pub recipient_id: Option<Uuid>,
}

impl CreateNotificationRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.title.trim().is_empty() || self.body.trim().is_empty() {
            return Err(AppError::InvalidRequest(
                "title and body must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Outcome of push delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryStatus {
    Stored,
    Delivered,
    Failed,
}

impl DeliveryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryStatus::Stored => "stored",
            DeliveryStatus::Delivered => "delivered",
            DeliveryStatus::Failed => "failed",
        }
    }
}

/// Body POSTed to the push gateway.
///
/// # Example
///
/// ```json
/// {
///   "event_type": "notification.created",
///   "event_id": "550e8400-e29b-41d4-a716-446655440000",
///   "tenant": "oakwood",
///   "created_at": "2026-01-15T10:30:00Z",
///   "data": {
///     "id": "...",
///     "title": "Water shut-off",
///     "body": "Maintenance on Tuesday 9:00-12:00",
///     "recipient_id": null
///   }
/// }
/// ```
///
/// The request carries `X-Signature: sha256=<hex>`, the HMAC-SHA256 of the
/// body keyed with the configured signing secret.
#[derive(Debug, Serialize, Deserialize)]
pub struct PushPayload {
    pub event_type: String,
    pub event_id: Uuid,
    pub tenant: String,
    pub created_at: DateTime<Utc>,
    pub data: PushData,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PushData {
    pub id: Uuid,
    pub title: String,
    pub body: String,
    pub recipient_id: Option<Uuid>,
}

impl PushPayload {
    pub fn new(tenant: &str, notification: &Notification) -> Self {
        Self {
            event_type: "notification.created".to_string(),
            event_id: Uuid::new_v4(),
            tenant: tenant.to_string(),
            created_at: Utc::now(),
            data: PushData {
                id: notification.id,
                title: notification.title.clone(),
                body: notification.body.clone(),
                recipient_id: notification.recipient_id,
            },
        }
    }
}

//! Notification storage and push delivery.
//!
//! Notifications are stored in the tenant schema first. When a push gateway
//! is configured, delivery happens on a background task: the payload is
//! signed with HMAC-SHA256 and POSTed to the gateway, and the outcome is
//! written back to `delivery_status`. Delivery never fails the request that
//! created the notification.

use crate::{
    db::DbPool,
    error::AppError,
    models::Pagination,
    models::notification::{
        CreateNotificationRequest, DeliveryStatus, Notification, NotificationView, PushPayload,
    },
    models::tenant::TenantSchema,
};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::time::Duration;
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

const NOTIFICATION_COLUMNS: &str =
    "id, title, body, recipient_id, created_by, delivery_status, created_at";

/// Signed delivery to an external push gateway.
#[derive(Debug, Clone)]
pub struct PushGateway {
    client: reqwest::Client,
    url: String,
    secret: String,
}

impl PushGateway {
    /// 5 second timeout per delivery (prevents hanging on a slow gateway).
    pub fn new(url: String, secret: String) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .build()?;

        Ok(Self {
            client,
            url,
            secret,
        })
    }

    /// Send one notification and report how it went.
    ///
    /// # Headers Sent
    ///
    /// - `Content-Type: application/json`
    /// - `X-Signature: sha256=<hex>`
    /// - `X-Event-Id: <uuid>`
    pub async fn deliver(&self, tenant: &str, notification: &Notification) -> DeliveryStatus {
        let payload = PushPayload::new(tenant, notification);
        let body = match serde_json::to_string(&payload) {
            Ok(body) => body,
            Err(e) => {
                tracing::error!(error = %e, "failed to serialize push payload");
                return DeliveryStatus::Failed;
            }
        };
        let signature = generate_signature(&self.secret, &body);

        let response = self
            .client
            .post(&self.url)
            .header("Content-Type", "application/json")
            .header("X-Signature", signature)
            .header("X-Event-Id", payload.event_id.to_string())
            .body(body)
            .send()
            .await;

        match response {
            Ok(resp) if resp.status().is_success() => DeliveryStatus::Delivered,
            Ok(resp) => {
                tracing::warn!(status = resp.status().as_u16(), notification_id = %notification.id, "push gateway rejected notification");
                DeliveryStatus::Failed
            }
            Err(e) => {
                tracing::error!(error = %e, notification_id = %notification.id, "push delivery failed");
                DeliveryStatus::Failed
            }
        }
    }

    /// Deliver in the background and record the outcome.
    pub fn spawn_delivery(
        &self,
        pool: DbPool,
        schema: TenantSchema,
        tenant: String,
        notification: Notification,
    ) {
        let gateway = self.clone();
        tokio::spawn(async move {
            let status = gateway.deliver(&tenant, &notification).await;
            if let Err(e) = record_delivery(&pool, &schema, notification.id, status).await {
                tracing::error!(error = %e, notification_id = %notification.id, "failed to record delivery status");
            }
        });
    }
}

/// HMAC-SHA256 signature header value: `sha256=<hex_encoded_hmac>`.
///
/// Receivers recompute HMAC-SHA256(secret, request_body) and compare in constant time.
pub fn generate_signature(secret: &str, payload: &str) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC key length is valid");
    mac.update(payload.as_bytes());
    format!("sha256={}", hex::encode(mac.finalize().into_bytes()))
}

async fn record_delivery(
    pool: &DbPool,
    schema: &TenantSchema,
    id: Uuid,
    status: DeliveryStatus,
) -> Result<(), AppError> {
    sqlx::query(&format!(
        "UPDATE {} SET delivery_status = $2 WHERE id = $1",
        schema.table("notifications")
    ))
    .bind(id)
    .bind(status.as_str())
    .execute(pool)
    .await?;

    Ok(())
}

/// Every notification in the tenant, newest first.
pub async fn list_all(
    pool: &DbPool,
    schema: &TenantSchema,
    page: &Pagination,
) -> Result<Vec<Notification>, AppError> {
    let (limit, offset) = page.bounds();

    let notifications = sqlx::query_as::<_, Notification>(&format!(
        "SELECT {NOTIFICATION_COLUMNS} FROM {} ORDER BY created_at DESC, id DESC LIMIT $1 OFFSET $2",
        schema.table("notifications")
    ))
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    Ok(notifications)
}

/// Broadcasts plus notifications addressed to `user_id`, with read state.
pub async fn list_for_resident(
    pool: &DbPool,
    schema: &TenantSchema,
    user_id: Uuid,
    page: &Pagination,
) -> Result<Vec<NotificationView>, AppError> {
    let (limit, offset) = page.bounds();

    let notifications = sqlx::query_as::<_, NotificationView>(&format!(
        r#"
        SELECT n.id, n.title, n.body, n.recipient_id, n.created_at,
               (r.user_id IS NOT NULL) AS read
        FROM {} n
        LEFT JOIN {} r ON r.notification_id = n.id AND r.user_id = $1
        WHERE n.recipient_id IS NULL OR n.recipient_id = $1
        ORDER BY n.created_at DESC, n.id DESC
        LIMIT $2 OFFSET $3
        "#,
        schema.table("notifications"),
        schema.table("notification_reads")
    ))
    .bind(user_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    Ok(notifications)
}

/// Fetch one notification. With `viewer` set, notifications addressed to
/// other residents are reported as not found.
pub async fn get_notification(
    pool: &DbPool,
    schema: &TenantSchema,
    id: Uuid,
    viewer: Option<Uuid>,
) -> Result<Notification, AppError> {
    let notification = sqlx::query_as::<_, Notification>(&format!(
        "SELECT {NOTIFICATION_COLUMNS} FROM {} WHERE id = $1",
        schema.table("notifications")
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::NotificationNotFound)?;

    if let Some(viewer) = viewer {
        if notification.recipient_id.is_some_and(|recipient| recipient != viewer) {
            return Err(AppError::NotificationNotFound);
        }
    }

    Ok(notification)
}

/// Store a notification. Push delivery is started by the caller.
pub async fn create_notification(
    pool: &DbPool,
    schema: &TenantSchema,
    created_by: Uuid,
    request: CreateNotificationRequest,
) -> Result<Notification, AppError> {
    request.validate()?;

    if let Some(recipient) = request.recipient_id {
        let exists: bool = sqlx::query_scalar(&format!(
            "SELECT EXISTS(SELECT 1 FROM {} WHERE id = $1)",
            schema.table("users")
        ))
        .bind(recipient)
        .fetch_one(pool)
        .await?;

        if !exists {
            return Err(AppError::UserNotFound);
        }
    }

    let notification = sqlx::query_as::<_, Notification>(&format!(
        r#"
        INSERT INTO {} (title, body, recipient_id, created_by, delivery_status)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING {NOTIFICATION_COLUMNS}
        "#,
        schema.table("notifications")
    ))
    .bind(request.title.trim())
    .bind(request.body.trim())
    .bind(request.recipient_id)
    .bind(created_by)
    .bind(DeliveryStatus::Stored.as_str())
    .fetch_one(pool)
    .await?;

    tracing::info!(schema = schema.as_str(), notification_id = %notification.id, "notification stored");
    Ok(notification)
}

/// Mark as read for `user_id`. Repeating the call is a no-op.
pub async fn mark_read(
    pool: &DbPool,
    schema: &TenantSchema,
    id: Uuid,
    user_id: Uuid,
) -> Result<(), AppError> {
    get_notification(pool, schema, id, Some(user_id)).await?;

    sqlx::query(&format!(
        r#"
        INSERT INTO {} (notification_id, user_id)
        VALUES ($1, $2)
        ON CONFLICT (notification_id, user_id) DO NOTHING
        "#,
        schema.table("notification_reads")
    ))
    .bind(id)
    .bind(user_id)
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn delete_notification(
    pool: &DbPool,
    schema: &TenantSchema,
    id: Uuid,
) -> Result<(), AppError> {
    let result = sqlx::query(&format!(
        "DELETE FROM {} WHERE id = $1",
        schema.table("notifications")
    ))
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotificationNotFound);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn notification() -> Notification {
        Notification {
            id: Uuid::new_v4(),
            title: "Water shut-off".to_string(),
            body: "Tuesday 9:00-12:00".to_string(),
            recipient_id: None,
            created_by: None,
            delivery_status: DeliveryStatus::Stored.as_str().to_string(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn signature_matches_known_vector() {
        // RFC 4231 test case 2
        let signature = generate_signature("Jefe", "what do ya want for nothing?");
        assert_eq!(
            signature,
            "sha256=5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843"
        );
    }

    #[test]
    fn payload_carries_tenant_and_notification() {
        let n = notification();
        let payload = PushPayload::new("oakwood", &n);

        assert_eq!(payload.event_type, "notification.created");
        assert_eq!(payload.tenant, "oakwood");
        assert_eq!(payload.data.id, n.id);
        assert_eq!(payload.data.recipient_id, None);
    }

    #[tokio::test]
    async fn unreachable_gateway_reports_failure() {
        let gateway =
            PushGateway::new("http://127.0.0.1:9/push".to_string(), "secret".to_string()).unwrap();

        assert_eq!(
            gateway.deliver("oakwood", &notification()).await,
            DeliveryStatus::Failed
        );
    }
}

//! Event data models and API request/response types.
//!
//! This module defines:
//! - `Event`: row of a tenant's `events` table
//! - `CreateEventRequest` / `UpdateEventRequest`: admin request bodies
//! - `Participant`: a resident who joined an event
//!
//! # Capacity
//!
//! `current_participants` is maintained by join/leave and never exceeds
//! `max_participants`. A missing `max_participants` means unlimited.

use crate::error::AppError;
use crate::models::Pagination;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Represents an event record from the database.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct Event {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub location: Option<String>,

    /// Public URL of the event image in object storage
    pub image_url: Option<String>,

    pub starts_at: DateTime<Utc>,
    pub ends_at: Option<DateTime<Utc>>,

    /// Capacity, `None` for unlimited
    pub max_participants: Option<i32>,

    pub current_participants: i32,

    /// Admin who created the event
    pub created_by: Option<Uuid>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Event {
    pub fn is_full(&self) -> bool {
        self.max_participants
            .is_some_and(|max| self.current_participants >= max)
    }
}

/// Request body for creating an event.
///
/// # JSON Example
///
/// ```json
/// {
///   "title": "Summer BBQ",
///   "description": "Bring your own drinks",
///   "location": "Courtyard",
///   "starts_at": "2026-07-04T17:00:00Z",
///   "ends_at": "2026-07-04T21:00:00Z",
///   "max_participants": 40
/// }
/// ```
#[derive(Debug, Deserialize)]
pub struct CreateEventRequest {
    pub title: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub starts_at: DateTime<Utc>,
    pub ends_at: Option<DateTime<Utc>>,
    pub max_participants: Option<i32>,
}

impl CreateEventRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        validate_schedule(&self.title, self.starts_at, self.ends_at, self.max_participants)
    }
}

/// Partial update; absent fields keep their value.
///
/// For the nullable columns an explicit `null` clears the value: `"ends_at": null`
/// removes the end time, `"max_participants": null` makes the event unlimited.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateEventRequest {
    pub title: Option<String>,
    #[serde(default, deserialize_with = "present")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub location: Option<Option<String>>,
    pub starts_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "present")]
    pub ends_at: Option<Option<DateTime<Utc>>>,
    #[serde(default, deserialize_with = "present")]
    pub max_participants: Option<Option<i32>>,
}

/// Present fields become `Some`, including `null`; absent ones stay `None` via `default`.
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

impl UpdateEventRequest {
    /// Merge onto `current`, validating the result against the event's participants.
    pub fn apply(self, current: &Event) -> Result<Event, AppError> {
        let mut merged = current.clone();

        if let Some(title) = self.title {
            merged.title = title;
        }
        if let Some(description) = self.description {
            merged.description = description;
        }
        if let Some(location) = self.location {
            merged.location = location;
        }
        if let Some(starts_at) = self.starts_at {
            merged.starts_at = starts_at;
        }
        if let Some(ends_at) = self.ends_at {
            merged.ends_at = ends_at;
        }
        if let Some(max_participants) = self.max_participants {
            merged.max_participants = max_participants;
        }

        validate_schedule(
            &merged.title,
            merged.starts_at,
            merged.ends_at,
            merged.max_participants,
        )?;

        if let Some(max) = merged.max_participants {
            if max < merged.current_participants {
                return Err(AppError::InvalidRequest(format!(
                    "max_participants cannot be lower than the {} residents already joined",
                    merged.current_participants
                )));
            }
        }

        Ok(merged)
    }
}

fn validate_schedule(
    title: &str,
    starts_at: DateTime<Utc>,
    ends_at: Option<DateTime<Utc>>,
    max_participants: Option<i32>,
) -> Result<(), AppError> {
    if title.trim().is_empty() {
        return Err(AppError::InvalidRequest(
            "title must not be empty".to_string(),
        ));
    }
    if ends_at.is_some_and(|end| end <= starts_at) {
        return Err(AppError::InvalidRequest(
            "ends_at must be after starts_at".to_string(),
        ));
    }
    if max_participants.is_some_and(|max| max < 1) {
        return Err(AppError::InvalidRequest(
            "max_participants must be at least 1".to_string(),
        ));
    }
    Ok(())
}

/// `GET /{tenant}/api/events` query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct EventQuery {
    /// Only events starting now or later
    #[serde(default)]
    pub upcoming: bool,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl EventQuery {
    pub fn pagination(&self) -> Pagination {
        Pagination {
            limit: self.limit,
            offset: self.offset,
        }
    }
}

/// A resident who joined an event, joined with their profile.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct Participant {
    pub user_id: Uuid,
    pub full_name: String,
    pub unit_number: Option<String>,
    pub joined_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn event(current: i32, max: Option<i32>) -> Event {
        let now = Utc::now();
        Event {
            id: Uuid::new_v4(),
            title: "Garden day".to_string(),
            description: None,
            location: None,
            image_url: None,
            starts_at: now,
            ends_at: Some(now + Duration::hours(2)),
            max_participants: max,
            current_participants: current,
            created_by: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn create_rejects_bad_schedules() {
        let now = Utc::now();
        let mut request = CreateEventRequest {
            title: "Pool party".to_string(),
            description: None,
            location: None,
            starts_at: now,
            ends_at: Some(now + Duration::hours(1)),
            max_participants: Some(10),
        };
        assert!(request.validate().is_ok());

        request.ends_at = Some(now - Duration::hours(1));
        assert!(request.validate().is_err());

        request.ends_at = None;
        request.max_participants = Some(0);
        assert!(request.validate().is_err());

        request.max_participants = None;
        request.title = String::new();
        assert!(request.validate().is_err());
    }

    #[test]
    fn full_only_with_a_limit() {
        assert!(event(5, Some(5)).is_full());
        assert!(!event(4, Some(5)).is_full());
        assert!(!event(500, None).is_full());
    }

    #[test]
    fn update_keeps_absent_fields() {
        let current = event(2, Some(10));
        let merged = UpdateEventRequest {
            location: Some(Some("Rooftop".to_string())),
            ..Default::default()
        }
        .apply(&current)
        .unwrap();

        assert_eq!(merged.title, current.title);
        assert_eq!(merged.location.as_deref(), Some("Rooftop"));
        assert_eq!(merged.max_participants, Some(10));
    }

    #[test]
    fn update_cannot_shrink_below_joined_residents() {
        let current = event(6, Some(10));

        let too_small = UpdateEventRequest {
            max_participants: Some(Some(5)),
            ..Default::default()
        };
        assert!(too_small.apply(&current).is_err());

        let exact = UpdateEventRequest {
            max_participants: Some(Some(6)),
            ..Default::default()
        };
        assert_eq!(exact.apply(&current).unwrap().max_participants, Some(6));
    }

    #[test]
    fn explicit_null_clears_nullable_fields() {
        let mut current = event(3, Some(10));
        current.description = Some("Bring gloves".to_string());

        let request: UpdateEventRequest = serde_json::from_str(
            r#"{"description": null, "ends_at": null, "max_participants": null}"#,
        )
        .unwrap();
        let merged = request.apply(&current).unwrap();

        assert_eq!(merged.description, None);
        assert_eq!(merged.ends_at, None);
        assert_eq!(merged.max_participants, None);
        assert_eq!(merged.location, current.location);
    }

    #[test]
    fn absent_fields_are_not_nulls() {
        let request: UpdateEventRequest = serde_json::from_str(r#"{"title": "Garden day 2"}"#).unwrap();
        assert!(request.description.is_none());
        assert!(request.ends_at.is_none());
        assert!(request.max_participants.is_none());

        let current = event(0, Some(4));
        let merged = request.apply(&current).unwrap();
        assert_eq!(merged.max_participants, Some(4));
        assert_eq!(merged.ends_at, current.ends_at);
    }

    #[test]
    fn update_validates_merged_schedule() {
        let current = event(0, None);
        let request = UpdateEventRequest {
            starts_at: current.ends_at,
            ..Default::default()
        };
        assert!(request.apply(&current).is_err());
    }
}

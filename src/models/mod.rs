//! Data models representing database entities and API payloads.

use serde::Deserialize;

/// Community administrator accounts
pub mod admin_user;
/// Platform API keys
pub mod api_key;
/// Community events and participation
pub mod event;
/// Notifications sent to residents
pub mod notification;
/// Tenant registry and schema identifiers
pub mod tenant;
/// Residents
pub mod user;

const DEFAULT_PAGE_SIZE: i64 = 50;
const MAX_PAGE_SIZE: i64 = 200;

/// `?limit=&offset=` query parameters shared by list endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct Pagination {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl Pagination {
    /// Clamped `(limit, offset)` ready to bind.
    pub fn bounds(&self) -> (i64, i64) {
        let limit = self
            .limit
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE);
        let offset = self.offset.unwrap_or(0).max(0);
        (limit, offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pagination_defaults_and_clamps() {
        assert_eq!(Pagination::default().bounds(), (50, 0));

        let oversized = Pagination {
            limit: Some(10_000),
            offset: Some(-5),
        };
        assert_eq!(oversized.bounds(), (200, 0));

        let zero = Pagination {
            limit: Some(0),
            offset: Some(20),
        };
        assert_eq!(zero.bounds(), (1, 20));
    }
}

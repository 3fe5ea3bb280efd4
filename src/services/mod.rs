//! Business logic services.
//!
//! Services contain the database work and validation behind the HTTP
//! handlers. Tenant-scoped services take the resolved `TenantSchema` and
//! never build table names from request input.

pub mod auth_service;
pub mod event_service;
pub mod firebase;
pub mod notification_service;
pub mod storage;
pub mod tenant_service;
pub mod user_service;

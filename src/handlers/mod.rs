//! HTTP request handlers (route handlers).
//!
//! Each handler is an async function that:
//! 1. Receives HTTP request data (JSON body, URL params, extensions set by middleware)
//! 2. Delegates to a service for validation and database work
//! 3. Returns HTTP response (JSON, status code)

/// Session endpoints
pub mod auth;
/// Community events
pub mod events;
/// Service health
pub mod health;
/// Notifications
pub mod notifications;
/// Platform tenant provisioning
pub mod tenants;
/// Residents
pub mod users;

//! HTTP middleware components.
//!
//! Tenant routes run `tenant` first, then `auth` for everything except the
//! login endpoints. Platform routes run `platform` alone.

/// JWT session authentication for tenant routes
pub mod auth;
/// Platform API key authentication
pub mod platform;
/// Tenant resolution from path and `homeID` header
pub mod tenant;

//! Residential community API.
//!
//! A multi-tenant REST backend for residential communities: events, residents,
//! notifications and tenant provisioning. Each community (tenant) lives in its
//! own PostgreSQL schema.
//!
//! # Architecture
//!
//! - **Web Framework**: Axum (async HTTP server)
//! - **Database**: PostgreSQL with sqlx, one schema per tenant
//! - **Tenancy**: `/{tenant}/api/...` paths plus a `homeID` header
//! - **Authentication**: JWT sessions (admin password or Firebase phone login),
//!   platform API keys for provisioning
//! - **Storage**: local directory or HTTP bucket for event images
//! - **Format**: JSON requests/responses

pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod state;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::HeaderValue,
    middleware as axum_middleware,
    routing::{get, post, put},
};
use state::AppState;
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

/// Build the HTTP router.
///
/// `cors_origins` of `None` allows any origin.
pub fn build_router(state: AppState, cors_origins: Option<Vec<String>>) -> Router {
    let tenant_layer =
        axum_middleware::from_fn_with_state(state.clone(), middleware::tenant::tenant_middleware);
    let session_layer =
        axum_middleware::from_fn_with_state(state.clone(), middleware::auth::session_middleware);

    // Tenant routes reachable without a session
    let sign_in_routes = Router::new()
        .route("/{tenant}/api/auth/login", post(handlers::auth::login))
        .route("/{tenant}/api/auth/phone", post(handlers::auth::phone_login))
        .route_layer(tenant_layer.clone());

    // Tenant routes requiring a session. The last route_layer runs first,
    // so the tenant is resolved before the session is checked against it.
    let session_routes = Router::new()
        .route("/{tenant}/api/auth/refresh", post(handlers::auth::refresh))
        .route("/{tenant}/api/auth/me", get(handlers::auth::me))
        // Residents
        .route(
            "/{tenant}/api/users",
            get(handlers::users::list_users).post(handlers::users::create_user),
        )
        .route("/{tenant}/api/users/me", get(handlers::users::get_me))
        .route(
            "/{tenant}/api/users/{id}",
            get(handlers::users::get_user)
                .put(handlers::users::update_user)
                .delete(handlers::users::delete_user),
        )
        // Events
        .route(
            "/{tenant}/api/events",
            get(handlers::events::list_events).post(handlers::events::create_event),
        )
        .route(
            "/{tenant}/api/events/{id}",
            get(handlers::events::get_event)
                .put(handlers::events::update_event)
                .delete(handlers::events::delete_event),
        )
        .route(
            "/{tenant}/api/events/{id}/join",
            post(handlers::events::join_event),
        )
        .route(
            "/{tenant}/api/events/{id}/leave",
            post(handlers::events::leave_event),
        )
        .route(
            "/{tenant}/api/events/{id}/participants",
            get(handlers::events::list_participants),
        )
        .route(
            "/{tenant}/api/events/{id}/image",
            put(handlers::events::upload_image)
                .layer(DefaultBodyLimit::max(state.max_image_bytes)),
        )
        // Notifications
        .route(
            "/{tenant}/api/notifications",
            get(handlers::notifications::list_notifications)
                .post(handlers::notifications::create_notification),
        )
        .route(
            "/{tenant}/api/notifications/{id}",
            get(handlers::notifications::get_notification)
                .delete(handlers::notifications::delete_notification),
        )
        .route(
            "/{tenant}/api/notifications/{id}/read",
            post(handlers::notifications::mark_read),
        )
        .route_layer(session_layer)
        .route_layer(tenant_layer);

    // Platform routes for operators
    let platform_routes = Router::new()
        .route(
            "/api/tenants",
            get(handlers::tenants::list_tenants).post(handlers::tenants::create_tenant),
        )
        .route(
            "/api/tenants/{name}",
            get(handlers::tenants::get_tenant).delete(handlers::tenants::delete_tenant),
        )
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::platform::platform_auth_middleware,
        ));

    let mut app = Router::new()
        // Public routes (no authentication required)
        .route("/health", get(handlers::health::health_check))
        .merge(sign_in_routes)
        .merge(session_routes)
        .merge(platform_routes);

    if let Some(root) = state.images.local_root() {
        app = app.nest_service("/uploads", ServeDir::new(root));
    }

    app.layer(cors_layer(cors_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(origins: Option<Vec<String>>) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);

    match origins {
        None => layer.allow_origin(Any),
        Some(origins) => {
            let origins: Vec<HeaderValue> = origins
                .iter()
                .filter_map(|origin| match origin.parse() {
                    Ok(value) => Some(value),
                    Err(_) => {
                        tracing::warn!(origin = %origin, "ignoring invalid CORS origin");
                        None
                    }
                })
                .collect();
            layer.allow_origin(origins)
        }
    }
}

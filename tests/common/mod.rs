//! Shared setup for tests that run against PostgreSQL.
//!
//! `TEST_DATABASE_URL` points the suite at an existing server (CI); otherwise
//! a throwaway postgres container is started. With neither available the
//! database tests return early. Every test provisions its own tenant, so
//! tests never share rows even on a shared server.

#![allow(dead_code)]

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode},
};
use chrono::{Duration, Utc};
use community_hub::{
    config::{Config, StorageBackend},
    db,
    models::{
        event::{CreateEventRequest, Event},
        tenant::CreateTenantRequest,
        user::{CreateUserRequest, User},
    },
    services::{
        auth_service::Role,
        event_service,
        tenant_service::{self, ResolvedTenant},
        user_service,
    },
    state::AppState,
};
use serde_json::Value;
use sqlx::{PgPool, postgres::PgPoolOptions};
use std::sync::Once;
use testcontainers::{ContainerAsync, ImageExt, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tower::ServiceExt;
use uuid::Uuid;

static INIT: Once = Once::new();

pub const ADMIN_USERNAME: &str = "manager";
pub const ADMIN_PASSWORD: &str = "correct horse battery";

/// A migrated database, kept alive for the duration of one test.
pub struct TestDatabase {
    pub pool: PgPool,
    _container: Option<ContainerAsync<Postgres>>,
}

impl TestDatabase {
    pub async fn start() -> Option<Self> {
        INIT.call_once(|| {
            let _ = tracing_subscriber::fmt::try_init();
        });

        let (database_url, container) = match std::env::var("TEST_DATABASE_URL") {
            Ok(url) => (url, None),
            Err(_) => match Postgres::default().with_tag("16-alpine").start().await {
                Ok(container) => {
                    let host = container.get_host().await.ok()?;
                    let port = container.get_host_port_ipv4(5432).await.ok()?;
                    (
                        format!("postgres://postgres:postgres@{host}:{port}/postgres"),
                        Some(container),
                    )
                }
                Err(e) => {
                    eprintln!("skipping database test: no TEST_DATABASE_URL and no container runtime ({e})");
                    return None;
                }
            },
        };

        let pool = PgPoolOptions::new()
            .max_connections(20)
            .connect(&database_url)
            .await
            .expect("connect to test database");
        db::run_migrations(&pool).await.expect("run migrations");

        Some(Self {
            pool,
            _container: container,
        })
    }
}

/// Application state over a real pool, storing images under `upload_dir`.
pub fn app_state(pool: PgPool, upload_dir: &std::path::Path) -> AppState {
    let config = Config {
        database_url: String::new(),
        server_port: 0,
        database_max_connections: 20,
        jwt_secret: "integration-test-secret-0123456789".to_string(),
        jwt_ttl_minutes: 60,
        cors_allowed_origins: None,
        firebase_project_id: None,
        firebase_jwks_url: "http://localhost:1/jwks".to_string(),
        storage_backend: StorageBackend::Local,
        storage_local_dir: upload_dir.to_string_lossy().into_owned(),
        storage_bucket_url: None,
        storage_auth_token: None,
        storage_public_base_url: "http://localhost/uploads".to_string(),
        max_image_bytes: 1024,
        push_gateway_url: None,
        push_signing_secret: None,
    };

    AppState::new(&config, pool).expect("build app state")
}

fn unique_name() -> String {
    format!("t{}", &Uuid::new_v4().simple().to_string()[..12])
}

/// Provision a fresh tenant with one admin and return it resolved.
pub async fn new_community(state: &AppState) -> ResolvedTenant {
    let name = unique_name();
    tenant_service::create_tenant(
        &state.pool,
        &state.tenants,
        CreateTenantRequest {
            name: name.clone(),
            display_name: format!("Community {name}"),
            admin_username: ADMIN_USERNAME.to_string(),
            admin_password: ADMIN_PASSWORD.to_string(),
        },
    )
    .await
    .expect("provision tenant");

    state
        .tenants
        .resolve(&state.pool, &name)
        .await
        .expect("resolve new tenant")
}

pub async fn add_resident(state: &AppState, tenant: &ResolvedTenant, n: u32) -> User {
    user_service::create_user(
        &state.pool,
        &tenant.schema,
        CreateUserRequest {
            full_name: format!("Resident {n}"),
            phone_number: format!("+1555{n:07}"),
            email: None,
            unit_number: Some(format!("{n}A")),
        },
    )
    .await
    .expect("create resident")
}

pub async fn add_event(state: &AppState, tenant: &ResolvedTenant, max: Option<i32>) -> Event {
    let starts_at = Utc::now() + Duration::days(7);
    event_service::create_event(
        &state.pool,
        &tenant.schema,
        Uuid::new_v4(),
        CreateEventRequest {
            title: "Courtyard picnic".to_string(),
            description: None,
            location: Some("Courtyard".to_string()),
            starts_at,
            ends_at: Some(starts_at + Duration::hours(3)),
            max_participants: max,
        },
    )
    .await
    .expect("create event")
}

pub async fn admin_id(state: &AppState, tenant: &ResolvedTenant) -> Uuid {
    user_service::find_admin_by_username(&state.pool, &tenant.schema, ADMIN_USERNAME)
        .await
        .expect("query admin")
        .expect("seeded admin exists")
        .id
}

pub fn bearer(state: &AppState, tenant: &ResolvedTenant, subject: Uuid, role: Role) -> String {
    let token = state
        .jwt
        .issue(subject, &tenant.name, role)
        .expect("issue token")
        .token;
    format!("Bearer {token}")
}

pub async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.expect("router responds");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::String(
            String::from_utf8_lossy(&bytes).into_owned(),
        ))
    };
    (status, body)
}

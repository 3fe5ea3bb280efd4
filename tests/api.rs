//! Router-level tests for tenant resolution, sessions and authorization.
//!
//! The pool connects lazily and every request here is rejected before a
//! query runs, so no database is needed. Requests that reach the session's
//! subject lookup live in `tests/sessions.rs`.

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
};
use community_hub::{
    build_router,
    config::{Config, StorageBackend},
    models::tenant::TenantSchema,
    services::{auth_service::Role, tenant_service::ResolvedTenant},
    state::AppState,
};
use serde_json::{Value, json};
use sqlx::postgres::PgPoolOptions;
use tower::ServiceExt;
use uuid::Uuid;

const SECRET: &str = "integration-test-secret-0123456789";

fn config(upload_dir: &str) -> Config {
    Config {
        database_url: "postgres://localhost:1/community_hub_test".to_string(),
        server_port: 0,
        database_max_connections: 1,
        jwt_secret: SECRET.to_string(),
        jwt_ttl_minutes: 60,
        cors_allowed_origins: None,
        firebase_project_id: None,
        firebase_jwks_url: "http://localhost:1/jwks".to_string(),
        storage_backend: StorageBackend::Local,
        storage_local_dir: upload_dir.to_string(),
        storage_bucket_url: None,
        storage_auth_token: None,
        storage_public_base_url: "http://localhost/uploads".to_string(),
        max_image_bytes: 1024,
        push_gateway_url: None,
        push_signing_secret: None,
    }
}

struct TestApp {
    router: Router,
    state: AppState,
    tenant: ResolvedTenant,
    _uploads: tempfile::TempDir,
}

async fn test_app() -> TestApp {
    let uploads = tempfile::tempdir().unwrap();
    let config = config(uploads.path().to_str().unwrap());
    let pool = PgPoolOptions::new()
        .max_connections(1)
        .connect_lazy(&config.database_url)
        .unwrap();

    let state = AppState::new(&config, pool).unwrap();
    let tenant = ResolvedTenant {
        id: Uuid::new_v4(),
        name: "oakwood".to_string(),
        display_name: "Oakwood Residences".to_string(),
        schema: TenantSchema::for_tenant("oakwood").unwrap(),
    };
    state.tenants.insert(tenant.clone()).await;

    TestApp {
        router: build_router(state.clone(), None),
        state,
        tenant,
        _uploads: uploads,
    }
}

impl TestApp {
    fn token(&self, tenant: &str, role: Role) -> String {
        self.state
            .jwt
            .issue(Uuid::new_v4(), tenant, role)
            .unwrap()
            .token
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }
}

#[tokio::test]
async fn missing_home_id_is_rejected() {
    let app = test_app().await;
    let request = Request::get("/oakwood/api/events")
        .body(Body::empty())
        .unwrap();

    let (status, body) = app.send(request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "missing_home_id");
}

#[tokio::test]
async fn home_id_must_match_tenant() {
    let app = test_app().await;

    let request = Request::get("/oakwood/api/events")
        .header("homeID", Uuid::new_v4().to_string())
        .body(Body::empty())
        .unwrap();
    let (status, body) = app.send(request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "tenant_mismatch");

    let request = Request::get("/oakwood/api/events")
        .header("homeID", "not-a-uuid")
        .body(Body::empty())
        .unwrap();
    let (status, body) = app.send(request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "invalid_home_id");
}

#[tokio::test]
async fn malformed_tenant_name_is_not_found() {
    let app = test_app().await;
    let request = Request::get("/Oak-Wood/api/events")
        .header("homeID", app.tenant.id.to_string())
        .body(Body::empty())
        .unwrap();

    let (status, body) = app.send(request).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "tenant_not_found");
}

#[tokio::test]
async fn session_routes_require_bearer_token() {
    let app = test_app().await;
    let request = Request::get("/oakwood/api/users")
        .header("homeID", app.tenant.id.to_string())
        .body(Body::empty())
        .unwrap();

    let (status, body) = app.send(request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "invalid_token");
}

#[tokio::test]
async fn token_from_another_tenant_is_rejected() {
    let app = test_app().await;
    let token = app.token("elmstreet", Role::Admin);

    let request = Request::get("/oakwood/api/users")
        .header("homeID", app.tenant.id.to_string())
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();

    let (status, body) = app.send(request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "invalid_token");
}

#[tokio::test]
async fn phone_login_requires_firebase() {
    let app = test_app().await;
    let request = Request::post("/oakwood/api/auth/phone")
        .header("homeID", app.tenant.id.to_string())
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(json!({ "id_token": "abc" }).to_string()))
        .unwrap();

    let (status, body) = app.send(request).await;
    assert_eq!(status, StatusCode::NOT_IMPLEMENTED);
    assert_eq!(body["error"]["code"], "phone_auth_unavailable");
}

#[tokio::test]
async fn platform_routes_require_api_key() {
    let app = test_app().await;
    let request = Request::get("/api/tenants").body(Body::empty()).unwrap();

    let (status, body) = app.send(request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "invalid_api_key");
}

//! Tenant provisioning and deactivation against a real database.

mod common;

use axum::{
    body::Body,
    http::{Request, StatusCode, header},
    response::IntoResponse,
};
use common::{ADMIN_PASSWORD, ADMIN_USERNAME, TestDatabase, app_state, new_community, send};
use community_hub::{
    build_router,
    error::AppError,
    models::tenant::{CreateTenantRequest, TenantSchema},
    services::tenant_service,
};
use serde_json::json;

fn request(name: &str) -> CreateTenantRequest {
    CreateTenantRequest {
        name: name.to_string(),
        display_name: "Maple Court".to_string(),
        admin_username: ADMIN_USERNAME.to_string(),
        admin_password: ADMIN_PASSWORD.to_string(),
    }
}

#[tokio::test]
async fn provisioned_admin_can_sign_in() {
    let Some(db) = TestDatabase::start().await else {
        return;
    };
    let uploads = tempfile::tempdir().unwrap();
    let state = app_state(db.pool.clone(), uploads.path());
    let tenant = new_community(&state).await;
    let router = build_router(state.clone(), None);

    let login = Request::post(format!("/{}/api/auth/login", tenant.name))
        .header("homeID", tenant.id.to_string())
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            json!({ "username": ADMIN_USERNAME, "password": ADMIN_PASSWORD }).to_string(),
        ))
        .unwrap();
    let (status, body) = send(&router, login).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["role"], "admin");
    let token = body["token"].as_str().unwrap().to_string();

    let me = Request::get(format!("/{}/api/auth/me", tenant.name))
        .header("homeID", tenant.id.to_string())
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&router, me).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["tenant"], tenant.name.as_str());
    assert_eq!(body["role"], "admin");

    let wrong = Request::post(format!("/{}/api/auth/login", tenant.name))
        .header("homeID", tenant.id.to_string())
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            json!({ "username": ADMIN_USERNAME, "password": "not the password" }).to_string(),
        ))
        .unwrap();
    let (status, body) = send(&router, wrong).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "invalid_credentials");
}

#[tokio::test]
async fn duplicate_tenant_names_conflict() {
    let Some(db) = TestDatabase::start().await else {
        return;
    };
    let uploads = tempfile::tempdir().unwrap();
    let state = app_state(db.pool.clone(), uploads.path());
    let tenant = new_community(&state).await;

    let duplicate =
        tenant_service::create_tenant(&state.pool, &state.tenants, request(&tenant.name)).await;
    let err = duplicate.unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
    assert_eq!(err.into_response().status(), StatusCode::CONFLICT);

    // The first tenant is untouched
    let stored = tenant_service::get_tenant(&state.pool, &tenant.name)
        .await
        .unwrap();
    assert_eq!(stored.id, tenant.id);
}

#[tokio::test]
async fn failed_provisioning_leaves_no_tenant_behind() {
    let Some(db) = TestDatabase::start().await else {
        return;
    };
    let uploads = tempfile::tempdir().unwrap();
    let state = app_state(db.pool.clone(), uploads.path());

    let name = format!("broken{}", &uuid::Uuid::new_v4().simple().to_string()[..8]);
    let schema = TenantSchema::for_tenant(&name).unwrap();
    // An incompatible admin table makes the admin insert fail mid-transaction
    sqlx::query(&format!("CREATE SCHEMA {}", schema.quoted()))
        .execute(&state.pool)
        .await
        .unwrap();
    sqlx::query(&format!("CREATE TABLE {} (note TEXT)", schema.table("admin_users")))
        .execute(&state.pool)
        .await
        .unwrap();

    let result = tenant_service::create_tenant(&state.pool, &state.tenants, request(&name)).await;
    assert!(result.is_err());

    let lookup = tenant_service::get_tenant(&state.pool, &name).await;
    assert!(matches!(lookup, Err(AppError::TenantNotFound)));
    assert!(state.tenants.get(&name).await.is_none());
}

#[tokio::test]
async fn deactivated_tenants_stop_resolving() {
    let Some(db) = TestDatabase::start().await else {
        return;
    };
    let uploads = tempfile::tempdir().unwrap();
    let state = app_state(db.pool.clone(), uploads.path());
    let tenant = new_community(&state).await;

    tenant_service::deactivate_tenant(&state.pool, &state.tenants, &tenant.name)
        .await
        .unwrap();

    let resolved = state.tenants.resolve(&state.pool, &tenant.name).await;
    assert!(matches!(resolved, Err(AppError::TenantNotFound)));

    let listed = tenant_service::list_tenants(&state.pool).await.unwrap();
    assert!(listed.iter().all(|t| t.name != tenant.name));

    // Names stay taken after deactivation
    let reuse =
        tenant_service::create_tenant(&state.pool, &state.tenants, request(&tenant.name)).await;
    assert!(matches!(reuse, Err(AppError::Conflict(_))));
}

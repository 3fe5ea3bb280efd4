//! Session endpoints for a tenant.
//!
//! - POST /{tenant}/api/auth/login - Admin username/password login
//! - POST /{tenant}/api/auth/phone - Resident login with a Firebase phone ID token
//! - POST /{tenant}/api/auth/refresh - Reissue the current session
//! - GET /{tenant}/api/auth/me - Describe the current session

use crate::{
    error::AppError,
    middleware::auth::Session,
    models::admin_user::{LoginRequest, PhoneLoginRequest, SessionResponse},
    services::auth_service::{IssuedToken, Role, verify_password},
    services::tenant_service::ResolvedTenant,
    services::user_service,
    state::AppState,
};
use axum::{Extension, Json, extract::State};

/// Admin login.
///
/// # Request Body
///
/// ```json
/// { "username": "manager", "password": "..." }
/// ```
///
/// # Response
///
/// - **200 OK**: `{ "token": "...", "expires_at": "...", "role": "admin" }`
/// - **401**: unknown username or wrong password (indistinguishable)
pub async fn login(
    State(state): State<AppState>,
    Extension(tenant): Extension<ResolvedTenant>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<IssuedToken>, AppError> {
    let admin =
        user_service::find_admin_by_username(&state.pool, &tenant.schema, request.username.trim())
            .await?;

    let admin = match admin {
        Some(admin) if verify_password(&request.password, &admin.password_hash).await? => admin,
        _ => {
            tracing::warn!(tenant = %tenant.name, "failed admin login");
            return Err(AppError::InvalidCredentials);
        }
    };

    let token = state.jwt.issue(admin.id, &tenant.name, Role::Admin)?;
    tracing::info!(tenant = %tenant.name, admin_id = %admin.id, "admin signed in");

    Ok(Json(token))
}

/// Resident login from the mobile app.
///
/// The client completes phone OTP with Firebase and sends the ID token. The
/// verified phone number must belong to an active resident of this tenant.
///
/// # Response
///
/// - **200 OK**: session token with role `resident`
/// - **401**: token invalid or without a phone number
/// - **404**: no active resident with that phone number
/// - **501**: phone login not configured
pub async fn phone_login(
    State(state): State<AppState>,
    Extension(tenant): Extension<ResolvedTenant>,
    Json(request): Json<PhoneLoginRequest>,
) -> Result<Json<IssuedToken>, AppError> {
    let firebase = state
        .firebase
        .as_ref()
        .ok_or(AppError::PhoneAuthUnavailable)?;

    let phone_number = firebase.verify_phone_token(&request.id_token).await?;
    let user = user_service::find_active_by_phone(&state.pool, &tenant.schema, &phone_number).await?;

    let token = state.jwt.issue(user.id, &tenant.name, Role::Resident)?;
    tracing::info!(tenant = %tenant.name, user_id = %user.id, "resident signed in by phone");

    Ok(Json(token))
}

/// Reissue a token for the current session.
///
/// The session middleware has already confirmed the subject still exists
/// (and, for residents, is active).
pub async fn refresh(
    State(state): State<AppState>,
    Extension(tenant): Extension<ResolvedTenant>,
    Extension(session): Extension<Session>,
) -> Result<Json<IssuedToken>, AppError> {
    let token = state.jwt.issue(session.subject, &tenant.name, session.role)?;
    Ok(Json(token))
}

pub async fn me(
    Extension(tenant): Extension<ResolvedTenant>,
    Extension(session): Extension<Session>,
) -> Json<SessionResponse> {
    Json(SessionResponse {
        subject: session.subject,
        tenant: tenant.name,
        role: session.role,
        display_name: session.display_name,
    })
}

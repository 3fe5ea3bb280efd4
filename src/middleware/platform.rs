//! Platform API key authentication middleware.
//!
//! Tenant provisioning is an operator task authenticated by API keys rather
//! than tenant sessions:
//! 1. Extract the API key from the Authorization header
//! 2. Hash it and verify it exists and is active in `public.api_keys`
//! 3. Inject the operator context into the request
//! 4. Reject unauthorized requests with HTTP 401

use crate::{
    error::AppError, models::api_key::ApiKey, services::auth_service::bearer_token,
    state::AppState,
};
use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Operator behind a platform request.
#[derive(Debug, Clone)]
pub struct PlatformContext {
    pub api_key_id: Uuid,
    pub label: String,
}

pub async fn platform_auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let api_key = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(bearer_token)
        .ok_or(AppError::InvalidApiKey)?;

    let key_hash = hash_api_key(api_key);

    let record = sqlx::query_as::<_, ApiKey>(
        "SELECT id, key_hash, label, is_active, created_at
         FROM api_keys
         WHERE key_hash = $1 AND is_active = true",
    )
    .bind(&key_hash)
    .fetch_optional(&state.pool)
    .await?
    .ok_or(AppError::InvalidApiKey)?;

    request.extensions_mut().insert(PlatformContext {
        api_key_id: record.id,
        label: record.label,
    });

    Ok(next.run(request).await)
}

/// SHA-256 hex digest as stored in `api_keys.key_hash`.
pub fn hash_api_key(api_key: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(api_key.as_bytes());
    hex::encode(hasher.finalize())
}

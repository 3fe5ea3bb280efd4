//! Shared application state handed to every handler.

use crate::{
    config::Config,
    db::DbPool,
    error::AppError,
    services::{
        auth_service::JwtKeys, firebase::FirebaseVerifier, notification_service::PushGateway,
        storage::ImageStore, tenant_service::TenantTable,
    },
};
use std::sync::Arc;

/// Cloned per request by axum; every field is cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub tenants: TenantTable,
    pub jwt: JwtKeys,

    /// `None` when `FIREBASE_PROJECT_ID` is not set
    pub firebase: Option<Arc<FirebaseVerifier>>,

    pub images: ImageStore,
    pub max_image_bytes: usize,

    /// `None` when no push gateway is configured
    pub push: Option<PushGateway>,
}

impl AppState {
    /// Build the state from configuration and an existing pool.
    pub fn new(config: &Config, pool: DbPool) -> Result<Self, AppError> {
        let firebase = config
            .firebase_project_id
            .clone()
            .map(|project| FirebaseVerifier::new(project, config.firebase_jwks_url.clone()))
            .transpose()?
            .map(Arc::new);

        let push = match (&config.push_gateway_url, &config.push_signing_secret) {
            (Some(url), Some(secret)) => Some(PushGateway::new(url.clone(), secret.clone())?),
            _ => None,
        };

        Ok(Self {
            pool,
            tenants: TenantTable::new(),
            jwt: JwtKeys::new(&config.jwt_secret, config.jwt_ttl_minutes),
            firebase,
            images: ImageStore::from_config(config)?,
            max_image_bytes: config.max_image_bytes,
            push,
        })
    }
}

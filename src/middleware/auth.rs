//! JWT session authentication middleware.
//!
//! This middleware runs after tenant resolution on protected tenant routes:
//! 1. Extract the token from `Authorization: Bearer <jwt>`
//! 2. Verify signature and expiry
//! 3. Require the token's tenant to equal the resolved tenant
//! 4. Require the subject to still exist (and, for residents, to be active)
//! 5. Inject a `Session` into the request extensions

use crate::{
    error::AppError,
    services::auth_service::{Claims, Role, bearer_token},
    services::tenant_service::ResolvedTenant,
    services::user_service,
    state::AppState,
};
use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

/// Authenticated caller of a tenant route.
///
/// Handlers extract it with `Extension<Session>`.
#[derive(Debug, Clone)]
pub struct Session {
    /// Admin id or resident id, depending on `role`
    pub subject: Uuid,
    pub role: Role,
    pub tenant: String,

    /// Admin or resident full name, read when the session was checked
    pub display_name: String,
}

impl Session {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Admin-only operations.
    pub fn require_admin(&self) -> Result<Uuid, AppError> {
        match self.role {
            Role::Admin => Ok(self.subject),
            Role::Resident => Err(AppError::Forbidden),
        }
    }

    /// Operations acting as a resident (joining events, reading notifications).
    pub fn require_resident(&self) -> Result<Uuid, AppError> {
        match self.role {
            Role::Resident => Ok(self.subject),
            Role::Admin => Err(AppError::Forbidden),
        }
    }
}

pub async fn session_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(bearer_token)
        .ok_or(AppError::InvalidToken)?;

    let claims = state.jwt.verify(token)?;

    // Tenant middleware runs first; without it there is nothing to check against
    let tenant = request
        .extensions()
        .get::<ResolvedTenant>()
        .cloned()
        .ok_or(AppError::TenantNotFound)?;

    if claims.tenant != tenant.name {
        tracing::warn!(token_tenant = %claims.tenant, tenant = %tenant.name, "session used against another tenant");
        return Err(AppError::InvalidToken);
    }

    let display_name = current_subject(&state, &tenant, &claims).await?;

    request.extensions_mut().insert(Session {
        subject: claims.sub,
        role: claims.role,
        tenant: claims.tenant,
        display_name,
    });

    Ok(next.run(request).await)
}

/// Display name of the token subject. Deleted subjects and deactivated
/// residents are rejected with `InvalidToken` for the rest of the token's life.
async fn current_subject(
    state: &AppState,
    tenant: &ResolvedTenant,
    claims: &Claims,
) -> Result<String, AppError> {
    match claims.role {
        Role::Admin => {
            let admin = user_service::get_admin(&state.pool, &tenant.schema, claims.sub).await?;
            Ok(admin.full_name)
        }
        Role::Resident => {
            let user = user_service::get_user(&state.pool, &tenant.schema, claims.sub)
                .await
                .map_err(|e| match e {
                    AppError::UserNotFound => AppError::InvalidToken,
                    other => other,
                })?;
            if !user.is_active {
                tracing::info!(tenant = %tenant.name, user_id = %user.id, "deactivated resident presented a session");
                return Err(AppError::InvalidToken);
            }
            Ok(user.full_name)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(role: Role) -> Session {
        Session {
            subject: Uuid::new_v4(),
            role,
            tenant: "oakwood".to_string(),
            display_name: "Dana".to_string(),
        }
    }

    #[test]
    fn role_guards() {
        let admin = session(Role::Admin);
        let resident = session(Role::Resident);

        assert!(admin.is_admin());
        assert_eq!(admin.require_admin().unwrap(), admin.subject);
        assert!(matches!(admin.require_resident(), Err(AppError::Forbidden)));

        assert!(!resident.is_admin());
        assert_eq!(resident.require_resident().unwrap(), resident.subject);
        assert!(matches!(resident.require_admin(), Err(AppError::Forbidden)));
    }
}

//! Firebase phone authentication.
//!
//! Mobile clients complete phone OTP with Firebase and send the resulting ID
//! token. The token is an RS256 JWT signed by Google; the signing keys are
//! published as a JWK set and cached here for an hour.

use crate::error::AppError;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode, decode_header, jwk::JwkSet};
use serde::Deserialize;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

const KEY_CACHE_TTL: Duration = Duration::from_secs(60 * 60);
const ISSUER_PREFIX: &str = "https://securetoken.google.com/";

/// Claims read from a Firebase ID token.
#[derive(Debug, Deserialize)]
pub struct FirebaseClaims {
    /// Firebase user id
    pub sub: String,

    /// Present when the user signed in with phone OTP
    #[serde(default)]
    pub phone_number: Option<String>,
}

struct CachedKeys {
    keys: JwkSet,
    fetched_at: Instant,
}

/// Verifies Firebase ID tokens for one Firebase project.
pub struct FirebaseVerifier {
    project_id: String,
    jwks_url: String,
    client: reqwest::Client,
    cache: RwLock<Option<CachedKeys>>,
}

impl FirebaseVerifier {
    pub fn new(project_id: String, jwks_url: String) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .build()?;

        Ok(Self {
            project_id,
            jwks_url,
            client,
            cache: RwLock::new(None),
        })
    }

    /// Verify an ID token and return the verified phone number.
    pub async fn verify_phone_token(&self, id_token: &str) -> Result<String, AppError> {
        let header = decode_header(id_token).map_err(|_| AppError::InvalidToken)?;
        if header.alg != Algorithm::RS256 {
            return Err(AppError::InvalidToken);
        }
        let kid = header.kid.ok_or(AppError::InvalidToken)?;

        let key = self.decoding_key(&kid).await?;
        let claims = decode::<FirebaseClaims>(id_token, &key, &self.validation())
            .map_err(|e| {
                tracing::debug!(error = %e, "firebase token rejected");
                AppError::InvalidToken
            })?
            .claims;

        claims.phone_number.ok_or(AppError::InvalidToken)
    }

    /// Audience and issuer rules Firebase documents for ID tokens.
    fn validation(&self) -> Validation {
        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&[&self.project_id]);
        validation.set_issuer(&[format!("{ISSUER_PREFIX}{}", self.project_id)]);
        validation
    }

    /// Find the key for `kid`, refreshing the cached set when stale or missing it.
    async fn decoding_key(&self, kid: &str) -> Result<DecodingKey, AppError> {
        {
            let cache = self.cache.read().await;
            if let Some(cached) = cache.as_ref() {
                if cached.fetched_at.elapsed() < KEY_CACHE_TTL {
                    if let Some(jwk) = cached.keys.find(kid) {
                        return DecodingKey::from_jwk(jwk).map_err(|_| AppError::InvalidToken);
                    }
                }
            }
        }

        let keys = self.fetch_keys().await?;
        let key = keys
            .find(kid)
            .map(DecodingKey::from_jwk)
            .transpose()
            .map_err(|_| AppError::InvalidToken)?
            .ok_or(AppError::InvalidToken);

        *self.cache.write().await = Some(CachedKeys {
            keys,
            fetched_at: Instant::now(),
        });

        key
    }

    async fn fetch_keys(&self) -> Result<JwkSet, AppError> {
        let keys = self
            .client
            .get(&self.jwks_url)
            .send()
            .await?
            .error_for_status()?
            .json::<JwkSet>()
            .await?;

        tracing::info!(count = keys.keys.len(), "firebase signing keys refreshed");
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::auth_service::{JwtKeys, Role};
    use uuid::Uuid;

    fn verifier() -> FirebaseVerifier {
        // Port 9 is discard; no request should reach it in these tests
        FirebaseVerifier::new("demo-project".to_string(), "http://127.0.0.1:9/jwks".to_string())
            .unwrap()
    }

    #[tokio::test]
    async fn garbage_is_rejected_before_fetching_keys() {
        let result = verifier().verify_phone_token("not-a-jwt").await;
        assert!(matches!(result, Err(AppError::InvalidToken)));
    }

    #[tokio::test]
    async fn hmac_signed_tokens_are_rejected() {
        let session = JwtKeys::new("0123456789abcdef0123456789abcdef", 5)
            .issue(Uuid::new_v4(), "oakwood", Role::Resident)
            .unwrap();

        let result = verifier().verify_phone_token(&session.token).await;
        assert!(matches!(result, Err(AppError::InvalidToken)));
    }

    #[test]
    fn validation_pins_project_audience_and_issuer() {
        let validation = verifier().validation();
        assert_eq!(validation.algorithms, vec![Algorithm::RS256]);
        assert!(
            validation
                .iss
                .as_ref()
                .is_some_and(|iss| iss.contains("https://securetoken.google.com/demo-project"))
        );
        assert!(
            validation
                .aud
                .as_ref()
                .is_some_and(|aud| aud.contains("demo-project"))
        );
    }
}

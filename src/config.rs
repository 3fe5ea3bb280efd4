//! Application configuration management.
//!
//! This module handles loading configuration from environment variables.
//! It uses the `envy` crate to deserialize environment variables into a type-safe struct,
//! then `Config::validate` checks the combinations envy cannot express.

use serde::Deserialize;

/// Application configuration loaded from environment variables.
///
/// # Environment Variables
///
/// - `DATABASE_URL` (required): PostgreSQL connection string
/// - `JWT_SECRET` (required): HMAC key for session tokens, at least 32 bytes
/// - `SERVER_PORT` (optional): HTTP server port, defaults to 3000
/// - `DATABASE_MAX_CONNECTIONS` (optional): pool size, defaults to 5
/// - `JWT_TTL_MINUTES` (optional): session lifetime, defaults to one day
/// - `CORS_ALLOWED_ORIGINS` (optional): comma separated origins, any origin when unset
/// - `FIREBASE_PROJECT_ID` (optional): enables phone login when set
/// - `STORAGE_BACKEND` (optional): `local` (default) or `http`
/// - `PUSH_GATEWAY_URL` / `PUSH_SIGNING_SECRET` (optional): notification delivery
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database_url: String,

    #[serde(default = "default_port")]
    pub server_port: u16,

    #[serde(default = "default_max_connections")]
    pub database_max_connections: u32,

    pub jwt_secret: String,

    #[serde(default = "default_jwt_ttl")]
    pub jwt_ttl_minutes: i64,

    #[serde(default)]
    pub cors_allowed_origins: Option<String>,

    #[serde(default)]
    pub firebase_project_id: Option<String>,

    #[serde(default = "default_firebase_jwks_url")]
    pub firebase_jwks_url: String,

    #[serde(default)]
    pub storage_backend: StorageBackend,

    #[serde(default = "default_storage_dir")]
    pub storage_local_dir: String,

    #[serde(default)]
    pub storage_bucket_url: Option<String>,

    #[serde(default)]
    pub storage_auth_token: Option<String>,

    /// Base URL prepended to object keys in responses.
    #[serde(default = "default_public_base_url")]
    pub storage_public_base_url: String,

    #[serde(default = "default_max_image_bytes")]
    pub max_image_bytes: usize,

    #[serde(default)]
    pub push_gateway_url: Option<String>,

    #[serde(default)]
    pub push_signing_secret: Option<String>,
}

/// Where uploaded images are written.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Local,
    Http,
}

/// Configuration combinations that deserialize fine but cannot run.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error(transparent)]
    Env(#[from] envy::Error),

    #[error("JWT_SECRET must be at least 32 bytes")]
    WeakJwtSecret,

    #[error("JWT_TTL_MINUTES must be positive")]
    InvalidJwtTtl,

    #[error("STORAGE_BUCKET_URL is required when STORAGE_BACKEND=http")]
    MissingBucketUrl,

    #[error("PUSH_GATEWAY_URL and PUSH_SIGNING_SECRET must be set together")]
    IncompletePushConfig,

    #[error("{name}: {reason}")]
    InvalidUrl { name: &'static str, reason: String },
}

const MIN_JWT_SECRET_LEN: usize = 32;

/// Default port if SERVER_PORT environment variable is not set.
fn default_port() -> u16 {
    3000
}

fn default_max_connections() -> u32 {
    5
}

fn default_jwt_ttl() -> i64 {
    24 * 60
}

fn default_firebase_jwks_url() -> String {
    "https://www.googleapis.com/service_accounts/v1/jwk/securetoken@system.gserviceaccount.com"
        .to_string()
}

fn default_storage_dir() -> String {
    "./uploads".to_string()
}

fn default_public_base_url() -> String {
    "http://localhost:3000/uploads".to_string()
}

fn default_max_image_bytes() -> usize {
    5 * 1024 * 1024
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// This method first attempts to load a `.env` file (which is optional),
    /// then reads environment variables, deserializes them into a Config struct
    /// and validates the result.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Required environment variables are missing (e.g., DATABASE_URL)
    /// - Environment variable values cannot be parsed into expected types
    /// - The values fail [`Config::validate`]
    pub fn from_env() -> Result<Self, ConfigError> {
        // Try to load .env file if it exists (does nothing if not found)
        dotenvy::dotenv().ok();

        let config = envy::from_env::<Config>()?;
        config.validate()?;
        Ok(config)
    }

    /// Check cross-field rules.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.jwt_secret.len() < MIN_JWT_SECRET_LEN {
            return Err(ConfigError::WeakJwtSecret);
        }
        if self.jwt_ttl_minutes <= 0 {
            return Err(ConfigError::InvalidJwtTtl);
        }

        if self.storage_backend == StorageBackend::Http {
            let bucket = self
                .storage_bucket_url
                .as_deref()
                .ok_or(ConfigError::MissingBucketUrl)?;
            validate_remote_url("STORAGE_BUCKET_URL", bucket)?;
        }

        match (&self.push_gateway_url, &self.push_signing_secret) {
            (Some(url), Some(_)) => validate_remote_url("PUSH_GATEWAY_URL", url)?,
            (None, None) => {}
            _ => return Err(ConfigError::IncompletePushConfig),
        }

        Ok(())
    }

    /// Parsed `CORS_ALLOWED_ORIGINS`, `None` meaning any origin.
    pub fn cors_origins(&self) -> Option<Vec<String>> {
        self.cors_allowed_origins.as_ref().map(|raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|origin| !origin.is_empty())
                .map(str::to_string)
                .collect()
        })
    }
}

/// Remote endpoints must be HTTPS; plain HTTP is allowed for local development hosts.
pub fn validate_remote_url(name: &'static str, raw: &str) -> Result<(), ConfigError> {
    let invalid = |reason: &str| ConfigError::InvalidUrl {
        name,
        reason: reason.to_string(),
    };

    if raw.len() > 2048 {
        return Err(invalid("URL exceeds 2048 characters"));
    }

    let parsed = url::Url::parse(raw).map_err(|_| invalid("invalid URL format"))?;

    match parsed.scheme() {
        "https" => Ok(()),
        "http" => match parsed.host_str() {
            Some("localhost") | Some("127.0.0.1") | Some("0.0.0.0") => Ok(()),
            _ => Err(invalid("HTTP is only allowed for localhost")),
        },
        _ => Err(invalid("URL must use HTTP or HTTPS")),
    }
}

#[cfg(test)]
pub(crate) fn test_config() -> Config {
    Config {
        database_url: "postgres://localhost/community_test".to_string(),
        server_port: default_port(),
        database_max_connections: default_max_connections(),
        jwt_secret: "0123456789abcdef0123456789abcdef".to_string(),
        jwt_ttl_minutes: default_jwt_ttl(),
        cors_allowed_origins: None,
        firebase_project_id: None,
        firebase_jwks_url: default_firebase_jwks_url(),
        storage_backend: StorageBackend::Local,
        storage_local_dir: default_storage_dir(),
        storage_bucket_url: None,
        storage_auth_token: None,
        storage_public_base_url: default_public_base_url(),
        max_image_bytes: default_max_image_bytes(),
        push_gateway_url: None,
        push_signing_secret: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(test_config().validate().is_ok());
    }

    #[test]
    fn short_jwt_secret_is_rejected() {
        let config = Config {
            jwt_secret: "short".to_string(),
            ..test_config()
        };
        assert!(matches!(config.validate(), Err(ConfigError::WeakJwtSecret)));
    }

    #[test]
    fn http_storage_requires_bucket() {
        let mut config = Config {
            storage_backend: StorageBackend::Http,
            ..test_config()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MissingBucketUrl)
        ));

        config.storage_bucket_url = Some("https://bucket.example.com/images".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn push_settings_must_come_in_pairs() {
        let config = Config {
            push_gateway_url: Some("https://push.example.com/send".to_string()),
            ..test_config()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::IncompletePushConfig)
        ));
    }

    #[test]
    fn plain_http_only_for_localhost() {
        assert!(validate_remote_url("X", "http://localhost:9000/bucket").is_ok());
        assert!(validate_remote_url("X", "https://storage.example.com").is_ok());
        assert!(validate_remote_url("X", "http://storage.example.com").is_err());
        assert!(validate_remote_url("X", "ftp://localhost").is_err());
        assert!(validate_remote_url("X", "not a url").is_err());
    }

    #[test]
    fn cors_origins_are_split_and_trimmed() {
        let config = Config {
            cors_allowed_origins: Some("https://a.example.com, https://b.example.com,".to_string()),
            ..test_config()
        };
        assert_eq!(
            config.cors_origins(),
            Some(vec![
                "https://a.example.com".to_string(),
                "https://b.example.com".to_string()
            ])
        );
        assert_eq!(test_config().cors_origins(), None);
    }
}

//! Object storage for uploaded images.
//!
//! Two backends are supported:
//! - `Local`: files under a directory on disk, served back by the router at `/uploads`
//! - `Http`: an S3-style bucket accepting `PUT <bucket_url>/<key>`
//!
//! Both return the public URL clients should use to load the image.

use crate::config::{Config, StorageBackend};
use crate::error::AppError;
use crate::models::tenant::TenantSchema;
use axum::body::Bytes;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;
use uuid::Uuid;

/// Content types accepted for uploads and the file extension stored for each.
const IMAGE_TYPES: &[(&str, &str)] = &[
    ("image/png", "png"),
    ("image/jpeg", "jpg"),
    ("image/webp", "webp"),
    ("image/gif", "gif"),
];

/// Configured image store.
#[derive(Debug, Clone)]
pub enum ImageStore {
    Local {
        root: PathBuf,
        public_base_url: String,
    },
    Http {
        client: reqwest::Client,
        bucket_url: String,
        auth_token: Option<String>,
        public_base_url: String,
    },
}

impl ImageStore {
    pub fn from_config(config: &Config) -> Result<Self, AppError> {
        let public_base_url = config.storage_public_base_url.trim_end_matches('/').to_string();

        match config.storage_backend {
            StorageBackend::Local => Ok(ImageStore::Local {
                root: PathBuf::from(&config.storage_local_dir),
                public_base_url,
            }),
            StorageBackend::Http => {
                let bucket_url = config
                    .storage_bucket_url
                    .clone()
                    .ok_or_else(|| AppError::Storage("STORAGE_BUCKET_URL is not set".into()))?;
                let client = reqwest::Client::builder()
                    .timeout(Duration::from_secs(30))
                    .build()?;

                Ok(ImageStore::Http {
                    client,
                    bucket_url: bucket_url.trim_end_matches('/').to_string(),
                    auth_token: config.storage_auth_token.clone(),
                    public_base_url,
                })
            }
        }
    }

    /// Root directory to serve at `/uploads`, for the local backend only.
    pub fn local_root(&self) -> Option<&Path> {
        match self {
            ImageStore::Local { root, .. } => Some(root),
            ImageStore::Http { .. } => None,
        }
    }

    /// Store `data` under `key` and return its public URL.
    pub async fn put(&self, key: &str, content_type: &str, data: Bytes) -> Result<String, AppError> {
        if !is_safe_key(key) {
            return Err(AppError::Storage(format!("refusing object key {key}")));
        }

        match self {
            ImageStore::Local {
                root,
                public_base_url,
            } => {
                let path = root.join(key);
                if let Some(parent) = path.parent() {
                    tokio::fs::create_dir_all(parent)
                        .await
                        .map_err(|e| AppError::Storage(e.to_string()))?;
                }
                tokio::fs::write(&path, &data)
                    .await
                    .map_err(|e| AppError::Storage(e.to_string()))?;

                tracing::info!(key, bytes = data.len(), "image stored locally");
                Ok(format!("{public_base_url}/{key}"))
            }
            ImageStore::Http {
                client,
                bucket_url,
                auth_token,
                public_base_url,
            } => {
                let mut request = client
                    .put(format!("{bucket_url}/{key}"))
                    .header("Content-Type", content_type)
                    .body(data);
                if let Some(token) = auth_token {
                    request = request.bearer_auth(token);
                }

                let response = request.send().await?;
                if !response.status().is_success() {
                    return Err(AppError::Storage(format!(
                        "bucket rejected upload with status {}",
                        response.status()
                    )));
                }

                tracing::info!(key, "image uploaded to bucket");
                Ok(format!("{public_base_url}/{key}"))
            }
        }
    }
}

/// Extension for an accepted image content type.
pub fn image_extension(content_type: &str) -> Option<&'static str> {
    let essence = content_type.split(';').next().unwrap_or_default().trim();
    IMAGE_TYPES
        .iter()
        .find(|(mime, _)| mime.eq_ignore_ascii_case(essence))
        .map(|(_, ext)| *ext)
}

/// Object key for a new event image: `<schema>/events/<event_id>/<uuid>.<ext>`.
pub fn event_image_key(schema: &TenantSchema, event_id: Uuid, extension: &str) -> String {
    format!(
        "{}/events/{}/{}.{}",
        schema.as_str(),
        event_id,
        Uuid::new_v4(),
        extension
    )
}

/// Keys must stay relative and inside the store root.
fn is_safe_key(key: &str) -> bool {
    !key.is_empty()
        && Path::new(key)
            .components()
            .all(|component| matches!(component, Component::Normal(_)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepted_image_types() {
        assert_eq!(image_extension("image/png"), Some("png"));
        assert_eq!(image_extension("IMAGE/JPEG"), Some("jpg"));
        assert_eq!(image_extension("image/webp; charset=binary"), Some("webp"));
        assert_eq!(image_extension("application/pdf"), None);
        assert_eq!(image_extension(""), None);
    }

    #[test]
    fn event_keys_are_namespaced_by_schema() {
        let schema = TenantSchema::for_tenant("oakwood").unwrap();
        let event_id = Uuid::new_v4();
        let key = event_image_key(&schema, event_id, "png");

        assert!(key.starts_with(&format!("tenant_oakwood/events/{event_id}/")));
        assert!(key.ends_with(".png"));
        assert!(is_safe_key(&key));
    }

    #[test]
    fn traversal_keys_are_unsafe() {
        assert!(!is_safe_key("../etc/passwd"));
        assert!(!is_safe_key("/absolute/path"));
        assert!(!is_safe_key("a/../../b"));
        assert!(!is_safe_key(""));
    }

    #[tokio::test]
    async fn local_store_writes_file_and_returns_public_url() {
        let dir = tempfile::tempdir().unwrap();
        let store = ImageStore::Local {
            root: dir.path().to_path_buf(),
            public_base_url: "http://localhost:3000/uploads".to_string(),
        };

        let url = store
            .put("tenant_oakwood/events/e1/a.png", "image/png", Bytes::from_static(b"png"))
            .await
            .unwrap();

        assert_eq!(url, "http://localhost:3000/uploads/tenant_oakwood/events/e1/a.png");
        let written = std::fs::read(dir.path().join("tenant_oakwood/events/e1/a.png")).unwrap();
        assert_eq!(written, b"png");
    }
}

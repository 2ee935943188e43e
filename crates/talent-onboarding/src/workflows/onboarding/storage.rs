use std::path::PathBuf;

use async_trait::async_trait;
use axum::body::Bytes;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use super::domain::ApplicantKind;
use crate::error::ServiceError;

/// Relative key of a stored blob, e.g. `model/documents/1718_a1b2c3d4_front.jpg`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlobRef(pub String);

impl BlobRef {
    /// Public path under the static `/uploads` mount.
    pub fn url(&self) -> String {
        format!("/uploads/{}", self.0)
    }
}

/// Groups blobs by the step that produced them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlobCategory {
    Measurements,
    Documents,
    IdentityCheck,
}

impl BlobCategory {
    pub const fn label(self) -> &'static str {
        match self {
            BlobCategory::Measurements => "measurements",
            BlobCategory::Documents => "documents",
            BlobCategory::IdentityCheck => "identity",
        }
    }
}

/// File part received in a multipart submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    pub field: String,
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("blob write to {path} failed: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl From<StorageError> for ServiceError {
    fn from(value: StorageError) -> Self {
        ServiceError::infra(value.to_string())
    }
}

/// Opaque blob store keyed by path.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn put(
        &self,
        kind: ApplicantKind,
        category: BlobCategory,
        file: &UploadedFile,
    ) -> Result<BlobRef, StorageError>;
}

/// Keep only `[A-Za-z0-9._-]` from the final path component of a client file name.
pub fn sanitize_file_name(raw: &str) -> String {
    let base = raw.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .take(100)
        .collect();
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "upload".to_string()
    } else {
        cleaned.to_string()
    }
}

/// Nanosecond timestamp, random suffix, sanitized original name.
pub fn unique_file_name(original: &str) -> String {
    let nanos = Utc::now().timestamp_nanos_opt().unwrap_or_default();
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{nanos}_{}_{}", &suffix[..8], sanitize_file_name(original))
}

/// Local directory tree laid out as `{root}/{kind}/{category}/{file}`.
#[derive(Debug, Clone)]
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn put(
        &self,
        kind: ApplicantKind,
        category: BlobCategory,
        file: &UploadedFile,
    ) -> Result<BlobRef, StorageError> {
        let relative_dir = format!("{}/{}", kind.label(), category.label());
        let dir = self.root.join(kind.label()).join(category.label());
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|source| StorageError::Write {
                path: dir.clone(),
                source,
            })?;

        let name = unique_file_name(&file.file_name);
        let path = dir.join(&name);
        tokio::fs::write(&path, &file.bytes)
            .await
            .map_err(|source| StorageError::Write {
                path: path.clone(),
                source,
            })?;

        debug!(path = %path.display(), bytes = file.bytes.len(), "blob stored");
        Ok(BlobRef(format!("{relative_dir}/{name}")))
    }
}

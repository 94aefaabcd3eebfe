//! Profile image storage.
//!
//! Uploaded images are written under a local directory and served back by the
//! router at `/assets`. The [`AssetStore`] trait is the seam for swapping in an
//! object store.

use std::path::PathBuf;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

/// Largest accepted upload, in bytes.
pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

/// Errors from asset storage.
#[derive(Debug, Error)]
pub enum AssetError {
    /// Content type is not an accepted image format.
    #[error("unsupported image type: {0}")]
    UnsupportedType(String),

    /// Upload had no bytes.
    #[error("image is empty")]
    Empty,

    /// Upload is larger than [`MAX_IMAGE_BYTES`].
    #[error("image exceeds {MAX_IMAGE_BYTES} bytes")]
    TooLarge,

    /// Writing to the backing store failed.
    #[error("asset io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Stores uploaded binary assets and returns their public URL.
#[async_trait]
pub trait AssetStore: Send + Sync {
    async fn store(&self, bytes: Vec<u8>, content_type: &str) -> Result<String, AssetError>;
}

/// Asset store backed by a local directory.
#[derive(Debug, Clone)]
pub struct LocalAssetStore {
    dir: PathBuf,
    public_base: String,
}

impl LocalAssetStore {
    /// Create a store writing into `dir`, with URLs rooted at `public_base`
    /// (for example `https://id.example.com/assets`).
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>, public_base: &str) -> Self {
        Self {
            dir: dir.into(),
            public_base: public_base.trim_end_matches('/').to_owned(),
        }
    }
}

fn extension_for(content_type: &str) -> Option<&'static str> {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    match essence.as_str() {
        "image/png" => Some("png"),
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/gif" => Some("gif"),
        "image/webp" => Some("webp"),
        _ => None,
    }
}

#[async_trait]
impl AssetStore for LocalAssetStore {
    async fn store(&self, bytes: Vec<u8>, content_type: &str) -> Result<String, AssetError> {
        let ext = extension_for(content_type)
            .ok_or_else(|| AssetError::UnsupportedType(content_type.to_owned()))?;
        if bytes.is_empty() {
            return Err(AssetError::Empty);
        }
        if bytes.len() > MAX_IMAGE_BYTES {
            return Err(AssetError::TooLarge);
        }

        tokio::fs::create_dir_all(&self.dir).await?;
        let file_name = format!("{}.{ext}", Uuid::new_v4());
        tokio::fs::write(self.dir.join(&file_name), &bytes).await?;

        tracing::debug!(file = %file_name, size = bytes.len(), "Stored asset");
        Ok(format!("{}/{file_name}", self.public_base))
    }
}

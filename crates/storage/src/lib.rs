//! Durable blob storage keyed by string path.
//!
//! [`BlobStore`] is the seam the pipeline writes card images through;
//! single-host deployments use the filesystem backend, everything else
//! uses S3-compatible object storage.

pub mod fs;
pub mod s3;

pub use fs::FsBlobStore;
pub use s3::S3BlobStore;

/// A stored blob with its declared content type.
#[derive(Debug, Clone)]
pub struct StoredObject {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

/// Errors from a blob store backend.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The key is empty, absolute, or escapes the store root.
    #[error("invalid blob key '{0}'")]
    InvalidKey(String),

    /// Filesystem failure.
    #[error("blob I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// Object-storage backend failure.
    #[error("blob backend error: {0}")]
    Backend(String),
}

/// Durable object storage keyed by string path.
///
/// `put` with the same key overwrites; a missing object on `get` is
/// `Ok(None)`, not an error.
#[async_trait::async_trait]
pub trait BlobStore: Send + Sync {
    async fn put(&self, key: &str, bytes: &[u8], mime_type: &str) -> Result<(), StorageError>;

    async fn get(&self, key: &str) -> Result<Option<StoredObject>, StorageError>;
}

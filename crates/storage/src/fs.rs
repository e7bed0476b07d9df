//! Filesystem blob store for single-host deployments.

use std::path::{Component, Path, PathBuf};

use crate::{BlobStore, StorageError, StoredObject};

/// Fallback content type when a blob has no mime sidecar.
const DEFAULT_MIME: &str = "application/octet-stream";

/// Stores blobs as files under a root directory.
///
/// The declared mime type is kept in a `<key>.mime` sidecar so `get`
/// returns what `put` declared.
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolve a key to a path under the root.
    ///
    /// Rejects empty, absolute, and parent-escaping keys instead of letting
    /// them address files outside the store.
    fn resolve(&self, key: &str) -> Result<PathBuf, StorageError> {
        if key.is_empty() {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        let path = Path::new(key);
        let mut resolved = self.root.clone();
        for component in path.components() {
            match component {
                Component::Normal(part) => resolved.push(part),
                _ => return Err(StorageError::InvalidKey(key.to_string())),
            }
        }
        Ok(resolved)
    }

    fn mime_path(path: &Path) -> PathBuf {
        let mut name = path.as_os_str().to_os_string();
        name.push(".mime");
        PathBuf::from(name)
    }
}

#[async_trait::async_trait]
impl BlobStore for FsBlobStore {
    async fn put(&self, key: &str, bytes: &[u8], mime_type: &str) -> Result<(), StorageError> {
        let path = self.resolve(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, bytes).await?;
        tokio::fs::write(Self::mime_path(&path), mime_type.as_bytes()).await?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<StoredObject>, StorageError> {
        let path = self.resolve(key)?;
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let mime_type = match tokio::fs::read_to_string(Self::mime_path(&path)).await {
            Ok(mime) => mime,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => DEFAULT_MIME.to_string(),
            Err(e) => return Err(e.into()),
        };

        Ok(Some(StoredObject { bytes, mime_type }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> (tempfile::TempDir, FsBlobStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::new(dir.path());
        (dir, store)
    }

    #[tokio::test]
    async fn put_then_get_round_trips() {
        let (_dir, store) = store();
        store
            .put("cards/2026-08-04-hangzhou-r1.png", b"png bytes", "image/png")
            .await
            .unwrap();

        let object = store
            .get("cards/2026-08-04-hangzhou-r1.png")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(object.bytes, b"png bytes");
        assert_eq!(object.mime_type, "image/png");
    }

    #[tokio::test]
    async fn put_overwrites_the_same_key() {
        let (_dir, store) = store();
        store.put("cards/k.png", b"first", "image/png").await.unwrap();
        store.put("cards/k.png", b"second", "image/webp").await.unwrap();

        let object = store.get("cards/k.png").await.unwrap().unwrap();
        assert_eq!(object.bytes, b"second");
        assert_eq!(object.mime_type, "image/webp");
    }

    #[tokio::test]
    async fn missing_key_is_none() {
        let (_dir, store) = store();
        assert!(store.get("cards/absent.png").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn traversal_keys_are_rejected() {
        let (_dir, store) = store();
        for key in ["", "/etc/passwd", "../escape.png", "cards/../../escape.png"] {
            assert!(matches!(
                store.get(key).await,
                Err(StorageError::InvalidKey(_))
            ));
        }
    }
}

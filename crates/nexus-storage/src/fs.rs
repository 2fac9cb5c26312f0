//! Filesystem storage back-end.

use std::path::Path;
use std::path::PathBuf;

use async_trait::async_trait;
use bytes::Bytes;
use tracing::debug;

use crate::error::InvalidKeySnafu;
use crate::error::Result;
use crate::error::StorageError;
use crate::store::KeyValueStore;
use crate::store::MetaMap;

/// Filesystem-backed key-value store.
///
/// Raw bytes live under `<root>/raw/<key>`, metadata under
/// `<root>/meta/<key>.json`. The two trees are kept separate so a key can
/// carry metadata while also being the prefix of deeper raw keys, which
/// is exactly how package manifests relate to package files.
///
/// `put_raw` writes through a temporary file and renames, so a concurrent
/// `get_raw` on the same key sees either the old bytes or the new ones.
#[derive(Debug, Clone)]
pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    /// Open a store rooted at `root`. The directory is created lazily.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn raw_path(&self, key: &str) -> Result<PathBuf> {
        Ok(self.root.join("raw").join(sanitize(key)?))
    }

    fn meta_path(&self, key: &str) -> Result<PathBuf> {
        let mut path = self.root.join("meta").join(sanitize(key)?);
        path.as_mut_os_string().push(".json");
        Ok(path)
    }

    /// Subtree of the meta tree below `key` (for prefix removal).
    fn meta_dir(&self, key: &str) -> Result<PathBuf> {
        Ok(self.root.join("meta").join(sanitize(key)?))
    }
}

/// Validate a storage key for filesystem use.
///
/// Keys are `/`-separated; segments must be non-empty and must not be
/// `.`/`..` or contain path-hostile bytes.
fn sanitize(key: &str) -> Result<&Path> {
    let valid = !key.is_empty()
        && !key.starts_with('/')
        && !key.ends_with('/')
        && key.split('/').all(|seg| {
            !seg.is_empty() && seg != "." && seg != ".." && !seg.contains('\\') && !seg.contains('\0')
        });
    if !valid {
        return InvalidKeySnafu { key }.fail();
    }
    Ok(Path::new(key))
}

async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let parent = path.parent().ok_or_else(|| StorageError::Unavailable {
        message: format!("no parent directory for {}", path.display()),
    })?;
    tokio::fs::create_dir_all(parent).await?;

    let tmp = path.with_extension("tmp");
    tokio::fs::write(&tmp, bytes).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}

/// Remove a path whether it is a file, a directory, or absent.
async fn remove_any(path: &Path) -> Result<()> {
    match tokio::fs::metadata(path).await {
        Ok(md) if md.is_dir() => tokio::fs::remove_dir_all(path).await?,
        Ok(_) => tokio::fs::remove_file(path).await?,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(e.into()),
    }
    Ok(())
}

#[async_trait]
impl KeyValueStore for FsStore {
    async fn get_raw(&self, key: &str) -> Result<Option<Bytes>> {
        let path = self.raw_path(key)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(Bytes::from(bytes))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn put_raw(&self, key: &str, bytes: Bytes) -> Result<()> {
        let path = self.raw_path(key)?;
        write_atomic(&path, &bytes).await?;
        debug!(key = %key, size = bytes.len(), "stored raw bytes");
        Ok(())
    }

    async fn remove(&self, prefix: &str) -> Result<()> {
        remove_any(&self.raw_path(prefix)?).await?;
        remove_any(&self.meta_path(prefix)?).await?;
        remove_any(&self.meta_dir(prefix)?).await?;
        Ok(())
    }

    async fn get_meta(&self, key: &str) -> Result<Option<MetaMap>> {
        let path = self.meta_path(key)?;
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let meta = serde_json::from_slice(&bytes).map_err(|e| StorageError::CorruptMeta {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        Ok(Some(meta))
    }

    async fn set_meta(&self, key: &str, meta: MetaMap) -> Result<()> {
        let mut merged = self.get_meta(key).await?.unwrap_or_default();
        merged.extend(meta);
        let bytes = serde_json::to_vec(&merged).map_err(|e| StorageError::Unavailable {
            message: format!("meta encode failed: {e}"),
        })?;
        write_atomic(&self.meta_path(key)?, &bytes).await
    }
}

//! The package cache proper.

use std::sync::Arc;

use bytes::Bytes;
use chrono::Utc;
use futures::StreamExt;
use futures::future::join_all;
use futures::stream;
use tracing::debug;
use tracing::instrument;
use tracing::warn;

use nexus_archive::ArchiveEntry;
use nexus_archive::extract_entries;
use nexus_archive::sri_sha256;
use nexus_resolver::Ecosystem;
use nexus_resolver::PackageKey;
use nexus_resolver::Resolved;
use nexus_storage::KeyValueStore;
use nexus_upstream::UpstreamClient;

use crate::error::CacheError;
use crate::error::Result;
use crate::error::UnsupportedSnafu;
use crate::manifest::FileEntry;
use crate::manifest::PackageManifest;

/// Concurrent per-file fetches during a cdnjs hydration.
///
/// cdnjs has no tarball; hydration is one HTTP request per file, bounded
/// so a large library does not open hundreds of connections at once.
const MAX_CONCURRENT_FILE_FETCHES: usize = 8;

/// Read-through, opportunistically warming cache over versioned package
/// artifacts.
///
/// Cheap to clone; all clones share the storage back-end and the
/// upstream client pool.
#[derive(Clone)]
pub struct PackageCache {
    store: Arc<dyn KeyValueStore>,
    client: UpstreamClient,
}

impl PackageCache {
    /// Build a cache over `store`, fetching misses through `client`.
    pub fn new(store: Arc<dyn KeyValueStore>, client: UpstreamClient) -> Self {
        Self { store, client }
    }

    /// Fetch one file of a resolved package.
    ///
    /// On a cache hit the stored bytes come back directly. On a miss the
    /// upstream artifact is pulled once, the requested entry is returned
    /// immediately, and persistence of the whole package is detached so
    /// it never blocks or fails this call.
    #[instrument(skip(self), fields(key = %resolved.key))]
    pub async fn get_file(&self, resolved: &Resolved, path: &str) -> Result<Bytes> {
        let path = path.trim_start_matches('/');
        let raw_key = resolved.key.raw_key(path);

        if let Some(bytes) = self.read_raw(&raw_key).await {
            debug!(raw_key = %raw_key, "cache hit");
            return Ok(bytes);
        }

        match resolved.key.ecosystem {
            Ecosystem::Npm | Ecosystem::Jsr | Ecosystem::Gh => self.pull_through_tarball(resolved, path).await,
            Ecosystem::Cdnjs => self.pull_through_cdnjs(resolved, path).await,
            Ecosystem::Wp => self.pull_through_wp(resolved, path).await,
            Ecosystem::Winget => UnsupportedSnafu {
                operation: "file fetch",
                key: resolved.key.to_string(),
            }
            .fail(),
        }
    }

    /// The package's manifest, hydrating synchronously when it has none
    /// yet.
    #[instrument(skip(self), fields(key = %resolved.key))]
    pub async fn list(&self, resolved: &Resolved) -> Result<PackageManifest> {
        let prefix = resolved.key.storage_prefix();
        if let Ok(Some(meta)) = self.store.get_meta(&prefix).await {
            if let Some(manifest) = PackageManifest::from_meta(&meta) {
                return Ok(manifest);
            }
        }
        self.hydrate(resolved).await
    }

    /// Fire-and-forget full hydration.
    ///
    /// The spawned task survives the response and the client connection;
    /// its failures are logged and dropped.
    pub fn hydrate_async(&self, resolved: &Resolved) {
        if matches!(resolved.key.ecosystem, Ecosystem::Wp | Ecosystem::Winget) {
            return;
        }
        let cache = self.clone();
        let resolved = resolved.clone();
        tokio::spawn(async move {
            if let Err(e) = cache.hydrate(&resolved).await {
                warn!(key = %resolved.key, error = %e, "background hydration failed");
            }
        });
    }

    /// Pull the package's artifact and persist every file, returning the
    /// manifest that was committed.
    async fn hydrate(&self, resolved: &Resolved) -> Result<PackageManifest> {
        match resolved.key.ecosystem {
            Ecosystem::Npm | Ecosystem::Jsr | Ecosystem::Gh => {
                let entries = self.fetch_entries(&resolved.key).await?;
                Ok(persist_entries(self.store.as_ref(), resolved, &entries).await)
            }
            Ecosystem::Cdnjs => self.hydrate_cdnjs(resolved).await,
            Ecosystem::Wp | Ecosystem::Winget => UnsupportedSnafu {
                operation: "hydration",
                key: resolved.key.to_string(),
            }
            .fail(),
        }
    }

    // ---- tarball ecosystems ----

    async fn pull_through_tarball(&self, resolved: &Resolved, path: &str) -> Result<Bytes> {
        let entries = self.fetch_entries(&resolved.key).await?;
        let target = entries.iter().find(|e| e.path == path).map(|e| e.bytes.clone());

        // Warm the rest after this response, even if the client is gone.
        let store = Arc::clone(&self.store);
        let resolved_task = resolved.clone();
        tokio::spawn(async move {
            persist_entries(store.as_ref(), &resolved_task, &entries).await;
        });

        target.ok_or_else(|| CacheError::FileNotFound {
            key: resolved.key.to_string(),
            path: path.to_string(),
        })
    }

    async fn fetch_entries(&self, key: &PackageKey) -> Result<Vec<ArchiveEntry>> {
        let gzipped = self.fetch_tarball(key).await?;
        extract_entries(&gzipped).map_err(|e| CacheError::UpstreamUnavailable {
            key: key.to_string(),
            message: e.to_string(),
        })
    }

    async fn fetch_tarball(&self, key: &PackageKey) -> Result<Bytes> {
        let fetched = match key.ecosystem {
            Ecosystem::Npm => {
                let url = UpstreamClient::npm_tarball_url(&key.name, &key.version);
                self.client.tarball(&url).await
            }
            Ecosystem::Jsr => match self.client.jsr_tarball_url(&key.name, &key.version).await {
                Ok(url) => self.client.tarball(&url).await,
                Err(e) => Err(e),
            },
            Ecosystem::Gh => {
                let (owner, repo) = key.name.split_once('/').unwrap_or((key.name.as_str(), ""));
                self.client.github_tarball(owner, repo, &key.version).await
            }
            _ => {
                return UnsupportedSnafu {
                    operation: "tarball fetch",
                    key: key.to_string(),
                }
                .fail();
            }
        };
        fetched.map_err(|e| CacheError::from_upstream(&key.to_string(), e))
    }

    // ---- cdnjs ----

    async fn pull_through_cdnjs(&self, resolved: &Resolved, path: &str) -> Result<Bytes> {
        let key = &resolved.key;
        let bytes = self
            .client
            .cdnjs_file(&key.name, &key.version, path)
            .await
            .map_err(|e| CacheError::from_upstream(&key.to_string(), e))?;

        self.persist_single(key, path, bytes.clone());
        self.hydrate_async(resolved);
        Ok(bytes)
    }

    async fn hydrate_cdnjs(&self, resolved: &Resolved) -> Result<PackageManifest> {
        let key = resolved.key.clone();
        let listing = self
            .client
            .cdnjs_version(&key.name, &key.version)
            .await
            .map_err(|e| CacheError::from_upstream(&key.to_string(), e))?;

        if !resolved.immutable {
            let prefix = key.storage_prefix();
            if let Err(e) = self.store.remove(&prefix).await {
                warn!(prefix = %prefix, error = %e, "prefix removal failed, skipping rehydration");
                return Ok(PackageManifest { files: Vec::new(), mtime: Utc::now().timestamp() });
            }
        }

        let files: Vec<FileEntry> = stream::iter(listing.files)
            .map(|path| {
                let cache = self.clone();
                let key = key.clone();
                async move {
                    let bytes = cache.client.cdnjs_file(&key.name, &key.version, &path).await.ok()?;
                    let raw_key = key.raw_key(&path);
                    let integrity = sri_sha256(&bytes);
                    let size = bytes.len() as u64;
                    if let Err(e) = cache.store.put_raw(&raw_key, bytes).await {
                        warn!(raw_key = %raw_key, error = %e, "file write failed during warmup");
                        return None;
                    }
                    Some(FileEntry { name: path, size, integrity: Some(integrity) })
                }
            })
            .buffer_unordered(MAX_CONCURRENT_FILE_FETCHES)
            .filter_map(|entry| async move { entry })
            .collect()
            .await;

        let manifest = PackageManifest { files, mtime: Utc::now().timestamp() };
        let prefix = key.storage_prefix();
        if let Err(e) = self.store.set_meta(&prefix, manifest.to_meta()).await {
            warn!(prefix = %prefix, error = %e, "manifest write failed");
        }
        Ok(manifest)
    }

    // ---- WordPress ----

    async fn pull_through_wp(&self, resolved: &Resolved, path: &str) -> Result<Bytes> {
        let key = &resolved.key;
        let (kind, slug) = key
            .name
            .split_once('/')
            .ok_or_else(|| CacheError::PackageNotFound { key: key.to_string() })?;

        let fetched = match kind {
            "plugins" => self.client.wp_plugin_file(slug, &key.version, path).await,
            "themes" => self.client.wp_theme_file(slug, &key.version, path).await,
            _ => return Err(CacheError::PackageNotFound { key: key.to_string() }),
        };
        let bytes = fetched.map_err(|e| CacheError::from_upstream(&key.to_string(), e))?;

        self.persist_single(key, path, bytes.clone());
        Ok(bytes)
    }

    // ---- synthetic entries ----

    /// Probe a synthesized entry (a transform result such as `+esm`)
    /// stored under the package prefix. Never touches upstream.
    pub async fn get_synthetic(&self, resolved: &Resolved, name: &str) -> Option<Bytes> {
        self.read_raw(&resolved.key.raw_key(name)).await
    }

    /// Persist a synthesized entry, detached and best-effort.
    pub fn put_synthetic(&self, resolved: &Resolved, name: &str, bytes: Bytes) {
        self.persist_single(&resolved.key, name, bytes);
    }

    // ---- shared plumbing ----

    /// Detached best-effort write of one file.
    fn persist_single(&self, key: &PackageKey, path: &str, bytes: Bytes) {
        let store = Arc::clone(&self.store);
        let raw_key = key.raw_key(path);
        tokio::spawn(async move {
            if let Err(e) = store.put_raw(&raw_key, bytes).await {
                warn!(raw_key = %raw_key, error = %e, "file write failed");
            }
        });
    }

    /// Read a raw key, degrading storage failure to a miss.
    async fn read_raw(&self, raw_key: &str) -> Option<Bytes> {
        match self.store.get_raw(raw_key).await {
            Ok(hit) => hit,
            Err(e) => {
                warn!(raw_key = %raw_key, error = %e, "storage read failed, treating as miss");
                None
            }
        }
    }
}

/// Persist extracted entries and commit the manifest.
///
/// Mutable keys get their whole prefix removed first so readers never
/// observe a mix of old and new hydrations. Per-file writes run
/// concurrently; a failed write drops that file from the manifest and
/// nothing else. The manifest itself is written last.
pub(crate) async fn persist_entries(
    store: &dyn KeyValueStore,
    resolved: &Resolved,
    entries: &[ArchiveEntry],
) -> PackageManifest {
    let prefix = resolved.key.storage_prefix();

    if !resolved.immutable {
        if let Err(e) = store.remove(&prefix).await {
            warn!(prefix = %prefix, error = %e, "prefix removal failed, skipping rehydration");
            return PackageManifest { files: Vec::new(), mtime: Utc::now().timestamp() };
        }
    }

    let writes = entries.iter().map(|entry| {
        let raw_key = resolved.key.raw_key(&entry.path);
        async move {
            let exists = store.get_raw(&raw_key).await.ok().flatten().is_some();
            if !exists {
                if let Err(e) = store.put_raw(&raw_key, entry.bytes.clone()).await {
                    warn!(raw_key = %raw_key, error = %e, "file write failed during warmup");
                    return None;
                }
            }
            Some(FileEntry {
                name: entry.path.clone(),
                size: entry.bytes.len() as u64,
                integrity: Some(sri_sha256(&entry.bytes)),
            })
        }
    });
    let files: Vec<FileEntry> = join_all(writes).await.into_iter().flatten().collect();

    let manifest = PackageManifest { files, mtime: Utc::now().timestamp() };
    if let Err(e) = store.set_meta(&prefix, manifest.to_meta()).await {
        warn!(prefix = %prefix, error = %e, "manifest write failed");
    }
    manifest
}

#[cfg(test)]
mod tests {
    use nexus_storage::MemoryStore;

    use super::*;

    fn resolved(ecosystem: Ecosystem, name: &str, version: &str) -> Resolved {
        let key = PackageKey::new(ecosystem, name, version);
        let immutable = key.is_immutable();
        Resolved { key, immutable }
    }

    fn entry(path: &str, bytes: &'static [u8]) -> ArchiveEntry {
        ArchiveEntry {
            path: path.to_string(),
            bytes: Bytes::from_static(bytes),
            declared_size: bytes.len() as u64,
        }
    }

    fn cache_over(store: Arc<MemoryStore>) -> PackageCache {
        PackageCache::new(store, UpstreamClient::new(None).unwrap())
    }

    #[tokio::test]
    async fn hit_serves_stored_bytes_without_upstream() {
        let store = Arc::new(MemoryStore::new());
        store
            .put_raw("cdn/npm/uikit/3.21.0/dist/js/uikit.js", Bytes::from_static(b"uikit"))
            .await
            .unwrap();

        let cache = cache_over(Arc::clone(&store));
        let resolved = resolved(Ecosystem::Npm, "uikit", "3.21.0");
        let bytes = cache.get_file(&resolved, "dist/js/uikit.js").await.unwrap();
        assert_eq!(bytes, Bytes::from_static(b"uikit"));
    }

    #[tokio::test]
    async fn leading_slash_on_path_is_tolerated() {
        let store = Arc::new(MemoryStore::new());
        store.put_raw("cdn/npm/a/1.0.0/index.js", Bytes::from_static(b"x")).await.unwrap();

        let cache = cache_over(Arc::clone(&store));
        let resolved = resolved(Ecosystem::Npm, "a", "1.0.0");
        assert!(cache.get_file(&resolved, "/index.js").await.is_ok());
    }

    #[tokio::test]
    async fn persist_writes_files_then_manifest() {
        let store = MemoryStore::new();
        let resolved = resolved(Ecosystem::Npm, "a", "1.0.0");
        let entries = vec![entry("package.json", b"{}"), entry("dist/index.js", b"export {}")];

        let manifest = persist_entries(&store, &resolved, &entries).await;

        assert_eq!(manifest.files.len(), 2);
        let stored = store.get_raw("cdn/npm/a/1.0.0/dist/index.js").await.unwrap().unwrap();
        assert_eq!(stored, Bytes::from_static(b"export {}"));

        let meta = store.get_meta("cdn/npm/a/1.0.0").await.unwrap().unwrap();
        let committed = PackageManifest::from_meta(&meta).unwrap();
        assert_eq!(committed, manifest);
    }

    #[tokio::test]
    async fn persisted_integrity_matches_stored_bytes() {
        let store = MemoryStore::new();
        let resolved = resolved(Ecosystem::Npm, "a", "1.0.0");
        let entries = vec![entry("index.js", b"console.log(1)")];

        let manifest = persist_entries(&store, &resolved, &entries).await;

        let stored = store.get_raw("cdn/npm/a/1.0.0/index.js").await.unwrap().unwrap();
        let expected = sri_sha256(&stored);
        assert_eq!(manifest.files[0].integrity.as_ref().unwrap(), &expected);
    }

    #[tokio::test]
    async fn immutable_persist_does_not_rewrite_existing_keys() {
        let store = MemoryStore::new();
        store.put_raw("cdn/npm/a/1.0.0/index.js", Bytes::from_static(b"original")).await.unwrap();

        let resolved = resolved(Ecosystem::Npm, "a", "1.0.0");
        let entries = vec![entry("index.js", b"replacement")];
        persist_entries(&store, &resolved, &entries).await;

        // The existing key is left alone; only absent keys are written.
        let stored = store.get_raw("cdn/npm/a/1.0.0/index.js").await.unwrap().unwrap();
        assert_eq!(stored, Bytes::from_static(b"original"));
    }

    #[tokio::test]
    async fn mutable_persist_removes_the_prefix_first() {
        let store = MemoryStore::new();
        store.put_raw("cdn/gh/o/r/main/stale.js", Bytes::from_static(b"old")).await.unwrap();

        let resolved = resolved(Ecosystem::Gh, "o/r", "main");
        assert!(!resolved.immutable);
        let entries = vec![entry("fresh.js", b"new")];
        persist_entries(&store, &resolved, &entries).await;

        assert_eq!(store.get_raw("cdn/gh/o/r/main/stale.js").await.unwrap(), None);
        assert!(store.get_raw("cdn/gh/o/r/main/fresh.js").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn list_serves_committed_manifest_without_upstream() {
        let store = Arc::new(MemoryStore::new());
        let resolved = resolved(Ecosystem::Npm, "uikit", "3.21.0");
        let entries = vec![entry("dist/js/uikit.js", b"uikit")];
        persist_entries(store.as_ref(), &resolved, &entries).await;

        let cache = cache_over(Arc::clone(&store));
        let manifest = cache.list(&resolved).await.unwrap();
        assert_eq!(manifest.files.len(), 1);
        assert_eq!(manifest.files[0].name, "dist/js/uikit.js");
        assert!(!manifest.files[0].name.starts_with('/'));
    }

    #[tokio::test]
    async fn synthetic_entries_roundtrip_through_the_prefix() {
        let store = Arc::new(MemoryStore::new());
        store
            .put_raw("cdn/npm/uikit/3.21.0/+esm", Bytes::from_static(b"export{}"))
            .await
            .unwrap();

        let cache = cache_over(Arc::clone(&store));
        let resolved = resolved(Ecosystem::Npm, "uikit", "3.21.0");
        let hit = cache.get_synthetic(&resolved, "+esm").await;
        assert_eq!(hit, Some(Bytes::from_static(b"export{}")));
        assert_eq!(cache.get_synthetic(&resolved, "+other").await, None);
    }

    #[tokio::test]
    async fn winget_keys_are_not_served_by_this_cache() {
        let store = Arc::new(MemoryStore::new());
        let cache = cache_over(store);
        let resolved = resolved(Ecosystem::Winget, "microsoft/winget-pkgs", "1.0.0");
        let err = cache.get_file(&resolved, "x").await.unwrap_err();
        assert!(matches!(err, CacheError::Unsupported { .. }));
    }
}

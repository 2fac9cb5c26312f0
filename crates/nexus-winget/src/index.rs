//! The layered, read-through WinGet index.
//!
//! Four cache layers, each with a 600-second TTL, all living in the
//! shared key-value store:
//!
//! 1. `registry/winget/<repo>/manifests-sha` — SHA of the `manifests`
//!    tree at the tracked branch.
//! 2. `registry/winget/<repo>/manifests-letters` — the letter map
//!    `[a-z0-9] → tree SHA`, one level deep into the manifests tree.
//! 3. `registry/winget/<repo>/manifests-<letter>` — the flattened path
//!    list of one letter's recursive tree expansion. Paths are stored
//!    repo-absolute; only the list is kept, never the tree objects.
//! 4. `registry/winget/<repo>/index` — the package → versions mapping.
//!
//! Reads of the index are stale-while-revalidate: a fresh value is
//! returned as-is, a stale value is returned immediately while a
//! detached rebuild refreshes it, and an absent value forces a
//! synchronous rebuild. Individual manifest files are cached forever
//! under `registry/winget/<repo>/files/<path>`; the upstream workflow
//! writes new versions into new directories, so a file at a given path
//! is effectively immutable.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use chrono::Utc;
use futures::future::join_all;
use serde::Deserialize;
use serde::Serialize;
use tracing::debug;
use tracing::instrument;
use tracing::warn;

use nexus_storage::KeyValueStore;
use nexus_storage::MetaMap;
use nexus_upstream::UpstreamClient;
use nexus_upstream::UpstreamError;

use crate::error::EmptyTreeSnafu;
use crate::error::Result;
use crate::error::WingetError;
use crate::version::sort_versions_desc;

/// Freshness window for every index layer.
pub const INDEX_TTL: Duration = Duration::from_secs(600);

/// The synthesized package → versions mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageIndex {
    /// Versions per package identifier, newest first.
    pub packages: BTreeMap<String, Vec<String>>,
}

impl PackageIndex {
    /// Record one `(identifier, version)` observation.
    pub fn add(&mut self, id: String, version: String) {
        let versions = self.packages.entry(id).or_default();
        if !versions.contains(&version) {
            versions.push(version);
        }
    }

    /// Sort every package's versions newest-first.
    pub fn sort(&mut self) {
        for versions in self.packages.values_mut() {
            sort_versions_desc(versions);
        }
    }

    /// Versions of one package, when present.
    pub fn versions(&self, id: &str) -> Option<&[String]> {
        self.packages.get(id).map(Vec::as_slice)
    }

    /// Number of packages in the index.
    pub fn len(&self) -> usize {
        self.packages.len()
    }

    /// Whether the index holds no packages.
    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }
}

/// Parse a repo-absolute manifest path into `(identifier, version)`.
///
/// Paths look like `manifests/<letter>/<publisher...>/<name>/<version>/
/// <file>.yaml`; the identifier is the dot-join of every segment between
/// the letter and the version, which handles multi-segment identifiers
/// like `Publisher.Product.Edition`.
pub fn parse_manifest_path(path: &str) -> Option<(String, String)> {
    let rest = path.strip_prefix("manifests/")?;
    let segments: Vec<&str> = rest.split('/').collect();
    // letter + at least one identifier segment + version + file
    if segments.len() < 4 || !segments.last()?.ends_with(".yaml") {
        return None;
    }
    let id_segments = &segments[1..segments.len() - 2];
    if id_segments.is_empty() {
        return None;
    }
    let id = id_segments.join(".");
    let version = segments[segments.len() - 2].to_string();
    Some((id, version))
}

/// Read-through index over the tracked WinGet manifest repository.
///
/// Cheap to clone; clones share the store and the client pool.
#[derive(Clone)]
pub struct WingetIndex {
    store: Arc<dyn KeyValueStore>,
    client: UpstreamClient,
    repo: String,
    branch: String,
}

impl WingetIndex {
    /// Track `repo` (`owner/name`) at `branch` through `store`.
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        client: UpstreamClient,
        repo: impl Into<String>,
        branch: impl Into<String>,
    ) -> Self {
        Self {
            store,
            client,
            repo: repo.into(),
            branch: branch.into(),
        }
    }

    /// The package index, stale-while-revalidate.
    #[instrument(skip(self))]
    pub async fn package_index(&self) -> Result<PackageIndex> {
        if let Some((bytes, age)) = self.read_cached(&self.index_key()).await {
            if let Ok(index) = serde_json::from_slice::<PackageIndex>(&bytes) {
                if age < INDEX_TTL.as_secs() as i64 {
                    return Ok(index);
                }
                debug!(age, "index stale, scheduling rebuild");
                let this = self.clone();
                tokio::spawn(async move {
                    if let Err(e) = this.rebuild_index().await {
                        warn!(error = %e, "background index rebuild failed");
                    }
                });
                return Ok(index);
            }
        }
        self.rebuild_index().await
    }

    /// Rebuild the index from the upstream tree and commit it.
    ///
    /// A single letter's failure drops that letter's packages from this
    /// rebuild but does not fail it; the resulting partial-but-coherent
    /// index is cached and a later fresh rebuild repairs the gap. An
    /// empty letter map fails hard instead, so a transient upstream
    /// hiccup cannot replace a good index with an empty one.
    #[instrument(skip(self))]
    pub async fn rebuild_index(&self) -> Result<PackageIndex> {
        let sha = self.manifests_sha().await?;
        let letters = self.letter_map(&sha).await?;

        let fetches = letters.into_iter().map(|(letter, letter_sha)| async move {
            let paths = self.letter_paths(&letter, &letter_sha).await;
            (letter, paths)
        });

        let mut index = PackageIndex::default();
        for (letter, result) in join_all(fetches).await {
            match result {
                Ok(paths) => {
                    for path in paths.iter().filter(|p| p.ends_with(".yaml")) {
                        if let Some((id, version)) = parse_manifest_path(path) {
                            index.add(id, version);
                        }
                    }
                }
                Err(e) => warn!(letter = %letter, error = %e, "letter fetch failed, dropping from this rebuild"),
            }
        }
        index.sort();

        match serde_json::to_vec(&index) {
            Ok(bytes) => self.write_cached(&self.index_key(), Bytes::from(bytes)).await,
            Err(e) => warn!(error = %e, "index encode failed"),
        }
        debug!(packages = index.len(), "index rebuilt");
        Ok(index)
    }

    /// Raw bytes of one manifest file, cached indefinitely.
    #[instrument(skip(self))]
    pub async fn manifest_file(&self, path: &str) -> Result<Bytes> {
        let key = self.file_key(path);
        if let Ok(Some(bytes)) = self.store.get_raw(&key).await {
            return Ok(bytes);
        }

        let (owner, name) = self.repo_parts();
        let bytes = self
            .client
            .github_raw(owner, name, &self.branch, path)
            .await
            .map_err(|e| match e {
                UpstreamError::NotFound { .. } => WingetError::FileNotFound { path: path.to_string() },
                other => other.into(),
            })?;

        let store = Arc::clone(&self.store);
        let bytes_task = bytes.clone();
        tokio::spawn(async move {
            if let Err(e) = store.put_raw(&key, bytes_task).await {
                warn!(key = %key, error = %e, "manifest file write failed");
            }
        });
        Ok(bytes)
    }

    /// Repo-absolute paths of every manifest file for one package
    /// version.
    #[instrument(skip(self))]
    pub async fn version_manifest_paths(&self, id: &str, version: &str) -> Result<Vec<String>> {
        let letter = match id.chars().next() {
            Some(c) => c.to_ascii_lowercase().to_string(),
            None => return Err(WingetError::PackageNotFound { id: id.to_string() }),
        };

        let sha = self.manifests_sha().await?;
        let letters = self.letter_map(&sha).await?;
        let letter_sha = letters
            .get(&letter)
            .ok_or_else(|| WingetError::PackageNotFound { id: id.to_string() })?;

        let paths = self.letter_paths(&letter, letter_sha).await?;
        let matching: Vec<String> = paths
            .into_iter()
            .filter(|p| {
                parse_manifest_path(p).is_some_and(|(parsed_id, parsed_version)| {
                    parsed_id == id && parsed_version == version
                })
            })
            .collect();

        if matching.is_empty() {
            return Err(WingetError::VersionNotFound {
                id: id.to_string(),
                version: version.to_string(),
            });
        }
        Ok(matching)
    }

    // ---- cache layers ----

    /// Layer 1: SHA of the `manifests` tree at the tracked branch.
    async fn manifests_sha(&self) -> Result<String> {
        let key = self.sha_key();
        if let Some((bytes, age)) = self.read_cached(&key).await {
            if age < INDEX_TTL.as_secs() as i64 {
                if let Ok(sha) = String::from_utf8(bytes.to_vec()) {
                    return Ok(sha);
                }
            }
        }

        let (owner, name) = self.repo_parts();
        let tree = self.client.git_tree(owner, name, &self.branch, false).await?;
        let sha = tree
            .iter()
            .find(|e| e.path == "manifests" && e.is_tree())
            .map(|e| e.sha.clone())
            .ok_or_else(|| EmptyTreeSnafu { repo: &self.repo }.build())?;

        self.write_cached(&key, Bytes::from(sha.clone())).await;
        Ok(sha)
    }

    /// Layer 2: single-character children of the manifests tree.
    ///
    /// Every per-version lookup walks through this layer, so it carries
    /// the same TTL cache as the others; only an empty cached map is
    /// refused (an index must never be built over zero letters).
    async fn letter_map(&self, manifests_sha: &str) -> Result<BTreeMap<String, String>> {
        let key = self.letters_key();
        if let Some((bytes, age)) = self.read_cached(&key).await {
            if age < INDEX_TTL.as_secs() as i64 {
                if let Ok(letters) = serde_json::from_slice::<BTreeMap<String, String>>(&bytes) {
                    if !letters.is_empty() {
                        return Ok(letters);
                    }
                }
            }
        }

        let (owner, name) = self.repo_parts();
        let tree = self.client.git_tree(owner, name, manifests_sha, false).await?;

        let letters: BTreeMap<String, String> = tree
            .into_iter()
            .filter(|e| e.is_tree() && is_letter_bucket(&e.path))
            .map(|e| (e.path, e.sha))
            .collect();

        if letters.is_empty() {
            return EmptyTreeSnafu { repo: &self.repo }.fail();
        }

        match serde_json::to_vec(&letters) {
            Ok(bytes) => self.write_cached(&key, Bytes::from(bytes)).await,
            Err(e) => warn!(error = %e, "letter map encode failed"),
        }
        Ok(letters)
    }

    /// Layer 3: flattened recursive path list of one letter bucket,
    /// canonicalized to repo-absolute paths.
    async fn letter_paths(&self, letter: &str, letter_sha: &str) -> Result<Vec<String>> {
        let key = self.letter_key(letter);
        if let Some((bytes, age)) = self.read_cached(&key).await {
            if age < INDEX_TTL.as_secs() as i64 {
                if let Ok(paths) = serde_json::from_slice::<Vec<String>>(&bytes) {
                    return Ok(paths);
                }
            }
        }

        let (owner, name) = self.repo_parts();
        let tree = self.client.git_tree(owner, name, letter_sha, true).await?;
        let paths: Vec<String> = tree
            .into_iter()
            .filter(|e| e.is_blob())
            .map(|e| format!("manifests/{letter}/{}", e.path))
            .collect();

        match serde_json::to_vec(&paths) {
            Ok(bytes) => self.write_cached(&key, Bytes::from(bytes)).await,
            Err(e) => warn!(letter = %letter, error = %e, "letter path list encode failed"),
        }
        Ok(paths)
    }

    // ---- storage plumbing ----

    async fn read_cached(&self, key: &str) -> Option<(Bytes, i64)> {
        let bytes = self.store.get_raw(key).await.ok().flatten()?;
        let mtime = self
            .store
            .get_meta(key)
            .await
            .ok()
            .flatten()
            .and_then(|meta| meta.get("mtime").and_then(|v| v.as_i64()))?;
        Some((bytes, Utc::now().timestamp() - mtime))
    }

    /// Best-effort cache write: value first, then the freshness stamp.
    async fn write_cached(&self, key: &str, bytes: Bytes) {
        if let Err(e) = self.store.put_raw(key, bytes).await {
            warn!(key = %key, error = %e, "cache write failed");
            return;
        }
        let mut meta = MetaMap::new();
        meta.insert("mtime".to_string(), serde_json::Value::from(Utc::now().timestamp()));
        if let Err(e) = self.store.set_meta(key, meta).await {
            warn!(key = %key, error = %e, "cache stamp failed");
        }
    }

    fn repo_parts(&self) -> (&str, &str) {
        self.repo.split_once('/').unwrap_or((self.repo.as_str(), ""))
    }

    fn sha_key(&self) -> String {
        format!("registry/winget/{}/manifests-sha", self.repo)
    }

    fn letters_key(&self) -> String {
        format!("registry/winget/{}/manifests-letters", self.repo)
    }

    fn letter_key(&self, letter: &str) -> String {
        format!("registry/winget/{}/manifests-{letter}", self.repo)
    }

    fn index_key(&self) -> String {
        format!("registry/winget/{}/index", self.repo)
    }

    fn file_key(&self, path: &str) -> String {
        format!("registry/winget/{}/files/{path}", self.repo)
    }
}

/// Letter buckets are single characters in `[a-z0-9]`.
fn is_letter_bucket(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(
        (chars.next(), chars.next()),
        (Some(c), None) if c.is_ascii_lowercase() || c.is_ascii_digit()
    )
}

#[cfg(test)]
mod tests {
    use nexus_storage::MemoryStore;

    use super::*;

    fn index_over(store: Arc<MemoryStore>) -> WingetIndex {
        WingetIndex::new(
            store,
            UpstreamClient::new(None).unwrap(),
            "microsoft/winget-pkgs",
            "master",
        )
    }

    async fn stamp(store: &MemoryStore, key: &str, mtime: i64) {
        let mut meta = MetaMap::new();
        meta.insert("mtime".to_string(), serde_json::Value::from(mtime));
        store.set_meta(key, meta).await.unwrap();
    }

    #[test]
    fn manifest_paths_parse_to_identifier_and_version() {
        let (id, version) =
            parse_manifest_path("manifests/m/Microsoft/VisualStudioCode/1.85.2/Microsoft.VisualStudioCode.yaml")
                .unwrap();
        assert_eq!(id, "Microsoft.VisualStudioCode");
        assert_eq!(version, "1.85.2");
    }

    #[test]
    fn multi_segment_identifiers_dot_join() {
        let (id, version) = parse_manifest_path(
            "manifests/m/Microsoft/VisualStudio/Community/17.8.0/Microsoft.VisualStudio.Community.installer.yaml",
        )
        .unwrap();
        assert_eq!(id, "Microsoft.VisualStudio.Community");
        assert_eq!(version, "17.8.0");
    }

    #[test]
    fn short_or_foreign_paths_do_not_parse() {
        assert_eq!(parse_manifest_path("manifests/m/README.md"), None);
        assert_eq!(parse_manifest_path("manifests/m/Only/x.yaml"), None);
        assert_eq!(parse_manifest_path("other/m/A/B/1.0/A.B.yaml"), None);
    }

    #[test]
    fn index_adds_and_sorts() {
        let mut index = PackageIndex::default();
        index.add("A.B".to_string(), "1.2.0".to_string());
        index.add("A.B".to_string(), "1.10.0".to_string());
        index.add("A.B".to_string(), "1.2.0".to_string());
        index.sort();
        assert_eq!(index.versions("A.B").unwrap(), ["1.10.0", "1.2.0"]);
    }

    #[test]
    fn letter_buckets_are_single_alnum_chars() {
        assert!(is_letter_bucket("m"));
        assert!(is_letter_bucket("9"));
        assert!(!is_letter_bucket("mm"));
        assert!(!is_letter_bucket("M"));
        assert!(!is_letter_bucket(""));
    }

    #[tokio::test]
    async fn fresh_index_serves_from_cache_without_upstream() {
        let store = Arc::new(MemoryStore::new());
        let mut cached = PackageIndex::default();
        cached.add("Microsoft.VisualStudioCode".to_string(), "1.85.2".to_string());
        let key = "registry/winget/microsoft/winget-pkgs/index";
        store
            .put_raw(key, Bytes::from(serde_json::to_vec(&cached).unwrap()))
            .await
            .unwrap();
        stamp(&store, key, Utc::now().timestamp()).await;

        let index = index_over(Arc::clone(&store)).package_index().await.unwrap();
        assert_eq!(index, cached);
    }

    #[tokio::test]
    async fn stale_index_is_returned_immediately() {
        let store = Arc::new(MemoryStore::new());
        let mut cached = PackageIndex::default();
        cached.add("A.B".to_string(), "1.0".to_string());
        let key = "registry/winget/microsoft/winget-pkgs/index";
        store
            .put_raw(key, Bytes::from(serde_json::to_vec(&cached).unwrap()))
            .await
            .unwrap();
        // Stamped well past the TTL: stale, but still served while the
        // detached rebuild runs (and, in this test, fails offline).
        stamp(&store, key, Utc::now().timestamp() - 10_000).await;

        let index = index_over(Arc::clone(&store)).package_index().await.unwrap();
        assert_eq!(index, cached);
    }

    #[tokio::test]
    async fn cached_manifest_file_skips_upstream() {
        let store = Arc::new(MemoryStore::new());
        let path = "manifests/m/A/B/1.0/A.B.yaml";
        store
            .put_raw(
                "registry/winget/microsoft/winget-pkgs/files/manifests/m/A/B/1.0/A.B.yaml",
                Bytes::from_static(b"PackageIdentifier: A.B\n"),
            )
            .await
            .unwrap();

        let bytes = index_over(Arc::clone(&store)).manifest_file(path).await.unwrap();
        assert_eq!(bytes, Bytes::from_static(b"PackageIdentifier: A.B\n"));
    }

    #[tokio::test]
    async fn cached_sha_layer_is_honored_when_fresh() {
        let store = Arc::new(MemoryStore::new());
        let key = "registry/winget/microsoft/winget-pkgs/manifests-sha";
        store.put_raw(key, Bytes::from_static(b"abc123")).await.unwrap();
        stamp(&store, key, Utc::now().timestamp()).await;

        let sha = index_over(Arc::clone(&store)).manifests_sha().await.unwrap();
        assert_eq!(sha, "abc123");
    }

    #[tokio::test]
    async fn cached_letter_map_is_honored_when_fresh() {
        let store = Arc::new(MemoryStore::new());
        let key = "registry/winget/microsoft/winget-pkgs/manifests-letters";
        let letters: BTreeMap<String, String> =
            [("m".to_string(), "sha-m".to_string()), ("g".to_string(), "sha-g".to_string())]
                .into_iter()
                .collect();
        store
            .put_raw(key, Bytes::from(serde_json::to_vec(&letters).unwrap()))
            .await
            .unwrap();
        stamp(&store, key, Utc::now().timestamp()).await;

        // Offline client: a live tree fetch would error, so success
        // proves the cached layer was used.
        let got = index_over(Arc::clone(&store)).letter_map("ignored-sha").await.unwrap();
        assert_eq!(got, letters);
    }

    #[tokio::test]
    async fn version_lookups_walk_the_cached_layers_without_upstream() {
        let store = Arc::new(MemoryStore::new());
        let now = Utc::now().timestamp();

        let sha_key = "registry/winget/microsoft/winget-pkgs/manifests-sha";
        store.put_raw(sha_key, Bytes::from_static(b"root-sha")).await.unwrap();
        stamp(&store, sha_key, now).await;

        let letters_key = "registry/winget/microsoft/winget-pkgs/manifests-letters";
        let letters: BTreeMap<String, String> = [("m".to_string(), "sha-m".to_string())].into_iter().collect();
        store
            .put_raw(letters_key, Bytes::from(serde_json::to_vec(&letters).unwrap()))
            .await
            .unwrap();
        stamp(&store, letters_key, now).await;

        let paths_key = "registry/winget/microsoft/winget-pkgs/manifests-m";
        let paths = vec![
            "manifests/m/Microsoft/VisualStudioCode/1.85.2/Microsoft.VisualStudioCode.yaml".to_string(),
            "manifests/m/Microsoft/VisualStudioCode/1.85.1/Microsoft.VisualStudioCode.yaml".to_string(),
        ];
        store
            .put_raw(paths_key, Bytes::from(serde_json::to_vec(&paths).unwrap()))
            .await
            .unwrap();
        stamp(&store, paths_key, now).await;

        let found = index_over(Arc::clone(&store))
            .version_manifest_paths("Microsoft.VisualStudioCode", "1.85.2")
            .await
            .unwrap();
        assert_eq!(found, [paths[0].clone()]);
    }
}

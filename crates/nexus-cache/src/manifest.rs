//! Package manifests: the cache's hydration marker.

use serde::Deserialize;
use serde::Serialize;

use nexus_storage::MetaMap;

/// One file of a hydrated package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    /// Path relative to the package root, no leading separator.
    pub name: String,
    /// Decompressed size in bytes.
    pub size: u64,
    /// SRI token (`sha256-<base64>`), present once the bytes have been
    /// persisted with their hash.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub integrity: Option<String>,
}

/// The meta object associated with a hydrated package version.
///
/// Presence of the file list under a package's storage prefix is what
/// marks the package fully hydrated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageManifest {
    /// Every file of the package.
    pub files: Vec<FileEntry>,
    /// Unix seconds at hydration time.
    pub mtime: i64,
}

impl PackageManifest {
    /// Look up one file by its root-relative name.
    pub fn file(&self, name: &str) -> Option<&FileEntry> {
        self.files.iter().find(|f| f.name == name)
    }

    /// The entries whose names start with `prefix` (used for
    /// sub-directory listings).
    pub fn files_under(&self, prefix: &str) -> Vec<&FileEntry> {
        let prefix = prefix.trim_start_matches('/');
        self.files
            .iter()
            .filter(|f| {
                prefix.is_empty()
                    || f.name
                        .strip_prefix(prefix)
                        .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
            })
            .collect()
    }

    /// Encode into a storage metadata map.
    pub fn to_meta(&self) -> MetaMap {
        let mut meta = MetaMap::new();
        meta.insert(
            "files".to_string(),
            serde_json::to_value(&self.files).expect("file entries encode"),
        );
        meta.insert("mtime".to_string(), serde_json::Value::from(self.mtime));
        meta
    }

    /// Decode from a storage metadata map; `None` when the map carries
    /// no file list (the package is not hydrated).
    pub fn from_meta(meta: &MetaMap) -> Option<Self> {
        let files = serde_json::from_value(meta.get("files")?.clone()).ok()?;
        let mtime = meta.get("mtime").and_then(|v| v.as_i64()).unwrap_or(0);
        Some(Self { files, mtime })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manifest() -> PackageManifest {
        PackageManifest {
            files: vec![
                FileEntry { name: "package.json".to_string(), size: 2, integrity: None },
                FileEntry {
                    name: "dist/index.js".to_string(),
                    size: 17,
                    integrity: Some("sha256-abc".to_string()),
                },
                FileEntry { name: "dist/index.css".to_string(), size: 3, integrity: None },
            ],
            mtime: 1_700_000_000,
        }
    }

    #[test]
    fn meta_roundtrip() {
        let original = manifest();
        let decoded = PackageManifest::from_meta(&original.to_meta()).unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn meta_without_files_is_not_hydrated() {
        let mut meta = MetaMap::new();
        meta.insert("mtime".to_string(), serde_json::Value::from(1));
        assert_eq!(PackageManifest::from_meta(&meta), None);
    }

    #[test]
    fn prefix_filter_is_segment_aware() {
        let manifest = manifest();
        let under = manifest.files_under("dist");
        assert_eq!(under.len(), 2);
        // `dist` must not match a `distro/` sibling.
        let none = manifest.files_under("dis");
        assert!(none.is_empty());
        // Empty prefix lists everything.
        assert_eq!(manifest.files_under("").len(), 3);
    }

    #[test]
    fn integrity_absent_entries_serialize_without_the_field() {
        let json = serde_json::to_value(&manifest().files[0]).unwrap();
        assert!(json.get("integrity").is_none());
    }
}

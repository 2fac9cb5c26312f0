//! The key-value contract the gateway core requires of its storage.

use std::collections::BTreeMap;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::Result;

/// Metadata attached to a key: a flat JSON object.
///
/// Stored and merged as a whole; individual values are opaque to the
/// back-end.
pub type MetaMap = BTreeMap<String, serde_json::Value>;

/// Minimal key-value contract over opaque byte blobs keyed by string.
///
/// No ordering or transaction guarantees are made across keys. `put_raw`
/// must be atomic with respect to concurrent `get_raw` on the same key;
/// last-writer-wins on concurrent same-key puts is acceptable because the
/// gateway only ever writes byte-identical duplicates.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Fetch the bytes stored at `key`, or `None` if absent.
    async fn get_raw(&self, key: &str) -> Result<Option<Bytes>>;

    /// Store `bytes` at `key`, replacing any previous value.
    async fn put_raw(&self, key: &str, bytes: Bytes) -> Result<()>;

    /// Remove `prefix` and every key below it.
    ///
    /// "Below" means the key itself, plus all keys starting with
    /// `prefix` followed by `/`. Removes both raw values and metadata.
    async fn remove(&self, prefix: &str) -> Result<()>;

    /// Fetch the metadata object attached to `key`, or `None` if absent.
    async fn get_meta(&self, key: &str) -> Result<Option<MetaMap>>;

    /// Merge `meta` into the metadata object attached to `key`.
    ///
    /// Keys present in `meta` replace existing entries; keys absent from
    /// `meta` are left untouched.
    async fn set_meta(&self, key: &str, meta: MetaMap) -> Result<()>;
}

/// Whether `key` lies at or below `prefix` in the key hierarchy.
pub(crate) fn key_under_prefix(key: &str, prefix: &str) -> bool {
    key == prefix || (key.starts_with(prefix) && key.as_bytes().get(prefix.len()) == Some(&b'/'))
}

//! In-memory storage back-end.

use std::collections::BTreeMap;
use std::sync::RwLock;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::Result;
use crate::store::KeyValueStore;
use crate::store::MetaMap;
use crate::store::key_under_prefix;

/// Process-local key-value store.
///
/// Default back-end for development and the test double for every
/// component that takes a [`KeyValueStore`]. Contents do not survive the
/// process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Maps>,
}

#[derive(Debug, Default)]
struct Maps {
    raw: BTreeMap<String, Bytes>,
    meta: BTreeMap<String, MetaMap>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of raw keys currently stored.
    pub fn len(&self) -> usize {
        self.inner.read().expect("storage lock poisoned").raw.len()
    }

    /// Whether no raw keys are stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get_raw(&self, key: &str) -> Result<Option<Bytes>> {
        let maps = self.inner.read().expect("storage lock poisoned");
        Ok(maps.raw.get(key).cloned())
    }

    async fn put_raw(&self, key: &str, bytes: Bytes) -> Result<()> {
        let mut maps = self.inner.write().expect("storage lock poisoned");
        maps.raw.insert(key.to_string(), bytes);
        Ok(())
    }

    async fn remove(&self, prefix: &str) -> Result<()> {
        let mut maps = self.inner.write().expect("storage lock poisoned");
        maps.raw.retain(|k, _| !key_under_prefix(k, prefix));
        maps.meta.retain(|k, _| !key_under_prefix(k, prefix));
        Ok(())
    }

    async fn get_meta(&self, key: &str) -> Result<Option<MetaMap>> {
        let maps = self.inner.read().expect("storage lock poisoned");
        Ok(maps.meta.get(key).cloned())
    }

    async fn set_meta(&self, key: &str, meta: MetaMap) -> Result<()> {
        let mut maps = self.inner.write().expect("storage lock poisoned");
        maps.meta.entry(key.to_string()).or_default().extend(meta);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(pairs: &[(&str, serde_json::Value)]) -> MetaMap {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    #[tokio::test]
    async fn put_then_get_roundtrip() {
        let store = MemoryStore::new();
        store.put_raw("cdn/npm/a/1.0.0/index.js", Bytes::from_static(b"x")).await.unwrap();

        let got = store.get_raw("cdn/npm/a/1.0.0/index.js").await.unwrap();
        assert_eq!(got, Some(Bytes::from_static(b"x")));
        assert_eq!(store.get_raw("cdn/npm/a/1.0.0/other.js").await.unwrap(), None);
    }

    #[tokio::test]
    async fn remove_clears_prefix_subtree() {
        let store = MemoryStore::new();
        store.put_raw("cdn/npm/a/1.0.0/index.js", Bytes::from_static(b"x")).await.unwrap();
        store.put_raw("cdn/npm/a/1.0.0/lib/util.js", Bytes::from_static(b"y")).await.unwrap();
        store.put_raw("cdn/npm/ab/1.0.0/index.js", Bytes::from_static(b"z")).await.unwrap();
        store.set_meta("cdn/npm/a/1.0.0", meta(&[("files", serde_json::json!([]))])).await.unwrap();

        store.remove("cdn/npm/a/1.0.0").await.unwrap();

        assert_eq!(store.get_raw("cdn/npm/a/1.0.0/index.js").await.unwrap(), None);
        assert_eq!(store.get_raw("cdn/npm/a/1.0.0/lib/util.js").await.unwrap(), None);
        assert_eq!(store.get_meta("cdn/npm/a/1.0.0").await.unwrap(), None);
        // Sibling with a shared string prefix survives.
        assert!(store.get_raw("cdn/npm/ab/1.0.0/index.js").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn set_meta_merges_keys() {
        let store = MemoryStore::new();
        store.set_meta("k", meta(&[("a", serde_json::json!(1)), ("b", serde_json::json!(2))])).await.unwrap();
        store.set_meta("k", meta(&[("b", serde_json::json!(3))])).await.unwrap();

        let got = store.get_meta("k").await.unwrap().unwrap();
        assert_eq!(got.get("a"), Some(&serde_json::json!(1)));
        assert_eq!(got.get("b"), Some(&serde_json::json!(3)));
    }

    #[tokio::test]
    async fn overwrite_is_last_writer_wins() {
        let store = MemoryStore::new();
        store.put_raw("k", Bytes::from_static(b"one")).await.unwrap();
        store.put_raw("k", Bytes::from_static(b"two")).await.unwrap();
        assert_eq!(store.get_raw("k").await.unwrap(), Some(Bytes::from_static(b"two")));
    }
}

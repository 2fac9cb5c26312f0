//! Application state shared across all HTTP handlers.

use std::sync::Arc;

use nexus_cache::PackageCache;
use nexus_resolver::Resolver;
use nexus_storage::FsStore;
use nexus_storage::KeyValueStore;
use nexus_storage::MemoryStore;
use nexus_upstream::UpstreamClient;
use nexus_winget::WingetIndex;

use crate::config::NexusConfig;
use crate::config::StorageBackend;

/// Shared application state passed to every Axum handler.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<StateInner>,
}

struct StateInner {
    client: UpstreamClient,
    resolver: Resolver,
    cache: PackageCache,
    winget: WingetIndex,
}

impl AppState {
    /// Wire up the full component graph from configuration.
    pub fn from_config(config: &NexusConfig) -> anyhow::Result<Self> {
        let store: Arc<dyn KeyValueStore> = match &config.storage.backend {
            StorageBackend::Memory => Arc::new(MemoryStore::new()),
            StorageBackend::Fs { path } => Arc::new(FsStore::new(path)),
        };
        let client = UpstreamClient::new(config.upstream.github_token.clone())?;
        Ok(Self::new(store, client, &config.winget.repo, &config.winget.branch))
    }

    /// Wire up state over an explicit store and client (used by tests).
    pub fn new(store: Arc<dyn KeyValueStore>, client: UpstreamClient, winget_repo: &str, winget_branch: &str) -> Self {
        let resolver = Resolver::new(client.clone());
        let cache = PackageCache::new(Arc::clone(&store), client.clone());
        let winget = WingetIndex::new(store, client.clone(), winget_repo, winget_branch);

        AppState {
            inner: Arc::new(StateInner {
                client,
                resolver,
                cache,
                winget,
            }),
        }
    }

    /// The shared upstream client.
    pub fn client(&self) -> &UpstreamClient {
        &self.inner.client
    }

    /// The version resolver.
    pub fn resolver(&self) -> &Resolver {
        &self.inner.resolver
    }

    /// The package cache.
    pub fn cache(&self) -> &PackageCache {
        &self.inner.cache
    }

    /// The WinGet index.
    pub fn winget(&self) -> &WingetIndex {
        &self.inner.winget
    }
}

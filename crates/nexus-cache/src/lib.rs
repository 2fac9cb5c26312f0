//! The tarball-backed package cache.
//!
//! A request for a single file triggers on-demand hydration of the whole
//! versioned artifact: the upstream tarball is pulled once, the requested
//! entry is returned to the caller as soon as the extraction pass reaches
//! it, and the rest of the package is persisted by a detached warmup task
//! that outlives the response.
//!
//! # Commit point
//!
//! The package manifest (file list + timestamp, stored as metadata on the
//! package's storage prefix) is written last and is the single source of
//! truth for "this package is hydrated". A reader that observes a
//! manifest may assume every listed file has a corresponding raw key; if
//! the back-end lost one anyway, the miss path repairs it with a fresh
//! upstream pull.
//!
//! # Mutable keys
//!
//! For keys whose version can alias to different bytes over time
//! (`latest`-resolved aliases, branches, `trunk`), the warmup removes the
//! whole storage prefix before writing, so readers see either the
//! previous complete manifest or a freshly built one, never a mix.
//!
//! # Concurrency
//!
//! There is no per-key singleflight barrier. Concurrent misses for the
//! same key each pull the tarball; the duplicate work is accepted because
//! the written bytes are identical and same-key puts are idempotent.
//! Storage failures degrade to cache misses on reads and best-effort
//! drops on writes; they never fail a user request that has another
//! source of bytes.

pub mod cache;
pub mod error;
pub mod manifest;

pub use cache::PackageCache;
pub use error::CacheError;
pub use error::Result;
pub use manifest::FileEntry;
pub use manifest::PackageManifest;

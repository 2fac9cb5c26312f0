//! Storage back-ends for the Nexus gateway.
//!
//! This crate defines the narrow key-value contract the gateway core
//! requires of whatever storage is configured, plus two back-ends:
//!
//! 1. **Memory** ([`MemoryStore`]): a process-local map. Default for
//!    development and the test double everywhere else.
//!
//! 2. **Filesystem** ([`FsStore`]): keys map to files under a root
//!    directory, metadata lives in a JSON sidecar per key.
//!
//! # Contract
//!
//! The interface is intentionally tiny so any object store, embedded KV,
//! or filesystem can back it. There are no transactions and no ordering
//! guarantees across keys; the gateway core is designed so no cross-key
//! invariant is required for correctness. A package's manifest metadata
//! is the single source of truth for "this package is hydrated", and its
//! write is the commit point.
//!
//! ## Failure semantics
//!
//! Every operation fails with [`StorageError::Unavailable`] on transport
//! error. Callers in the gateway treat read failures as cache misses and
//! write failures as best-effort drops: background warming must never
//! fail a user request.

pub mod error;
pub mod fs;
pub mod memory;
pub mod store;

pub use error::Result;
pub use error::StorageError;
pub use fs::FsStore;
pub use memory::MemoryStore;
pub use store::KeyValueStore;
pub use store::MetaMap;

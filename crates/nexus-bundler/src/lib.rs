//! The ESM transform behind the `+esm` virtual path.
//!
//! A pure, in-memory transformation over a package's already-cached
//! files: the entry module is read from a virtual filesystem, its
//! relative imports are resolved within that filesystem and rewritten to
//! absolute CDN paths, and every bare import is rewritten to
//! `/cdn/npm/<dep>@<resolved>/+esm` — or the unversioned path when the
//! dependency does not appear in the package manifest. Dependency
//! ranges are pinned to concrete versions without a registry round-trip
//! by the range-upper-bound heuristic in [`deps::pin_version`].
//!
//! The output is a single JavaScript module in which every import target
//! begins with `/`, `.`, `http:` or `https:`. Correctness of the
//! bundled code beyond faithful dependency rewiring is the client's
//! problem once the rewrite is done.

pub mod deps;
pub mod error;
pub mod rewrite;
pub mod vfs;

pub use deps::package_dependencies;
pub use deps::pin_version;
pub use error::BundleError;
pub use error::Result;
pub use rewrite::bundle_entry;
pub use rewrite::rewrite_imports;
pub use vfs::VirtualFs;

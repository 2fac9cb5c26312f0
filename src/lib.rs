//! Nexus: a universal package-registry gateway and content-delivery
//! front.
//!
//! Nexus unifies access to heterogeneous software-distribution sources
//! (npm, JSR, cdnjs, GitHub, WordPress SVN, the WinGet community
//! repository, and a table of generic mirrored upstreams) behind a
//! single HTTP surface: fetch a file, list a directory, search a
//! catalog, or proxy a request.
//!
//! The heavy lifting lives in the member crates (`nexus-cache`,
//! `nexus-resolver`, `nexus-winget`, ...); this crate carries the HTTP
//! surface: the router, the request handlers, shared state, and
//! configuration.

pub mod config;
pub mod content_type;
pub mod error;
pub mod handlers;
pub mod server;
pub mod state;

pub use config::NexusConfig;
pub use server::router::build_router;
pub use state::AppState;

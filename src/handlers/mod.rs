//! HTTP request handlers, one module per API surface.

pub mod cdn;
pub mod cdn_path;
pub mod docs;
pub mod health;
pub mod mirror;
pub mod winget;

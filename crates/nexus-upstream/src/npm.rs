//! npm registry payload shapes.
//!
//! Packuments arrive as schemaless JSON; the fields the gateway actually
//! consumes are decoded into typed structs here and everything else is
//! dropped at the boundary.

use std::collections::BTreeMap;

use serde::Deserialize;

/// The subset of an npm packument the gateway reads.
#[derive(Debug, Clone, Deserialize)]
pub struct Packument {
    /// Published versions keyed by version string.
    #[serde(default)]
    pub versions: BTreeMap<String, NpmVersion>,
    /// Dist tags (`latest`, `next`, ...).
    #[serde(rename = "dist-tags", default)]
    pub dist_tags: BTreeMap<String, String>,
}

/// Per-version metadata from a packument.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NpmVersion {
    /// Tarball location.
    #[serde(default)]
    pub dist: Dist,
    /// `browser` entry point, when a string. Object forms are dropped.
    #[serde(default, deserialize_with = "string_or_none")]
    pub browser: Option<String>,
    /// `main` entry point.
    #[serde(default)]
    pub main: Option<String>,
    /// `module` entry point.
    #[serde(default)]
    pub module: Option<String>,
    /// `exports` field, kept raw: string vs object is narrowed by the
    /// entry-file selector.
    #[serde(default)]
    pub exports: Option<serde_json::Value>,
    /// Runtime dependencies.
    #[serde(default)]
    pub dependencies: BTreeMap<String, String>,
    /// Peer dependencies.
    #[serde(rename = "peerDependencies", default)]
    pub peer_dependencies: BTreeMap<String, String>,
}

/// Distribution pointers for one published version.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Dist {
    /// Tarball URL.
    #[serde(default)]
    pub tarball: String,
}

/// Decode a field that is a string in most packuments but occasionally an
/// object (the `browser` replacement map). Objects decode to `None`.
fn string_or_none<'de, D>(de: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(de)?;
    Ok(value.as_str().map(str::to_string))
}

impl Packument {
    /// All published version strings, in packument order.
    pub fn version_strings(&self) -> Vec<String> {
        self.versions.keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_minimal_packument() {
        let json = serde_json::json!({
            "dist-tags": { "latest": "2.0.0" },
            "versions": {
                "1.0.0": { "dist": { "tarball": "https://registry.npmjs.org/a/-/a-1.0.0.tgz" }, "main": "index.js" },
                "2.0.0": { "dist": { "tarball": "https://registry.npmjs.org/a/-/a-2.0.0.tgz" } }
            }
        });
        let packument: Packument = serde_json::from_value(json).unwrap();
        assert_eq!(packument.dist_tags.get("latest").unwrap(), "2.0.0");
        assert_eq!(packument.versions.len(), 2);
        assert_eq!(packument.versions["1.0.0"].main.as_deref(), Some("index.js"));
    }

    #[test]
    fn browser_object_form_is_dropped() {
        let json = serde_json::json!({
            "versions": {
                "1.0.0": { "browser": { "./lib/node.js": "./lib/browser.js" } }
            }
        });
        let packument: Packument = serde_json::from_value(json).unwrap();
        assert_eq!(packument.versions["1.0.0"].browser, None);
    }

    #[test]
    fn browser_string_form_is_kept() {
        let json = serde_json::json!({
            "versions": { "1.0.0": { "browser": "dist/web.js" } }
        });
        let packument: Packument = serde_json::from_value(json).unwrap();
        assert_eq!(packument.versions["1.0.0"].browser.as_deref(), Some("dist/web.js"));
    }

    #[test]
    fn exports_kept_raw_for_later_narrowing() {
        let json = serde_json::json!({
            "versions": { "1.0.0": { "exports": { ".": { "default": "./mod.ts" } } } }
        });
        let packument: Packument = serde_json::from_value(json).unwrap();
        assert!(packument.versions["1.0.0"].exports.as_ref().unwrap().is_object());
    }
}

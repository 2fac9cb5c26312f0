//! Import rewiring over the entry module.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Captures;
use regex::Regex;
use tracing::debug;

use crate::deps::package_dependencies;
use crate::deps::pin_version;
use crate::error::EntryNotFoundSnafu;
use crate::error::Result;
use crate::vfs::VirtualFs;

/// `import ... from "x"` and `export ... from "x"`.
static FROM_IMPORT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\b(import|export)(\s[^'";]*?from\s*)(['"])([^'"]+)(['"])"#).expect("static regex")
});

/// Side-effect imports: `import "x"`.
static BARE_IMPORT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\bimport\s*(['"])([^'"]+)(['"])"#).expect("static regex"));

/// Dynamic imports: `import("x")`.
static DYNAMIC_IMPORT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\bimport\(\s*(['"])([^'"]+)(['"])\s*\)"#).expect("static regex"));

/// Transform a package's entry module for the `+esm` virtual path.
///
/// Relative imports are resolved against the package's cached files and
/// rewritten to absolute CDN paths; bare imports are rewritten to
/// `+esm` paths pinned by the package's dependency ranges. The result
/// contains no bare specifiers.
pub fn bundle_entry(package: &str, version: &str, entry: &str, vfs: &VirtualFs) -> Result<String> {
    let entry = entry.trim_start_matches('/');
    let entry_path = vfs
        .resolve("", &format!("./{entry}"))
        .ok_or_else(|| EntryNotFoundSnafu { path: entry }.build())?;
    let source = vfs.get(&entry_path).ok_or_else(|| EntryNotFoundSnafu { path: entry }.build())?;

    let deps = vfs.get("package.json").map(package_dependencies).unwrap_or_default();
    let importer_dir = entry_path.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("");

    debug!(package, version, entry = entry_path.as_str(), deps = deps.len(), "bundling entry module");
    Ok(rewrite_imports(source, package, version, importer_dir, vfs, &deps))
}

/// Rewrite every import specifier in `source`.
pub fn rewrite_imports(
    source: &str,
    package: &str,
    version: &str,
    importer_dir: &str,
    vfs: &VirtualFs,
    deps: &BTreeMap<String, String>,
) -> String {
    let rewrite = |spec: &str| rewrite_specifier(spec, package, version, importer_dir, vfs, deps);

    let source = FROM_IMPORT.replace_all(source, |caps: &Captures<'_>| {
        format!("{}{}{}{}{}", &caps[1], &caps[2], &caps[3], rewrite(&caps[4]), &caps[5])
    });
    let source = DYNAMIC_IMPORT.replace_all(&source, |caps: &Captures<'_>| {
        format!("import({}{}{})", &caps[1], rewrite(&caps[2]), &caps[3])
    });
    let source = BARE_IMPORT.replace_all(&source, |caps: &Captures<'_>| {
        format!("import {}{}{}", &caps[1], rewrite(&caps[2]), &caps[3])
    });
    source.into_owned()
}

fn rewrite_specifier(
    spec: &str,
    package: &str,
    version: &str,
    importer_dir: &str,
    vfs: &VirtualFs,
    deps: &BTreeMap<String, String>,
) -> String {
    if spec.starts_with("http:") || spec.starts_with("https:") {
        return spec.to_string();
    }

    if spec.starts_with("./") || spec.starts_with("../") || spec.starts_with("/virtual/") {
        return match vfs.resolve(importer_dir, spec) {
            Some(resolved) => format!("/cdn/npm/{package}@{version}/{resolved}"),
            // Unresolvable relative specifier: left as-is, still rooted.
            None => spec.to_string(),
        };
    }

    if spec.starts_with('/') {
        return spec.to_string();
    }

    let bare = spec.strip_prefix("node:").unwrap_or(spec);
    let (dep, subpath) = split_bare(bare);
    let pinned = deps.get(dep).and_then(|range| pin_version(range));

    let base = match pinned {
        Some(version) => format!("/cdn/npm/{dep}@{version}"),
        None => format!("/cdn/npm/{dep}"),
    };
    match subpath {
        Some(subpath) => format!("{base}/{subpath}/+esm"),
        None => format!("{base}/+esm"),
    }
}

/// Split a bare specifier into its package name and optional subpath.
/// Scoped names keep both of their leading segments.
fn split_bare(spec: &str) -> (&str, Option<&str>) {
    let segments: Vec<&str> = spec.splitn(3, '/').collect();
    if spec.starts_with('@') {
        match segments.len() {
            3 => {
                let name_len = segments[0].len() + 1 + segments[1].len();
                (&spec[..name_len], Some(segments[2]))
            }
            _ => (spec, None),
        }
    } else {
        match spec.split_once('/') {
            Some((name, subpath)) => (name, Some(subpath)),
            None => (spec, None),
        }
    }
}

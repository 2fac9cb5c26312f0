//! Dependency extraction and range pinning.

use std::collections::BTreeMap;

use semver::Comparator;
use semver::Op;
use semver::VersionReq;
use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
struct PackageJson {
    #[serde(default)]
    dependencies: BTreeMap<String, String>,
    #[serde(rename = "peerDependencies", default)]
    peer_dependencies: BTreeMap<String, String>,
}

/// Extract the dependency ranges of a package, dependencies and
/// peer-dependencies merged (a peer listed under both keeps the
/// `dependencies` range).
pub fn package_dependencies(package_json: &str) -> BTreeMap<String, String> {
    let parsed: PackageJson = serde_json::from_str(package_json).unwrap_or_default();
    let mut merged = parsed.peer_dependencies;
    merged.extend(parsed.dependencies);
    merged
}

/// Pin a dependency range to a concrete version without a registry
/// round-trip.
///
/// Prefers the range's declared upper bound stepped down by one
/// (`<2.0.0` pins `1`, `<1.3.0` pins `1.2`), and falls back to the
/// range's minimum version otherwise (`^1.2.3` pins `1.2.3`). Returns
/// `None` for ranges carrying no usable version at all (`*`, `latest`),
/// in which case the import is rewritten unversioned.
pub fn pin_version(range: &str) -> Option<String> {
    let range = range.trim();
    if range.is_empty() || range == "*" || range == "latest" {
        return None;
    }
    let req = VersionReq::parse(&normalize_range(range)).ok()?;

    if let Some(pinned) = req.comparators.iter().find_map(upper_bound_pin) {
        return Some(pinned);
    }
    req.comparators.iter().find_map(minimum_pin)
}

/// For an explicit upper bound, the version one step below it.
fn upper_bound_pin(c: &Comparator) -> Option<String> {
    match c.op {
        Op::LessEq => Some(render(c)),
        Op::Less => {
            match (c.minor, c.patch) {
                // `<2.0.0` and `<2` step down to the previous major.
                (Some(0) | None, Some(0) | None) => {
                    (c.major > 0).then(|| (c.major - 1).to_string())
                }
                // `<1.3.0` steps down to the previous minor.
                (Some(minor), Some(0) | None) => {
                    Some(format!("{}.{}", c.major, minor.saturating_sub(1)))
                }
                (Some(minor), Some(patch)) => {
                    Some(format!("{}.{}.{}", c.major, minor, patch.saturating_sub(1)))
                }
                (None, Some(_)) => None,
            }
        }
        _ => None,
    }
}

/// For lower-bounded shapes (`^`, `~`, `>=`, `=`, bare), the minimum.
fn minimum_pin(c: &Comparator) -> Option<String> {
    match c.op {
        Op::Caret | Op::Tilde | Op::Exact | Op::GreaterEq | Op::Wildcard => Some(render(c)),
        _ => None,
    }
}

/// Rewrite an npm-style range into the comma-separated comparator form
/// `VersionReq` parses: the first `||` alternative is kept, hyphen
/// ranges expand, and whitespace-separated comparators gain commas.
fn normalize_range(range: &str) -> String {
    let first = range.split("||").next().unwrap_or(range).trim();
    if let Some((lo, hi)) = first.split_once(" - ") {
        return format!(">={}, <={}", lo.trim(), hi.trim());
    }
    first.split_whitespace().collect::<Vec<_>>().join(", ")
}

fn render(c: &Comparator) -> String {
    match (c.minor, c.patch) {
        (Some(minor), Some(patch)) => format!("{}.{}.{}", c.major, minor, patch),
        (Some(minor), None) => format!("{}.{}", c.major, minor),
        _ => c.major.to_string(),
    }
}

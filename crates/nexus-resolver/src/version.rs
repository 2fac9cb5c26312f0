//! Pure version-picking over an upstream's published version set.

use std::collections::BTreeMap;

use semver::Version;
use semver::VersionReq;

/// Pick the concrete version a specifier resolves to.
///
/// The algorithm is the same across ecosystems, only the metadata source
/// differs:
///
/// 1. A spec that is itself a published version passes through.
/// 2. Otherwise the spec is read as a semver range (`18`, `^1.2`,
///    `v3.4.0`) and the highest satisfying published version wins.
/// 3. Otherwise the `latest` dist-tag, when the metadata offers one.
/// 4. Otherwise the highest published version by semver order.
///
/// Returns `None` when the version set offers nothing at all.
pub fn pick_version(
    versions: &[String],
    dist_tags: &BTreeMap<String, String>,
    spec: Option<&str>,
) -> Option<String> {
    let spec = spec.unwrap_or("").trim();

    if !spec.is_empty() {
        if versions.iter().any(|v| v == spec) {
            return Some(spec.to_string());
        }
        if let Some(found) = max_satisfying(versions, spec) {
            return Some(found);
        }
    }

    if let Some(latest) = dist_tags.get("latest") {
        return Some(latest.clone());
    }

    highest(versions)
}

/// Highest published version satisfying `spec` under semver range
/// semantics, or `None` when the spec is not a range or nothing matches.
fn max_satisfying(versions: &[String], spec: &str) -> Option<String> {
    let spec = spec.strip_prefix('v').unwrap_or(spec);
    let req = VersionReq::parse(&normalize_range(spec)).ok()?;

    versions
        .iter()
        .filter_map(|raw| parse_lenient(raw).map(|parsed| (parsed, raw)))
        .filter(|(parsed, _)| req.matches(parsed))
        .max_by(|a, b| a.0.cmp(&b.0))
        .map(|(_, raw)| raw.clone())
}

/// Highest published version by semver order, ignoring unparseable
/// entries.
fn highest(versions: &[String]) -> Option<String> {
    versions
        .iter()
        .filter_map(|raw| parse_lenient(raw).map(|parsed| (parsed, raw)))
        .max_by(|a, b| a.0.cmp(&b.0))
        .map(|(_, raw)| raw.clone())
}

/// Parse a published version string, tolerating a leading `v`.
fn parse_lenient(raw: &str) -> Option<Version> {
    Version::parse(raw.strip_prefix('v').unwrap_or(raw)).ok()
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

#[cfg(test)]
mod tests {
    use super::*;

    fn versions(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn tags(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn exact_published_version_passes_through() {
        let published = versions(&["1.0.0", "2.0.0"]);
        assert_eq!(pick_version(&published, &tags(&[]), Some("1.0.0")).unwrap(), "1.0.0");
    }

    #[test]
    fn partial_spec_resolves_as_range() {
        let published = versions(&["17.0.2", "18.2.0", "18.3.1", "19.0.0"]);
        assert_eq!(pick_version(&published, &tags(&[]), Some("18")).unwrap(), "18.3.1");
        assert_eq!(pick_version(&published, &tags(&[]), Some("^18.2")).unwrap(), "18.3.1");
    }

    #[test]
    fn caret_range_respects_major_boundary() {
        let published = versions(&["1.2.0", "1.9.3", "2.0.0"]);
        assert_eq!(pick_version(&published, &tags(&[]), Some("^1.2")).unwrap(), "1.9.3");
    }

    #[test]
    fn leading_v_spec_matches_v_tags() {
        let published = versions(&["v3.3.9", "v3.4.0"]);
        assert_eq!(pick_version(&published, &tags(&[]), Some("v3.4.0")).unwrap(), "v3.4.0");
        assert_eq!(pick_version(&published, &tags(&[]), Some("3")).unwrap(), "v3.4.0");
    }

    #[test]
    fn compound_npm_ranges_resolve() {
        let published = versions(&["1.2.0", "1.8.0", "2.1.0"]);
        assert_eq!(pick_version(&published, &tags(&[]), Some(">=1.2 <2")).unwrap(), "1.8.0");
    }

    #[test]
    fn alias_falls_through_to_latest_tag() {
        let published = versions(&["1.0.0", "2.0.0"]);
        let dist_tags = tags(&[("latest", "1.0.0")]);
        assert_eq!(pick_version(&published, &dist_tags, Some("latest")).unwrap(), "1.0.0");
        assert_eq!(pick_version(&published, &dist_tags, None).unwrap(), "1.0.0");
    }

    #[test]
    fn no_tag_falls_through_to_highest() {
        let published = versions(&["1.0.0", "10.0.0", "2.0.0"]);
        assert_eq!(pick_version(&published, &tags(&[]), None).unwrap(), "10.0.0");
    }

    #[test]
    fn empty_version_set_yields_nothing() {
        assert_eq!(pick_version(&[], &tags(&[]), Some("1.0.0")), None);
        assert_eq!(pick_version(&[], &tags(&[]), None), None);
    }

    #[test]
    fn resolution_is_idempotent() {
        let published = versions(&["17.0.2", "18.3.1"]);
        let first = pick_version(&published, &tags(&[]), Some("18")).unwrap();
        let second = pick_version(&published, &tags(&[]), Some(&first)).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn unparseable_published_versions_are_skipped() {
        let published = versions(&["not-a-version", "1.2.3"]);
        assert_eq!(pick_version(&published, &tags(&[]), None).unwrap(), "1.2.3");
    }
}

//! WinGet version ordering.
//!
//! WinGet versions are dotted strings that are usually numeric
//! (`1.85.2`, `2024.11.0`) but not guaranteed to be semver. Segments
//! compare numerically when both sides parse, lexicographically
//! otherwise, and a version with more segments sorts after its prefix
//! (`1.2.1` > `1.2`).

use std::cmp::Ordering;

/// Sort versions newest-first, in place.
pub fn sort_versions_desc(versions: &mut [String]) {
    versions.sort_by(|a, b| compare_versions(b, a));
}

/// Compare two dotted version strings.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let mut left = a.split('.');
    let mut right = b.split('.');

    loop {
        match (left.next(), right.next()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) => {
                let ord = match (x.parse::<u64>(), y.parse::<u64>()) {
                    (Ok(xn), Ok(yn)) => xn.cmp(&yn),
                    _ => x.cmp(y),
                };
                if ord != Ordering::Equal {
                    return ord;
                }
            }
        }
    }
}

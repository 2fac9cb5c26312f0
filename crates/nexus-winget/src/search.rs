//! Match functions for `manifestSearch`.

use regex::RegexBuilder;
use serde::Deserialize;
use serde::Serialize;

/// How a search keyword is matched against a package identifier.
///
/// Matching is performed over the `PackageIdentifier` string only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchType {
    /// Lower-cased string equality.
    Exact,
    /// Substring match on lower-cased strings.
    #[default]
    CaseInsensitive,
    /// Prefix match on lower-cased strings.
    StartsWith,
    /// Substring match on lower-cased strings.
    Substring,
    /// Case-insensitive anchored regex where `*` means `.*`.
    Wildcard,
    /// Keyword characters appear in order anywhere in the string.
    Fuzzy,
    /// Some whitespace-delimited word of the string matches fuzzily.
    FuzzySubstring,
}

impl MatchType {
    /// Whether `target` matches `keyword` under this match type.
    pub fn is_match(self, keyword: &str, target: &str) -> bool {
        let keyword_lower = keyword.to_lowercase();
        let target_lower = target.to_lowercase();
        match self {
            MatchType::Exact => target_lower == keyword_lower,
            MatchType::CaseInsensitive | MatchType::Substring => target_lower.contains(&keyword_lower),
            MatchType::StartsWith => target_lower.starts_with(&keyword_lower),
            MatchType::Wildcard => wildcard_match(keyword, target),
            MatchType::Fuzzy => is_subsequence(&keyword_lower, &target_lower),
            MatchType::FuzzySubstring => target_lower
                .split_whitespace()
                .any(|word| is_subsequence(&keyword_lower, word)),
        }
    }
}

/// Anchored, case-insensitive wildcard match: `*` becomes `.*`, every
/// other character is literal.
fn wildcard_match(pattern: &str, target: &str) -> bool {
    let mut regex = String::with_capacity(pattern.len() + 8);
    regex.push('^');
    for ch in pattern.chars() {
        if ch == '*' {
            regex.push_str(".*");
        } else {
            regex.push_str(&regex::escape(&ch.to_string()));
        }
    }
    regex.push('$');

    RegexBuilder::new(&regex)
        .case_insensitive(true)
        .build()
        .map(|re| re.is_match(target))
        .unwrap_or(false)
}

/// Whether the characters of `needle` appear in `haystack` in order,
/// not necessarily contiguously.
fn is_subsequence(needle: &str, haystack: &str) -> bool {
    let mut chars = haystack.chars();
    needle.chars().all(|n| chars.any(|h| h == n))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_is_case_blind_equality() {
        assert!(MatchType::Exact.is_match("microsoft.vscode", "Microsoft.VSCode"));
        assert!(!MatchType::Exact.is_match("vscode", "Microsoft.VSCode"));
    }

    #[test]
    fn case_insensitive_and_substring_agree() {
        for match_type in [MatchType::CaseInsensitive, MatchType::Substring] {
            assert!(match_type.is_match("studiocode", "Microsoft.VisualStudioCode"));
            assert!(!match_type.is_match("xcode", "Microsoft.VisualStudioCode"));
        }
    }

    #[test]
    fn starts_with_is_a_prefix_test() {
        assert!(MatchType::StartsWith.is_match("micro", "Microsoft.VisualStudioCode"));
        assert!(!MatchType::StartsWith.is_match("visual", "Microsoft.VisualStudioCode"));
    }

    #[test]
    fn wildcard_is_anchored() {
        assert!(MatchType::Wildcard.is_match("Microsoft.*", "Microsoft.VisualStudioCode"));
        assert!(MatchType::Wildcard.is_match("*.visualstudiocode", "Microsoft.VisualStudioCode"));
        assert!(!MatchType::Wildcard.is_match("Microsoft", "Microsoft.VisualStudioCode"));
        // Dots in the pattern are literal, not regex wildcards.
        assert!(!MatchType::Wildcard.is_match("Microsoftx*", "Microsoft.VisualStudioCode"));
    }

    #[test]
    fn fuzzy_matches_subsequences() {
        assert!(MatchType::Fuzzy.is_match("vscode", "Microsoft.VisualStudioCode"));
        assert!(MatchType::Fuzzy.is_match("mvsc", "Microsoft.VisualStudioCode"));
        assert!(!MatchType::Fuzzy.is_match("codevs", "Microsoft.VisualStudioCode"));
    }

    #[test]
    fn fuzzy_substring_checks_words() {
        assert!(MatchType::FuzzySubstring.is_match("stdio", "Visual Studio Code"));
        assert!(!MatchType::FuzzySubstring.is_match("vsc", "Visual Studio Code"));
    }

    #[test]
    fn matching_is_stable_under_double_lowercasing() {
        for match_type in [
            MatchType::Exact,
            MatchType::CaseInsensitive,
            MatchType::StartsWith,
            MatchType::Substring,
        ] {
            let keyword = "VsCoDe";
            let target = "Microsoft.VSCode";
            let once = match_type.is_match(keyword, target);
            let twice = match_type.is_match(&keyword.to_lowercase(), &target.to_lowercase());
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn default_is_case_insensitive() {
        assert_eq!(MatchType::default(), MatchType::CaseInsensitive);
    }

    #[test]
    fn serde_names_are_pascal_case() {
        let parsed: MatchType = serde_json::from_str("\"FuzzySubstring\"").unwrap();
        assert_eq!(parsed, MatchType::FuzzySubstring);
        assert_eq!(serde_json::to_string(&MatchType::StartsWith).unwrap(), "\"StartsWith\"");
    }
}

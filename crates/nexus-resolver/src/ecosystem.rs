//! The package ecosystems the gateway fronts.

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use serde::Serialize;

/// A software-distribution source the gateway knows how to serve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Ecosystem {
    /// The npm registry.
    Npm,
    /// JSR, served through its npm-compat registry.
    Jsr,
    /// GitHub repositories (tags, branches, commits).
    Gh,
    /// cdnjs libraries.
    Cdnjs,
    /// WordPress plugin and theme SVN.
    Wp,
    /// The WinGet community manifest repository.
    Winget,
}

impl Ecosystem {
    /// The path segment this ecosystem uses in URLs and storage keys.
    pub fn as_str(self) -> &'static str {
        match self {
            Ecosystem::Npm => "npm",
            Ecosystem::Jsr => "jsr",
            Ecosystem::Gh => "gh",
            Ecosystem::Cdnjs => "cdnjs",
            Ecosystem::Wp => "wp",
            Ecosystem::Winget => "winget",
        }
    }
}

impl fmt::Display for Ecosystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Ecosystem {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "npm" => Ok(Ecosystem::Npm),
            "jsr" => Ok(Ecosystem::Jsr),
            "gh" => Ok(Ecosystem::Gh),
            "cdnjs" => Ok(Ecosystem::Cdnjs),
            "wp" => Ok(Ecosystem::Wp),
            "winget" => Ok(Ecosystem::Winget),
            _ => Err(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_and_parse_roundtrip() {
        for eco in [
            Ecosystem::Npm,
            Ecosystem::Jsr,
            Ecosystem::Gh,
            Ecosystem::Cdnjs,
            Ecosystem::Wp,
            Ecosystem::Winget,
        ] {
            assert_eq!(eco.as_str().parse::<Ecosystem>().unwrap(), eco);
        }
        assert!("deb".parse::<Ecosystem>().is_err());
    }
}

use std::fmt;

/// Canonical identity of a pull request: (org, repo, number).
///
/// Two references parsed from different textual forms that denote the same
/// triple compare equal; this is the unit of deduplication and cycle
/// detection. The derived ordering (org, then repo, then numeric number)
/// is the output ordering of the resolver.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PrRef {
    pub org: String,
    pub repo: String,
    pub number: u64,
}

impl PrRef {
    pub fn new(org: impl Into<String>, repo: impl Into<String>, number: u64) -> Self {
        PrRef {
            org: org.into(),
            repo: repo.into(),
            number,
        }
    }

    /// Short `org/repo#number` form, used in log lines and error messages.
    pub fn short(&self) -> String {
        format!("{}/{}#{}", self.org, self.repo, self.number)
    }
}

impl fmt::Display for PrRef {
    /// Renders the canonical clone-target URL.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "https://github.com/{}/{}/pull/{}",
            self.org, self.repo, self.number
        )
    }
}

/// Repository-only identity, extracted from an https or SSH remote URL.
#[allow(dead_code)] // Paired with parse_repo_ref; no resolver caller yet
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RepoRef {
    pub org: String,
    pub repo: String,
}

impl fmt::Display for RepoRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.org, self.repo)
    }
}

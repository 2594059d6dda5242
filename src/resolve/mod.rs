use std::collections::{BTreeSet, HashSet};

use thiserror::Error;
use tracing::{debug, info};

use crate::github::{GitHubError, PullRequestSource};
use crate::reference::{parse_pr_ref, ParseError, PrRef};

/// Annotation line prefixes that declare a dependency. Case-sensitive,
/// matched against the start of each line.
const DEPENDENCY_PREFIXES: [&str; 4] = ["Require:", "Requires:", "Test:", "Tests:"];

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Api(#[from] GitHubError),
}

/// Extract declared dependency references from free text.
///
/// A line contributes when it starts with one of the recognized prefixes;
/// the value after the colon is trimmed and parsed as a pull request
/// reference (full URL or short id). Unparseable values are skipped, not
/// errors. All matching lines contribute; duplicates collapse.
pub fn extract_dependencies(text: &str) -> HashSet<PrRef> {
    let mut found = HashSet::new();
    for line in text.lines() {
        let Some(value) = DEPENDENCY_PREFIXES
            .iter()
            .find_map(|prefix| line.strip_prefix(prefix))
        else {
            continue;
        };
        match parse_pr_ref(value.trim()) {
            Ok(pr) => {
                found.insert(pr);
            }
            Err(_) => debug!(line, "skipping unparseable dependency annotation"),
        }
    }
    found
}

/// The dependency contribution of a single pull request.
///
/// The description is consulted first; if it declares any dependencies they
/// are the PR's entire contribution. Only a PR whose description declares
/// nothing falls back to its comments, scanned newest first; the first
/// comment that declares any dependencies wins exclusively.
async fn dependencies_of<S: PullRequestSource + ?Sized>(
    source: &S,
    pr: &PrRef,
) -> Result<HashSet<PrRef>, ResolveError> {
    let details = source.fetch_pull_request(pr).await?;
    let declared = extract_dependencies(details.description());
    if !declared.is_empty() {
        debug!(pr = %pr.short(), count = declared.len(), "dependencies declared in description");
        return Ok(declared);
    }

    let comments = source.fetch_issue_comments(pr).await?;
    for comment in comments.iter().rev() {
        let declared = extract_dependencies(comment.text());
        if !declared.is_empty() {
            debug!(pr = %pr.short(), count = declared.len(), "dependencies declared in comment");
            return Ok(declared);
        }
    }

    Ok(HashSet::new())
}

/// Resolve the dependency closure of the given pull request references.
///
/// Returns the discovered dependencies, deduplicated and sorted by
/// (org, repo, number); the starting references themselves are not part of
/// the result. With `recursive` set, discovered dependencies are expanded
/// in turn until no new references appear.
///
/// A caller-supplied reference that fails to parse aborts the run, as does
/// any fetch failure. Each reference is fetched at most once per call: a
/// single visited set is threaded through every expansion pass, which is
/// what makes annotation cycles terminate.
pub async fn resolve<S: PullRequestSource + ?Sized>(
    source: &S,
    start_refs: &[String],
    recursive: bool,
) -> Result<BTreeSet<PrRef>, ResolveError> {
    let mut frontier = Vec::with_capacity(start_refs.len());
    for text in start_refs {
        frontier.push(parse_pr_ref(text)?);
    }

    let mut seen: HashSet<PrRef> = HashSet::new();
    let mut dependencies: BTreeSet<PrRef> = BTreeSet::new();

    loop {
        let mut pass = BTreeSet::new();
        for pr in frontier {
            // Mark before fetching: a reference already expanded anywhere
            // in this call is never fetched again, even when a later
            // annotation re-references it.
            if !seen.insert(pr.clone()) {
                debug!(pr = %pr.short(), "already visited, skipping");
                continue;
            }
            for dep in dependencies_of(source, &pr).await? {
                if !seen.contains(&dep) {
                    pass.insert(dep);
                }
            }
        }

        dependencies.extend(pass.iter().cloned());
        if !recursive || pass.is_empty() {
            break;
        }
        info!(discovered = pass.len(), "expanding discovered dependencies");
        frontier = pass.into_iter().collect();
    }

    Ok(dependencies)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::github::{IssueComment, PullRequestDetails};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// In-memory PullRequestSource mapping each PR to a description and a
    /// chronological comment chain, counting fetches per PR.
    #[derive(Default)]
    struct FakeSource {
        prs: HashMap<PrRef, (String, Vec<String>)>,
        fetches: Mutex<HashMap<PrRef, usize>>,
    }

    impl FakeSource {
        fn with_pr(mut self, short: &str, description: &str, comments: &[&str]) -> Self {
            let pr = parse_pr_ref(short).unwrap();
            let comments = comments.iter().map(|c| c.to_string()).collect();
            self.prs.insert(pr, (description.to_string(), comments));
            self
        }

        fn fetch_count(&self, short: &str) -> usize {
            let pr = parse_pr_ref(short).unwrap();
            *self.fetches.lock().unwrap().get(&pr).unwrap_or(&0)
        }
    }

    #[async_trait]
    impl PullRequestSource for FakeSource {
        async fn fetch_pull_request(&self, pr: &PrRef) -> Result<PullRequestDetails, GitHubError> {
            *self.fetches.lock().unwrap().entry(pr.clone()).or_insert(0) += 1;
            let (description, _) = self
                .prs
                .get(pr)
                .ok_or_else(|| GitHubError::NotFound(pr.short()))?;
            Ok(PullRequestDetails {
                body: Some(description.clone()),
            })
        }

        async fn fetch_issue_comments(&self, pr: &PrRef) -> Result<Vec<IssueComment>, GitHubError> {
            let (_, comments) = self
                .prs
                .get(pr)
                .ok_or_else(|| GitHubError::NotFound(pr.short()))?;
            Ok(comments
                .iter()
                .map(|c| IssueComment {
                    body: Some(c.clone()),
                })
                .collect())
        }
    }

    fn refs(shorts: &[&str]) -> Vec<String> {
        shorts.iter().map(|s| s.to_string()).collect()
    }

    fn sorted_shorts(set: &BTreeSet<PrRef>) -> Vec<String> {
        set.iter().map(PrRef::short).collect()
    }

    #[test]
    fn test_extract_all_four_prefixes() {
        let text = "Require: a/b#1\nRequires: a/b#2\nTest: a/b#3\nTests: a/b#4\n";
        let found = extract_dependencies(text);
        assert_eq!(found.len(), 4);
        assert!(found.contains(&PrRef::new("a", "b", 1)));
        assert!(found.contains(&PrRef::new("a", "b", 4)));
    }

    #[test]
    fn test_extract_accepts_full_urls() {
        let found = extract_dependencies("Requires: https://github.com/a/b/pull/7");
        assert_eq!(found.len(), 1);
        assert!(found.contains(&PrRef::new("a", "b", 7)));
    }

    #[test]
    fn test_extract_ignores_unrecognized_prefixes() {
        assert!(extract_dependencies("Blocks: a/b#3").is_empty());
        assert!(extract_dependencies("requires: a/b#3").is_empty());
        assert!(extract_dependencies("  Requires: a/b#3").is_empty());
    }

    #[test]
    fn test_extract_skips_unparseable_values() {
        let text = "Requires: not-a-valid-id\nRequires: a/b#4\n";
        let found = extract_dependencies(text);
        assert_eq!(found.len(), 1);
        assert!(found.contains(&PrRef::new("a", "b", 4)));
    }

    #[test]
    fn test_extract_collapses_duplicates() {
        let text = "Requires: a/b#4\nTests: https://github.com/a/b/pull/4\n";
        assert_eq!(extract_dependencies(text).len(), 1);
    }

    #[test]
    fn test_extract_empty_text() {
        assert!(extract_dependencies("").is_empty());
        assert!(extract_dependencies("just prose\nwith no annotations").is_empty());
    }

    #[tokio::test]
    async fn test_resolve_no_annotations_is_empty() {
        let source = FakeSource::default().with_pr("x/y#1", "just a description", &[]);
        let result = resolve(&source, &refs(&["x/y#1"]), true).await.unwrap();
        assert!(result.is_empty());
    }

    #[tokio::test]
    async fn test_resolve_description_wins_over_comments() {
        let source = FakeSource::default()
            .with_pr("org/repo#1", "Requires: org/repo#5", &["Requires: org/repo#9"])
            .with_pr("org/repo#5", "", &[])
            .with_pr("org/repo#9", "", &[]);
        let result = resolve(&source, &refs(&["org/repo#1"]), true).await.unwrap();
        assert_eq!(sorted_shorts(&result), vec!["org/repo#5"]);
    }

    #[tokio::test]
    async fn test_resolve_newest_matching_comment_wins() {
        let source = FakeSource::default()
            .with_pr("x/y#1", "", &["Requires: a/b#1", "Requires: a/b#2"])
            .with_pr("a/b#1", "", &[])
            .with_pr("a/b#2", "", &[]);
        let result = resolve(&source, &refs(&["x/y#1"]), true).await.unwrap();
        assert_eq!(sorted_shorts(&result), vec!["a/b#2"]);
    }

    #[tokio::test]
    async fn test_resolve_skips_comments_without_annotations() {
        let source = FakeSource::default()
            .with_pr(
                "x/y#1",
                "",
                &["Requires: a/b#1", "thanks, looks good to me"],
            )
            .with_pr("a/b#1", "", &[]);
        let result = resolve(&source, &refs(&["x/y#1"]), true).await.unwrap();
        assert_eq!(sorted_shorts(&result), vec!["a/b#1"]);
    }

    #[tokio::test]
    async fn test_resolve_cycle_terminates() {
        let source = FakeSource::default()
            .with_pr("x/y#1", "Requires: x/y#2", &[])
            .with_pr("x/y#2", "Requires: x/y#1", &[]);
        let result = resolve(&source, &refs(&["x/y#1"]), true).await.unwrap();
        // The starting reference is excluded: resolve returns dependencies,
        // not inputs.
        assert_eq!(sorted_shorts(&result), vec!["x/y#2"]);
    }

    #[tokio::test]
    async fn test_resolve_transitive_chain() {
        let source = FakeSource::default()
            .with_pr("x/y#1", "Requires: x/y#2", &[])
            .with_pr("x/y#2", "Requires: x/y#3", &[])
            .with_pr("x/y#3", "", &[]);
        let result = resolve(&source, &refs(&["x/y#1"]), true).await.unwrap();
        assert_eq!(sorted_shorts(&result), vec!["x/y#2", "x/y#3"]);
    }

    #[tokio::test]
    async fn test_resolve_non_recursive_stops_at_direct_deps() {
        let source = FakeSource::default()
            .with_pr("x/y#1", "Requires: x/y#2", &[])
            .with_pr("x/y#2", "Requires: x/y#3", &[])
            .with_pr("x/y#3", "", &[]);
        let result = resolve(&source, &refs(&["x/y#1"]), false).await.unwrap();
        assert_eq!(sorted_shorts(&result), vec!["x/y#2"]);
        assert_eq!(source.fetch_count("x/y#2"), 0);
    }

    #[tokio::test]
    async fn test_resolve_fetches_each_pr_once() {
        // Diamond: #1 requires #2 and #3, #2 also requires #3.
        let source = FakeSource::default()
            .with_pr("x/y#1", "Requires: x/y#2\nRequires: x/y#3", &[])
            .with_pr("x/y#2", "Requires: x/y#3", &[])
            .with_pr("x/y#3", "", &[]);
        let result = resolve(&source, &refs(&["x/y#1"]), true).await.unwrap();
        assert_eq!(sorted_shorts(&result), vec!["x/y#2", "x/y#3"]);
        assert_eq!(source.fetch_count("x/y#1"), 1);
        assert_eq!(source.fetch_count("x/y#2"), 1);
        assert_eq!(source.fetch_count("x/y#3"), 1);
    }

    #[tokio::test]
    async fn test_resolve_output_is_sorted() {
        let source = FakeSource::default()
            .with_pr("m/n#1", "Requires: z/z#1\nRequires: a/b#9\nRequires: a/b#2", &[])
            .with_pr("z/z#1", "", &[])
            .with_pr("a/b#9", "", &[])
            .with_pr("a/b#2", "", &[]);
        let result = resolve(&source, &refs(&["m/n#1"]), true).await.unwrap();
        assert_eq!(sorted_shorts(&result), vec!["a/b#2", "a/b#9", "z/z#1"]);
    }

    #[tokio::test]
    async fn test_resolve_accepts_multiple_starting_refs() {
        let source = FakeSource::default()
            .with_pr("x/y#1", "Requires: a/b#1", &[])
            .with_pr("x/y#2", "Requires: a/b#2", &[])
            .with_pr("a/b#1", "", &[])
            .with_pr("a/b#2", "", &[]);
        let result = resolve(&source, &refs(&["x/y#1", "x/y#2"]), true)
            .await
            .unwrap();
        assert_eq!(sorted_shorts(&result), vec!["a/b#1", "a/b#2"]);
    }

    #[tokio::test]
    async fn test_resolve_invalid_start_ref_is_fatal() {
        let source = FakeSource::default();
        let err = resolve(&source, &refs(&["not-a-reference"]), true)
            .await
            .unwrap_err();
        assert!(matches!(err, ResolveError::Parse(_)));
    }

    #[tokio::test]
    async fn test_resolve_missing_pr_is_fatal() {
        let source = FakeSource::default().with_pr("x/y#1", "Requires: x/y#2", &[]);
        let err = resolve(&source, &refs(&["x/y#1"]), true).await.unwrap_err();
        assert!(matches!(err, ResolveError::Api(GitHubError::NotFound(_))));
    }
}

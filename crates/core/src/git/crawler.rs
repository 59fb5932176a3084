//! Full-history crawl across HEAD and every local branch.
//!
//! A single branch rarely carries every author (squash merges, orphan
//! branches), so the crawl unions three reads:
//!
//! 1. HEAD at depth 1, for the current head commit id;
//! 2. every local branch, each to `branch_depth` commits;
//! 3. HEAD again to `head_depth` commits.
//!
//! Commits reached more than once are kept once. Any single read may fail
//! without aborting the others.

use std::collections::HashSet;

use tracing::{debug, info, warn};

use super::client::CommitSource;
use crate::config::CrawlConfig;
use crate::models::CommitRecord;

/// Result of one crawl.
#[derive(Debug, Clone, Default)]
pub struct CrawlReport {
    /// HEAD commit id, if HEAD could be read.
    pub head_commit: Option<String>,
    /// Unique commits in discovery order.
    pub commits: Vec<CommitRecord>,
    /// Number of reads that failed and were skipped.
    pub failed_reads: usize,
}

/// Walks a [`CommitSource`] to collect every reachable commit.
pub struct HistoryCrawler<'a> {
    source: &'a dyn CommitSource,
    limits: CrawlConfig,
    verbose: bool,
}

impl<'a> HistoryCrawler<'a> {
    pub fn new(source: &'a dyn CommitSource, limits: CrawlConfig) -> Self {
        Self {
            source,
            limits,
            verbose: false,
        }
    }

    /// Report HEAD failures at `warn` instead of `debug`.
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn crawl(&self) -> CrawlReport {
        let mut report = CrawlReport::default();
        let mut seen: HashSet<String> = HashSet::new();

        match self.source.log("HEAD", 1) {
            Ok(head) => report.head_commit = head.first().map(|c| c.id.clone()),
            Err(e) => {
                report.failed_reads += 1;
                if self.verbose {
                    warn!(error = %e, "failed to read HEAD");
                } else {
                    debug!(error = %e, "failed to read HEAD");
                }
            }
        }

        match self.source.branches() {
            Ok(branches) => {
                if self.verbose {
                    info!(branches = %branches.join(", "), "found branches");
                }
                for branch in &branches {
                    match self.source.log(branch, self.limits.branch_depth) {
                        Ok(commits) => Self::collect(&mut report, &mut seen, commits),
                        Err(e) => {
                            report.failed_reads += 1;
                            warn!(branch = %branch, error = %e, "failed to read branch history");
                        }
                    }
                }
            }
            Err(e) => {
                report.failed_reads += 1;
                warn!(error = %e, "failed to list branches");
            }
        }

        match self.source.log("HEAD", self.limits.head_depth) {
            Ok(commits) => Self::collect(&mut report, &mut seen, commits),
            Err(e) => {
                report.failed_reads += 1;
                if self.verbose {
                    warn!(error = %e, "failed to read HEAD history");
                } else {
                    debug!(error = %e, "failed to read HEAD history");
                }
            }
        }

        debug!(
            commits = report.commits.len(),
            failed_reads = report.failed_reads,
            "crawl finished"
        );
        report
    }

    fn collect(report: &mut CrawlReport, seen: &mut HashSet<String>, commits: Vec<CommitRecord>) {
        for commit in commits {
            if seen.insert(commit.id.clone()) {
                report.commits.push(commit);
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    //! In-memory [`CommitSource`] for crawler and resolver tests.

    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use crate::errors::GitError;
    use crate::git::CommitSource;
    use crate::models::CommitRecord;

    pub fn commit(id: &str, name: &str, email: &str, time: i64) -> CommitRecord {
        CommitRecord {
            id: id.into(),
            author_name: name.into(),
            author_email: email.into(),
            author_time: time,
        }
    }

    /// Branch histories held in memory; `None` entries fail on read.
    #[derive(Default)]
    pub struct FakeHistory {
        pub head: Option<Vec<CommitRecord>>,
        pub branches: Vec<(String, Option<Vec<CommitRecord>>)>,
        pub log_calls: Arc<AtomicUsize>,
    }

    impl FakeHistory {
        pub fn linear(commits: Vec<CommitRecord>) -> Self {
            Self {
                head: Some(commits.clone()),
                branches: vec![("main".into(), Some(commits))],
                ..Default::default()
            }
        }

        pub fn calls(&self) -> Arc<AtomicUsize> {
            self.log_calls.clone()
        }
    }

    impl CommitSource for FakeHistory {
        fn head_commit(&self) -> Result<String, GitError> {
            self.head
                .as_ref()
                .and_then(|h| h.first())
                .map(|c| c.id.clone())
                .ok_or_else(|| GitError::RefNotFound("HEAD".into()))
        }

        fn branches(&self) -> Result<Vec<String>, GitError> {
            Ok(self.branches.iter().map(|(n, _)| n.clone()).collect())
        }

        fn log(&self, reference: &str, depth: usize) -> Result<Vec<CommitRecord>, GitError> {
            self.log_calls.fetch_add(1, Ordering::SeqCst);
            let history = if reference == "HEAD" {
                self.head.as_ref()
            } else {
                let by_name: HashMap<_, _> =
                    self.branches.iter().map(|(n, c)| (n.as_str(), c)).collect();
                by_name.get(reference).copied().and_then(|c| c.as_ref())
            };
            history
                .map(|c| c.iter().take(depth).cloned().collect())
                .ok_or_else(|| GitError::RefNotFound(reference.into()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use crate::git::client::test_support::{commit_as, init_repo};
    use crate::git::GitClient;

    #[test]
    fn test_duplicates_across_branches_counted_once() {
        let shared = vec![
            commit("c3", "Carol", "carol@example.com", 300),
            commit("c2", "Bob", "bob@example.com", 200),
            commit("c1", "Alice", "alice@example.com", 100),
        ];
        let mut feature = vec![commit("f1", "Dave", "", 250)];
        feature.extend(shared[1..].iter().cloned());
        let source = FakeHistory {
            head: Some(shared.clone()),
            branches: vec![
                ("main".into(), Some(shared.clone())),
                ("feature".into(), Some(feature)),
            ],
            ..Default::default()
        };

        let report = HistoryCrawler::new(&source, CrawlConfig::default()).crawl();
        let ids: Vec<_> = report.commits.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["c3", "c2", "c1", "f1"]);
        assert_eq!(report.head_commit.as_deref(), Some("c3"));
        assert_eq!(report.failed_reads, 0);
    }

    #[test]
    fn test_failing_branch_is_skipped() {
        let main = vec![commit("m1", "Alice", "", 100)];
        let source = FakeHistory {
            head: Some(main.clone()),
            branches: vec![
                ("broken".into(), None),
                ("main".into(), Some(main)),
                ("other".into(), Some(vec![commit("o1", "Bob", "", 50)])),
            ],
            ..Default::default()
        };

        let report = HistoryCrawler::new(&source, CrawlConfig::default()).crawl();
        assert_eq!(report.commits.len(), 2);
        assert_eq!(report.failed_reads, 1);
    }

    #[test]
    fn test_head_failure_keeps_branch_commits() {
        let source = FakeHistory {
            head: None,
            branches: vec![("orphan".into(), Some(vec![commit("o1", "Bob", "", 50)]))],
            ..Default::default()
        };

        let report = HistoryCrawler::new(&source, CrawlConfig::default())
            .verbose(true)
            .crawl();
        assert!(report.head_commit.is_none());
        assert_eq!(report.commits.len(), 1);
        assert_eq!(report.failed_reads, 2);
    }

    #[test]
    fn test_depth_limits_applied() {
        let history: Vec<_> = (0..10)
            .map(|i| commit(&format!("c{i}"), "A", "", 1000 - i))
            .collect();
        let source = FakeHistory::linear(history);
        let limits = CrawlConfig {
            branch_depth: 3,
            head_depth: 5,
        };

        let report = HistoryCrawler::new(&source, limits).crawl();
        assert_eq!(report.commits.len(), 5);
    }

    #[test]
    fn test_crawl_real_repository_with_side_branch() {
        let dir = tempfile::tempdir().unwrap();
        let repo = init_repo(dir.path());
        let root = commit_as(&repo, "Alice", "alice@example.com", 1_500_000_000, "root");
        commit_as(&repo, "Bob", "bob@example.com", 1_500_000_100, "main work");

        // A side branch whose tip is not reachable from HEAD.
        let root_commit = repo.find_commit(root).unwrap();
        repo.branch("side", &root_commit, false).unwrap();
        let sig = git2::Signature::new("Carol", "carol@example.com", &git2::Time::new(1_500_000_200, 0))
            .unwrap();
        let tree = root_commit.tree().unwrap();
        repo.commit(
            Some("refs/heads/side"),
            &sig,
            &sig,
            "side work",
            &tree,
            &[&root_commit],
        )
        .unwrap();

        let client = GitClient::new(dir.path());
        let report = HistoryCrawler::new(&client, CrawlConfig::default()).crawl();
        let mut names: Vec<_> = report
            .commits
            .iter()
            .map(|c| c.author_name.as_str())
            .collect();
        names.sort();
        assert_eq!(names, vec!["Alice", "Bob", "Carol"]);
        assert_eq!(report.failed_reads, 0);
    }

    #[test]
    fn test_crawl_missing_repository_is_empty() {
        let client = GitClient::new("/nonexistent/repo");
        let report = HistoryCrawler::new(&client, CrawlConfig::default()).crawl();
        assert!(report.commits.is_empty());
        assert!(report.head_commit.is_none());
        assert_eq!(report.failed_reads, 3);
    }
}

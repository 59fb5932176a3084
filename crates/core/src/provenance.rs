//! Repository provenance resolution.
//!
//! [`ProvenanceResolver`] owns the working [`ProvenanceSummary`] for one
//! repository and decides on each request whether the cached summary can be
//! used or the history must be crawled again.

use chrono::{Datelike, Local, Utc};
use tracing::{debug, info, warn};

use crate::cache::{accepts_cached, is_fresh, CacheStore};
use crate::config::{CrawlConfig, RepositoryLocation};
use crate::errors::CacheError;
use crate::git::{CommitSource, GitClient, HistoryCrawler};
use crate::models::ProvenanceSummary;

/// How a [`ProvenanceResolver::refresh`] call was satisfied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Refresh {
    /// The cached summary replaced the working one.
    Cached,
    /// The history was crawled; `commits` unique commits were folded in.
    Crawled { commits: usize },
}

/// Resolves and caches the provenance summary of one repository.
pub struct ProvenanceResolver {
    location: RepositoryLocation,
    summary: ProvenanceSummary,
    source: Box<dyn CommitSource>,
    cache: Box<dyn CacheStore>,
    limits: CrawlConfig,
    verbose: bool,
}

impl ProvenanceResolver {
    pub fn new(
        location: RepositoryLocation,
        source: Box<dyn CommitSource>,
        cache: Box<dyn CacheStore>,
        limits: CrawlConfig,
    ) -> Self {
        let summary = ProvenanceSummary::empty(location.as_cache_key(), Utc::now());
        Self {
            location,
            summary,
            source,
            cache,
            limits,
            verbose: false,
        }
    }

    /// Resolver reading the repository on disk through `git2`.
    pub fn for_repository(
        location: RepositoryLocation,
        cache: Box<dyn CacheStore>,
        limits: CrawlConfig,
    ) -> Self {
        let source = Box::new(GitClient::new(location.path()));
        Self::new(location, source, cache, limits)
    }

    /// Log crawl progress and HEAD failures at higher levels.
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn location(&self) -> &RepositoryLocation {
        &self.location
    }

    pub fn summary(&self) -> &ProvenanceSummary {
        &self.summary
    }

    /// Bring the working summary up to date, from the cache if it is fresh
    /// and strictly better, otherwise by crawling. May block for a full
    /// history crawl.
    pub fn refresh(&mut self) -> Refresh {
        let live_path = self.location.as_cache_key();

        if let Some(cached) = self.cache.load() {
            match self.source.head_commit() {
                Ok(live_head) if is_fresh(&cached, &live_head, &live_path) => {
                    if accepts_cached(&cached, &self.summary) {
                        if self.verbose {
                            info!(authors = cached.authors.len(), "using cached provenance");
                        }
                        self.summary = cached;
                        return Refresh::Cached;
                    }
                    debug!("cached first commit date is not earlier, recrawling");
                }
                Ok(live_head) => {
                    debug!(cached = %cached.head_commit, live = %live_head, "provenance cache is stale");
                }
                Err(e) => {
                    debug!(error = %e, "cannot read HEAD to validate cache");
                }
            }
        }

        self.crawl(live_path)
    }

    fn crawl(&mut self, live_path: String) -> Refresh {
        if self.verbose {
            info!(path = %live_path, "crawling repository history");
        }
        let report = HistoryCrawler::new(self.source.as_ref(), self.limits)
            .verbose(self.verbose)
            .crawl();

        if let Some(head) = report.head_commit {
            self.summary.head_commit = head;
        }
        self.summary.path = live_path;
        let commits = self.summary.absorb(&report.commits);

        debug!(
            commits,
            authors = self.summary.authors.len(),
            first_date = %self.summary.first_date,
            "provenance updated from crawl"
        );
        Refresh::Crawled { commits }
    }

    /// Year of the earliest known commit, in local time.
    pub fn first_year(&mut self) -> i32 {
        self.refresh();
        self.summary.first_date.with_timezone(&Local).year()
    }

    /// Write the working summary to the cache store.
    pub fn persist(&self) -> Result<(), CacheError> {
        self.cache.save(&self.summary)
    }

    /// Drop the stored cache document.
    pub fn clear_cache(&self) -> Result<(), CacheError> {
        self.cache.clear()
    }

    /// Persist, logging instead of failing.
    pub fn persist_or_warn(&self) {
        if let Err(e) = self.persist() {
            warn!(error = %e, "failed to write provenance cache");
        }
    }
}

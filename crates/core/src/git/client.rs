//! Local Git repository reads via `git2`.

use std::path::{Path, PathBuf};

use git2::{BranchType, Oid, Repository, Sort};
use tracing::{debug, instrument};

use crate::errors::GitError;
use crate::models::CommitRecord;

/// Read-only view of a repository's commit graph.
///
/// The crawler and resolver only talk to this trait, so tests can swap in
/// an in-memory history.
pub trait CommitSource: Send {
    /// Id of the commit HEAD points at.
    fn head_commit(&self) -> Result<String, GitError>;

    /// Names of all local branches.
    fn branches(&self) -> Result<Vec<String>, GitError>;

    /// Up to `depth` commits reachable from `reference`, newest first.
    fn log(&self, reference: &str, depth: usize) -> Result<Vec<CommitRecord>, GitError>;
}

/// [`CommitSource`] backed by a repository on disk.
///
/// The repository is opened on every call, so a missing or broken repository
/// surfaces as a [`GitError`] at read time rather than at construction.
pub struct GitClient {
    repo_path: PathBuf,
}

impl GitClient {
    pub fn new<P: AsRef<Path>>(repo_path: P) -> Self {
        Self {
            repo_path: repo_path.as_ref().to_path_buf(),
        }
    }

    pub fn repo_path(&self) -> &Path {
        &self.repo_path
    }

    fn open(&self) -> Result<Repository, GitError> {
        Repository::open(&self.repo_path)
            .map_err(|_| GitError::RepositoryNotFound(self.repo_path.display().to_string()))
    }

    fn resolve(repo: &Repository, reference: &str) -> Result<Oid, GitError> {
        if reference == "HEAD" {
            let head = repo
                .head()
                .map_err(|_| GitError::RefNotFound(reference.to_string()))?;
            return Ok(head.peel_to_commit()?.id());
        }
        if let Ok(branch) = repo.find_branch(reference, BranchType::Local) {
            return Ok(branch.get().peel_to_commit()?.id());
        }
        let object = repo
            .revparse_single(reference)
            .map_err(|_| GitError::RefNotFound(reference.to_string()))?;
        Ok(object.peel_to_commit()?.id())
    }
}

impl CommitSource for GitClient {
    fn head_commit(&self) -> Result<String, GitError> {
        let repo = self.open()?;
        Ok(Self::resolve(&repo, "HEAD")?.to_string())
    }

    fn branches(&self) -> Result<Vec<String>, GitError> {
        let repo = self.open()?;
        let mut names = Vec::new();
        for branch_result in repo.branches(Some(BranchType::Local))? {
            let (branch, _) = branch_result?;
            if let Some(name) = branch.name()? {
                names.push(name.to_string());
            }
        }
        Ok(names)
    }

    #[instrument(skip(self), fields(path = %self.repo_path.display()))]
    fn log(&self, reference: &str, depth: usize) -> Result<Vec<CommitRecord>, GitError> {
        let repo = self.open()?;
        let start = Self::resolve(&repo, reference)?;

        let mut revwalk = repo.revwalk()?;
        revwalk.push(start)?;
        revwalk.set_sorting(Sort::TIME)?;

        let mut commits = Vec::new();
        for oid_result in revwalk.take(depth) {
            let oid = oid_result?;
            let commit = repo.find_commit(oid)?;
            let author = commit.author();
            commits.push(CommitRecord {
                id: oid.to_string(),
                author_name: String::from_utf8_lossy(author.name_bytes()).into_owned(),
                author_email: String::from_utf8_lossy(author.email_bytes()).into_owned(),
                author_time: author.when().seconds(),
            });
        }
        debug!(count = commits.len(), "collected commits");
        Ok(commits)
    }
}

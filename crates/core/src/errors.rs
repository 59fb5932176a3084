//! Error types for the gitfooter core library.
//!
//! Each subsystem has its own error type derived with `thiserror`, and a
//! top-level [`CoreError`] enum unifies them all for callers that want a
//! single error type.
//!
//! Only [`ConfigError`] and [`RenderError`] ever reach a page-render caller.
//! Git, cache and mailmap failures are logged and recovered where they occur.

use thiserror::Error;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Unified error type for the entire core library.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Git(#[from] GitError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Mailmap(#[from] MailmapError),

    #[error(transparent)]
    Render(#[from] RenderError),
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

/// Errors from configuration loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file not found.
    #[error("configuration file not found: {0}")]
    FileNotFound(String),

    /// TOML parse error, including unknown or missing footer options.
    #[error("configuration parse error: {0}")]
    ParseError(String),

    /// A config value is invalid.
    #[error("invalid configuration value for '{field}': {detail}")]
    InvalidValue {
        field: String,
        detail: String,
    },

    /// The working directory could not be determined.
    #[error("cannot resolve relative repository path: {0}")]
    WorkingDirectory(String),

    /// Generic I/O error reading the config file.
    #[error("configuration I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Git errors
// ---------------------------------------------------------------------------

/// Errors from local Git (git2) operations.
#[derive(Debug, Error)]
pub enum GitError {
    /// The repository path does not exist or is not a git repo.
    #[error("git repository not found at '{0}'")]
    RepositoryNotFound(String),

    /// A ref (branch, HEAD) could not be resolved.
    #[error("git ref not found: {0}")]
    RefNotFound(String),

    /// A `git2` library error.
    #[error("git2 error: {0}")]
    Git2Error(#[from] git2::Error),
}

// ---------------------------------------------------------------------------
// Cache errors
// ---------------------------------------------------------------------------

/// Errors from the provenance cache store.
#[derive(Debug, Error)]
pub enum CacheError {
    /// The cached document could not be encoded.
    #[error("failed to encode provenance cache: {0}")]
    Encode(#[from] serde_json::Error),

    /// Reading or writing the cache file failed.
    #[error("provenance cache I/O error at '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

// ---------------------------------------------------------------------------
// Mailmap errors
// ---------------------------------------------------------------------------

/// Errors from reading a repository's `.mailmap`.
#[derive(Debug, Error)]
pub enum MailmapError {
    /// The file exists but could not be read.
    #[error("failed to read mailmap at '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

// ---------------------------------------------------------------------------
// Render errors
// ---------------------------------------------------------------------------

/// Errors from rewriting a page body.
#[derive(Debug, Error)]
pub enum RenderError {
    /// The HTML rewriter rejected the document or a selector.
    #[error("html rewrite failed: {0}")]
    Rewrite(String),
}

impl From<lol_html::errors::RewritingError> for RenderError {
    fn from(err: lol_html::errors::RewritingError) -> Self {
        Self::Rewrite(err.to_string())
    }
}

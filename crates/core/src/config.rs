//! TOML-based configuration system for gitfooter.
//!
//! The `[footer]` table carries the options a site build hands to the
//! decorator. It is parsed strictly: unknown keys, a missing `repo`,
//! `privacy_policy` or `authors`, and values of the wrong shape all fail at
//! load time, before any repository access happens.

use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::errors::ConfigError;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Top-level application configuration loaded from a TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Minimum tracing level: trace, debug, info, warn, error.
    #[serde(default)]
    pub log_level: Option<String>,

    /// Footer decorator options.
    pub footer: FooterConfig,

    /// Provenance cache settings.
    #[serde(default)]
    pub cache: CacheConfig,

    /// History crawl bounds.
    #[serde(default)]
    pub crawl: CrawlConfig,

    /// Settings for `gitfooter serve`.
    #[serde(default)]
    pub server: ServerConfig,
}

// ---------------------------------------------------------------------------
// Footer
// ---------------------------------------------------------------------------

/// Options controlling what the footer transform injects.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FooterConfig {
    /// Verbose diagnostics for crawl and injection.
    #[serde(default)]
    pub debug: bool,

    /// Marks a development build. Informational only.
    #[serde(default, alias = "isDevelopment")]
    pub is_development: bool,

    /// Repository path, optionally prefixed with `file://`.
    pub repo: String,

    /// Privacy-policy link appended to the footer, or `false`.
    #[serde(alias = "privacypolicy", alias = "privacyPolicy")]
    pub privacy_policy: PrivacyPolicy,

    /// Where the author list comes from.
    pub authors: AuthorSource,

    /// Advisory; the crawl always visits every local branch.
    #[serde(default = "default_branch")]
    pub branch: String,
}

fn default_branch() -> String {
    "main".into()
}

/// Privacy-policy setting: a link target, or disabled.
///
/// Accepts a URL string, the boolean `false`, or the string `"false"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawPrivacyPolicy", into = "RawPrivacyPolicy")]
pub enum PrivacyPolicy {
    Disabled,
    Url(String),
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum RawPrivacyPolicy {
    Flag(bool),
    Text(String),
}

impl TryFrom<RawPrivacyPolicy> for PrivacyPolicy {
    type Error = String;

    fn try_from(raw: RawPrivacyPolicy) -> Result<Self, Self::Error> {
        match raw {
            RawPrivacyPolicy::Flag(false) => Ok(Self::Disabled),
            RawPrivacyPolicy::Flag(true) => {
                Err("privacy_policy must be a URL or false, not true".into())
            }
            RawPrivacyPolicy::Text(text) if text == "false" => Ok(Self::Disabled),
            RawPrivacyPolicy::Text(text) => Ok(Self::Url(text)),
        }
    }
}

impl From<PrivacyPolicy> for RawPrivacyPolicy {
    fn from(policy: PrivacyPolicy) -> Self {
        match policy {
            PrivacyPolicy::Disabled => Self::Flag(false),
            PrivacyPolicy::Url(url) => Self::Text(url),
        }
    }
}

/// Source of the author list shown in the copyright notice.
///
/// Accepts the literal `"git"` or a list of display strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawAuthorSource", into = "RawAuthorSource")]
pub enum AuthorSource {
    /// Derive authors from repository history.
    Git,
    /// Use these names verbatim.
    Explicit(Vec<String>),
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum RawAuthorSource {
    Keyword(String),
    List(Vec<String>),
}

impl TryFrom<RawAuthorSource> for AuthorSource {
    type Error = String;

    fn try_from(raw: RawAuthorSource) -> Result<Self, Self::Error> {
        match raw {
            RawAuthorSource::Keyword(word) if word == "git" => Ok(Self::Git),
            RawAuthorSource::Keyword(word) => Err(format!(
                "authors must be \"git\" or a list of names, got \"{word}\""
            )),
            RawAuthorSource::List(names) => Ok(Self::Explicit(names)),
        }
    }
}

impl From<AuthorSource> for RawAuthorSource {
    fn from(source: AuthorSource) -> Self {
        match source {
            AuthorSource::Git => Self::Keyword("git".into()),
            AuthorSource::Explicit(names) => Self::List(names),
        }
    }
}

// ---------------------------------------------------------------------------
// Cache
// ---------------------------------------------------------------------------

/// Location of the provenance cache document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Cache file path; relative paths resolve against the working directory.
    #[serde(default = "default_cache_path")]
    pub path: PathBuf,
}

fn default_cache_path() -> PathBuf {
    PathBuf::from(".gitfooter.cache.json")
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            path: default_cache_path(),
        }
    }
}

// ---------------------------------------------------------------------------
// Crawl
// ---------------------------------------------------------------------------

/// Depth limits for the history crawl.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct CrawlConfig {
    /// Commits walked per local branch.
    #[serde(default = "default_branch_depth")]
    pub branch_depth: usize,

    /// Commits walked from HEAD in the final pass.
    #[serde(default = "default_head_depth")]
    pub head_depth: usize,
}

fn default_branch_depth() -> usize {
    500
}
fn default_head_depth() -> usize {
    1000
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            branch_depth: default_branch_depth(),
            head_depth: default_head_depth(),
        }
    }
}

// ---------------------------------------------------------------------------
// Server
// ---------------------------------------------------------------------------

/// Settings for serving a built site through the footer transform.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen address (default `127.0.0.1:8080`).
    #[serde(default = "default_listen")]
    pub listen: String,

    /// Directory holding the rendered site.
    #[serde(default = "default_site_dir")]
    pub site_dir: PathBuf,

    /// Request path prefixes the transform never touches.
    #[serde(default = "default_excluded_prefixes")]
    pub excluded_prefixes: Vec<String>,
}

fn default_listen() -> String {
    "127.0.0.1:8080".into()
}
fn default_site_dir() -> PathBuf {
    PathBuf::from("public")
}
pub(crate) fn default_excluded_prefixes() -> Vec<String> {
    vec!["/api/".into()]
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            site_dir: default_site_dir(),
            excluded_prefixes: default_excluded_prefixes(),
        }
    }
}

// ---------------------------------------------------------------------------
// Repository location
// ---------------------------------------------------------------------------

/// Absolute path to the working tree whose history feeds the notice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryLocation(PathBuf);

impl RepositoryLocation {
    /// Resolve a configured `repo` value against `cwd`.
    ///
    /// A `file://` prefix is stripped, relative paths are joined onto `cwd`,
    /// and `.` components are dropped.
    pub fn resolve(repo: &str, cwd: &Path) -> Self {
        let raw = repo.strip_prefix("file://").unwrap_or(repo);
        let joined = if Path::new(raw).is_absolute() {
            PathBuf::from(raw)
        } else {
            cwd.join(raw)
        };
        let cleaned = joined
            .components()
            .filter(|c| !matches!(c, Component::CurDir))
            .collect();
        Self(cleaned)
    }

    /// Resolve against the process working directory.
    pub fn from_current_dir(repo: &str) -> Result<Self, ConfigError> {
        let cwd =
            std::env::current_dir().map_err(|e| ConfigError::WorkingDirectory(e.to_string()))?;
        Ok(Self::resolve(repo, &cwd))
    }

    pub fn path(&self) -> &Path {
        &self.0
    }

    /// The path in the form stored in the provenance cache.
    pub fn as_cache_key(&self) -> String {
        self.0.display().to_string()
    }
}

// ---------------------------------------------------------------------------
// Loading & validation
// ---------------------------------------------------------------------------

impl AppConfig {
    /// Load an [`AppConfig`] from a TOML file at the given path.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        info!(path = %path.display(), "loading configuration");

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }

        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Parse configuration from TOML text.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: AppConfig =
            toml::from_str(contents).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        debug!("configuration parsed successfully");
        Ok(config)
    }

    /// Validate that all required fields are present and sane.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.footer.repo.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "footer.repo".into(),
                detail: "repository path must not be empty".into(),
            });
        }
        if let PrivacyPolicy::Url(url) = &self.footer.privacy_policy {
            if url.trim().is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: "footer.privacy_policy".into(),
                    detail: "URL must not be empty; use false to disable".into(),
                });
            }
        }
        if let AuthorSource::Explicit(names) = &self.footer.authors {
            if names.iter().any(|n| n.trim().is_empty()) {
                return Err(ConfigError::InvalidValue {
                    field: "footer.authors".into(),
                    detail: "author names must not be empty".into(),
                });
            }
        }
        if self.crawl.branch_depth == 0 || self.crawl.head_depth == 0 {
            return Err(ConfigError::InvalidValue {
                field: "crawl".into(),
                detail: "crawl depths must be > 0".into(),
            });
        }

        Ok(())
    }

    /// Convenience: load and validate in one call.
    pub fn load_and_validate<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let config = Self::load_from_file(path)?;
        config.validate()?;
        Ok(config)
    }

    /// The repository location for this config, resolved against the
    /// process working directory.
    pub fn repository(&self) -> Result<RepositoryLocation, ConfigError> {
        let location = RepositoryLocation::from_current_dir(&self.footer.repo)?;
        if self.footer.debug {
            info!(
                repo = %self.footer.repo,
                resolved = %location.path().display(),
                "resolved repository location"
            );
        }
        Ok(location)
    }

    /// Tracing filter directive implied by this config.
    pub fn effective_log_level<'a>(&'a self, fallback: &'a str) -> &'a str {
        if self.footer.debug {
            "debug"
        } else {
            self.log_level.as_deref().unwrap_or(fallback)
        }
    }
}

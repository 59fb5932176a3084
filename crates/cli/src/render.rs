//! `gitfooter render`: rewrite HTML files on disk.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, warn};
use walkdir::WalkDir;

use gitfooter_core::FooterInjector;

/// Totals for one render run.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct RenderSummary {
    pub written: usize,
    pub failed: usize,
}

/// A page to rewrite and where the result goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageJob {
    pub source: PathBuf,
    pub target: PathBuf,
    /// Site-relative request path, used for logging.
    pub url_path: String,
}

fn is_html(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("html") || ext.eq_ignore_ascii_case("htm"))
}

/// Plan the jobs for `input`, which is either one file or a directory
/// walked for `*.html`. Without `output` pages are rewritten in place.
pub fn plan(input: &Path, output: Option<&Path>) -> Result<Vec<PageJob>> {
    if input.is_file() {
        let name = input
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        return Ok(vec![PageJob {
            source: input.to_path_buf(),
            target: output.unwrap_or(input).to_path_buf(),
            url_path: format!("/{name}"),
        }]);
    }
    if !input.is_dir() {
        anyhow::bail!("input not found: {}", input.display());
    }

    let mut jobs = Vec::new();
    for entry in WalkDir::new(input).sort_by_file_name() {
        let entry = entry.with_context(|| format!("failed to walk {}", input.display()))?;
        if !entry.file_type().is_file() || !is_html(entry.path()) {
            continue;
        }
        let relative = entry.path().strip_prefix(input)?;
        let url_path = format!(
            "/{}",
            relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/")
        );
        jobs.push(PageJob {
            source: entry.path().to_path_buf(),
            target: output
                .map(|out| out.join(relative))
                .unwrap_or_else(|| entry.path().to_path_buf()),
            url_path,
        });
    }
    Ok(jobs)
}

fn render_one(injector: &FooterInjector, job: &PageJob) -> Result<()> {
    let html = std::fs::read_to_string(&job.source)
        .with_context(|| format!("failed to read {}", job.source.display()))?;
    let out = injector
        .apply(&job.url_path, &html)
        .with_context(|| format!("failed to rewrite {}", job.source.display()))?;
    if let Some(parent) = job.target.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    std::fs::write(&job.target, out)
        .with_context(|| format!("failed to write {}", job.target.display()))?;
    debug!(page = %job.url_path, target = %job.target.display(), "page written");
    Ok(())
}

/// Rewrite every planned page. A page that fails is reported and skipped.
pub fn render(injector: &FooterInjector, jobs: &[PageJob], progress: bool) -> RenderSummary {
    let bar = if progress {
        let bar = ProgressBar::new(jobs.len() as u64);
        if let Ok(style) = ProgressStyle::with_template("{bar:30.blue} {pos}/{len} {msg}") {
            bar.set_style(style);
        }
        bar
    } else {
        ProgressBar::hidden()
    };

    let mut summary = RenderSummary::default();
    for job in jobs {
        bar.set_message(job.url_path.clone());
        match render_one(injector, job) {
            Ok(()) => summary.written += 1,
            Err(e) => {
                warn!(page = %job.url_path, error = %format!("{e:#}"), "render failed");
                summary.failed += 1;
            }
        }
        bar.inc(1);
    }
    bar.finish_and_clear();
    summary
}

//! Footer injection for rendered HTML pages.
//!
//! Two independent edits are made to each page:
//!
//! - every `<footer>` carrying the class `footer` gets the privacy-policy
//!   markup appended as its last child;
//! - every element with `id="copyright"` has its content replaced by the
//!   copyright notice as a single text node.
//!
//! Pages without either element pass through unchanged.

use std::cell::Cell;
use std::sync::{Mutex, MutexGuard};

use chrono::{Datelike, Local};
use lol_html::html_content::ContentType;
use lol_html::{element, rewrite_str, RewriteStrSettings};
use tracing::{debug, info};

use crate::authors::resolve_authors;
use crate::cache::JsonFileCache;
use crate::config::{default_excluded_prefixes, AppConfig, FooterConfig, PrivacyPolicy};
use crate::errors::{ConfigError, RenderError};
use crate::provenance::ProvenanceResolver;

const HTML_CONTENT_TYPE: &str = "text/html";

/// Output of [`rewrite_footer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rewrite {
    pub html: String,
    /// `footer.footer` elements that received the privacy markup.
    pub footers: usize,
    /// `#copyright` elements whose content was replaced.
    pub copyright_elements: usize,
}

/// Copyright line for a year range and author list.
pub fn copyright_text(first_year: i32, current_year: i32, authors: &[String]) -> String {
    let names = authors.join(", ");
    if first_year == current_year {
        format!("©{current_year} {names}")
    } else {
        format!("©{first_year} - {current_year} {names}")
    }
}

/// Markup appended to the footer; empty when the policy is disabled.
pub fn privacy_policy_markup(policy: &PrivacyPolicy) -> String {
    match policy {
        PrivacyPolicy::Disabled => String::new(),
        PrivacyPolicy::Url(url) => format!(
            concat!(
                r#"<span class="privacy spectrum-Detail spectrum-Detail--serif spectrum-Detail--sizeM spectrum-Detail--light">"#,
                r#"<a href="{}" class="spectrum-Link spectrum-Link--quiet spectrum-Link--primary">Privacy Policy</a>"#,
                "</span>"
            ),
            escape_attribute(url)
        ),
    }
}

fn escape_attribute(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Apply both footer edits to `html`.
pub fn rewrite_footer(
    html: &str,
    privacy_markup: &str,
    copyright: &str,
) -> Result<Rewrite, RenderError> {
    let footers = Cell::new(0usize);
    let copyright_elements = Cell::new(0usize);

    let output = rewrite_str(
        html,
        RewriteStrSettings {
            element_content_handlers: vec![
                element!("footer.footer", |el| {
                    if !privacy_markup.is_empty() {
                        el.append(privacy_markup, ContentType::Html);
                    }
                    footers.set(footers.get() + 1);
                    Ok(())
                }),
                element!("#copyright", |el| {
                    el.set_inner_content(copyright, ContentType::Text);
                    copyright_elements.set(copyright_elements.get() + 1);
                    Ok(())
                }),
            ],
            ..RewriteStrSettings::default()
        },
    )?;

    Ok(Rewrite {
        html: output,
        footers: footers.get(),
        copyright_elements: copyright_elements.get(),
    })
}

/// Decorates rendered pages with the repository-derived footer.
///
/// The provenance resolver sits behind a mutex so concurrent renders run
/// the cache check, crawl and cache write one at a time.
pub struct FooterInjector {
    options: FooterConfig,
    excluded_prefixes: Vec<String>,
    resolver: Mutex<ProvenanceResolver>,
}

impl FooterInjector {
    pub fn new(options: FooterConfig, resolver: ProvenanceResolver) -> Self {
        Self {
            options,
            excluded_prefixes: default_excluded_prefixes(),
            resolver: Mutex::new(resolver),
        }
    }

    /// Build an injector for the repository and cache file named in `config`.
    pub fn from_config(config: &AppConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let location = config.repository()?;
        let cache = JsonFileCache::in_working_dir(&config.cache.path);
        debug!(cache = %cache.path().display(), "using provenance cache");

        let resolver = ProvenanceResolver::for_repository(location, Box::new(cache), config.crawl)
            .verbose(config.footer.debug);
        Ok(Self::new(config.footer.clone(), resolver)
            .with_excluded_prefixes(config.server.excluded_prefixes.clone()))
    }

    /// Replace the request path prefixes that are never rewritten.
    pub fn with_excluded_prefixes(mut self, prefixes: Vec<String>) -> Self {
        self.excluded_prefixes = prefixes;
        self
    }

    pub fn options(&self) -> &FooterConfig {
        &self.options
    }

    /// Lock the resolver, recovering from a poisoned mutex.
    pub fn resolver(&self) -> MutexGuard<'_, ProvenanceResolver> {
        self.resolver.lock().unwrap_or_else(|poisoned| {
            tracing::warn!("provenance mutex was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// Whether a response is an HTML page outside the excluded namespaces.
    pub fn should_apply(&self, path: &str, content_type: Option<&str>) -> bool {
        let is_html = content_type.is_some_and(|ct| ct.contains(HTML_CONTENT_TYPE));
        is_html
            && !self
                .excluded_prefixes
                .iter()
                .any(|prefix| path.starts_with(prefix.as_str()))
    }

    /// Resolve authors and years, then rewrite `body`.
    pub fn apply(&self, path: &str, body: &str) -> Result<String, RenderError> {
        self.apply_for_year(path, body, Local::now().year())
    }

    /// [`apply`](Self::apply) with an explicit current year.
    pub fn apply_for_year(
        &self,
        path: &str,
        body: &str,
        current_year: i32,
    ) -> Result<String, RenderError> {
        let mut resolver = self.resolver();
        let authors = resolve_authors(&self.options.authors, &mut resolver);
        let first_year = resolver.first_year();
        let text = copyright_text(first_year, current_year, &authors);
        let privacy = privacy_policy_markup(&self.options.privacy_policy);

        let rewrite = rewrite_footer(body, &privacy, &text)?;
        if self.options.debug && rewrite.copyright_elements > 0 {
            info!(path, "found footer copyright element");
        }
        debug!(
            path,
            footers = rewrite.footers,
            copyright_elements = rewrite.copyright_elements,
            "footer applied"
        );

        resolver.persist_or_warn();
        Ok(rewrite.html)
    }

    /// The copyright line as it would be rendered now.
    pub fn current_copyright(&self) -> String {
        let mut resolver = self.resolver();
        let authors = resolve_authors(&self.options.authors, &mut resolver);
        let first_year = resolver.first_year();
        copyright_text(first_year, Local::now().year(), &authors)
    }
}

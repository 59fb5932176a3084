//! gitfooter command-line tool.
//!
//! Provides subcommands for rendering copyright footers into built HTML,
//! serving a site through the footer transform, inspecting the resolved
//! authors and provenance cache, and generating / validating configuration
//! files.

mod render;
mod style;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Datelike;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use gitfooter_core::authors::resolve_authors;
use gitfooter_core::cache::{CacheStore, JsonFileCache};
use gitfooter_core::config::{AppConfig, AuthorSource, PrivacyPolicy};
use gitfooter_core::footer::copyright_text;
use gitfooter_core::FooterInjector;
use gitfooter_web::WebServer;

// ---------------------------------------------------------------------------
// CLI argument definitions
// ---------------------------------------------------------------------------

/// gitfooter command-line tool.
#[derive(Parser, Debug)]
#[command(
    name = "gitfooter",
    version,
    about = "Stamp git-derived copyright footers into rendered HTML"
)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, global = true, default_value = "gitfooter.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate a default configuration file.
    Init {
        /// Output path for the generated config file.
        #[arg(short, long, default_value = "./gitfooter.toml")]
        output: PathBuf,
    },

    /// Validate a configuration file.
    Validate,

    /// Rewrite an HTML file, or every HTML file under a directory.
    Render {
        /// File or directory to rewrite.
        input: PathBuf,

        /// Write results here instead of rewriting in place.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show the resolved authors and copyright line.
    Authors,

    /// Inspect or clear the provenance cache.
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },

    /// Serve a built site through the footer transform.
    Serve {
        /// Listen address (overrides `server.listen`).
        #[arg(short, long)]
        listen: Option<String>,

        /// Site directory (overrides `server.site_dir`).
        #[arg(long)]
        site_dir: Option<PathBuf>,
    },
}

#[derive(Subcommand, Debug)]
enum CacheAction {
    /// Print the stored cache document.
    Show,
    /// Delete the cache file.
    Clear,
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", style::error(&format!("{:#}", e)));
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Init { output } => {
            init_logging("warn");
            cmd_init(&output)
        }
        Commands::Validate => {
            init_logging("warn");
            cmd_validate(&cli.config)
        }
        command => {
            let config = load_config(&cli.config)?;
            let fallback = if matches!(command, Commands::Serve { .. }) {
                "info"
            } else {
                "warn"
            };
            init_logging(config.effective_log_level(fallback));

            match command {
                Commands::Render { input, output } => cmd_render(&config, &input, output.as_deref()),
                Commands::Authors => cmd_authors(&config),
                Commands::Cache { action } => cmd_cache(&config, action),
                Commands::Serve { listen, site_dir } => cmd_serve(config, listen, site_dir).await,
                Commands::Init { .. } | Commands::Validate => unreachable!(),
            }
        }
    }
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .init();
}

// ---------------------------------------------------------------------------
// Config helpers
// ---------------------------------------------------------------------------

fn load_config(path: &Path) -> Result<AppConfig> {
    AppConfig::load_and_validate(path)
        .with_context(|| format!("failed to load configuration from {}", path.display()))
}

// ---------------------------------------------------------------------------
// Subcommand implementations
// ---------------------------------------------------------------------------

const DEFAULT_CONFIG: &str = r#"# gitfooter configuration

# log_level = "info"

[footer]
# Repository whose history supplies the copyright years and authors.
repo = "."
# Link appended to <footer class="footer">, or false.
privacy_policy = "https://example.com/privacy"
# "git" derives authors from history, or list them: ["Docs Team"]
authors = "git"
# Verbose crawl and injection logging.
debug = false

[cache]
path = ".gitfooter.cache.json"

[crawl]
branch_depth = 500
head_depth = 1000

[server]
listen = "127.0.0.1:8080"
site_dir = "public"
excluded_prefixes = ["/api/"]
"#;

fn cmd_init(output: &Path) -> Result<()> {
    if output.exists() {
        anyhow::bail!(
            "file already exists: {}. Use a different path or remove the existing file.",
            output.display()
        );
    }

    std::fs::write(output, DEFAULT_CONFIG).context("failed to write config file")?;

    println!(
        "{}",
        style::success(&format!("Default configuration written to {}", output.display()))
    );
    println!();
    println!("Next steps:");
    println!("  1. Point footer.repo at your site's repository");
    println!(
        "  2. Validate with: gitfooter validate --config {}",
        output.display()
    );
    println!(
        "  3. Render a built site: gitfooter render public --config {}",
        output.display()
    );

    Ok(())
}

fn cmd_validate(config_path: &Path) -> Result<()> {
    println!("Validating configuration: {}", config_path.display());
    println!();

    let config = AppConfig::load_from_file(config_path).context("failed to parse configuration")?;
    println!("  [OK] TOML structure is valid");

    match config.validate() {
        Ok(()) => println!("  [OK] All required fields are valid"),
        Err(e) => {
            println!("  [FAIL] Validation error: {}", e);
            anyhow::bail!("configuration validation failed");
        }
    }

    let repo = config.repository()?;
    let repo_found = repo.path().join(".git").exists() || repo.path().join("HEAD").is_file();

    println!();
    println!("{}", style::header("Configuration summary:"));
    println!("  Repository    : {}", repo.path().display());
    if !repo_found {
        println!("  {}", style::warn("no git repository found there"));
    }
    println!(
        "  Authors       : {}",
        match &config.footer.authors {
            AuthorSource::Git => "from git history".to_string(),
            AuthorSource::Explicit(names) => names.join(", "),
        }
    );
    println!(
        "  Privacy policy: {}",
        match &config.footer.privacy_policy {
            PrivacyPolicy::Disabled => "disabled",
            PrivacyPolicy::Url(url) => url.as_str(),
        }
    );
    println!("  Cache file    : {}", config.cache.path.display());
    println!(
        "  Crawl depths  : branches {}, HEAD {}",
        config.crawl.branch_depth, config.crawl.head_depth
    );
    println!("  Serve listen  : {}", config.server.listen);
    println!();
    println!("{}", style::success("Configuration is valid."));

    Ok(())
}

fn cmd_render(config: &AppConfig, input: &Path, output: Option<&Path>) -> Result<()> {
    let jobs = render::plan(input, output)?;
    if jobs.is_empty() {
        println!("No HTML files found under {}", input.display());
        return Ok(());
    }

    let injector = FooterInjector::from_config(config)?;
    let summary = render::render(&injector, &jobs, jobs.len() > 1);

    println!(
        "{}",
        style::success(&format!("{} page(s) written", summary.written))
    );
    println!("  {}", style::dim(&injector.current_copyright()));
    if summary.failed > 0 {
        anyhow::bail!("{} page(s) failed to render", summary.failed);
    }
    Ok(())
}

fn cmd_authors(config: &AppConfig) -> Result<()> {
    let injector = FooterInjector::from_config(config)?;
    let mut resolver = injector.resolver();
    let authors = resolve_authors(&config.footer.authors, &mut resolver);
    let first_year = resolver.first_year();
    resolver.persist_or_warn();

    let current_year = chrono::Local::now().year();

    println!("{}", style::header("Authors"));
    if authors.is_empty() {
        println!("  {}", style::dim("(none)"));
    }
    for name in &authors {
        println!("  {}", name);
    }
    println!();
    println!("  First year : {}", first_year);
    println!(
        "  Head commit: {}",
        Some(resolver.summary().head_commit.as_str())
            .filter(|h| !h.is_empty())
            .unwrap_or("none")
    );
    println!("  Copyright  : {}", copyright_text(first_year, current_year, &authors));
    Ok(())
}

fn cmd_cache(config: &AppConfig, action: CacheAction) -> Result<()> {
    let cache = JsonFileCache::in_working_dir(&config.cache.path);

    match action {
        CacheAction::Show => match cache.load() {
            Some(summary) => {
                let json = serde_json::to_string_pretty(&summary)
                    .context("failed to format cache document")?;
                println!("{}", json);
            }
            None => println!("No usable cache at {}", cache.path().display()),
        },
        CacheAction::Clear => {
            cache.clear()?;
            println!(
                "{}",
                style::success(&format!("Removed {}", cache.path().display()))
            );
        }
    }
    Ok(())
}

async fn cmd_serve(
    mut config: AppConfig,
    listen: Option<String>,
    site_dir: Option<PathBuf>,
) -> Result<()> {
    if let Some(listen) = listen {
        config.server.listen = listen;
    }
    if let Some(site_dir) = site_dir {
        config.server.site_dir = site_dir;
    }
    if !config.server.site_dir.is_dir() {
        anyhow::bail!("site directory not found: {}", config.server.site_dir.display());
    }

    let injector = Arc::new(FooterInjector::from_config(&config)?);
    info!(repo = %config.footer.repo, "footer transform ready");

    WebServer::new(config.server.clone(), injector).start().await
}

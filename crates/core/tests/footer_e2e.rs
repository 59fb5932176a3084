//! End-to-end tests for the footer transform against real repositories.
//!
//! Each test builds a throwaway git repository with `git2`, points a
//! [`FooterInjector`] at it with a JSON cache file in the same temp dir, and
//! checks the rewritten HTML plus the cache document left behind.

use std::path::Path;

use chrono::Datelike;
use git2::{Oid, Repository, Signature, Time};
use tempfile::TempDir;

use gitfooter_core::cache::{CacheStore, JsonFileCache};
use gitfooter_core::config::{AppConfig, CrawlConfig, RepositoryLocation};
use gitfooter_core::footer::FooterInjector;
use gitfooter_core::models::AuthorIdentity;
use gitfooter_core::provenance::ProvenanceResolver;

// ===========================================================================
// Helpers
// ===========================================================================

const PAGE: &str = r#"<!DOCTYPE html>
<html>
<head><title>Docs</title></head>
<body>
<article>Body text</article>
<footer class="footer"><span id="copyright">placeholder</span></footer>
</body>
</html>"#;

fn commit(repo: &Repository, refname: &str, name: &str, email: &str, time: i64) -> Oid {
    let sig = Signature::new(name, email, &Time::new(time, 0)).unwrap();
    let tree_oid = repo.treebuilder(None).unwrap().write().unwrap();
    let tree = repo.find_tree(tree_oid).unwrap();
    let parent = repo
        .find_reference(refname)
        .ok()
        .and_then(|r| r.peel_to_commit().ok())
        .or_else(|| repo.head().ok().and_then(|h| h.peel_to_commit().ok()));
    let parents: Vec<&git2::Commit> = parent.iter().collect();
    repo.commit(Some(refname), &sig, &sig, "change", &tree, &parents)
        .unwrap()
}

/// Repository with two authors on HEAD and a third only on `docs`.
fn sample_repo(dir: &Path) -> Repository {
    let repo = Repository::init(dir).unwrap();
    // 2021-06-01
    commit(&repo, "HEAD", "Alice Smith", "alice@example.com", 1_622_505_600);
    let base = repo.head().unwrap().peel_to_commit().unwrap();
    repo.branch("docs", &base, false).unwrap();
    drop(base);
    commit(&repo, "HEAD", "bob", "bob@laptop.local", 1_640_995_200);
    commit(&repo, "refs/heads/docs", "Carol", "carol@example.com", 1_650_000_000);
    repo
}

fn config_for(repo_dir: &Path, cache_path: &Path, authors: &str) -> AppConfig {
    let toml_str = format!(
        r#"
[footer]
repo = "file://{repo}"
privacy_policy = "https://example.com/privacy"
authors = {authors}

[cache]
path = "{cache}"
"#,
        repo = repo_dir.display(),
        cache = cache_path.display(),
    );
    AppConfig::from_toml_str(&toml_str).unwrap()
}

struct Site {
    _tmp: TempDir,
    repo_dir: std::path::PathBuf,
    cache_path: std::path::PathBuf,
}

fn site() -> Site {
    let tmp = TempDir::new().unwrap();
    let repo_dir = tmp.path().join("repo");
    std::fs::create_dir(&repo_dir).unwrap();
    sample_repo(&repo_dir);
    let cache_path = tmp.path().join("cache.json");
    Site {
        _tmp: tmp,
        repo_dir,
        cache_path,
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[test]
fn test_git_authors_across_branches_with_mailmap() {
    let site = site();
    std::fs::write(
        site.repo_dir.join(".mailmap"),
        "Bob Jones <bob@example.com> <bob@laptop.local>\n",
    )
    .unwrap();

    let config = config_for(&site.repo_dir, &site.cache_path, "\"git\"");
    let injector = FooterInjector::from_config(&config).unwrap();
    let html = injector.apply_for_year("/guide/", PAGE, 2030).unwrap();

    let copyright = html
        .split(r#"<span id="copyright">"#)
        .nth(1)
        .and_then(|rest| rest.split("</span>").next())
        .unwrap();
    assert!(copyright.starts_with("©2021 - 2030 "));
    for name in ["Alice Smith", "Bob Jones", "Carol"] {
        assert!(copyright.contains(name), "missing {name} in {copyright}");
    }
    assert!(!copyright.contains("bob@"));
    assert!(html.contains(r#"href="https://example.com/privacy""#));
}

#[test]
fn test_cache_written_after_render() {
    let site = site();
    let config = config_for(&site.repo_dir, &site.cache_path, "\"git\"");
    let injector = FooterInjector::from_config(&config).unwrap();
    injector.apply_for_year("/", PAGE, 2030).unwrap();

    let stored = JsonFileCache::new(&site.cache_path).load().unwrap();
    let repo = Repository::open(&site.repo_dir).unwrap();
    let head = repo.head().unwrap().peel_to_commit().unwrap().id().to_string();
    assert_eq!(stored.head_commit, head);
    assert_eq!(stored.path, site.repo_dir.display().to_string());
    assert_eq!(stored.first_date.timestamp(), 1_622_505_600);
    assert_eq!(stored.authors.len(), 3);
}

#[test]
fn test_fresh_cache_used_by_next_process() {
    let site = site();
    let config = config_for(&site.repo_dir, &site.cache_path, "\"git\"");
    FooterInjector::from_config(&config)
        .unwrap()
        .apply_for_year("/", PAGE, 2030)
        .unwrap();

    // Mark the cache so its use is observable.
    let cache = JsonFileCache::new(&site.cache_path);
    let mut stored = cache.load().unwrap();
    stored.authors.insert(AuthorIdentity::new("From Cache", ""));
    cache.save(&stored).unwrap();

    let html = FooterInjector::from_config(&config)
        .unwrap()
        .apply_for_year("/", PAGE, 2030)
        .unwrap();
    assert!(html.contains("From Cache"));
}

#[test]
fn test_new_commit_invalidates_cache() {
    let site = site();
    let config = config_for(&site.repo_dir, &site.cache_path, "\"git\"");
    FooterInjector::from_config(&config)
        .unwrap()
        .apply_for_year("/", PAGE, 2030)
        .unwrap();

    let cache = JsonFileCache::new(&site.cache_path);
    let mut stored = cache.load().unwrap();
    stored.authors.insert(AuthorIdentity::new("From Cache", ""));
    cache.save(&stored).unwrap();

    let repo = Repository::open(&site.repo_dir).unwrap();
    commit(&repo, "HEAD", "Dan", "dan@example.com", 1_700_000_000);

    let html = FooterInjector::from_config(&config)
        .unwrap()
        .apply_for_year("/", PAGE, 2030)
        .unwrap();
    assert!(!html.contains("From Cache"));
    assert!(html.contains("Dan"));
}

#[test]
fn test_corrupt_cache_falls_back_to_crawl() {
    let site = site();
    std::fs::write(&site.cache_path, "not json at all").unwrap();
    let config = config_for(&site.repo_dir, &site.cache_path, "[\"Docs Team\"]");

    let html = FooterInjector::from_config(&config)
        .unwrap()
        .apply_for_year("/", PAGE, 2030)
        .unwrap();
    assert!(html.contains(">©2021 - 2030 Docs Team</span>"));
    assert!(JsonFileCache::new(&site.cache_path).load().is_some());
}

#[test]
fn test_missing_repository_still_renders() {
    let tmp = TempDir::new().unwrap();
    let cache_path = tmp.path().join("cache.json");
    let resolver = ProvenanceResolver::for_repository(
        RepositoryLocation::resolve("/nonexistent/repo", Path::new("/")),
        Box::new(JsonFileCache::new(&cache_path)),
        CrawlConfig::default(),
    );
    let config = config_for(Path::new("/nonexistent/repo"), &cache_path, "\"git\"");
    let injector = FooterInjector::new(config.footer.clone(), resolver);

    // No history: the first year is the current year and the list is empty.
    let year = chrono::Local::now().year();
    let html = injector.apply_for_year("/", PAGE, year).unwrap();
    assert!(html.contains(&format!(r#"<span id="copyright">©{year} </span>"#)));
}

#[test]
fn test_api_paths_are_not_decorated() {
    let site = site();
    let config = config_for(&site.repo_dir, &site.cache_path, "\"git\"");
    let injector = FooterInjector::from_config(&config).unwrap();
    assert!(!injector.should_apply("/api/search", Some("text/html")));
    assert!(injector.should_apply("/index.html", Some("text/html")));
}

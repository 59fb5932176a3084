//! Author list resolution for the copyright notice.

use tracing::{debug, info, warn};

use crate::config::AuthorSource;
use crate::identity::Mailmap;
use crate::models::{AuthorIdentity, OrderedSet};
use crate::provenance::ProvenanceResolver;

/// Display names for the notice, unique and in first-seen order.
///
/// With [`AuthorSource::Explicit`] the configured names are used as given.
/// With [`AuthorSource::Git`] the repository provenance is refreshed and
/// every known author is passed through the repository's `.mailmap`, if it
/// has one. A mailmap that cannot be read falls back to raw names.
pub fn resolve_authors(source: &AuthorSource, resolver: &mut ProvenanceResolver) -> Vec<String> {
    match source {
        AuthorSource::Explicit(names) => names.iter().cloned().collect::<OrderedSet<_>>().into_vec(),
        AuthorSource::Git => {
            let mailmap = match Mailmap::load(resolver.location().path()) {
                Ok(Some(mailmap)) => {
                    info!(entries = mailmap.len(), "found .mailmap");
                    Some(mailmap)
                }
                Ok(None) => None,
                Err(e) => {
                    warn!(error = %e, "error processing .mailmap, using raw author names");
                    None
                }
            };

            resolver.refresh();
            display_names(resolver.summary().authors.iter(), mailmap.as_ref())
        }
    }
}

/// Map identities to display names and deduplicate.
pub fn display_names<'a, I>(identities: I, mailmap: Option<&Mailmap>) -> Vec<String>
where
    I: IntoIterator<Item = &'a AuthorIdentity>,
{
    let mut names = OrderedSet::new();
    for identity in identities {
        let name = match mailmap {
            Some(map) => map.normalize(&identity.name, identity.email_or_empty()),
            None => identity.name.as_str(),
        };
        if names.insert(name.to_string()) {
            debug!(author = %identity, display = name, "added author");
        }
    }
    names.into_vec()
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;
    use crate::cache::MemoryCache;
    use crate::config::{CrawlConfig, RepositoryLocation};
    use crate::git::crawler::test_support::{commit, FakeHistory};

    fn resolver_for(dir: &Path, history: FakeHistory) -> ProvenanceResolver {
        ProvenanceResolver::new(
            RepositoryLocation::resolve(dir.to_str().unwrap(), Path::new("/")),
            Box::new(history),
            Box::new(MemoryCache::new()),
            CrawlConfig::default(),
        )
    }

    fn history() -> FakeHistory {
        FakeHistory::linear(vec![
            commit("c4", "alice", "alice@laptop", 400),
            commit("c3", "Bob", "bob@example.com", 300),
            commit("c2", "Alice Smith", "alice@example.com", 200),
            commit("c1", "Bob", "", 100),
        ])
    }

    #[test]
    fn test_explicit_list_deduplicated_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let mut resolver = resolver_for(dir.path(), history());
        let source = AuthorSource::Explicit(vec!["Zoe".into(), "Yan".into(), "Zoe".into()]);
        assert_eq!(resolve_authors(&source, &mut resolver), vec!["Zoe", "Yan"]);
        assert!(resolver.summary().head_commit.is_empty());
    }

    #[test]
    fn test_git_mode_without_mailmap_dedupes_raw_names() {
        let dir = tempfile::tempdir().unwrap();
        let mut resolver = resolver_for(dir.path(), history());
        assert_eq!(
            resolve_authors(&AuthorSource::Git, &mut resolver),
            vec!["alice", "Bob", "Alice Smith"]
        );
    }

    #[test]
    fn test_git_mode_with_mailmap_normalizes() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(".mailmap"),
            "Alice Smith <alice@example.com> <alice@laptop>\n",
        )
        .unwrap();
        let mut resolver = resolver_for(dir.path(), history());
        assert_eq!(
            resolve_authors(&AuthorSource::Git, &mut resolver),
            vec!["Alice Smith", "Bob"]
        );
    }

    #[test]
    fn test_unreadable_mailmap_falls_back_to_raw_names() {
        let dir = tempfile::tempdir().unwrap();
        // A directory where the file should be cannot be read as text.
        std::fs::create_dir(dir.path().join(".mailmap")).unwrap();
        let mut resolver = resolver_for(dir.path(), history());
        assert_eq!(
            resolve_authors(&AuthorSource::Git, &mut resolver),
            vec!["alice", "Bob", "Alice Smith"]
        );
    }
}

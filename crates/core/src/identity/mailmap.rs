//! `.mailmap` reader.
//!
//! Recognized line shapes (blank lines and `#` comments are skipped):
//!
//! ```text
//! Canonical Name <canonical@email> Alias Name <alias@email>
//! Canonical Name <canonical@email> <alias@email>
//! <canonical@email> <alias@email>
//! Canonical Name <alias@email>
//! Canonical Name <canonical@email> Alias Name
//! ```
//!
//! Every line yields at most one `email -> name` entry. Lines of any other
//! shape are dropped silently.

use std::collections::HashMap;
use std::path::Path;

use tracing::debug;

use crate::errors::MailmapError;

/// Email -> canonical display name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Mailmap {
    names: HashMap<String, String>,
}

#[derive(Debug, PartialEq, Eq)]
enum Token<'a> {
    Name(&'a str),
    Email(&'a str),
}

/// Split a line into name runs and `<...>` emails. `None` on an unclosed
/// or empty `<>`.
fn tokenize(line: &str) -> Option<Vec<Token<'_>>> {
    let mut tokens = Vec::new();
    let mut rest = line;
    while !rest.is_empty() {
        match rest.find('<') {
            Some(open) => {
                let name = rest[..open].trim();
                if !name.is_empty() {
                    tokens.push(Token::Name(name));
                }
                let after = &rest[open + 1..];
                let close = after.find('>')?;
                let email = after[..close].trim();
                if email.is_empty() {
                    return None;
                }
                tokens.push(Token::Email(email));
                rest = &after[close + 1..];
            }
            None => {
                let name = rest.trim();
                if !name.is_empty() {
                    tokens.push(Token::Name(name));
                }
                rest = "";
            }
        }
    }
    Some(tokens)
}

/// The `(key email, display name)` entry a line contributes, if any.
fn entry<'a>(tokens: &[Token<'a>]) -> Option<(&'a str, &'a str)> {
    use Token::{Email, Name};

    match tokens {
        // Canonical Name <canonical> Alias Name <alias>
        [Name(canon), Email(_), Name(_), Email(alias)] => Some((*alias, *canon)),
        // <canonical> Alias Name <alias>
        [Email(_), Name(name), Email(alias)] => Some((*alias, *name)),
        // Canonical Name <canonical> <alias>
        [Name(canon), Email(_), Email(alias)] => Some((*alias, *canon)),
        // <canonical> <alias>
        [Email(_), Email(alias)] => Some((*alias, "")),
        // Canonical Name <alias>
        [Name(canon), Email(alias)] => Some((*alias, *canon)),
        // Canonical Name <canonical> Alias Name
        [Name(canon), Email(canonical), Name(_)] => Some((*canonical, *canon)),
        _ => None,
    }
}

impl Mailmap {
    /// Parse mailmap text.
    pub fn parse(contents: &str) -> Self {
        let mut names = HashMap::new();
        for line in contents.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            match tokenize(line).as_deref().and_then(entry) {
                Some((email, name)) => {
                    names.insert(email.to_string(), name.to_string());
                }
                None => debug!(line, "ignoring unrecognized mailmap line"),
            }
        }
        Self { names }
    }

    /// Read `<repo>/.mailmap`. A missing file is `Ok(None)`.
    pub fn load(repo_path: &Path) -> Result<Option<Self>, MailmapError> {
        let path = repo_path.join(".mailmap");
        if !path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(&path).map_err(|source| MailmapError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let mailmap = Self::parse(&contents);
        debug!(path = %path.display(), entries = mailmap.len(), "loaded mailmap");
        Ok(Some(mailmap))
    }

    /// Display name for an author: the mapped name when `email` has a
    /// non-empty entry, otherwise `name` unchanged.
    pub fn normalize<'a>(&'a self, name: &'a str, email: &str) -> &'a str {
        match self.names.get(email) {
            Some(canonical) if !canonical.is_empty() => canonical.as_str(),
            _ => name,
        }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

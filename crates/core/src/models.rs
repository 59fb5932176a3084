//! Domain model types shared by the crawler, cache and footer transform.

use std::collections::HashSet;
use std::hash::Hash;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Commits
// ---------------------------------------------------------------------------

/// One commit as seen by the history crawl.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitRecord {
    pub id: String,
    pub author_name: String,
    /// Empty when the commit carries no email.
    pub author_email: String,
    /// Author timestamp in seconds since the epoch.
    pub author_time: i64,
}

impl CommitRecord {
    pub fn author(&self) -> AuthorIdentity {
        AuthorIdentity::new(&self.author_name, &self.author_email)
    }
}

// ---------------------------------------------------------------------------
// Author identities
// ---------------------------------------------------------------------------

/// A commit author as stored in the provenance summary.
///
/// An empty email is stored as `None`, so two identities are equal exactly
/// when their names match and their emails are both absent or both equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AuthorIdentity {
    pub name: String,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "empty_as_none"
    )]
    pub email: Option<String>,
}

fn empty_as_none<'de, D: serde::Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    let email = Option::<String>::deserialize(d)?;
    Ok(email.filter(|e| !e.is_empty()))
}

impl AuthorIdentity {
    pub fn new(name: &str, email: &str) -> Self {
        Self {
            name: name.to_string(),
            email: (!email.is_empty()).then(|| email.to_string()),
        }
    }

    /// Email as a plain string, empty when absent.
    pub fn email_or_empty(&self) -> &str {
        self.email.as_deref().unwrap_or("")
    }
}

impl std::fmt::Display for AuthorIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.email {
            Some(email) => write!(f, "{} <{}>", self.name, email),
            None => write!(f, "{}", self.name),
        }
    }
}

// ---------------------------------------------------------------------------
// Ordered set
// ---------------------------------------------------------------------------

/// Insertion-ordered set: O(1) membership, iteration in first-seen order.
#[derive(Debug, Clone)]
pub struct OrderedSet<T> {
    items: Vec<T>,
    seen: HashSet<T>,
}

impl<T: Eq + Hash + Clone> OrderedSet<T> {
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            seen: HashSet::new(),
        }
    }

    /// Insert `item`; returns `false` if it was already present.
    pub fn insert(&mut self, item: T) -> bool {
        if self.seen.contains(&item) {
            return false;
        }
        self.seen.insert(item.clone());
        self.items.push(item);
        true
    }

    pub fn contains(&self, item: &T) -> bool {
        self.seen.contains(item)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    pub fn into_vec(self) -> Vec<T> {
        self.items
    }
}

impl<T: Eq + Hash + Clone> Default for OrderedSet<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Eq + Hash + Clone> FromIterator<T> for OrderedSet<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut set = Self::new();
        for item in iter {
            set.insert(item);
        }
        set
    }
}

impl<T: PartialEq> PartialEq for OrderedSet<T> {
    fn eq(&self, other: &Self) -> bool {
        self.items == other.items
    }
}

impl<T: Eq> Eq for OrderedSet<T> {}

impl<T: Serialize> Serialize for OrderedSet<T> {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.items.serialize(serializer)
    }
}

impl<'de, T> Deserialize<'de> for OrderedSet<T>
where
    T: Deserialize<'de> + Eq + Hash + Clone,
{
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let items = Vec::<T>::deserialize(deserializer)?;
        Ok(items.into_iter().collect())
    }
}

/// Unique commit authors in first-seen order.
pub type AuthorSet = OrderedSet<AuthorIdentity>;

// ---------------------------------------------------------------------------
// Provenance summary
// ---------------------------------------------------------------------------

/// Derived facts about a repository, persisted between runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvenanceSummary {
    pub path: String,
    #[serde(rename = "headrev")]
    pub head_commit: String,
    pub authors: AuthorSet,
    #[serde(rename = "firstDate")]
    pub first_date: DateTime<Utc>,
}

impl ProvenanceSummary {
    /// A summary with no history yet; `first_date` starts at `now` so any
    /// crawled commit lowers it.
    pub fn empty(path: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            path: path.into(),
            head_commit: String::new(),
            authors: AuthorSet::new(),
            first_date: now,
        }
    }

    /// Fold commits into the summary.
    ///
    /// Commits are deduplicated by id; `first_date` only ever moves earlier
    /// and new author identities are appended after the ones already known.
    /// Returns the number of distinct commits seen.
    pub fn absorb<'a, I>(&mut self, commits: I) -> usize
    where
        I: IntoIterator<Item = &'a CommitRecord>,
    {
        let mut ids: HashSet<&str> = HashSet::new();
        for commit in commits {
            if !ids.insert(commit.id.as_str()) {
                continue;
            }
            if commit.author_time < self.first_date.timestamp() {
                if let Some(date) = Utc.timestamp_opt(commit.author_time, 0).single() {
                    self.first_date = date;
                }
            }
            self.authors.insert(commit.author());
        }
        ids.len()
    }

    /// Earliest commit date truncated to whole seconds.
    pub fn first_date_secs(&self) -> i64 {
        self.first_date.timestamp()
    }
}

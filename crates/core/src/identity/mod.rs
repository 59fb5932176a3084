//! Author identity canonicalization.
//!
//! Repositories may carry a `.mailmap` that folds several commit identities
//! into one display name. [`Mailmap`] parses that file and rewrites author
//! names before they reach the copyright notice.

pub mod mailmap;

pub use mailmap::Mailmap;

//! gitfooter core library.
//!
//! This crate derives a copyright notice from a repository's commit history
//! and injects it into rendered HTML: configuration, history crawling,
//! mailmap normalization, the provenance cache, author aggregation, and the
//! footer rewrite.

pub mod authors;
pub mod cache;
pub mod config;
pub mod errors;
pub mod footer;
pub mod git;
pub mod identity;
pub mod models;
pub mod provenance;

// Re-exports for convenience.
pub use config::AppConfig;
pub use footer::FooterInjector;
pub use identity::Mailmap;
pub use provenance::ProvenanceResolver;

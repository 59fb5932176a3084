//! Git history access for gitfooter.

pub mod client;
pub mod crawler;

pub use client::{CommitSource, GitClient};
pub use crawler::{CrawlReport, HistoryCrawler};

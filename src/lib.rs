//! Huginn - link preview metadata with a bounded cache
//!
//! This crate answers "what should the preview card for this URL show?"
//! It keeps a bounded, insertion-ordered cache of page metadata (title,
//! description, image), fetches misses through a pluggable
//! [`MetadataFetcher`] with at most one fetch outstanding, and gives up on
//! a fetch after a fixed deadline so callers can always fall back to a
//! plain link.
//!
//! # Example
//!
//! ```rust,no_run
//! use huginn::Huginn;
//! use huginn::fetch::HttpFetcherConfig;
//!
//! #[tokio::main]
//! async fn main() -> huginn::Result<()> {
//!     let previews = Huginn::builder()
//!         .http(HttpFetcherConfig::default())
//!         .capacity(100)
//!         .build()?;
//!
//!     match previews.lookup("https://www.rust-lang.org").await {
//!         Some(metadata) => println!("{:?}", metadata.title),
//!         None => println!("no preview"),
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Bringing your own scraper
//!
//! When pages must be rendered elsewhere (a hidden web view, a UI thread,
//! another process), use a [`FetchBridge`](fetch::FetchBridge) and answer
//! requests from the host side, or implement [`MetadataFetcher`] directly.

pub mod cache;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod fetch;
pub mod telemetry;
pub mod types;

// Re-export main types at crate root
pub use config::PreviewConfig;
pub use coordinator::{Huginn, HuginnBuilder, Lookup, MetadataCoordinator};
pub use error::{HuginnError, Result};
pub use fetch::MetadataFetcher;
pub use types::{CacheEntry, ImageRef, LinkMetadata};

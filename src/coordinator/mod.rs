//! Metadata cache coordinator.
//!
//! [`MetadataCoordinator`] answers "metadata for URL X" from its bounded
//! cache, or by asking its [`MetadataFetcher`](crate::MetadataFetcher) with
//! at most one fetch outstanding at a time. Build one with
//! [`Huginn::builder()`].

mod builder;
mod flight;
mod handle;
mod lookup;

pub use builder::{Huginn, HuginnBuilder};
pub use handle::MetadataCoordinator;
pub use lookup::Lookup;

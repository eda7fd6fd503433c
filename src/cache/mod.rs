//! Caching subsystem.
//!
//! [`MetadataStore`] is the bounded URL → metadata map owned by a
//! [`MetadataCoordinator`](crate::MetadataCoordinator). It is a plain,
//! single-owner data structure; the coordinator serializes access to it.
//!
//! Eviction is first-in first-out: when the store is full, the entry that
//! was inserted earliest goes, regardless of how recently it was read.

pub mod store;

pub use store::{Insertion, MetadataStore};

/// Default maximum number of cached URLs.
pub const DEFAULT_CAPACITY: usize = 100;

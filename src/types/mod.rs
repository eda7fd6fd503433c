//! Public types for the Huginn API.

mod metadata;

pub use metadata::{CacheEntry, ImageRef, LinkMetadata};

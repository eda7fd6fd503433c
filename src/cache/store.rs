//! Bounded, insertion-ordered metadata store.

use std::collections::{HashMap, VecDeque};

use crate::types::{CacheEntry, LinkMetadata};

/// Outcome of [`MetadataStore::insert`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Insertion {
    /// Metadata had no usable field; the store is unchanged.
    Rejected,
    /// The URL was already cached; its value was replaced in place.
    Replaced,
    /// A new entry was added, possibly evicting the oldest one.
    Inserted { evicted: Option<String> },
}

/// Bounded URL → metadata map with FIFO eviction.
///
/// Invariants:
/// - `len() <= capacity()`
/// - every stored record is [usable](LinkMetadata::is_usable)
#[derive(Debug, Clone)]
pub struct MetadataStore {
    entries: HashMap<String, LinkMetadata>,
    order: VecDeque<String>,
    capacity: usize,
}

impl MetadataStore {
    /// Create an empty store holding at most `capacity` entries.
    ///
    /// A zero capacity is raised to one; [`PreviewConfig::validate`](crate::PreviewConfig::validate)
    /// rejects it before it gets here.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: HashMap::with_capacity(capacity),
            order: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Look up a URL. Reads do not affect eviction order.
    pub fn get(&self, url: &str) -> Option<&LinkMetadata> {
        self.entries.get(url)
    }

    pub fn contains(&self, url: &str) -> bool {
        self.entries.contains_key(url)
    }

    /// Insert metadata for `url`, evicting the oldest entry if the store is full.
    pub fn insert(&mut self, url: impl Into<String>, metadata: LinkMetadata) -> Insertion {
        if !metadata.is_usable() {
            return Insertion::Rejected;
        }

        let url = url.into();
        if let Some(existing) = self.entries.get_mut(&url) {
            *existing = metadata;
            return Insertion::Replaced;
        }

        let evicted = if self.order.len() >= self.capacity {
            self.order.pop_front().inspect(|oldest| {
                self.entries.remove(oldest);
            })
        } else {
            None
        };

        self.order.push_back(url.clone());
        self.entries.insert(url, metadata);
        Insertion::Inserted { evicted }
    }

    /// Snapshot of all entries, oldest first.
    pub fn entries(&self) -> Vec<CacheEntry> {
        self.order
            .iter()
            .filter_map(|url| {
                self.entries.get(url).map(|metadata| CacheEntry {
                    url: url.clone(),
                    metadata: metadata.clone(),
                })
            })
            .collect()
    }

    /// Cached URLs, oldest first.
    pub fn urls(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Evict all entries.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }
}

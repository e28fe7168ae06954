//! In-process keyword volume cache
//!
//! Every successful lookup is memoized for the life of the process and
//! shared by all jobs. Entries never expire and are never invalidated;
//! fallback (zero) results are never stored, so a keyword that failed once
//! is retried by the next independent lookup.
//!
//! # Example
//!
//! ```rust
//! use searchvol::cache::{CachedLookup, VolumeCache};
//! use searchvol::models::KeywordVolume;
//!
//! let cache = VolumeCache::new();
//! cache.insert("dune", CachedLookup::new(KeywordVolume::new("dune", 10, 20), vec![]));
//! assert_eq!(cache.get("dune").unwrap().volume.total(), 30);
//! ```

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock};

use crate::models::KeywordVolume;

/// A memoized lookup: the volume plus the related terms it reported
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedLookup {
    pub volume: KeywordVolume,
    pub related_terms: Vec<String>,
}

impl CachedLookup {
    pub fn new(volume: KeywordVolume, related_terms: Vec<String>) -> Self {
        Self {
            volume,
            related_terms,
        }
    }
}

/// Cache statistics
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CacheStats {
    /// Total cache hits
    pub hits: u64,
    /// Total cache misses
    pub misses: u64,
    /// Number of cached keywords
    pub entries: usize,
}

impl CacheStats {
    /// Calculate hit rate
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Process-wide keyword → lookup memo
#[derive(Debug, Default)]
pub struct VolumeCache {
    entries: RwLock<HashMap<String, CachedLookup>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl VolumeCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a cached lookup, counting the hit or miss
    pub fn get(&self, keyword: &str) -> Option<CachedLookup> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        let found = entries.get(keyword).cloned();

        if found.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
            tracing::trace!(keyword, "Volume cache hit");
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
        }

        found
    }

    /// Store a lookup
    ///
    /// The first write for a keyword wins; returns `false` if the keyword was
    /// already cached. Concurrent writers for the same keyword carry equal
    /// values, so which one lands is irrelevant.
    pub fn insert(&self, keyword: impl Into<String>, entry: CachedLookup) -> bool {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        match entries.entry(keyword.into()) {
            std::collections::hash_map::Entry::Occupied(_) => false,
            std::collections::hash_map::Entry::Vacant(slot) => {
                slot.insert(entry);
                true
            }
        }
    }

    /// Check for a keyword without touching the statistics
    pub fn contains(&self, keyword: &str) -> bool {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(keyword)
    }

    /// Number of cached keywords
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Current statistics
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.len(),
        }
    }
}

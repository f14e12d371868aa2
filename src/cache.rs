//! In-memory caches owned by a handler instance
//!
//! The artifact cache holds fully materialized (possibly compressed)
//! response bodies, one shard per content coding, keyed by absolute path.
//! Admission is gated by the configured size threshold; there is no TTL
//! and no eviction, entries are only ever replaced by newer
//! materializations of the same path. The index memo remembers rewrite
//! targets produced by index resolution.

use crate::models::{Artifact, ContentCoding};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use tracing::debug;

/// Cache statistics for monitoring
#[derive(Debug, Clone)]
pub struct CacheStats {
    pub entries: usize,
    pub bytes: usize,
    pub hits: u64,
    pub misses: u64,
}

/// Per-encoding sharded artifact cache.
pub struct ArtifactCache {
    shards: [RwLock<HashMap<String, Arc<Artifact>>>; ContentCoding::COUNT],
    hits: AtomicU64,
    misses: AtomicU64,
}

impl ArtifactCache {
    pub fn new() -> Self {
        ArtifactCache {
            shards: std::array::from_fn(|_| RwLock::new(HashMap::new())),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Look up a cached artifact by `(path, coding)`.
    pub fn lookup(&self, path: &str, coding: ContentCoding) -> Option<Arc<Artifact>> {
        let found = match self.shards[coding.shard()].read() {
            Ok(shard) => shard.get(path).cloned(),
            Err(_) => None,
        };
        match &found {
            Some(artifact) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                debug!(
                    path,
                    coding = ?coding,
                    size = artifact.bytes.len(),
                    "artifact cache hit"
                );
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                debug!(path, coding = ?coding, "artifact cache miss");
            }
        }
        found
    }

    /// Insert an artifact into the shard matching its coding.
    ///
    /// Replaces any previous entry for the path atomically; concurrent
    /// duplicate inserts are benign, the last writer wins.
    pub fn insert(&self, artifact: Artifact) {
        let shard_index = artifact.encoding.shard();
        if let Ok(mut shard) = self.shards[shard_index].write() {
            debug!(
                path = %artifact.path,
                coding = ?artifact.encoding,
                size = artifact.bytes.len(),
                "caching artifact"
            );
            shard.insert(artifact.path.clone(), Arc::new(artifact));
        }
    }

    /// Drop every cached artifact.
    pub fn clear(&self) {
        for shard in &self.shards {
            if let Ok(mut shard) = shard.write() {
                shard.clear();
            }
        }
    }

    /// Snapshot entry/byte counts and hit/miss counters.
    pub fn stats(&self) -> CacheStats {
        let mut entries = 0;
        let mut bytes = 0;
        for shard in &self.shards {
            if let Ok(shard) = shard.read() {
                entries += shard.len();
                bytes += shard.values().map(|a| a.bytes.len()).sum::<usize>();
            }
        }
        CacheStats {
            entries,
            bytes,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

impl Default for ArtifactCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Memo of index-resolution outcomes, keyed by the decoded URL as
/// requested (before trailing-slash stripping).
pub struct IndexMemo {
    inner: RwLock<HashMap<String, String>>,
}

impl IndexMemo {
    pub fn new() -> Self {
        IndexMemo {
            inner: RwLock::new(HashMap::new()),
        }
    }

    pub fn get(&self, url: &str) -> Option<String> {
        match self.inner.read() {
            Ok(memo) => memo.get(url).cloned(),
            Err(_) => None,
        }
    }

    pub fn insert(&self, url: String, target: String) {
        if let Ok(mut memo) = self.inner.write() {
            memo.insert(url, target);
        }
    }

    pub fn clear(&self) {
        if let Ok(mut memo) = self.inner.write() {
            memo.clear();
        }
    }
}

impl Default for IndexMemo {
    fn default() -> Self {
        Self::new()
    }
}

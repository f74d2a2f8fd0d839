//! # BlockCache
//!
//! An in-process, byte-budgeted cache for decoded [`blockcodec`](https://docs.rs/blockcodec)
//! blocks, keyed by `(file id, on-disk offset)`.
//!
//! Blocks are split across three priority bands, mirroring the way a real
//! HFile block cache partitions its capacity so that a single cold scan can't
//! evict the index/bloom blocks every reader depends on:
//!
//! - **single-access** — a block's home on its first cache hit.
//! - **multi-access** — promoted here the first time a single-access block is
//!   requested again. Scan-resistant: a one-off full-table scan only ever
//!   touches the single-access band.
//! - **in-memory** — reserved for blocks the caller marks `important`
//!   (index and bloom blocks), regardless of whether the owning family has
//!   data-block caching enabled. Evicted last.
//!
//! Each band gets a fixed byte budget (a fraction of the cache's total
//! capacity) and evicts its own least-recently-used entries when a new block
//! would push it over budget. A band never steals budget from another.

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::Arc;

use lru::LruCache;
use parking_lot::Mutex;

/// Identifies a cached block by the SortedFile it came from and its on-disk offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub file_id: u64,
    pub block_offset: u64,
}

impl CacheKey {
    #[must_use]
    pub fn new(file_id: u64, block_offset: u64) -> Self {
        Self { file_id, block_offset }
    }
}

/// Priority band a cached block lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Priority {
    SingleAccess,
    MultiAccess,
    InMemory,
}

/// Capacity configuration for a [`BlockCache`].
#[derive(Debug, Clone, Copy)]
pub struct CacheConfig {
    pub capacity_bytes: u64,
    /// Fraction of `capacity_bytes` reserved for the single-access band.
    pub single_access_fraction: f64,
    /// Fraction of `capacity_bytes` reserved for the multi-access band.
    pub multi_access_fraction: f64,
    /// Fraction of `capacity_bytes` reserved for the in-memory band.
    pub in_memory_fraction: f64,
}

impl CacheConfig {
    /// 128 MiB total, split 25/50/25 across single/multi/in-memory — the
    /// same default split a real HFile block cache uses.
    #[must_use]
    pub fn with_capacity(capacity_bytes: u64) -> Self {
        Self {
            capacity_bytes,
            single_access_fraction: 0.25,
            multi_access_fraction: 0.50,
            in_memory_fraction: 0.25,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self::with_capacity(128 * 1024 * 1024)
    }
}

#[derive(Debug, Clone)]
struct CachedBlock {
    bytes: Arc<Vec<u8>>,
}

impl CachedBlock {
    fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

struct Band {
    entries: LruCache<CacheKey, CachedBlock>,
    bytes_used: u64,
    budget_bytes: u64,
}

impl Band {
    fn new(budget_bytes: u64) -> Self {
        Self {
            // Unbounded by count; eviction is driven by `budget_bytes` instead.
            entries: LruCache::new(NonZeroUsize::new(usize::MAX).unwrap()),
            bytes_used: 0,
            budget_bytes,
        }
    }

    fn evict_to_fit(&mut self, incoming_size: u64, evictions: &mut u64) {
        while self.bytes_used + incoming_size > self.budget_bytes {
            let Some((_, evicted)) = self.entries.pop_lru() else {
                break;
            };
            self.bytes_used -= evicted.size();
            *evictions += 1;
        }
    }

    fn insert(&mut self, key: CacheKey, block: CachedBlock, evictions: &mut u64) {
        let size = block.size();
        if let Some(old) = self.entries.peek(&key) {
            self.bytes_used -= old.size();
        }
        self.evict_to_fit(size, evictions);
        self.entries.put(key, block);
        self.bytes_used += size;
    }

    fn remove(&mut self, key: &CacheKey) -> Option<CachedBlock> {
        let removed = self.entries.pop(key);
        if let Some(b) = &removed {
            self.bytes_used -= b.size();
        }
        removed
    }
}

/// Running counters for cache effectiveness, in HFile block cache terms.
#[derive(Debug, Clone, Copy, Default)]
pub struct CacheStats {
    pub hit_count: u64,
    pub miss_count: u64,
    pub eviction_count: u64,
    /// Hits and misses restricted to requests where the caller asked for
    /// caching (`caching = true`); a scan that opts out of caching doesn't
    /// count against the ratio callers actually care about.
    pub caching_hit_count: u64,
    pub caching_request_count: u64,
}

impl CacheStats {
    #[must_use]
    pub fn hit_percent(&self) -> f64 {
        let total = self.hit_count + self.miss_count;
        if total == 0 { 0.0 } else { self.hit_count as f64 / total as f64 * 100.0 }
    }

    #[must_use]
    pub fn caching_hit_percent(&self) -> f64 {
        if self.caching_request_count == 0 {
            0.0
        } else {
            self.caching_hit_count as f64 / self.caching_request_count as f64 * 100.0
        }
    }
}

/// A point-in-time snapshot of cache occupancy and effectiveness.
#[derive(Debug, Clone, Copy)]
pub struct CacheMetrics {
    pub size_bytes: u64,
    pub free_bytes: u64,
    pub block_count: u64,
    pub stats: CacheStats,
}

struct Inner {
    single: Band,
    multi: Band,
    memory: Band,
    /// Tracks which band each cached key currently lives in, and which file
    /// each key belongs to, so `invalidate_file` doesn't need a linear scan
    /// per band.
    locations: HashMap<CacheKey, Priority>,
    files: HashMap<u64, std::collections::HashSet<CacheKey>>,
    stats: CacheStats,
}

/// A byte-budgeted, priority-banded block cache shared by every open
/// SortedFile reader in a process.
pub struct BlockCache {
    inner: Mutex<Inner>,
    capacity_bytes: u64,
}

impl BlockCache {
    #[must_use]
    pub fn new(config: CacheConfig) -> Self {
        let single_budget = (config.capacity_bytes as f64 * config.single_access_fraction) as u64;
        let multi_budget = (config.capacity_bytes as f64 * config.multi_access_fraction) as u64;
        let memory_budget = (config.capacity_bytes as f64 * config.in_memory_fraction) as u64;
        Self {
            inner: Mutex::new(Inner {
                single: Band::new(single_budget),
                multi: Band::new(multi_budget),
                memory: Band::new(memory_budget),
                locations: HashMap::new(),
                files: HashMap::new(),
                stats: CacheStats::default(),
            }),
            capacity_bytes: config.capacity_bytes,
        }
    }

    /// Looks up `key`. Promotes a single-access hit to the multi-access band.
    ///
    /// `caching` should reflect the caller's intent to populate the cache on
    /// miss (e.g. a full scan might pass `false`); it only affects which
    /// bucket the hit/miss is counted against in [`CacheStats`].
    #[must_use]
    pub fn get(&self, key: &CacheKey, caching: bool) -> Option<Arc<Vec<u8>>> {
        let mut inner = self.inner.lock();

        let found = match inner.locations.get(key).copied() {
            Some(Priority::SingleAccess) => inner.single.entries.peek(key).map(|b| b.bytes.clone()),
            Some(Priority::MultiAccess) => inner.multi.entries.get(key).map(|b| b.bytes.clone()),
            Some(Priority::InMemory) => inner.memory.entries.get(key).map(|b| b.bytes.clone()),
            None => None,
        };

        if caching {
            inner.stats.caching_request_count += 1;
        }

        let Some(bytes) = found else {
            inner.stats.miss_count += 1;
            return None;
        };
        inner.stats.hit_count += 1;
        if caching {
            inner.stats.caching_hit_count += 1;
        }

        if matches!(inner.locations.get(key), Some(Priority::SingleAccess)) {
            let mut evictions = 0u64;
            if let Some(block) = inner.single.remove(key) {
                inner.multi.insert(*key, block, &mut evictions);
                inner.locations.insert(*key, Priority::MultiAccess);
            }
            inner.stats.eviction_count += evictions;
        }

        Some(bytes)
    }

    /// Inserts a block. `important` routes index/bloom blocks into the
    /// in-memory band unconditionally, independent of any per-family
    /// data-block-caching setting the caller applies before calling this.
    pub fn insert(&self, key: CacheKey, bytes: Arc<Vec<u8>>, important: bool) {
        let mut inner = self.inner.lock();
        if inner.locations.contains_key(&key) {
            return;
        }
        let block = CachedBlock { bytes };
        let priority = if important { Priority::InMemory } else { Priority::SingleAccess };
        let mut evictions = 0u64;
        match priority {
            Priority::SingleAccess => inner.single.insert(key, block, &mut evictions),
            Priority::MultiAccess => inner.multi.insert(key, block, &mut evictions),
            Priority::InMemory => inner.memory.insert(key, block, &mut evictions),
        }
        inner.stats.eviction_count += evictions;
        inner.locations.insert(key, priority);
        inner.files.entry(key.file_id).or_default().insert(key);
    }

    /// Drops every cached block belonging to `file_id`. Called when a
    /// SortedFile is deleted by compaction or archived.
    pub fn invalidate_file(&self, file_id: u64) {
        let mut inner = self.inner.lock();
        let Some(keys) = inner.files.remove(&file_id) else {
            return;
        };
        for key in keys {
            match inner.locations.remove(&key) {
                Some(Priority::SingleAccess) => { inner.single.remove(&key); }
                Some(Priority::MultiAccess) => { inner.multi.remove(&key); }
                Some(Priority::InMemory) => { inner.memory.remove(&key); }
                None => {}
            }
        }
    }

    #[must_use]
    pub fn metrics(&self) -> CacheMetrics {
        let inner = self.inner.lock();
        let size_bytes = inner.single.bytes_used + inner.multi.bytes_used + inner.memory.bytes_used;
        CacheMetrics {
            size_bytes,
            free_bytes: self.capacity_bytes.saturating_sub(size_bytes),
            block_count: inner.locations.len() as u64,
            stats: inner.stats,
        }
    }
}

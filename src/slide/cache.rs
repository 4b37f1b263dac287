//! Cache of decoded slide blocks.
//!
//! The extractor steps over a series in 448 pixel regions, while slides store
//! 240, 256 or 512 pixel tiles (or full-width strips). Neighbouring regions
//! therefore share storage blocks, and without a cache every shared block
//! would be read and decompressed twice or more.
//!
//! Entries are evicted least-recently-used once the decoded byte total
//! exceeds the capacity.

use std::num::NonZeroUsize;
use std::sync::Arc;

use image::RgbImage;
use lru::LruCache;
use tokio::sync::Mutex;

/// Default capacity: 64MB of decoded RGB pixels
pub const DEFAULT_DECODED_CACHE_CAPACITY: usize = 64 * 1024 * 1024;

/// Upper bound on entries, independent of their size
const MAX_ENTRIES: usize = 4096;

/// A storage block of one series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockKey {
    pub series: usize,
    pub block: usize,
}

struct Entries {
    lru: LruCache<BlockKey, Arc<RgbImage>>,
    bytes: usize,
}

/// Size-bounded LRU of decoded blocks.
pub struct DecodedBlockCache {
    entries: Mutex<Entries>,
    max_bytes: usize,
}

impl DecodedBlockCache {
    /// Create a cache with the default capacity.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_DECODED_CACHE_CAPACITY)
    }

    /// Create a cache holding at most `max_bytes` of decoded pixels.
    pub fn with_capacity(max_bytes: usize) -> Self {
        let max_entries = NonZeroUsize::new(MAX_ENTRIES).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(Entries {
                lru: LruCache::new(max_entries),
                bytes: 0,
            }),
            max_bytes,
        }
    }

    /// Largest decoded byte total the cache holds.
    pub fn capacity(&self) -> usize {
        self.max_bytes
    }

    /// Get a block, marking it as recently used.
    pub async fn get(&self, key: &BlockKey) -> Option<Arc<RgbImage>> {
        self.entries.lock().await.lru.get(key).cloned()
    }

    /// Insert a block, evicting older blocks to stay under capacity.
    ///
    /// A block larger than the whole capacity is not cached.
    pub async fn put(&self, key: BlockKey, block: Arc<RgbImage>) {
        let size = block.as_raw().len();
        if size > self.max_bytes {
            return;
        }

        let mut entries = self.entries.lock().await;
        if let Some(old) = entries.lru.pop(&key) {
            entries.bytes = entries.bytes.saturating_sub(old.as_raw().len());
        }
        if entries.lru.len() == MAX_ENTRIES {
            if let Some((_, evicted)) = entries.lru.pop_lru() {
                entries.bytes = entries.bytes.saturating_sub(evicted.as_raw().len());
            }
        }
        entries.lru.put(key, block);
        entries.bytes += size;

        while entries.bytes > self.max_bytes {
            match entries.lru.pop_lru() {
                Some((_, evicted)) => {
                    entries.bytes = entries.bytes.saturating_sub(evicted.as_raw().len());
                }
                None => {
                    entries.bytes = 0;
                    break;
                }
            }
        }
    }

    /// Number of cached blocks.
    pub async fn len(&self) -> usize {
        self.entries.lock().await.lru.len()
    }

    /// Total decoded bytes currently held.
    pub async fn size(&self) -> usize {
        self.entries.lock().await.bytes
    }
}

impl Default for DecodedBlockCache {
    fn default() -> Self {
        Self::new()
    }
}

use std::num::NonZeroUsize;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use lru::LruCache;
use tokio::sync::Mutex;

use super::range_reader::{check_range, RangeReader};
use crate::error::IoError;

/// Default block size: 64KB.
///
/// Large enough to hold a whole classic-TIFF directory or a typical
/// TileOffsets array in one read.
pub const DEFAULT_BLOCK_SIZE: usize = 64 * 1024;

/// Default cache capacity in number of blocks.
pub const DEFAULT_BLOCK_CACHE_CAPACITY: usize = 64;

/// Block-based caching layer that wraps any RangeReader.
///
/// Directory parsing issues many small reads at scattered offsets (entry
/// counts, entries, out-of-line tag values). The cache turns those into
/// block-aligned reads of the inner reader and keeps recent blocks in an LRU.
///
/// Reads longer than one block (compressed tile payloads) go straight to the
/// inner reader so that they do not evict directory blocks.
pub struct BlockCache<R> {
    inner: R,
    block_size: usize,
    cache: Mutex<LruCache<u64, Bytes>>,
}

impl<R: RangeReader> BlockCache<R> {
    /// Create a new BlockCache with the default block size and capacity.
    pub fn new(inner: R) -> Self {
        Self::with_capacity(inner, DEFAULT_BLOCK_SIZE, DEFAULT_BLOCK_CACHE_CAPACITY)
    }

    /// Create a new BlockCache with custom block size and capacity.
    ///
    /// A zero capacity is treated as a capacity of one block.
    pub fn with_capacity(inner: R, block_size: usize, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner,
            block_size: block_size.max(1),
            cache: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Access the wrapped reader.
    pub fn inner(&self) -> &R {
        &self.inner
    }

    async fn get_block(&self, block_idx: u64) -> Result<Bytes, IoError> {
        if let Some(block) = self.cache.lock().await.get(&block_idx) {
            return Ok(block.clone());
        }

        let offset = block_idx * self.block_size as u64;
        let remaining = self.inner.size().saturating_sub(offset);
        let len = remaining.min(self.block_size as u64) as usize;
        let block = self.inner.read_exact_at(offset, len).await?;

        self.cache.lock().await.put(block_idx, block.clone());
        Ok(block)
    }
}

#[async_trait]
impl<R: RangeReader> RangeReader for BlockCache<R> {
    async fn read_exact_at(&self, offset: u64, len: usize) -> Result<Bytes, IoError> {
        check_range(offset, len, self.inner.size())?;

        if len == 0 {
            return Ok(Bytes::new());
        }
        if len > self.block_size {
            return self.inner.read_exact_at(offset, len).await;
        }

        let block_size = self.block_size as u64;
        let start_block = offset / block_size;
        let end_block = (offset + len as u64 - 1) / block_size;

        if start_block == end_block {
            let block = self.get_block(start_block).await?;
            let start = (offset % block_size) as usize;
            return Ok(block.slice(start..start + len));
        }

        let mut out = BytesMut::with_capacity(len);
        let mut cursor = offset;
        for block_idx in start_block..=end_block {
            let block = self.get_block(block_idx).await?;
            let start = (cursor % block_size) as usize;
            let take = (block.len() - start).min(len - out.len());
            out.extend_from_slice(&block[start..start + take]);
            cursor += take as u64;
        }

        Ok(out.freeze())
    }

    fn size(&self) -> u64 {
        self.inner.size()
    }

    fn identifier(&self) -> &str {
        self.inner.identifier()
    }
}

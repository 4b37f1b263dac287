//! TIFF / BigTIFF slide reader.
//!
//! Every image directory of the file is one series, in file order. For an
//! Aperio SVS file that is the full resolution level, the thumbnail, the
//! reduced levels, then the label and macro images; for a generic pyramidal
//! TIFF it is the levels from largest to smallest.
//!
//! # Region reads
//!
//! ```text
//!   block grid (tiles or strips)         requested region
//!   ┌──────┬──────┬──────┐
//!   │      │  ┌───┼──┐   │               ┌──────┐
//!   ├──────┼──┼───┼──┼───┤      ──►      │      │
//!   │      │  └───┼──┘   │               └──────┘
//!   └──────┴──────┴──────┘
//! ```
//!
//! Each covering block is fetched (through the decoded-block cache), decoded
//! to RGB, and the overlapping rows are copied into the output buffer.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use image::RgbImage;
use tracing::{debug, warn};

use super::cache::{BlockKey, DecodedBlockCache};
use super::reader::{SeriesInfo, SlideReader};
use crate::error::{SlideError, TiffError};
use crate::format::decode_block;
use crate::format::tiff::{ImageDirectory, TiffFile};
use crate::io::{BlockCache, FileRangeReader, RangeReader};

/// Channels of every region returned by [`TiffSlide`]
const RGB_CHANNELS: u32 = 3;

/// A slide backed by a TIFF or BigTIFF container.
pub struct TiffSlide<R> {
    reader: R,
    tiff: TiffFile,
    blocks: DecodedBlockCache,
}

impl TiffSlide<BlockCache<FileRangeReader>> {
    /// Open a slide file from the local filesystem.
    pub async fn open_path(path: impl AsRef<Path>) -> Result<Self, SlideError> {
        let file = FileRangeReader::open(path).await?;
        Self::open(BlockCache::new(file)).await
    }
}

impl<R: RangeReader> TiffSlide<R> {
    /// Parse the slide structure from a range reader.
    pub async fn open(reader: R) -> Result<Self, SlideError> {
        Self::with_cache(reader, DecodedBlockCache::new()).await
    }

    /// Parse the slide structure, using a caller-provided block cache.
    pub async fn with_cache(reader: R, blocks: DecodedBlockCache) -> Result<Self, SlideError> {
        let tiff = TiffFile::open(&reader).await?;
        debug!(
            slide = reader.identifier(),
            series = tiff.directories.len(),
            bigtiff = tiff.header.is_bigtiff,
            "Parsed slide structure"
        );
        let slide = Self {
            reader,
            tiff,
            blocks,
        };
        for series in slide.uncached_series() {
            if let Some(dir) = slide.tiff.directories.get(series) {
                warn!(
                    series,
                    block_width = dir.block_width,
                    block_height = dir.block_height,
                    cache_bytes = slide.blocks.capacity(),
                    "Decoded block exceeds the cache, every region read decodes it again"
                );
            }
        }
        Ok(slide)
    }

    /// Series whose decoded storage block is larger than the block cache.
    ///
    /// Single-strip TIFFs are the usual case. Reads from these series decode
    /// each covering block on every request.
    pub fn uncached_series(&self) -> Vec<usize> {
        let capacity = self.blocks.capacity() as u64;
        self.tiff
            .directories
            .iter()
            .filter(|dir| {
                dir.block_width as u64 * dir.block_height as u64 * RGB_CHANNELS as u64 > capacity
            })
            .map(|dir| dir.index)
            .collect()
    }

    /// Identifier of the underlying reader (usually the file path).
    pub fn identifier(&self) -> &str {
        self.reader.identifier()
    }

    /// Image description of a series (SVS files keep scanner metadata here).
    pub fn description(&self, series: usize) -> Option<&str> {
        self.tiff.directories.get(series)?.description.as_deref()
    }

    fn directory(&self, series: usize) -> Result<&ImageDirectory, SlideError> {
        self.tiff
            .directories
            .get(series)
            .ok_or(SlideError::SeriesOutOfRange {
                series,
                count: self.tiff.directories.len(),
            })
    }

    async fn block(
        &self,
        dir: &ImageDirectory,
        bx: u32,
        by: u32,
    ) -> Result<Arc<RgbImage>, SlideError> {
        let index = dir.block_index(bx, by).ok_or_else(|| {
            TiffError::Decode(format!("block ({}, {}) outside the block grid", bx, by))
        })?;
        let key = BlockKey {
            series: dir.index,
            block: index,
        };
        if let Some(cached) = self.blocks.get(&key).await {
            return Ok(cached);
        }

        let (offset, byte_count) = dir
            .block_location(index)
            .ok_or_else(|| TiffError::Decode(format!("block {} has no location", index)))?;
        if byte_count == 0 {
            return Err(TiffError::Decode(format!("block {} is empty", index)).into());
        }
        let len = usize::try_from(byte_count)
            .map_err(|_| TiffError::Decode(format!("block {} is too large", index)))?;

        let payload = self.reader.read_exact_at(offset, len).await?;
        let decoded = Arc::new(decode_block(dir, &payload)?);
        self.blocks.put(key, decoded.clone()).await;
        Ok(decoded)
    }
}

#[async_trait]
impl<R: RangeReader> SlideReader for TiffSlide<R> {
    fn series_count(&self) -> usize {
        self.tiff.directories.len()
    }

    fn series_info(&self, series: usize) -> Option<SeriesInfo> {
        let dir = self.tiff.directories.get(series)?;
        Some(SeriesInfo {
            index: dir.index,
            width: dir.width,
            height: dir.height,
            depth: 1,
            channels: RGB_CHANNELS,
            timepoints: 1,
            tile_width: dir.block_width,
            tile_height: dir.block_height,
            compression: dir.compression.name(),
            label: dir
                .description
                .as_deref()
                .and_then(|d| d.lines().next())
                .filter(|line| !line.trim().is_empty())
                .map(|line| line.trim().to_string()),
        })
    }

    async fn read_region(
        &self,
        series: usize,
        x: u32,
        y: u32,
        width: u32,
        height: u32,
    ) -> Result<Bytes, SlideError> {
        let dir = self.directory(series)?;
        let fits = x as u64 + width as u64 <= dir.width as u64
            && y as u64 + height as u64 <= dir.height as u64;
        if !fits {
            return Err(SlideError::RegionOutOfBounds {
                x,
                y,
                width,
                height,
                series_width: dir.width,
                series_height: dir.height,
            });
        }
        if width == 0 || height == 0 {
            return Ok(Bytes::new());
        }

        let channels = RGB_CHANNELS as usize;
        let out_stride = width as usize * channels;
        let mut out = vec![0u8; out_stride * height as usize];

        let (x_end, y_end) = (x + width, y + height);
        let (bw, bh) = (dir.block_width, dir.block_height);

        for by in y / bh..=(y_end - 1) / bh {
            for bx in x / bw..=(x_end - 1) / bw {
                let block = self.block(dir, bx, by).await?;
                let (block_x, block_y) = (bx * bw, by * bh);

                let col_start = x.max(block_x);
                let col_end = x_end.min(block_x + bw);
                let row_start = y.max(block_y);
                let row_end = y_end.min(block_y + bh);

                let src_col = col_start - block_x;
                let cols = col_end - col_start;
                if src_col + cols > block.width() || row_end - block_y > block.height() {
                    return Err(TiffError::Decode(format!(
                        "block ({}, {}) decoded to {}x{}, smaller than its grid cell",
                        bx,
                        by,
                        block.width(),
                        block.height()
                    ))
                    .into());
                }

                let src_stride = block.width() as usize * channels;
                let len = cols as usize * channels;
                for row in row_start..row_end {
                    let src = (row - block_y) as usize * src_stride + src_col as usize * channels;
                    let dst = (row - y) as usize * out_stride + (col_start - x) as usize * channels;
                    out[dst..dst + len].copy_from_slice(&block.as_raw()[src..src + len]);
                }
            }
        }

        Ok(Bytes::from(out))
    }
}

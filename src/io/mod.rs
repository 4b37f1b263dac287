//! Byte-range I/O layer.
//!
//! Slide parsing only ever asks for `(offset, len)` ranges, so the format code
//! is written against the [`RangeReader`] trait rather than a concrete file.
//! [`FileRangeReader`] serves ranges from a local file and [`BlockCache`]
//! coalesces the many small reads of directory parsing into block-sized ones.

mod block_cache;
mod file_reader;
mod range_reader;

pub use block_cache::{BlockCache, DEFAULT_BLOCK_CACHE_CAPACITY, DEFAULT_BLOCK_SIZE};
pub use file_reader::FileRangeReader;
pub use range_reader::{MemoryRangeReader, RangeReader};

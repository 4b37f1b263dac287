//! Test utilities for integration tests.
//!
//! This module provides a synthetic slide writer, a recording slide wrapper
//! and generators for tissue-like tiles.

use async_trait::async_trait;
use bytes::Bytes;
use image::codecs::jpeg::JpegEncoder;
use image::{Rgb, RgbImage};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use slide_sieve::error::{IoError, SlideError};
use slide_sieve::io::RangeReader;
use slide_sieve::slide::{SeriesInfo, SlideReader};

// =============================================================================
// Mock Range Reader with Request Tracking
// =============================================================================

/// An in-memory range reader that counts read requests.
#[derive(Clone)]
pub struct TrackingReader {
    data: Bytes,
    identifier: String,
    request_count: Arc<AtomicUsize>,
}

impl TrackingReader {
    pub fn new(data: Vec<u8>, identifier: impl Into<String>) -> Self {
        Self {
            data: Bytes::from(data),
            identifier: identifier.into(),
            request_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }

    pub fn reset_tracking(&self) {
        self.request_count.store(0, Ordering::SeqCst);
    }
}

#[async_trait]
impl RangeReader for TrackingReader {
    async fn read_exact_at(&self, offset: u64, len: usize) -> Result<Bytes, IoError> {
        self.request_count.fetch_add(1, Ordering::SeqCst);

        let start = offset as usize;
        let end = start + len;
        if end > self.data.len() {
            return Err(IoError::RangeOutOfBounds {
                offset,
                requested: len as u64,
                size: self.data.len() as u64,
            });
        }
        Ok(self.data.slice(start..end))
    }

    fn size(&self) -> u64 {
        self.data.len() as u64
    }

    fn identifier(&self) -> &str {
        &self.identifier
    }
}

// =============================================================================
// Recording Slide
// =============================================================================

/// A slide wrapper that records every region request.
pub struct RecordingSlide<S> {
    inner: S,
    requests: Mutex<Vec<(u32, u32, u32, u32)>>,
}

impl<S> RecordingSlide<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Requested regions as `(x, y, width, height)`.
    pub fn requests(&self) -> Vec<(u32, u32, u32, u32)> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl<S: SlideReader> SlideReader for RecordingSlide<S> {
    fn series_count(&self) -> usize {
        self.inner.series_count()
    }

    fn series_info(&self, series: usize) -> Option<SeriesInfo> {
        self.inner.series_info(series)
    }

    async fn read_region(
        &self,
        series: usize,
        x: u32,
        y: u32,
        width: u32,
        height: u32,
    ) -> Result<Bytes, SlideError> {
        self.requests.lock().unwrap().push((x, y, width, height));
        self.inner.read_region(series, x, y, width, height).await
    }
}

// =============================================================================
// Synthetic Slide Writer
// =============================================================================

#[derive(Clone, Copy, PartialEq, Eq)]
pub enum ByteOrderType {
    LittleEndian,
    BigEndian,
}

/// How the tiles of a series are stored.
#[derive(Clone, Copy, PartialEq, Eq)]
pub enum TileEncoding {
    /// Uncompressed interleaved RGB
    Raw,
    /// Self-contained JPEG per tile
    Jpeg { quality: u8 },
    /// Abbreviated JPEG per tile with tables in the JPEGTables tag, as
    /// Aperio SVS files store them
    JpegSharedTables { quality: u8 },
}

/// One tiled image directory.
pub struct SeriesSpec {
    pub image: RgbImage,
    pub tile_size: u32,
    pub encoding: TileEncoding,
    pub description: Option<String>,
}

impl SeriesSpec {
    pub fn raw(image: RgbImage, tile_size: u32) -> Self {
        Self {
            image,
            tile_size,
            encoding: TileEncoding::Raw,
            description: None,
        }
    }

    pub fn with_encoding(mut self, encoding: TileEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Builder for tiled TIFF and BigTIFF slides.
pub struct SlideBuilder {
    byte_order: ByteOrderType,
    is_bigtiff: bool,
    series: Vec<SeriesSpec>,
}

const ASCII: u16 = 2;
const SHORT: u16 = 3;
const LONG: u16 = 4;
const UNDEFINED: u16 = 7;
const LONG8: u16 = 16;

struct Entry {
    tag: u16,
    field_type: u16,
    count: u64,
    value: Vec<u8>,
}

impl SlideBuilder {
    pub fn new() -> Self {
        Self {
            byte_order: ByteOrderType::LittleEndian,
            is_bigtiff: false,
            series: Vec::new(),
        }
    }

    pub fn with_byte_order(mut self, order: ByteOrderType) -> Self {
        self.byte_order = order;
        self
    }

    pub fn with_bigtiff(mut self, is_bigtiff: bool) -> Self {
        self.is_bigtiff = is_bigtiff;
        self
    }

    pub fn add_series(mut self, series: SeriesSpec) -> Self {
        self.series.push(series);
        self
    }

    /// Build the file data.
    pub fn build(self) -> Vec<u8> {
        let mut data = match self.byte_order {
            ByteOrderType::LittleEndian => vec![b'I', b'I'],
            ByteOrderType::BigEndian => vec![b'M', b'M'],
        };
        if self.is_bigtiff {
            self.put(&mut data, 43, 2);
            self.put(&mut data, 8, 2);
            self.put(&mut data, 0, 2);
        } else {
            self.put(&mut data, 42, 2);
        }

        // Position of the field holding the next IFD offset
        let mut link = data.len();
        self.put(&mut data, 0, self.offset_size());

        for spec in &self.series {
            let (blocks, tables) = encode_blocks(spec);

            let mut offsets = Vec::with_capacity(blocks.len());
            let mut counts = Vec::with_capacity(blocks.len());
            for block in &blocks {
                offsets.push(data.len() as u64);
                counts.push(block.len() as u64);
                data.extend_from_slice(block);
            }

            let entries = self.entries(spec, &offsets, &counts, tables);

            // Out-of-line values go before the IFD
            let mut value_offsets = Vec::with_capacity(entries.len());
            for entry in &entries {
                if entry.value.len() > self.offset_size() {
                    if data.len() % 2 == 1 {
                        data.push(0);
                    }
                    value_offsets.push(Some(data.len() as u64));
                    data.extend_from_slice(&entry.value);
                } else {
                    value_offsets.push(None);
                }
            }

            if data.len() % 2 == 1 {
                data.push(0);
            }
            let ifd_offset = data.len() as u64;
            self.patch(&mut data, link, ifd_offset);

            let count_size = if self.is_bigtiff { 8 } else { 2 };
            self.put(&mut data, entries.len() as u64, count_size);
            for (entry, out_of_line) in entries.iter().zip(&value_offsets) {
                self.put(&mut data, entry.tag as u64, 2);
                self.put(&mut data, entry.field_type as u64, 2);
                self.put(&mut data, entry.count, if self.is_bigtiff { 8 } else { 4 });
                match out_of_line {
                    Some(offset) => self.put(&mut data, *offset, self.offset_size()),
                    None => {
                        let mut field = vec![0u8; self.offset_size()];
                        field[..entry.value.len()].copy_from_slice(&entry.value);
                        data.extend_from_slice(&field);
                    }
                }
            }
            link = data.len();
            self.put(&mut data, 0, self.offset_size());
        }

        data
    }

    fn entries(
        &self,
        spec: &SeriesSpec,
        offsets: &[u64],
        counts: &[u64],
        tables: Option<Vec<u8>>,
    ) -> Vec<Entry> {
        let (compression, photometric) = match spec.encoding {
            TileEncoding::Raw => (1, 2),
            TileEncoding::Jpeg { .. } | TileEncoding::JpegSharedTables { .. } => (7, 6),
        };
        let offset_type = if self.is_bigtiff { LONG8 } else { LONG };
        let offset_size = if self.is_bigtiff { 8 } else { 4 };

        let mut entries = vec![
            self.entry(256, LONG, &[spec.image.width() as u64], 4),
            self.entry(257, LONG, &[spec.image.height() as u64], 4),
            self.entry(258, SHORT, &[8, 8, 8], 2),
            self.entry(259, SHORT, &[compression], 2),
            self.entry(262, SHORT, &[photometric], 2),
            self.entry(277, SHORT, &[3], 2),
            self.entry(284, SHORT, &[1], 2),
            self.entry(322, LONG, &[spec.tile_size as u64], 4),
            self.entry(323, LONG, &[spec.tile_size as u64], 4),
            self.entry(324, offset_type, offsets, offset_size),
            self.entry(325, offset_type, counts, offset_size),
        ];
        if let Some(ref description) = spec.description {
            let mut value = description.as_bytes().to_vec();
            value.push(0);
            entries.push(Entry {
                tag: 270,
                field_type: ASCII,
                count: value.len() as u64,
                value,
            });
        }
        if let Some(tables) = tables {
            entries.push(Entry {
                tag: 347,
                field_type: UNDEFINED,
                count: tables.len() as u64,
                value: tables,
            });
        }
        entries.sort_by_key(|e| e.tag);
        entries
    }

    fn entry(&self, tag: u16, field_type: u16, values: &[u64], size: usize) -> Entry {
        let mut value = Vec::with_capacity(values.len() * size);
        for &v in values {
            self.put(&mut value, v, size);
        }
        Entry {
            tag,
            field_type,
            count: values.len() as u64,
            value,
        }
    }

    fn offset_size(&self) -> usize {
        if self.is_bigtiff {
            8
        } else {
            4
        }
    }

    fn put(&self, data: &mut Vec<u8>, value: u64, size: usize) {
        let bytes = match self.byte_order {
            ByteOrderType::LittleEndian => value.to_le_bytes()[..size].to_vec(),
            ByteOrderType::BigEndian => value.to_be_bytes()[8 - size..].to_vec(),
        };
        data.extend_from_slice(&bytes);
    }

    fn patch(&self, data: &mut [u8], at: usize, value: u64) {
        let mut field = Vec::new();
        self.put(&mut field, value, self.offset_size());
        data[at..at + field.len()].copy_from_slice(&field);
    }
}

impl Default for SlideBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Encode every tile of a series in row-major order. Edge tiles are padded
/// with black to the full tile size.
fn encode_blocks(spec: &SeriesSpec) -> (Vec<Vec<u8>>, Option<Vec<u8>>) {
    let size = spec.tile_size;
    let across = spec.image.width().div_ceil(size);
    let down = spec.image.height().div_ceil(size);

    let mut blocks = Vec::new();
    let mut tables = None;
    for ty in 0..down {
        for tx in 0..across {
            let tile = RgbImage::from_fn(size, size, |x, y| {
                let (px, py) = (tx * size + x, ty * size + y);
                if px < spec.image.width() && py < spec.image.height() {
                    *spec.image.get_pixel(px, py)
                } else {
                    Rgb([0, 0, 0])
                }
            });

            let block = match spec.encoding {
                TileEncoding::Raw => tile.into_raw(),
                TileEncoding::Jpeg { quality } => encode_jpeg(&tile, quality),
                TileEncoding::JpegSharedTables { quality } => {
                    let (shared, abbreviated) = split_tables(&encode_jpeg(&tile, quality));
                    tables.get_or_insert(shared);
                    abbreviated
                }
            };
            blocks.push(block);
        }
    }
    (blocks, tables)
}

pub fn encode_jpeg(img: &RgbImage, quality: u8) -> Vec<u8> {
    let mut buf = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut buf, quality);
    encoder.encode_image(img).unwrap();
    buf
}

/// Split a complete JPEG stream into a tables stream (SOI + DQT/DHT + EOI)
/// and an abbreviated stream holding everything else.
pub fn split_tables(jpeg: &[u8]) -> (Vec<u8>, Vec<u8>) {
    let mut tables = vec![0xFF, 0xD8];
    let mut abbreviated = vec![0xFF, 0xD8];

    let mut pos = 2;
    while pos + 4 <= jpeg.len() {
        let marker = jpeg[pos + 1];
        if marker == 0xDA {
            // Scan header, entropy-coded data and EOI
            abbreviated.extend_from_slice(&jpeg[pos..]);
            break;
        }
        let length = u16::from_be_bytes([jpeg[pos + 2], jpeg[pos + 3]]) as usize;
        let segment = &jpeg[pos..pos + 2 + length];
        if marker == 0xDB || marker == 0xC4 {
            tables.extend_from_slice(segment);
        } else {
            abbreviated.extend_from_slice(segment);
        }
        pos += 2 + length;
    }

    tables.extend_from_slice(&[0xFF, 0xD9]);
    (tables, abbreviated)
}

// =============================================================================
// Synthetic Images
// =============================================================================

/// RGB pixels where (x, y) is `[x, y, x + y]` modulo 256.
pub fn gradient(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        Rgb([x as u8, y as u8, (x + y) as u8])
    })
}

/// Smooth gray texture on the left half and white glass on the right half.
pub fn half_tissue_slide(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        if x < width / 2 {
            let v = 60 + ((x + y) % 64) as u8 * 2;
            Rgb([v, v, v])
        } else {
            Rgb([255, 255, 255])
        }
    })
}

pub const BACKGROUND: [u8; 3] = [255, 255, 255];
/// Eosin pink
pub const STROMA_DARK: [u8; 3] = [230, 150, 200];
/// Pale pink
pub const STROMA_LIGHT: [u8; 3] = [240, 200, 230];
/// Hematoxylin purple
pub const NUCLEUS: [u8; 3] = [60, 20, 120];

/// A 140x140 tile holding a 100x100 striped stroma block at (20, 20) on
/// white, with a 6x6 nucleus at each of `spots`.
pub fn tissue_tile(spots: &[(u32, u32)]) -> RgbImage {
    RgbImage::from_fn(140, 140, |x, y| {
        let in_tissue = (20..120).contains(&x) && (20..120).contains(&y);
        let in_spot = spots
            .iter()
            .any(|&(sx, sy)| (sx..sx + 6).contains(&x) && (sy..sy + 6).contains(&y));
        if in_spot {
            Rgb(NUCLEUS)
        } else if in_tissue && x % 2 == 0 {
            Rgb(STROMA_DARK)
        } else if in_tissue {
            Rgb(STROMA_LIGHT)
        } else {
            Rgb(BACKGROUND)
        }
    })
}

/// Flat pink tile: right color, no texture.
pub fn flat_tile() -> RgbImage {
    RgbImage::from_pixel(64, 64, Rgb(STROMA_DARK))
}

/// Textured green pen mark: plenty of variation, wrong color.
pub fn pen_mark_tile() -> RgbImage {
    RgbImage::from_fn(64, 64, |x, _| {
        if x % 2 == 0 {
            Rgb([20, 160, 40])
        } else {
            Rgb([60, 230, 90])
        }
    })
}

/// Save `img` under `dir`, creating parent directories.
pub fn save_tile(dir: &Path, name: &str, img: &RgbImage) -> std::path::PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    img.save(&path).unwrap();
    path
}

/// Mean absolute per-channel difference between two equally sized buffers.
pub fn mean_abs_diff(a: &[u8], b: &[u8]) -> f64 {
    assert_eq!(a.len(), b.len());
    let total: u64 = a.iter().zip(b).map(|(x, y)| x.abs_diff(*y) as u64).sum();
    total as f64 / a.len().max(1) as f64
}

/// Smooth RGB ramp with no wraparound, friendly to lossy codecs.
pub fn smooth_ramp(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        Rgb([
            (x * 255 / width.max(1)) as u8,
            (y * 255 / height.max(1)) as u8,
            ((x + y) * 255 / (width + height).max(1)) as u8,
        ])
    })
}

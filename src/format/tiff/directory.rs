//! Resolved image directories.
//!
//! An [`ImageDirectory`] is an IFD with every value needed to locate and
//! decode its pixels already loaded: dimensions, sample layout, compression,
//! and the offset/byte-count arrays of its blocks.
//!
//! Tiled and strip-organized directories are described by the same block
//! grid. A strip is a block as wide as the image and `RowsPerStrip` tall, so
//! region reads do not need to care which organization a directory uses.

use bytes::Bytes;

use crate::error::TiffError;
use crate::io::RangeReader;

use super::header::{TiffHeader, BIGTIFF_HEADER_SIZE, TIFF_HEADER_SIZE};
use super::ifd::{Ifd, ValueReader};
use super::tags::{Compression, TiffTag};

/// Photometric interpretation: 0 is white.
pub const PHOTOMETRIC_WHITE_IS_ZERO: u16 = 0;

/// Photometric interpretation: 0 is black.
pub const PHOTOMETRIC_BLACK_IS_ZERO: u16 = 1;

/// Photometric interpretation: RGB.
pub const PHOTOMETRIC_RGB: u16 = 2;

/// Photometric interpretation: YCbCr.
pub const PHOTOMETRIC_YCBCR: u16 = 6;

/// One image of a TIFF file with its block layout resolved.
#[derive(Debug, Clone)]
pub struct ImageDirectory {
    /// Position of the IFD in the file's chain
    pub index: usize,
    pub width: u32,
    pub height: u32,
    /// Whether blocks are tiles (true) or strips (false)
    pub is_tiled: bool,
    pub block_width: u32,
    pub block_height: u32,
    pub blocks_across: u32,
    pub blocks_down: u32,
    pub compression: Compression,
    pub samples_per_pixel: u16,
    pub bits_per_sample: u16,
    pub photometric: u16,
    pub planar_configuration: u16,
    pub block_offsets: Vec<u64>,
    pub block_byte_counts: Vec<u64>,
    /// Shared JPEG tables for abbreviated tile streams
    pub jpeg_tables: Option<Bytes>,
    pub description: Option<String>,
}

impl ImageDirectory {
    /// Load all values needed to read pixels from `ifd`.
    pub async fn load<R: RangeReader>(
        reader: &R,
        header: &TiffHeader,
        ifd: &Ifd,
        index: usize,
    ) -> Result<Self, TiffError> {
        let values = ValueReader::new(reader, header);

        let required = |tag: TiffTag| ifd.entry(tag).ok_or(TiffError::MissingTag(tag.name()));
        let width = to_u32(
            values.unsigned(required(TiffTag::ImageWidth)?, TiffTag::ImageWidth).await?,
            TiffTag::ImageWidth,
        )?;
        let height = to_u32(
            values.unsigned(required(TiffTag::ImageLength)?, TiffTag::ImageLength).await?,
            TiffTag::ImageLength,
        )?;
        if width == 0 || height == 0 {
            return Err(TiffError::InvalidTagValue {
                tag: TiffTag::ImageWidth.name(),
                message: format!("empty image {}x{}", width, height),
            });
        }

        let samples_per_pixel =
            optional_unsigned(&values, ifd, TiffTag::SamplesPerPixel, 1).await? as u16;
        let bits_per_sample =
            optional_unsigned(&values, ifd, TiffTag::BitsPerSample, 1).await? as u16;
        let compression = Compression::from_u16(
            optional_unsigned(&values, ifd, TiffTag::Compression, 1).await? as u16,
        );
        let default_photometric = if samples_per_pixel >= 3 {
            PHOTOMETRIC_RGB
        } else {
            PHOTOMETRIC_BLACK_IS_ZERO
        };
        let photometric = optional_unsigned(
            &values,
            ifd,
            TiffTag::PhotometricInterpretation,
            default_photometric as u64,
        )
        .await? as u16;
        let planar_configuration =
            optional_unsigned(&values, ifd, TiffTag::PlanarConfiguration, 1).await? as u16;

        let is_tiled = ifd.entry(TiffTag::TileWidth).is_some();
        let (block_width, block_height, offsets_tag, counts_tag) = if is_tiled {
            let tile_width = to_u32(
                values.unsigned(required(TiffTag::TileWidth)?, TiffTag::TileWidth).await?,
                TiffTag::TileWidth,
            )?;
            let tile_height = to_u32(
                values.unsigned(required(TiffTag::TileLength)?, TiffTag::TileLength).await?,
                TiffTag::TileLength,
            )?;
            (tile_width, tile_height, TiffTag::TileOffsets, TiffTag::TileByteCounts)
        } else {
            let rows =
                optional_unsigned(&values, ifd, TiffTag::RowsPerStrip, height as u64).await?;
            let rows = rows.min(height as u64) as u32;
            (width, rows, TiffTag::StripOffsets, TiffTag::StripByteCounts)
        };

        if block_width == 0 || block_height == 0 {
            return Err(TiffError::InvalidTagValue {
                tag: if is_tiled {
                    TiffTag::TileWidth.name()
                } else {
                    TiffTag::RowsPerStrip.name()
                },
                message: "zero block size".to_string(),
            });
        }

        let blocks_across = width.div_ceil(block_width);
        let blocks_down = height.div_ceil(block_height);

        let block_offsets = values
            .unsigned_array(required(offsets_tag)?, offsets_tag)
            .await?;
        let block_byte_counts = values
            .unsigned_array(required(counts_tag)?, counts_tag)
            .await?;

        let expected = blocks_across as usize * blocks_down as usize;
        if block_offsets.len() < expected || block_byte_counts.len() < expected {
            return Err(TiffError::InvalidTagValue {
                tag: offsets_tag.name(),
                message: format!(
                    "expected {} blocks, found {} offsets and {} byte counts",
                    expected,
                    block_offsets.len(),
                    block_byte_counts.len()
                ),
            });
        }

        let jpeg_tables = match ifd.entry(TiffTag::JpegTables) {
            Some(entry) => Some(values.raw(entry).await?),
            None => None,
        };
        let description = match ifd.entry(TiffTag::ImageDescription) {
            Some(entry) => Some(values.ascii(entry).await?),
            None => None,
        };

        Ok(ImageDirectory {
            index,
            width,
            height,
            is_tiled,
            block_width,
            block_height,
            blocks_across,
            blocks_down,
            compression,
            samples_per_pixel,
            bits_per_sample,
            photometric,
            planar_configuration,
            block_offsets,
            block_byte_counts,
            jpeg_tables,
            description,
        })
    }

    /// Linear index of the block at grid position `(bx, by)`.
    pub fn block_index(&self, bx: u32, by: u32) -> Option<usize> {
        if bx >= self.blocks_across || by >= self.blocks_down {
            return None;
        }
        Some(by as usize * self.blocks_across as usize + bx as usize)
    }

    /// File offset and byte count of a block.
    pub fn block_location(&self, index: usize) -> Option<(u64, u64)> {
        Some((
            *self.block_offsets.get(index)?,
            *self.block_byte_counts.get(index)?,
        ))
    }
}

async fn optional_unsigned<R: RangeReader>(
    values: &ValueReader<'_, R>,
    ifd: &Ifd,
    tag: TiffTag,
    default: u64,
) -> Result<u64, TiffError> {
    match ifd.entry(tag) {
        Some(entry) => values.unsigned(entry, tag).await,
        None => Ok(default),
    }
}

fn to_u32(value: u64, tag: TiffTag) -> Result<u32, TiffError> {
    u32::try_from(value).map_err(|_| TiffError::InvalidTagValue {
        tag: tag.name(),
        message: format!("{} does not fit in 32 bits", value),
    })
}

// =============================================================================
// TiffFile
// =============================================================================

/// A TIFF file opened for pixel access: header plus every image directory.
#[derive(Debug, Clone)]
pub struct TiffFile {
    pub header: TiffHeader,
    pub directories: Vec<ImageDirectory>,
}

impl TiffFile {
    /// Parse the header and load every directory of the IFD chain.
    pub async fn open<R: RangeReader>(reader: &R) -> Result<Self, TiffError> {
        let header_len = (reader.size() as usize).min(BIGTIFF_HEADER_SIZE);
        if header_len < TIFF_HEADER_SIZE {
            return Err(TiffError::FileTooSmall {
                required: TIFF_HEADER_SIZE as u64,
                actual: header_len as u64,
            });
        }
        let header_bytes = reader.read_exact_at(0, header_len).await?;
        let header = TiffHeader::parse(&header_bytes, reader.size())?;

        let ifds = Ifd::read_chain(reader, &header).await?;
        let mut directories = Vec::with_capacity(ifds.len());
        for (index, ifd) in ifds.iter().enumerate() {
            directories.push(ImageDirectory::load(reader, &header, ifd, index).await?);
        }

        Ok(TiffFile {
            header,
            directories,
        })
    }
}

//! Block payload decoding.
//!
//! Turns the compressed bytes of one tile or strip into an RGB image. Every
//! supported layout is normalized to 8-bit RGB so the slide layer can hand
//! out interleaved three-channel regions.

use image::{ImageFormat, RgbImage};

use super::jpeg::complete_stream;
use super::tiff::{
    Compression, ImageDirectory, PHOTOMETRIC_BLACK_IS_ZERO, PHOTOMETRIC_RGB,
    PHOTOMETRIC_WHITE_IS_ZERO, PHOTOMETRIC_YCBCR,
};
use crate::error::TiffError;

/// Decode one block of `dir` from its raw payload.
///
/// The returned image is `block_width` wide. Its height is `block_height`,
/// except for a trailing strip that the writer stored short.
pub fn decode_block(dir: &ImageDirectory, payload: &[u8]) -> Result<RgbImage, TiffError> {
    check_layout(dir)?;

    match dir.compression {
        Compression::None => decode_uncompressed(dir, payload),
        Compression::Jpeg => {
            let stream = complete_stream(dir.jpeg_tables.as_deref(), payload);
            let decoded = image::load_from_memory_with_format(&stream, ImageFormat::Jpeg)
                .map_err(|e| TiffError::Decode(e.to_string()))?;
            Ok(decoded.to_rgb8())
        }
        other => Err(TiffError::UnsupportedCompression(other.name())),
    }
}

/// Reject directories whose samples we cannot turn into RGB.
pub fn check_layout(dir: &ImageDirectory) -> Result<(), TiffError> {
    if !dir.compression.is_supported() {
        return Err(TiffError::UnsupportedCompression(dir.compression.name()));
    }
    if dir.bits_per_sample != 8 {
        return Err(TiffError::UnsupportedLayout(format!(
            "{} bits per sample",
            dir.bits_per_sample
        )));
    }
    if dir.planar_configuration != 1 && dir.samples_per_pixel > 1 {
        return Err(TiffError::UnsupportedLayout(
            "planar sample organization".to_string(),
        ));
    }
    if dir.compression == Compression::None {
        let photometric_ok = match dir.samples_per_pixel {
            1 => matches!(
                dir.photometric,
                PHOTOMETRIC_WHITE_IS_ZERO | PHOTOMETRIC_BLACK_IS_ZERO
            ),
            3 | 4 => dir.photometric == PHOTOMETRIC_RGB,
            _ => false,
        };
        if !photometric_ok {
            return Err(TiffError::UnsupportedLayout(format!(
                "{} samples with photometric {}{}",
                dir.samples_per_pixel,
                dir.photometric,
                if dir.photometric == PHOTOMETRIC_YCBCR {
                    " (uncompressed YCbCr)"
                } else {
                    ""
                }
            )));
        }
    }
    Ok(())
}

fn decode_uncompressed(dir: &ImageDirectory, payload: &[u8]) -> Result<RgbImage, TiffError> {
    let spp = dir.samples_per_pixel as usize;
    let row_bytes = dir.block_width as usize * spp;
    let rows = (payload.len() / row_bytes).min(dir.block_height as usize);
    if rows == 0 {
        return Err(TiffError::Decode(format!(
            "payload of {} bytes is shorter than one row of {} bytes",
            payload.len(),
            row_bytes
        )));
    }

    let pixels = dir.block_width as usize * rows;
    let mut rgb = Vec::with_capacity(pixels * 3);
    for sample in payload[..pixels * spp].chunks_exact(spp) {
        match spp {
            1 => {
                let v = if dir.photometric == PHOTOMETRIC_WHITE_IS_ZERO {
                    255 - sample[0]
                } else {
                    sample[0]
                };
                rgb.extend_from_slice(&[v, v, v]);
            }
            _ => rgb.extend_from_slice(&sample[..3]),
        }
    }

    RgbImage::from_raw(dir.block_width, rows as u32, rgb)
        .ok_or_else(|| TiffError::Decode("pixel buffer size mismatch".to_string()))
}

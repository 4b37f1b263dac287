//! TIFF and BigTIFF structure parsing.
//!
//! - **Byte order**: declared in the header (II / MM); every multi-byte value
//!   is read through [`ByteOrder`].
//! - **Classic TIFF vs BigTIFF**: 32-bit vs 64-bit offsets, handled
//!   transparently by [`TiffHeader`].
//! - **IFDs**: one per image. Whole slide files hold pyramid levels, label,
//!   macro and thumbnail images as separate IFDs; each becomes an
//!   [`ImageDirectory`].

mod directory;
mod header;
mod ifd;
mod tags;

#[cfg(test)]
pub(crate) mod fixtures;

pub use directory::{
    ImageDirectory, TiffFile, PHOTOMETRIC_BLACK_IS_ZERO, PHOTOMETRIC_RGB,
    PHOTOMETRIC_WHITE_IS_ZERO, PHOTOMETRIC_YCBCR,
};
pub use header::{ByteOrder, TiffHeader, BIGTIFF_HEADER_SIZE, TIFF_HEADER_SIZE};
pub use ifd::{Ifd, IfdEntry, ValueReader};
pub use tags::{Compression, FieldType, TiffTag};

//! Slide file formats.
//!
//! Whole slide images from most scanners (Aperio SVS, generic pyramidal TIFF,
//! and many vendor exports) are TIFF or BigTIFF containers: one IFD per
//! pyramid level plus label, macro and thumbnail images. This module parses
//! that structure ([`tiff`]), repairs abbreviated JPEG tile streams
//! ([`jpeg`]), and decodes block payloads to RGB ([`decode`]).

pub mod decode;
pub mod jpeg;
pub mod tiff;

pub use decode::{check_layout, decode_block};
pub use jpeg::{complete_stream, has_tables, merge_tables};

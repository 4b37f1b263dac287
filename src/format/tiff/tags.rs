//! TIFF vocabulary: field types, the tags we read, and compression codes.

/// TIFF field types we know how to decode.
///
/// Rational and floating point types never carry structural information in
/// slide files, so they are left out and treated as unknown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Byte,
    Ascii,
    Short,
    Long,
    Undefined,
    /// BigTIFF only
    Long8,
}

impl FieldType {
    pub fn from_u16(value: u16) -> Option<Self> {
        match value {
            1 => Some(FieldType::Byte),
            2 => Some(FieldType::Ascii),
            3 => Some(FieldType::Short),
            4 => Some(FieldType::Long),
            7 => Some(FieldType::Undefined),
            16 => Some(FieldType::Long8),
            _ => None,
        }
    }

    /// Size of one element in bytes.
    #[inline]
    pub const fn size_in_bytes(self) -> usize {
        match self {
            FieldType::Byte | FieldType::Ascii | FieldType::Undefined => 1,
            FieldType::Short => 2,
            FieldType::Long => 4,
            FieldType::Long8 => 8,
        }
    }
}

/// Tags that drive how a directory's pixels are located and decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TiffTag {
    ImageWidth,
    ImageLength,
    BitsPerSample,
    Compression,
    PhotometricInterpretation,
    ImageDescription,
    StripOffsets,
    SamplesPerPixel,
    RowsPerStrip,
    StripByteCounts,
    PlanarConfiguration,
    TileWidth,
    TileLength,
    TileOffsets,
    TileByteCounts,
    JpegTables,
}

impl TiffTag {
    pub const fn as_u16(self) -> u16 {
        match self {
            TiffTag::ImageWidth => 256,
            TiffTag::ImageLength => 257,
            TiffTag::BitsPerSample => 258,
            TiffTag::Compression => 259,
            TiffTag::PhotometricInterpretation => 262,
            TiffTag::ImageDescription => 270,
            TiffTag::StripOffsets => 273,
            TiffTag::SamplesPerPixel => 277,
            TiffTag::RowsPerStrip => 278,
            TiffTag::StripByteCounts => 279,
            TiffTag::PlanarConfiguration => 284,
            TiffTag::TileWidth => 322,
            TiffTag::TileLength => 323,
            TiffTag::TileOffsets => 324,
            TiffTag::TileByteCounts => 325,
            TiffTag::JpegTables => 347,
        }
    }

    /// Name used in error messages.
    pub const fn name(self) -> &'static str {
        match self {
            TiffTag::ImageWidth => "ImageWidth",
            TiffTag::ImageLength => "ImageLength",
            TiffTag::BitsPerSample => "BitsPerSample",
            TiffTag::Compression => "Compression",
            TiffTag::PhotometricInterpretation => "PhotometricInterpretation",
            TiffTag::ImageDescription => "ImageDescription",
            TiffTag::StripOffsets => "StripOffsets",
            TiffTag::SamplesPerPixel => "SamplesPerPixel",
            TiffTag::RowsPerStrip => "RowsPerStrip",
            TiffTag::StripByteCounts => "StripByteCounts",
            TiffTag::PlanarConfiguration => "PlanarConfiguration",
            TiffTag::TileWidth => "TileWidth",
            TiffTag::TileLength => "TileLength",
            TiffTag::TileOffsets => "TileOffsets",
            TiffTag::TileByteCounts => "TileByteCounts",
            TiffTag::JpegTables => "JPEGTables",
        }
    }
}

/// TIFF compression schemes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    None,
    Lzw,
    OldJpeg,
    Jpeg,
    Deflate,
    /// Aperio JPEG 2000 (33003 YCbCr, 33005 RGB)
    Jpeg2000,
    Other(u16),
}

impl Compression {
    pub fn from_u16(value: u16) -> Self {
        match value {
            1 => Compression::None,
            5 => Compression::Lzw,
            6 => Compression::OldJpeg,
            7 => Compression::Jpeg,
            8 | 32946 => Compression::Deflate,
            33003 | 33005 => Compression::Jpeg2000,
            other => Compression::Other(other),
        }
    }

    /// Whether tiles with this compression can be decoded.
    #[inline]
    pub const fn is_supported(self) -> bool {
        matches!(self, Compression::None | Compression::Jpeg)
    }

    pub fn name(self) -> String {
        match self {
            Compression::None => "None".to_string(),
            Compression::Lzw => "LZW".to_string(),
            Compression::OldJpeg => "Old JPEG".to_string(),
            Compression::Jpeg => "JPEG".to_string(),
            Compression::Deflate => "Deflate".to_string(),
            Compression::Jpeg2000 => "JPEG 2000".to_string(),
            Compression::Other(code) => format!("code {}", code),
        }
    }
}

//! Image File Directories and tag value access.
//!
//! An IFD is a list of `(tag, type, count, value-or-offset)` entries followed
//! by the offset of the next IFD. Values that fit in the value field are
//! stored inline; larger ones live elsewhere in the file and are fetched
//! through the [`ValueReader`].

use std::collections::HashSet;

use bytes::Bytes;

use crate::error::TiffError;
use crate::io::RangeReader;

use super::header::TiffHeader;
use super::tags::{FieldType, TiffTag};

/// Upper bound on the IFD chain length; guards against corrupt chains.
const MAX_IFDS: usize = 256;

/// A single raw IFD entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IfdEntry {
    pub tag: u16,
    pub field_type_raw: u16,
    pub field_type: Option<FieldType>,
    pub count: u64,
    /// The 4 or 8 byte value/offset field, left-aligned
    pub value_field: [u8; 8],
}

impl IfdEntry {
    /// Total size of the value in bytes, if the field type is known.
    pub fn byte_len(&self) -> Option<u64> {
        self.field_type
            .map(|t| t.size_in_bytes() as u64 * self.count)
    }

    /// Whether the value is stored inside the entry itself.
    pub fn is_inline(&self, header: &TiffHeader) -> bool {
        matches!(self.byte_len(), Some(len) if len <= header.offset_size() as u64)
    }
}

/// A parsed Image File Directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ifd {
    pub entries: Vec<IfdEntry>,
    pub next_ifd_offset: u64,
}

impl Ifd {
    /// Encoded size of an IFD with `entry_count` entries.
    pub fn encoded_size(entry_count: u64, header: &TiffHeader) -> usize {
        header.ifd_count_size() + entry_count as usize * header.ifd_entry_size() + header.offset_size()
    }

    /// Parse an IFD from its encoded bytes (count, entries, next offset).
    pub fn parse(bytes: &[u8], header: &TiffHeader) -> Result<Self, TiffError> {
        let order = header.byte_order;
        let count_size = header.ifd_count_size();
        if bytes.len() < count_size {
            return Err(TiffError::FileTooSmall {
                required: count_size as u64,
                actual: bytes.len() as u64,
            });
        }

        let entry_count = read_entry_count(header, &bytes[..count_size]);
        let required = Self::encoded_size(entry_count, header);
        if bytes.len() < required {
            return Err(TiffError::FileTooSmall {
                required: required as u64,
                actual: bytes.len() as u64,
            });
        }

        let entry_size = header.ifd_entry_size();
        let value_size = header.offset_size();
        let mut entries = Vec::with_capacity(entry_count as usize);

        for i in 0..entry_count as usize {
            let raw = &bytes[count_size + i * entry_size..count_size + (i + 1) * entry_size];
            let tag = order.read_u16(&raw[0..2]);
            let field_type_raw = order.read_u16(&raw[2..4]);
            let (count, value_start) = if header.is_bigtiff {
                (order.read_u64(&raw[4..12]), 12)
            } else {
                (order.read_u32(&raw[4..8]) as u64, 8)
            };

            let mut value_field = [0u8; 8];
            value_field[..value_size].copy_from_slice(&raw[value_start..value_start + value_size]);

            entries.push(IfdEntry {
                tag,
                field_type_raw,
                field_type: FieldType::from_u16(field_type_raw),
                count,
                value_field,
            });
        }

        let next_start = count_size + entry_count as usize * entry_size;
        let next_ifd_offset = header.read_offset(&bytes[next_start..next_start + value_size]);

        Ok(Ifd {
            entries,
            next_ifd_offset,
        })
    }

    /// Find the entry for `tag`.
    pub fn entry(&self, tag: TiffTag) -> Option<&IfdEntry> {
        let id = tag.as_u16();
        self.entries.iter().find(|e| e.tag == id)
    }

    /// Read every IFD of the file by following the next-IFD chain.
    pub async fn read_chain<R: RangeReader>(
        reader: &R,
        header: &TiffHeader,
    ) -> Result<Vec<Ifd>, TiffError> {
        let mut ifds = Vec::new();
        let mut seen = HashSet::new();
        let mut offset = header.first_ifd_offset;

        while offset != 0 && ifds.len() < MAX_IFDS {
            if !seen.insert(offset) || offset >= reader.size() {
                return Err(TiffError::InvalidIfdOffset(offset));
            }

            let count_bytes = reader.read_exact_at(offset, header.ifd_count_size()).await?;
            let entry_count = read_entry_count(header, &count_bytes);
            let size = Self::encoded_size(entry_count, header);
            let bytes = reader.read_exact_at(offset, size).await?;

            let ifd = Ifd::parse(&bytes, header)?;
            offset = ifd.next_ifd_offset;
            ifds.push(ifd);
        }

        Ok(ifds)
    }
}

/// IFD entry count: u16 in classic TIFF, u64 in BigTIFF.
fn read_entry_count(header: &TiffHeader, bytes: &[u8]) -> u64 {
    if header.is_bigtiff {
        header.byte_order.read_u64(bytes)
    } else {
        header.byte_order.read_u16(bytes) as u64
    }
}

// =============================================================================
// ValueReader
// =============================================================================

/// Reads tag values, inline or out-of-line, respecting the file byte order.
pub struct ValueReader<'a, R: RangeReader> {
    reader: &'a R,
    header: &'a TiffHeader,
}

impl<'a, R: RangeReader> ValueReader<'a, R> {
    pub fn new(reader: &'a R, header: &'a TiffHeader) -> Self {
        Self { reader, header }
    }

    /// Raw value bytes of an entry.
    pub async fn raw(&self, entry: &IfdEntry) -> Result<Bytes, TiffError> {
        let len = entry
            .byte_len()
            .ok_or(TiffError::UnknownFieldType(entry.field_type_raw))?;

        if entry.is_inline(self.header) {
            return Ok(Bytes::copy_from_slice(&entry.value_field[..len as usize]));
        }

        let offset = self.header.read_offset(&entry.value_field);
        Ok(self.reader.read_exact_at(offset, len as usize).await?)
    }

    /// All elements of an unsigned integer entry, widened to u64.
    pub async fn unsigned_array(
        &self,
        entry: &IfdEntry,
        tag: TiffTag,
    ) -> Result<Vec<u64>, TiffError> {
        let field_type = entry
            .field_type
            .ok_or(TiffError::UnknownFieldType(entry.field_type_raw))?;
        if matches!(field_type, FieldType::Ascii | FieldType::Undefined) {
            return Err(TiffError::InvalidTagValue {
                tag: tag.name(),
                message: format!("expected an integer type, got {:?}", field_type),
            });
        }

        let bytes = self.raw(entry).await?;
        let order = self.header.byte_order;
        let size = field_type.size_in_bytes();

        Ok(bytes
            .chunks_exact(size)
            .map(|chunk| match field_type {
                FieldType::Short => order.read_u16(chunk) as u64,
                FieldType::Long => order.read_u32(chunk) as u64,
                FieldType::Long8 => order.read_u64(chunk),
                _ => chunk[0] as u64,
            })
            .collect())
    }

    /// First element of an unsigned integer entry.
    pub async fn unsigned(&self, entry: &IfdEntry, tag: TiffTag) -> Result<u64, TiffError> {
        self.unsigned_array(entry, tag)
            .await?
            .first()
            .copied()
            .ok_or_else(|| TiffError::InvalidTagValue {
                tag: tag.name(),
                message: "empty value".to_string(),
            })
    }

    /// An ASCII entry as a string, trailing NULs removed.
    pub async fn ascii(&self, entry: &IfdEntry) -> Result<String, TiffError> {
        let bytes = self.raw(entry).await?;
        let text = String::from_utf8_lossy(&bytes);
        Ok(text.trim_end_matches('\0').to_string())
    }
}

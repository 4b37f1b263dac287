//! Abbreviated JPEG streams.
//!
//! Aperio SVS and many pyramidal TIFF writers store each tile as an
//! "abbreviated" JPEG stream: SOI, frame header and scan, but no quantization
//! (DQT) or Huffman (DHT) tables. The tables are stored once per directory in
//! the `JPEGTables` tag, itself a stream of the form SOI + tables + EOI.
//!
//! Merging drops the tables' EOI and the tile's SOI and concatenates the
//! rest: SOI + tables + tile content + EOI.

use bytes::{Bytes, BytesMut};

const SOI: [u8; 2] = [0xFF, 0xD8];
const EOI: [u8; 2] = [0xFF, 0xD9];
const DQT: u8 = 0xDB;
const DHT: u8 = 0xC4;
const SOS: u8 = 0xDA;

/// Whether a JPEG stream carries its own DQT/DHT tables before the scan.
///
/// Marker segments are walked from SOI up to the first SOS. Streams that do
/// not start with SOI are reported as carrying tables so they are decoded
/// unchanged (and fail loudly if they are not JPEG at all).
pub fn has_tables(data: &[u8]) -> bool {
    if data.len() < 4 || data[0..2] != SOI {
        return true;
    }

    let mut pos = 2;
    while pos + 3 < data.len() {
        if data[pos] != 0xFF {
            pos += 1;
            continue;
        }
        match data[pos + 1] {
            DQT | DHT => return true,
            SOS => return false,
            // Fill bytes and standalone markers carry no length
            0xFF => pos += 1,
            0x01 | 0xD0..=0xD9 => pos += 2,
            _ => {
                let length = u16::from_be_bytes([data[pos + 2], data[pos + 3]]) as usize;
                pos += 2 + length;
            }
        }
    }

    false
}

/// Concatenate `tables` and an abbreviated `tile` stream into one stream.
pub fn merge_tables(tables: &[u8], tile: &[u8]) -> Bytes {
    let tables_end = if tables.ends_with(&EOI) {
        tables.len() - 2
    } else {
        tables.len()
    };
    let tile_start = if tile.starts_with(&SOI) { 2 } else { 0 };

    let mut out = BytesMut::with_capacity(tables_end + tile.len() - tile_start);
    out.extend_from_slice(&tables[..tables_end]);
    out.extend_from_slice(&tile[tile_start..]);
    out.freeze()
}

/// Produce a decodable stream for a tile, merging shared tables when needed.
pub fn complete_stream(tables: Option<&[u8]>, tile: &[u8]) -> Bytes {
    match tables {
        Some(tables) if !tables.is_empty() && !has_tables(tile) => merge_tables(tables, tile),
        _ => Bytes::copy_from_slice(tile),
    }
}

//! Minimal uncompressed TIFF writer for unit tests.

/// One image directory to write.
pub(crate) struct RawImage {
    pub width: u32,
    pub height: u32,
    /// `Some((tile_width, tile_height))` for tiled, `None` for strips
    pub tile: Option<(u32, u32)>,
    pub rows_per_strip: u32,
    pub samples_per_pixel: u16,
    /// Interleaved samples, `width * height * samples_per_pixel` bytes
    pub pixels: Vec<u8>,
}

impl RawImage {
    pub fn tiled(width: u32, height: u32, tile: u32) -> Self {
        Self {
            width,
            height,
            tile: Some((tile, tile)),
            rows_per_strip: height,
            samples_per_pixel: 3,
            pixels: gradient(width, height),
        }
    }

    pub fn stripped(width: u32, height: u32, rows_per_strip: u32) -> Self {
        Self {
            width,
            height,
            tile: None,
            rows_per_strip,
            samples_per_pixel: 3,
            pixels: gradient(width, height),
        }
    }

    fn blocks(&self) -> Vec<Vec<u8>> {
        let spp = self.samples_per_pixel as usize;
        let stride = self.width as usize * spp;
        let mut blocks = Vec::new();

        match self.tile {
            Some((tw, th)) => {
                for ty in 0..self.height.div_ceil(th) {
                    for tx in 0..self.width.div_ceil(tw) {
                        let mut block = vec![0u8; (tw * th) as usize * spp];
                        for row in 0..th {
                            let y = ty * th + row;
                            if y >= self.height {
                                break;
                            }
                            let x0 = tx * tw;
                            let cols = tw.min(self.width - x0) as usize;
                            let src = y as usize * stride + x0 as usize * spp;
                            let dst = row as usize * tw as usize * spp;
                            block[dst..dst + cols * spp]
                                .copy_from_slice(&self.pixels[src..src + cols * spp]);
                        }
                        blocks.push(block);
                    }
                }
            }
            None => {
                for strip in 0..self.height.div_ceil(self.rows_per_strip) {
                    let start = (strip * self.rows_per_strip) as usize;
                    let end = (start + self.rows_per_strip as usize).min(self.height as usize);
                    blocks.push(self.pixels[start * stride..end * stride].to_vec());
                }
            }
        }
        blocks
    }
}

/// RGB pixels where (x, y) is `[x, y, x + y]` modulo 256.
pub(crate) fn gradient(width: u32, height: u32) -> Vec<u8> {
    let mut pixels = Vec::with_capacity((width * height * 3) as usize);
    for y in 0..height {
        for x in 0..width {
            pixels.extend_from_slice(&[x as u8, y as u8, (x + y) as u8]);
        }
    }
    pixels
}

const SHORT: u16 = 3;
const LONG: u16 = 4;

fn shorts(values: &[u16]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_le_bytes()).collect()
}

fn longs(values: &[u32]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_le_bytes()).collect()
}

/// Write a little-endian classic TIFF with one IFD per image.
pub(crate) fn write_tiff(images: &[RawImage]) -> Vec<u8> {
    let mut buf = vec![b'I', b'I', 42, 0, 0, 0, 0, 0];
    let mut link = 4usize;

    for image in images {
        let mut offsets = Vec::new();
        let mut counts = Vec::new();
        for block in image.blocks() {
            offsets.push(buf.len() as u32);
            counts.push(block.len() as u32);
            buf.extend_from_slice(&block);
        }

        let spp = image.samples_per_pixel;
        let photometric = if spp >= 3 { 2 } else { 1 };
        let mut entries: Vec<(u16, u16, u32, Vec<u8>)> = vec![
            (256, LONG, 1, longs(&[image.width])),
            (257, LONG, 1, longs(&[image.height])),
            (258, SHORT, spp as u32, shorts(&vec![8; spp as usize])),
            (259, SHORT, 1, shorts(&[1])),
            (262, SHORT, 1, shorts(&[photometric])),
            (277, SHORT, 1, shorts(&[spp])),
            (284, SHORT, 1, shorts(&[1])),
        ];
        let n = offsets.len() as u32;
        match image.tile {
            Some((tw, th)) => {
                entries.push((322, LONG, 1, longs(&[tw])));
                entries.push((323, LONG, 1, longs(&[th])));
                entries.push((324, LONG, n, longs(&offsets)));
                entries.push((325, LONG, n, longs(&counts)));
            }
            None => {
                entries.push((273, LONG, n, longs(&offsets)));
                entries.push((278, LONG, 1, longs(&[image.rows_per_strip])));
                entries.push((279, LONG, n, longs(&counts)));
            }
        }
        entries.sort_by_key(|e| e.0);

        let mut value_offsets = Vec::with_capacity(entries.len());
        for (_, _, _, value) in &entries {
            if value.len() > 4 {
                if buf.len() % 2 == 1 {
                    buf.push(0);
                }
                value_offsets.push(Some(buf.len() as u32));
                buf.extend_from_slice(value);
            } else {
                value_offsets.push(None);
            }
        }

        if buf.len() % 2 == 1 {
            buf.push(0);
        }
        let ifd_offset = buf.len() as u32;
        buf[link..link + 4].copy_from_slice(&ifd_offset.to_le_bytes());

        buf.extend_from_slice(&(entries.len() as u16).to_le_bytes());
        for ((tag, field_type, count, value), out_of_line) in entries.iter().zip(&value_offsets) {
            buf.extend_from_slice(&tag.to_le_bytes());
            buf.extend_from_slice(&field_type.to_le_bytes());
            buf.extend_from_slice(&count.to_le_bytes());
            match out_of_line {
                Some(offset) => buf.extend_from_slice(&offset.to_le_bytes()),
                None => {
                    let mut field = [0u8; 4];
                    field[..value.len()].copy_from_slice(value);
                    buf.extend_from_slice(&field);
                }
            }
        }
        link = buf.len();
        buf.extend_from_slice(&0u32.to_le_bytes());
    }

    buf
}

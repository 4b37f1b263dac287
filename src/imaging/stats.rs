//! Image statistics and intensity transforms.

use image::RgbImage;

/// Percentile of `values` with linear interpolation between closest ranks.
///
/// The value at rank `p / 100 * (n - 1)` of the sorted data. Returns `None`
/// for empty input. `values` is reordered.
pub fn percentile(values: &mut [f32], p: f64) -> Option<f32> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(|a, b| a.total_cmp(b));

    let rank = (p / 100.0).clamp(0.0, 1.0) * (values.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let fraction = (rank - lower as f64) as f32;
    Some(values[lower] + (values[upper] - values[lower]) * fraction)
}

/// Map `[low, high]` onto `[0, 1]`, clipping values outside the range.
///
/// A degenerate range (`low == high`) is only clipped, which leaves every
/// value equal to `low`.
pub fn rescale_intensity(values: &mut [f32], low: f32, high: f32) {
    let span = high - low;
    for v in values.iter_mut() {
        let clipped = v.clamp(low, high.max(low));
        *v = if span > 0.0 {
            (clipped - low) / span
        } else {
            clipped
        };
    }
}

/// Population standard deviation of each RGB channel.
pub fn channel_std(img: &RgbImage) -> [f64; 3] {
    let n = (img.width() as u64 * img.height() as u64) as f64;
    if n == 0.0 {
        return [0.0; 3];
    }

    let mut sum = [0f64; 3];
    let mut sum_sq = [0f64; 3];
    for pixel in img.pixels() {
        for c in 0..3 {
            let v = pixel[c] as f64;
            sum[c] += v;
            sum_sq[c] += v * v;
        }
    }

    let mut std = [0f64; 3];
    for c in 0..3 {
        let mean = sum[c] / n;
        std[c] = (sum_sq[c] / n - mean * mean).max(0.0).sqrt();
    }
    std
}

/// Stretch each channel so its darkest value maps to 0 and its brightest to
/// 255. Channels with a single value are left unchanged.
pub fn autocontrast(img: &mut RgbImage) {
    let mut histograms = [[0u32; 256]; 3];
    for pixel in img.pixels() {
        for c in 0..3 {
            histograms[c][pixel[c] as usize] += 1;
        }
    }

    let mut luts = [[0u8; 256]; 3];
    for (lut, histogram) in luts.iter_mut().zip(&histograms) {
        let lo = histogram.iter().position(|&n| n > 0);
        let hi = histogram.iter().rposition(|&n| n > 0);
        match (lo, hi) {
            (Some(lo), Some(hi)) if hi > lo => {
                let scale = 255.0 / (hi - lo) as f64;
                let offset = -(lo as f64) * scale;
                for (i, entry) in lut.iter_mut().enumerate() {
                    let v = (i as f64 * scale + offset) as i64;
                    *entry = v.clamp(0, 255) as u8;
                }
            }
            _ => {
                for (i, entry) in lut.iter_mut().enumerate() {
                    *entry = i as u8;
                }
            }
        }
    }

    for pixel in img.pixels_mut() {
        for c in 0..3 {
            pixel[c] = luts[c][pixel[c] as usize];
        }
    }
}

/// Arithmetic mean, `None` for empty input.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Median (mean of the two middle values for even lengths), `None` for
/// empty input.
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

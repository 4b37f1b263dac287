//! Directory-level nuclei counting.

use std::path::Path;

use tracing::{info, warn};

use super::features::{measure_nuclei, NucleiFeatures};
use super::segment::{segment_nuclei, NucleiParams};
use super::table::{FeatureRow, FeatureTable};
use crate::error::{CountError, SegmentError};
use crate::walk::{scan_tiles, TileEntry};

/// Outcome counts of a counting run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CountSummary {
    /// Image files attempted
    pub seen: usize,
    pub written: usize,
    pub failures: usize,
    pub skipped_hidden: usize,
}

/// Decode, segment and measure one tile.
pub fn analyze_tile(path: &Path, params: &NucleiParams) -> Result<NucleiFeatures, SegmentError> {
    let img = image::open(path)?.to_rgb8();
    let seg = segment_nuclei(&img, params)?;
    let (_, features) = measure_nuclei(&seg);
    Ok(features)
}

/// Analyze every tile under `root`, appending one row per tile to `table`.
///
/// Tiles that fail are logged and skipped; only table write errors abort.
pub fn count_nuclei(
    root: &Path,
    table: &mut FeatureTable,
    params: &NucleiParams,
) -> Result<CountSummary, CountError> {
    if !root.is_dir() {
        return Err(CountError::NotADirectory(root.to_path_buf()));
    }

    let mut summary = CountSummary::default();
    for entry in scan_tiles(root, None) {
        let path = match entry {
            TileEntry::Hidden(path) => {
                info!(path = %path.display(), "Skipping hidden file");
                summary.skipped_hidden += 1;
                continue;
            }
            TileEntry::Image(path) => path,
        };

        summary.seen += 1;
        match analyze_tile(&path, params) {
            Ok(features) => {
                table.append(&FeatureRow::new(&path, &features))?;
                info!(
                    path = %path.display(),
                    nuclei = features.count,
                    "Counted nuclei"
                );
                summary.written += 1;
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Cannot analyze tile, skipping");
                summary.failures += 1;
            }
        }
    }

    info!(
        seen = summary.seen,
        written = summary.written,
        failures = summary.failures,
        skipped_hidden = summary.skipped_hidden,
        table = %table.path().display(),
        "Counting finished"
    );
    Ok(summary)
}

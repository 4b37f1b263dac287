//! Nuclei counting and morphometry.
//!
//! For every tile: segment nucleus-like regions ([`segment_nuclei`]), label
//! them, measure them ([`measure_nuclei`]) and append one aggregate row to a
//! CSV table ([`FeatureTable`]).

mod counter;
mod features;
mod segment;
mod table;

pub use counter::{analyze_tile, count_nuclei, CountSummary};
pub use features::{measure_nuclei, NucleiFeatures};
pub use segment::{segment_nuclei, tissue_mask, NucleiParams, Segmentation};
pub use table::{FeatureRow, FeatureTable, COLUMNS};

//! Append-only CSV table of per-tile features.
//!
//! The header row is written only when the file did not exist at open time,
//! so repeated runs keep appending rows under a single header. Every row is
//! flushed as soon as it is written.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use serde::Serialize;

use super::features::NucleiFeatures;
use crate::error::CountError;

/// Column names, in order
pub const COLUMNS: [&str; 7] = [
    "filename",
    "filepath",
    "nuclei_count",
    "mean_area",
    "median_eccentricity",
    "mean_perimeter",
    "mean_solidity",
];

/// One row of the table. Missing aggregates are written as empty fields.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureRow {
    pub filename: String,
    pub filepath: String,
    pub nuclei_count: u32,
    pub mean_area: Option<f64>,
    pub median_eccentricity: Option<f64>,
    pub mean_perimeter: Option<f64>,
    pub mean_solidity: Option<f64>,
}

impl FeatureRow {
    pub fn new(path: &Path, features: &NucleiFeatures) -> Self {
        Self {
            filename: path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            filepath: path.to_string_lossy().into_owned(),
            nuclei_count: features.count,
            mean_area: features.mean_area,
            median_eccentricity: features.median_eccentricity,
            mean_perimeter: features.mean_perimeter,
            mean_solidity: features.mean_solidity,
        }
    }
}

/// Writer appending [`FeatureRow`]s to a CSV file.
pub struct FeatureTable {
    path: PathBuf,
    writer: csv::Writer<File>,
    header_written: bool,
}

impl FeatureTable {
    /// Open `path` for appending, creating it if needed.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, CountError> {
        let path = path.into();
        let existed = path.exists();

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| CountError::Table {
                path: path.clone(),
                source: e.into(),
            })?;
        let writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);

        Ok(Self {
            path,
            writer,
            header_written: existed,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the header is already in the file.
    pub fn header_written(&self) -> bool {
        self.header_written
    }

    /// Append one row, preceded by the header if the table is new.
    pub fn append(&mut self, row: &FeatureRow) -> Result<(), CountError> {
        if !self.header_written {
            self.writer
                .write_record(COLUMNS)
                .map_err(|source| self.error(source))?;
            self.header_written = true;
        }
        self.writer
            .serialize(row)
            .map_err(|source| self.error(source))?;
        self.writer
            .flush()
            .map_err(|e| self.error(e.into()))
    }

    fn error(&self, source: csv::Error) -> CountError {
        CountError::Table {
            path: self.path.clone(),
            source,
        }
    }
}

//! Clean plans: the record of what a cleaning run removes, and why.
//!
//! A plan is written as pretty-printed JSON:
//!
//! ```json
//! {
//!   "root": "tiles/slide-1",
//!   "removals": [
//!     { "path": "tiles/slide-1/._slide-1_250_250.tiff", "reason": "hidden" },
//!     { "path": "tiles/slide-1/slide-1_250_698.tiff", "reason": "noise",
//!       "color_ratio": 0.31, "mean_std": 12.4 }
//!   ]
//! }
//! ```
//!
//! `purge` deletes every listed file; re-running it on the same plan only
//! counts the files as already missing.

use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::classify::TileStats;
use crate::error::CleanError;

/// Why a file is removed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum RemovalReason {
    /// Hidden metadata file
    Hidden,
    /// File that could not be decoded as an image
    Corrupt { error: String },
    /// Decodable tile that failed classification
    Noise { color_ratio: f64, mean_std: f64 },
}

impl RemovalReason {
    pub fn noise(stats: &TileStats) -> Self {
        RemovalReason::Noise {
            color_ratio: stats.color_ratio,
            mean_std: stats.mean_std,
        }
    }
}

impl std::fmt::Display for RemovalReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RemovalReason::Hidden => write!(f, "hidden"),
            RemovalReason::Corrupt { .. } => write!(f, "corrupt"),
            RemovalReason::Noise { .. } => write!(f, "noise"),
        }
    }
}

/// One file scheduled for removal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannedRemoval {
    pub path: PathBuf,
    #[serde(flatten)]
    pub reason: RemovalReason,
}

/// Removal decisions of one cleaning run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CleanPlan {
    /// Directory that was scanned
    pub root: PathBuf,
    pub removals: Vec<PlannedRemoval>,
}

impl CleanPlan {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            removals: Vec::new(),
        }
    }

    pub fn push(&mut self, path: PathBuf, reason: RemovalReason) {
        self.removals.push(PlannedRemoval { path, reason });
    }

    pub fn len(&self) -> usize {
        self.removals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.removals.is_empty()
    }

    /// Write the plan as JSON.
    pub fn save(&self, path: &Path) -> Result<(), CleanError> {
        let json = serde_json::to_string_pretty(self).map_err(|source| CleanError::PlanFormat {
            path: path.to_path_buf(),
            source,
        })?;
        std::fs::write(path, json).map_err(|source| CleanError::PlanIo {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Read a plan written by [`CleanPlan::save`].
    pub fn load(path: &Path) -> Result<Self, CleanError> {
        let json = std::fs::read_to_string(path).map_err(|source| CleanError::PlanIo {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&json).map_err(|source| CleanError::PlanFormat {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Outcome counts of a purge.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PurgeSummary {
    pub removed: usize,
    pub missing: usize,
    pub failed: usize,
}

/// Delete every file listed in a plan.
pub fn purge(plan: &CleanPlan) -> PurgeSummary {
    let mut summary = PurgeSummary::default();
    for removal in &plan.removals {
        match std::fs::remove_file(&removal.path) {
            Ok(()) => {
                info!(path = %removal.path.display(), reason = %removal.reason, "Removed");
                summary.removed += 1;
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                summary.missing += 1;
            }
            Err(e) => {
                warn!(path = %removal.path.display(), error = %e, "Cannot remove file");
                summary.failed += 1;
            }
        }
    }
    info!(
        removed = summary.removed,
        missing = summary.missing,
        failed = summary.failed,
        "Purge finished"
    );
    summary
}

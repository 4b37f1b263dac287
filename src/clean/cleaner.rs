//! Tile directory cleaning.
//!
//! Classification and disposal are separate steps: the scan produces a
//! [`CleanPlan`] and the [`Disposal`] mode decides what happens to the
//! planned files. The default mode only reports.

use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use super::classify::{TileStats, TissueClassifierParams};
use super::plan::{CleanPlan, RemovalReason};
use crate::error::CleanError;
use crate::walk::{scan_tiles, TileEntry};

/// What to do with files classified for removal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Disposal {
    /// Leave every file in place
    #[default]
    Report,
    /// Move files under this directory, keeping their path relative to the
    /// scanned root
    Quarantine(PathBuf),
    /// Delete files
    Delete,
}

/// Outcome counts of a cleaning run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanSummary {
    /// Image files decoded or attempted
    pub inspected: usize,
    pub retained: usize,
    pub hidden: usize,
    pub corrupt: usize,
    pub noise: usize,
    /// Planned files that could not be moved or deleted
    pub disposal_failures: usize,
}

impl CleanSummary {
    pub fn removed(&self) -> usize {
        self.hidden + self.corrupt + self.noise
    }
}

/// Result of [`clean_tiles`].
#[derive(Debug, Clone)]
pub struct CleanOutcome {
    pub plan: CleanPlan,
    pub summary: CleanSummary,
}

/// Classify every tile under `root` and dispose of the rejected files.
pub fn clean_tiles(
    root: &Path,
    params: &TissueClassifierParams,
    disposal: &Disposal,
) -> Result<CleanOutcome, CleanError> {
    if !root.is_dir() {
        return Err(CleanError::NotADirectory(root.to_path_buf()));
    }

    let mut plan = CleanPlan::new(root);
    let mut summary = CleanSummary::default();

    let quarantine_dir = match disposal {
        Disposal::Quarantine(dir) => Some(dir.as_path()),
        _ => None,
    };

    for entry in scan_tiles(root, quarantine_dir) {
        match entry {
            TileEntry::Hidden(path) => {
                info!(path = %path.display(), "Hidden file");
                summary.hidden += 1;
                plan.push(path, RemovalReason::Hidden);
            }
            TileEntry::Image(path) => {
                summary.inspected += 1;
                match image::open(&path) {
                    Err(e) => {
                        info!(path = %path.display(), error = %e, "Unreadable image");
                        summary.corrupt += 1;
                        plan.push(
                            path,
                            RemovalReason::Corrupt {
                                error: e.to_string(),
                            },
                        );
                    }
                    Ok(img) => {
                        let stats = TileStats::measure(&img.to_rgb8(), params);
                        if stats.is_tissue(params) {
                            info!(
                                path = %path.display(),
                                color_ratio = stats.color_ratio,
                                mean_std = stats.mean_std,
                                "Tissue image retained"
                            );
                            summary.retained += 1;
                        } else {
                            info!(
                                path = %path.display(),
                                color_ratio = stats.color_ratio,
                                mean_std = stats.mean_std,
                                "Noise image"
                            );
                            summary.noise += 1;
                            plan.push(path, RemovalReason::noise(&stats));
                        }
                    }
                }
            }
        }
    }

    summary.disposal_failures = dispose(&plan, disposal);

    info!(
        inspected = summary.inspected,
        retained = summary.retained,
        hidden = summary.hidden,
        corrupt = summary.corrupt,
        noise = summary.noise,
        disposal_failures = summary.disposal_failures,
        "Cleaning finished"
    );
    Ok(CleanOutcome { plan, summary })
}

/// Apply a disposal mode to every planned file. Returns the failure count.
fn dispose(plan: &CleanPlan, disposal: &Disposal) -> usize {
    let mut failures = 0;
    for removal in &plan.removals {
        let result = match disposal {
            Disposal::Report => continue,
            Disposal::Delete => std::fs::remove_file(&removal.path),
            Disposal::Quarantine(dir) => quarantine(&plan.root, &removal.path, dir),
        };
        match result {
            Ok(()) => debug!(path = %removal.path.display(), reason = %removal.reason, "Disposed"),
            Err(e) => {
                warn!(path = %removal.path.display(), error = %e, "Cannot dispose of file");
                failures += 1;
            }
        }
    }
    failures
}

/// Destination of `path` inside the quarantine directory.
pub fn quarantine_path(root: &Path, path: &Path, dir: &Path) -> PathBuf {
    match path.strip_prefix(root) {
        Ok(relative) => dir.join(relative),
        Err(_) => dir.join(path.file_name().unwrap_or(path.as_os_str())),
    }
}

fn quarantine(root: &Path, path: &Path, dir: &Path) -> io::Result<()> {
    let target = quarantine_path(root, path, dir);
    if target.try_exists()? {
        return Err(io::Error::new(
            io::ErrorKind::AlreadyExists,
            format!("{} is already quarantined", target.display()),
        ));
    }
    if let Some(parent) = target.parent() {
        std::fs::create_dir_all(parent)?;
    }
    if std::fs::rename(path, &target).is_err() {
        // Rename fails across filesystems
        std::fs::copy(path, &target)?;
        std::fs::remove_file(path)?;
    }
    Ok(())
}

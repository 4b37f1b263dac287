//! Tile cleaning.
//!
//! Walks a tile directory and sorts every file into one of:
//!
//! - **hidden**: `._*` metadata files, removed without inspection
//! - **corrupt**: image files that fail to decode
//! - **noise**: decodable tiles that fail [`TileStats::is_tissue`]
//! - **retained**: everything else
//!
//! The first three make up the [`CleanPlan`], which is applied according to
//! the chosen [`Disposal`] and can be saved and purged later.

mod classify;
mod cleaner;
mod plan;

pub use classify::{TileStats, TissueClassifierParams};
pub use cleaner::{clean_tiles, quarantine_path, CleanOutcome, CleanSummary, Disposal};
pub use plan::{purge, CleanPlan, PlannedRemoval, PurgeSummary, RemovalReason};

//! Tile directory traversal shared by the cleaner and the nuclei counter.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::warn;
use walkdir::{DirEntry, WalkDir};

/// File name prefix of AppleDouble metadata files
pub const HIDDEN_PREFIX: &str = "._";

/// Extensions (lowercase) of files treated as tiles
pub const IMAGE_EXTENSIONS: [&str; 5] = ["tif", "tiff", "png", "jpg", "jpeg"];

/// A file found under a tile directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TileEntry {
    /// Metadata file whose name starts with [`HIDDEN_PREFIX`]
    Hidden(PathBuf),
    /// File with an image extension
    Image(PathBuf),
}

impl TileEntry {
    pub fn path(&self) -> &Path {
        match self {
            TileEntry::Hidden(path) | TileEntry::Image(path) => path,
        }
    }
}

/// Whether a file name marks a hidden metadata file.
pub fn is_hidden(file_name: &str) -> bool {
    file_name.starts_with(HIDDEN_PREFIX)
}

/// Whether a path has one of [`IMAGE_EXTENSIONS`], ignoring case.
pub fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.as_str()))
}

/// Hidden and image files under `root`, recursively, in file name order.
///
/// Other files are ignored. Unreadable directory entries are logged and
/// skipped. The `exclude` directory, when given, is pruned with everything
/// below it; it is matched on its resolved path, so `tiles/q`, `./tiles/q`
/// and an absolute spelling all name the same directory.
pub fn scan_tiles(root: &Path, exclude: Option<&Path>) -> Vec<TileEntry> {
    let excluded = exclude.map(|dir| fs::canonicalize(dir).unwrap_or_else(|_| dir.to_path_buf()));

    let mut entries = Vec::new();
    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| !is_excluded(entry, excluded.as_deref()));
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(error = %e, "Cannot read directory entry, skipping");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }

        let hidden = is_hidden(&entry.file_name().to_string_lossy());
        if hidden {
            entries.push(TileEntry::Hidden(entry.into_path()));
        } else if has_image_extension(entry.path()) {
            entries.push(TileEntry::Image(entry.into_path()));
        }
    }
    entries
}

fn is_excluded(entry: &DirEntry, excluded: Option<&Path>) -> bool {
    let Some(excluded) = excluded else {
        return false;
    };
    entry.file_type().is_dir()
        && (entry.path() == excluded
            || fs::canonicalize(entry.path()).is_ok_and(|path| path == excluded))
}

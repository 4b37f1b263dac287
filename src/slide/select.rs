//! Choosing the series to tile.

use super::reader::SlideReader;
use crate::error::SlideError;

/// How the extractor picks a series from a slide.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeriesSelector {
    /// An explicit series index
    Index(usize),

    /// The largest series (by pixel area) whose sides both fit the bound.
    /// Ties go to the lower index.
    LargestWithin { max_dimension: u32 },
}

impl SeriesSelector {
    /// Resolve the selector against a slide's series list.
    pub fn resolve<S: SlideReader + ?Sized>(&self, slide: &S) -> Result<usize, SlideError> {
        match *self {
            SeriesSelector::Index(series) => {
                let count = slide.series_count();
                if series >= count {
                    return Err(SlideError::SeriesOutOfRange { series, count });
                }
                Ok(series)
            }
            SeriesSelector::LargestWithin { max_dimension } => {
                let mut best: Option<(usize, u64)> = None;
                for info in slide.all_series() {
                    if info.width > max_dimension || info.height > max_dimension {
                        continue;
                    }
                    if best.map_or(true, |(_, area)| info.area() > area) {
                        best = Some((info.index, info.area()));
                    }
                }
                best.map(|(index, _)| index)
                    .ok_or(SlideError::NoMatchingSeries { max_dimension })
            }
        }
    }
}

impl std::fmt::Display for SeriesSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SeriesSelector::Index(i) => write!(f, "series {}", i),
            SeriesSelector::LargestWithin { max_dimension } => {
                write!(f, "largest series within {}px", max_dimension)
            }
        }
    }
}

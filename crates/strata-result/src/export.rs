//! Hand-off of placed fields to grid file encoders.

use std::fmt;
use std::io;
use std::path::Path;

use indexmap::IndexMap;
use strata_core::{Dataset, IncrementId};

use crate::grid::Grid;

/// Where placed values live on the grid.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ExportMode {
    /// One value per cell of a rectilinear grid.
    #[default]
    Cell,
    /// One value per cell centre, as a point cloud.
    Point,
}

impl fmt::Display for ExportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Cell => "cell",
            Self::Point => "point",
        })
    }
}

/// A file format for gridded data.
///
/// [`Results::export`](crate::Results::export) calls
/// [`encode`](Self::encode) once per visible increment with every placed
/// field, named `<phase|homogenization>/<label>`.
pub trait GridEncoder {
    /// File extension without the dot, e.g. `"vti"`.
    fn extension(&self) -> &str;

    /// Returns `true` if the format holds exactly one increment, so an
    /// export must not span several.
    fn single_increment(&self) -> bool {
        false
    }

    /// Write one increment to `path`.
    fn encode(
        &mut self,
        path: &Path,
        grid: &Grid,
        mode: ExportMode,
        arrays: &IndexMap<String, Dataset>,
    ) -> io::Result<()>;
}

/// Digits needed to print the largest increment index, at least one.
pub(crate) fn index_width(last: Option<IncrementId>) -> usize {
    let last = last.map_or(0, |id| id.0).max(1);
    last.ilog10() as usize + 1
}

/// `<stem>_inc<NN>.<ext>` with the index zero-padded to `width`.
pub(crate) fn file_name(stem: &str, increment: IncrementId, width: usize, ext: &str) -> String {
    format!("{stem}_inc{:0width$}.{ext}", increment.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_names_are_padded_to_the_last_increment() {
        assert_eq!(index_width(None), 1);
        assert_eq!(index_width(Some(IncrementId(0))), 1);
        assert_eq!(index_width(Some(IncrementId(9))), 1);
        assert_eq!(index_width(Some(IncrementId(10))), 2);
        assert_eq!(index_width(Some(IncrementId(250))), 3);
        assert_eq!(file_name("run", IncrementId(5), 3, "vti"), "run_inc005.vti");
        assert_eq!(file_name("run", IncrementId(40), 2, "txt"), "run_inc40.txt");
    }
}

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use crate::error::SortError;

/// Number of runs up to which [MergeSelection::Auto] scans cursors linearly
pub(crate) const LINEAR_SELECTION_MAX_RUNS: usize = 8;

/// How the merge picks the cursor holding the smallest record.
///
/// All strategies produce the same output, they differ only in cost per merged record.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MergeSelection {
    /// Linear scan for a few runs, binary heap otherwise
    #[default]
    Auto,
    /// Scan all cursors, O(k) per record
    Linear,
    /// Binary heap keyed by the record order, O(log k) per record
    Heap,
}

impl MergeSelection {
    /// The concrete strategy used for merging `runs` runs
    pub(crate) fn resolve(self, runs: usize) -> MergeSelection {
        match self {
            MergeSelection::Auto => {
                if runs <= LINEAR_SELECTION_MAX_RUNS {
                    MergeSelection::Linear
                } else {
                    MergeSelection::Heap
                }
            }
            selection => selection,
        }
    }
}

impl Display for MergeSelection {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            MergeSelection::Auto => "auto",
            MergeSelection::Linear => "linear",
            MergeSelection::Heap => "heap",
        };
        write!(f, "{name}")
    }
}

impl FromStr for MergeSelection {
    type Err = SortError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(MergeSelection::Auto),
            "linear" => Ok(MergeSelection::Linear),
            "heap" => Ok(MergeSelection::Heap),
            other => Err(SortError::invalid_parameter(
                "merge_selection",
                format!("'{other}', expected one of auto, linear, heap"),
            )),
        }
    }
}

use std::path::{Path, PathBuf};

use crate::cancellation::Cancellation;
use crate::error::SortError;
use crate::merge_selection::MergeSelection;

#[derive(Clone, Debug)]
pub(crate) struct Config {
    run_dir: PathBuf,
    run_stem: String,
    run_extension: Option<String>,
    max_records_per_run: usize,
    flush_interval: usize,
    merge_selection: MergeSelection,
    cancellation: Cancellation,
}

impl Config {
    /// Run files are named after `input` and placed in `tmp`, or next to `input` when `tmp`
    /// is not given
    pub(crate) fn new(
        input: &Path,
        tmp: Option<PathBuf>,
        max_records_per_run: usize,
        merge_selection: MergeSelection,
        cancellation: Cancellation,
    ) -> Result<Config, SortError> {
        if max_records_per_run == 0 {
            return Err(SortError::invalid_parameter("max_records_per_run", "must be >= 1"));
        }

        let run_stem = input
            .file_stem()
            .ok_or_else(|| SortError::invalid_parameter("input", format!("'{}' has no file name", input.display())))?
            .to_string_lossy()
            .to_string();
        let run_extension = input.extension().map(|e| e.to_string_lossy().to_string());
        let run_dir = match tmp {
            Some(tmp) => tmp,
            None => parent_dir(input),
        };

        Ok(
            Config {
                run_dir,
                run_stem,
                run_extension,
                max_records_per_run,
                flush_interval: max_records_per_run,
                merge_selection,
                cancellation,
            }
        )
    }

    pub(crate) fn run_dir(&self) -> &PathBuf {
        &self.run_dir
    }

    /// Deterministic path of the run with the given index: `<stem>.part-<index>[.<ext>]`
    pub(crate) fn run_path(&self, index: usize) -> PathBuf {
        let name = match &self.run_extension {
            Some(extension) => format!("{}.part-{}.{}", self.run_stem, index, extension),
            None => format!("{}.part-{}", self.run_stem, index),
        };
        self.run_dir.join(name)
    }

    pub(crate) fn max_records_per_run(&self) -> usize {
        self.max_records_per_run
    }

    pub(crate) fn flush_interval(&self) -> usize {
        self.flush_interval
    }

    pub(crate) fn merge_selection(&self) -> MergeSelection {
        self.merge_selection
    }

    pub(crate) fn cancellation(&self) -> &Cancellation {
        &self.cancellation
    }
}

/// Directory containing `path`, "." for bare file names
pub(crate) fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

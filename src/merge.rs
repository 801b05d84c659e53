use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tempfile::{Builder, NamedTempFile};

use crate::config::{parent_dir, Config};
use crate::cursor::Cursor;
use crate::error::{IoContext, SortError};
use crate::merge_selection::MergeSelection;
use crate::record::LineEnding;

/// Origin of the files being merged
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MergeInputs {
    /// Run files written by the splitter, deleted once exhausted
    Runs,
    /// Sorted files supplied by the caller, kept
    SortedFiles,
}

impl MergeInputs {
    fn line_ending(self) -> LineEnding {
        match self {
            MergeInputs::Runs => LineEnding::Lf,
            MergeInputs::SortedFiles => LineEnding::LfOrCrLf,
        }
    }

    fn remove_exhausted(self) -> bool {
        self == MergeInputs::Runs
    }
}

/// Cursors whose runs still hold records
enum ActiveCursors {
    Linear(Vec<Cursor>),
    Heap(BinaryHeap<Reverse<Cursor>>),
}

impl ActiveCursors {
    fn new(selection: MergeSelection, cursors: Vec<Cursor>) -> ActiveCursors {
        match selection.resolve(cursors.len()) {
            MergeSelection::Heap => ActiveCursors::Heap(cursors.into_iter().map(Reverse).collect()),
            _ => ActiveCursors::Linear(cursors),
        }
    }

    /// Remove and return the cursor holding the smallest record
    fn pop_min(&mut self) -> Option<Cursor> {
        match self {
            ActiveCursors::Linear(cursors) => {
                let index = cursors
                    .iter()
                    .enumerate()
                    .min_by(|(_, a), (_, b)| a.cmp(b))
                    .map(|(i, _)| i)?;
                Some(cursors.swap_remove(index))
            }
            ActiveCursors::Heap(cursors) => cursors.pop().map(|Reverse(cursor)| cursor),
        }
    }

    fn push(&mut self, cursor: Cursor) {
        match self {
            ActiveCursors::Linear(cursors) => cursors.push(cursor),
            ActiveCursors::Heap(cursors) => cursors.push(Reverse(cursor)),
        }
    }
}

/// Staging file next to `output`, renamed onto it once the merge succeeds
fn create_staging_file(output: &Path) -> Result<NamedTempFile, SortError> {
    let name = output
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| "output".to_string());
    Builder::new()
        .prefix(&format!(".{}.", name))
        .suffix(".tmp")
        .tempfile_in(parent_dir(output))
        .io_context(|| format!("create staging file for {}", output.display()))
}

/// k-way merge of sorted run files into `output`.
///
/// Every run gets one [Cursor]. A run is closed as soon as its last record has been written, and
/// deleted when it is one of [MergeInputs::Runs]. Returns the number of records written.
pub(crate) fn merge_runs(config: &Config, runs: &[PathBuf], output: &Path, inputs: MergeInputs) -> Result<usize, SortError> {
    log::info!("Merging {} sorted runs into {}", runs.len(), output.display());
    let staged = create_staging_file(output)?;
    let remove_exhausted = inputs.remove_exhausted();

    let mut cursors = Vec::with_capacity(runs.len());
    for path in runs {
        let cursor = Cursor::open(path.clone(), inputs.line_ending())?;
        if cursor.is_exhausted() {
            cursor.close(remove_exhausted)?;
        } else {
            cursors.push(cursor);
        }
    }

    let selection = config.merge_selection().resolve(cursors.len());
    log::debug!("Selecting from {} cursors using {} selection", cursors.len(), selection);
    let mut active = ActiveCursors::new(selection, cursors);
    let mut writer = BufWriter::new(staged);
    let flush_interval = config.flush_interval();
    let mut merged_len: usize = 0;

    while let Some(mut cursor) = active.pop_min() {
        config.cancellation().check()?;
        if let Some(record) = cursor.read_next()? {
            writeln!(writer, "{}", record).io_context(|| format!("write {}", output.display()))?;
            merged_len += 1;
            if merged_len % flush_interval == 0 {
                writer.flush().io_context(|| format!("flush {}", output.display()))?;
            }
        }

        if cursor.is_exhausted() {
            cursor.close(remove_exhausted)?;
        } else {
            active.push(cursor);
        }
    }

    let staged = writer
        .into_inner()
        .map_err(|e| SortError::io(format!("flush {}", output.display()), e.into_error()))?;
    staged
        .as_file()
        .sync_all()
        .io_context(|| format!("sync {}", output.display()))?;
    staged
        .persist(output)
        .map_err(|e| SortError::io(format!("rename staging file to {}", output.display()), e.error))?;

    log::info!("Finished merging into {}, merged length: {} lines", output.display(), merged_len);
    Ok(merged_len)
}

use std::cmp::{max, min};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use rlimit::{getrlimit, setrlimit, Resource};

use crate::cancellation::Cancellation;
use crate::config::{parent_dir, Config};
use crate::error::{IoContext, SortError};
use crate::merge::{merge_runs, MergeInputs};
use crate::merge_selection::MergeSelection;
use crate::record::{LineEnding, Record};
use crate::run_file::remove_run_files;
use crate::splitter::RunSplitter;

/// Descriptors reserved for everything other than the merged runs
const RESERVED_FILES: u64 = 256;

/// Default output path: `<dir>/<stem>_sorted<.ext>`
///
/// # Examples
/// ```
/// use std::path::{Path, PathBuf};
/// use record_file_sort::sort::default_output_path;
///
/// assert_eq!(default_output_path(Path::new("data/input.txt")), PathBuf::from("data/input_sorted.txt"));
/// ```
pub fn default_output_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|stem| stem.to_string_lossy().to_string())
        .unwrap_or_default();
    let name = match input.extension() {
        Some(extension) => format!("{}_sorted.{}", stem, extension.to_string_lossy()),
        None => format!("{}_sorted", stem),
    };
    parent_dir(input).join(name)
}

/// Sort a file of `<number>. <text>` records by text, then by number.
///
/// The input is split into sorted runs of at most `max_records_per_run` records which are then
/// merged into the output. Memory usage is bounded by two runs, one being parsed and sorted and
/// one being written.
///
/// # Examples
/// ```
/// use std::path::PathBuf;
/// use record_file_sort::sort::Sort;
///
/// fn sort_records(input: PathBuf, output: PathBuf, tmp: PathBuf) -> Result<PathBuf, anyhow::Error> {
///     let mut sort = Sort::new(input);
///     sort.with_output(output);
///     // one run holds at most this many records, the output is flushed at the same cadence
///     sort.with_max_records_per_run(100_000);
///     // run files are created next to the input unless a directory is given
///     sort.with_tmp_dir(tmp);
///     Ok(sort.sort()?)
/// }
/// ```
pub struct Sort {
    input: PathBuf,
    output: Option<PathBuf>,
    tmp: Option<PathBuf>,
    max_records_per_run: usize,
    merge_selection: MergeSelection,
    cancellation: Cancellation,
}

impl Sort {
    /// Create a default Sort definition.
    ///
    /// * output is `<stem>_sorted<.ext>` next to the input
    /// * run files are created next to the input
    /// * runs hold up to 50 000 records
    /// * merge selection is [MergeSelection::Auto]
    pub fn new(input: PathBuf) -> Sort {
        Sort {
            input,
            output: None,
            tmp: None,
            max_records_per_run: 50_000,
            merge_selection: MergeSelection::Auto,
            cancellation: Cancellation::new(),
        }
    }

    /// Set the output path
    pub fn with_output(&mut self, output: PathBuf) {
        self.output = Some(output);
    }

    /// Set directory for run files. By default run files are created next to the input
    pub fn with_tmp_dir(&mut self, tmp: PathBuf) {
        self.tmp = Some(tmp);
    }

    /// Set the maximal number of records held in memory for one run. Also used as the
    /// number of records between output flushes.
    pub fn with_max_records_per_run(&mut self, max_records_per_run: usize) {
        self.max_records_per_run = max_records_per_run;
    }

    /// Set [MergeSelection]
    pub fn with_merge_selection(&mut self, merge_selection: MergeSelection) {
        self.merge_selection = merge_selection;
    }

    /// Use `cancellation` to stop a running sort from another thread
    pub fn with_cancellation(&mut self, cancellation: Cancellation) {
        self.cancellation = cancellation;
    }

    /// The path the sorted output is written to
    pub fn output_path(&self) -> PathBuf {
        self.output
            .clone()
            .unwrap_or_else(|| default_output_path(&self.input))
    }

    fn create_config(&self) -> Result<Config, SortError> {
        Config::new(
            &self.input,
            self.tmp.clone(),
            self.max_records_per_run,
            self.merge_selection,
            self.cancellation.clone(),
        )
    }

    fn ensure_input(&self) -> Result<(), SortError> {
        if self.input.is_file() {
            Ok(())
        } else {
            Err(SortError::InputNotFound { path: self.input.clone() })
        }
    }

    /// Sort the input into the output path and return it
    pub fn sort(&self) -> Result<PathBuf, SortError> {
        self.ensure_input()?;
        let config = self.create_config()?;
        let output = self.output_path();
        log::info!("Start sorting {} into {}", self.input.display(), output.display());

        let runs = RunSplitter::new(&config, &self.input).split()?;
        let run_paths: Vec<PathBuf> = runs.iter().map(|run| run.path().clone()).collect();
        let merged = Self::with_open_files(run_paths.len(), || merge_runs(&config, &run_paths, &output, MergeInputs::Runs))?;
        remove_run_files(&run_paths);

        log::info!("Finish sorting {}, {} records", self.input.display(), merged);
        Ok(output)
    }

    /// Merge already sorted `files` into the output path. The merged files are kept.
    pub fn merge(&self, files: &[PathBuf]) -> Result<PathBuf, SortError> {
        if let Some(missing) = files.iter().find(|file| !file.is_file()) {
            return Err(SortError::InputNotFound { path: missing.clone() });
        }
        let config = self.create_config()?;
        let output = self.output_path();
        Self::with_open_files(files.len(), || merge_runs(&config, files, &output, MergeInputs::SortedFiles))?;
        Ok(output)
    }

    /// Check whether the input is sorted
    pub fn check(&self) -> Result<bool, SortError> {
        self.ensure_input()?;
        let config = self.create_config()?;
        Self::internal_check(&self.input, &config)
    }

    pub(crate) fn internal_check(path: &Path, config: &Config) -> Result<bool, SortError> {
        let mut reader = BufReader::new(File::open(path).io_context(|| format!("open {}", path.display()))?);
        let mut line = String::new();
        let mut line_number: usize = 0;
        let mut byte_offset: u64 = 0;
        let mut previous: Option<Record> = None;
        loop {
            config.cancellation().check()?;
            line.clear();
            let bytes = reader
                .read_line(&mut line)
                .io_context(|| format!("read {}", path.display()))?;
            if bytes == 0 {
                break;
            }
            line_number += 1;
            let current = Record::parse(LineEnding::LfOrCrLf.trim(&line))
                .map_err(|source| SortError::Format {
                    path: path.to_path_buf(),
                    line_number,
                    byte_offset,
                    source,
                })?;
            byte_offset += bytes as u64;
            if let Some(previous) = &previous {
                if previous > &current {
                    log::info!("{} is not sorted at line {}", path.display(), line_number);
                    return Ok(false);
                }
            }
            previous = Some(current);
        }
        Ok(true)
    }

    /// Run `f` with the open files soft limit raised to fit `files` open runs
    fn with_open_files<T, F>(files: usize, f: F) -> Result<T, SortError>
    where
        F: FnOnce() -> Result<T, SortError>,
    {
        let (current_soft, current_hard) = Self::get_rlimits()?;
        let new_soft = min(max(files as u64 + RESERVED_FILES, current_soft), current_hard);
        if new_soft == current_soft {
            return f();
        }
        log::info!("Set new rlimit NOFILE, soft: {}, hard: {}", new_soft, current_hard);
        Self::set_rlimits(new_soft, current_hard)?;
        let result = f();
        log::info!("Restore rlimit NOFILE, soft: {}, hard: {}", current_soft, current_hard);
        Self::merge_restore_result(result, Self::set_rlimits(current_soft, current_hard))
    }

    /// A restore failure is reported only when `f` succeeded, otherwise the error of `f` wins
    fn merge_restore_result<T>(result: Result<T, SortError>, restored: Result<(), SortError>) -> Result<T, SortError> {
        match (result, restored) {
            (result, Ok(())) => result,
            (Ok(_), Err(e)) => Err(e),
            (Err(e), Err(restore_error)) => {
                log::warn!("Failed to restore rlimit NOFILE: {}", restore_error);
                Err(e)
            }
        }
    }

    fn get_rlimits() -> Result<(u64, u64), SortError> {
        getrlimit(Resource::NOFILE).io_context(|| "getrlimit NOFILE")
    }

    fn set_rlimits(soft: u64, hard: u64) -> Result<(), SortError> {
        setrlimit(Resource::NOFILE, soft, hard)
            .io_context(|| format!("set rlimit NOFILE, soft: {}, hard: {}", soft, hard))
    }
}

//! This crate implements an external merge sort for text files of numbered records, lines of the
//! form `<number>. <text>`, for example `415. Apple banana cherry`.
//!
//! Records are ordered by their text, compared byte by byte, and records with equal text by their
//! number. Files of any size can be sorted: the input is read in runs of a bounded number of
//! records, each run is sorted in memory and written to a run file, and finally all runs are
//! merged into the output with one cursor per run. The text of every record is preserved byte for
//! byte.
//!
//! The crate also contains a generator of random record files useful for testing and
//! benchmarking, see [generator::FileGenerator].
//!
//! # Examples
//! ```
//! use std::path::PathBuf;
//! use record_file_sort::sort::Sort;
//!
//! fn sort_records(input: PathBuf, tmp: PathBuf) -> Result<(), anyhow::Error> {
//!     let mut sort = Sort::new(input);
//!
//!     // the number of records held in memory for a single run
//!     sort.with_max_records_per_run(100_000);
//!
//!     // set the directory for run files. The default is the directory of the input, for large
//!     // files it is recommended to provide a dedicated directory, preferably on the same file
//!     // system as the output.
//!     sort.with_tmp_dir(tmp);
//!
//!     // the output defaults to <input stem>_sorted<.ext> next to the input
//!     let output = sort.sort()?;
//!     log::info!("Sorted into {}", output.display());
//!     Ok(())
//! }
//! ```
//!

pub(crate) mod config;
pub(crate) mod cursor;
pub(crate) mod merge;
pub(crate) mod pipeline;
pub(crate) mod run_file;
pub(crate) mod splitter;

pub mod cancellation;
pub mod error;
pub mod generator;
pub mod merge_selection;
pub mod record;
pub mod sort;

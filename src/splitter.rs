use std::cmp::min;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::error::{IoContext, SortError};
use crate::pipeline::WritePipeline;
use crate::record::{LineEnding, Record};
use crate::run_file::{remove_run_files, RunFile};

/// Upper bound for the records preallocated for a run
const INITIAL_RUN_CAPACITY: usize = 1 << 16;

/// Write already sorted records to `path`, one per line
pub(crate) fn write_run(path: &Path, records: &[Record]) -> Result<(), SortError> {
    let file = File::create(path).io_context(|| format!("create run {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    for record in records {
        writeln!(writer, "{}", record).io_context(|| format!("write run {}", path.display()))?;
    }
    writer.flush().io_context(|| format!("flush run {}", path.display()))?;
    Ok(())
}

/// Splits an input file into sorted runs of at most `max_records_per_run` records.
///
/// The input is read strictly forward. A run is sorted in memory and handed to a background
/// writer, the next run is parsed while the previous one is being written.
pub(crate) struct RunSplitter<'a> {
    config: &'a Config,
    input: PathBuf,
    runs: Vec<RunFile>,
}

impl<'a> RunSplitter<'a> {
    pub(crate) fn new(config: &'a Config, input: &Path) -> RunSplitter<'a> {
        RunSplitter {
            config,
            input: input.to_path_buf(),
            runs: Vec::new(),
        }
    }

    /// Split the input. On failure other than cancellation the run files created so far are
    /// removed before the error is returned.
    pub(crate) fn split(mut self) -> Result<Vec<RunFile>, SortError> {
        log::info!("Start splitting {} into runs of {} records", self.input.display(), self.config.max_records_per_run());
        let mut pipeline = WritePipeline::new("run-writer")?;
        let result = self.split_into(&mut pipeline);
        let finished = pipeline.finish();
        let result = result.and_then(|_| finished.map(|_| ()));

        match result {
            Ok(()) => {
                log::info!("Finish splitting {}, runs: {}", self.input.display(), self.runs.len());
                Ok(self.runs)
            }
            Err(SortError::Cancelled) => {
                log::info!("Splitting {} cancelled, {} run files left in {}", self.input.display(), self.runs.len(), self.config.run_dir().display());
                Err(SortError::Cancelled)
            }
            Err(e) => {
                log::info!("Splitting {} failed, removing {} run files", self.input.display(), self.runs.len());
                remove_run_files(self.runs.iter().map(|run| run.path()));
                Err(e)
            }
        }
    }

    fn split_into(&mut self, pipeline: &mut WritePipeline) -> Result<(), SortError> {
        let max_records = self.config.max_records_per_run();
        let file = File::open(&self.input).io_context(|| format!("open input {}", self.input.display()))?;
        let mut reader = BufReader::new(file);
        let mut line = String::new();
        let mut line_number: usize = 0;
        let mut bytes_consumed: u64 = 0;
        let capacity = min(max_records, INITIAL_RUN_CAPACITY);
        let mut batch: Vec<Record> = Vec::with_capacity(capacity);

        loop {
            self.config.cancellation().check()?;
            line.clear();
            let bytes = reader
                .read_line(&mut line)
                .io_context(|| format!("read input {}", self.input.display()))?;
            if bytes == 0 {
                break;
            }
            line_number += 1;
            let record = Record::parse(LineEnding::LfOrCrLf.trim(&line))
                .map_err(|source| SortError::Format {
                    path: self.input.clone(),
                    line_number,
                    byte_offset: bytes_consumed,
                    source,
                })?;
            bytes_consumed += bytes as u64;
            batch.push(record);

            if batch.len() == max_records {
                let full = std::mem::replace(&mut batch, Vec::with_capacity(capacity));
                self.submit_run(pipeline, full)?;
            }
        }

        if !batch.is_empty() {
            self.submit_run(pipeline, batch)?;
        }
        log::debug!("Read {} lines, {} bytes from {}", line_number, bytes_consumed, self.input.display());
        Ok(())
    }

    fn submit_run(&mut self, pipeline: &mut WritePipeline, mut records: Vec<Record>) -> Result<(), SortError> {
        records.sort_unstable();
        let path = self.config.run_path(self.runs.len());
        let run = RunFile::new(path.clone(), records.len());
        log::debug!("Writing run {} with {} records", path.display(), run.records());
        // registered before the write starts so a failed split removes it as well
        self.runs.push(run);
        pipeline.submit(move || write_run(&path, &records))?;
        Ok(())
    }
}

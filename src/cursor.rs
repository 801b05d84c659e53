use std::cmp::Ordering;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;

use crate::error::{IoContext, SortError};
use crate::record::{LineEnding, Record};

/// Exclusive read state over one sorted run during the merge.
///
/// The cursor always holds the next record of its run, or nothing once the run is exhausted.
#[derive(Debug)]
pub(crate) struct Cursor {
    path: PathBuf,
    reader: BufReader<File>,
    head: Option<Record>,
    line_ending: LineEnding,
    line: String,
    line_number: usize,
    byte_offset: u64,
}

impl Cursor {
    /// Open `path` and read its first record
    pub(crate) fn open(path: PathBuf, line_ending: LineEnding) -> Result<Cursor, SortError> {
        let file = File::open(&path).io_context(|| format!("open run {}", path.display()))?;
        let mut cursor = Cursor {
            path,
            reader: BufReader::new(file),
            head: None,
            line_ending,
            line: String::new(),
            line_number: 0,
            byte_offset: 0,
        };
        cursor.head = cursor.read_record()?;
        Ok(cursor)
    }

    fn read_record(&mut self) -> Result<Option<Record>, SortError> {
        self.line.clear();
        let offset = self.byte_offset;
        let bytes = self.reader
            .read_line(&mut self.line)
            .io_context(|| format!("read run {}", self.path.display()))?;
        if bytes == 0 {
            return Ok(None);
        }
        self.byte_offset += bytes as u64;
        self.line_number += 1;
        let record = Record::parse(self.line_ending.trim(&self.line))
            .map_err(|source| SortError::Format {
                path: self.path.clone(),
                line_number: self.line_number,
                byte_offset: offset,
                source,
            })?;
        Ok(Some(record))
    }

    pub(crate) fn peek(&self) -> Option<&Record> {
        self.head.as_ref()
    }

    pub(crate) fn is_exhausted(&self) -> bool {
        self.head.is_none()
    }

    /// Take the current record and advance to the next one
    pub(crate) fn read_next(&mut self) -> Result<Option<Record>, SortError> {
        if self.head.is_none() {
            return Ok(None);
        }
        let next = self.read_record()?;
        Ok(std::mem::replace(&mut self.head, next))
    }

    /// Close the read handle and optionally delete the run file
    pub(crate) fn close(self, remove: bool) -> Result<(), SortError> {
        let Cursor { path, reader, line_number, .. } = self;
        drop(reader);
        log::debug!("Closing run {} after {} records", path.display(), line_number);
        if remove {
            std::fs::remove_file(&path).io_context(|| format!("remove run {}", path.display()))?;
        }
        Ok(())
    }
}

impl Eq for Cursor {}

impl PartialEq<Self> for Cursor {
    fn eq(&self, other: &Self) -> bool {
        self.head == other.head
    }
}

impl PartialOrd<Self> for Cursor {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Cursor {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.peek(), other.peek()) {
            (None, None) => Ordering::Equal,
            // exhausted cursors order last
            (None, Some(_)) => Ordering::Greater,
            (Some(_), None) => Ordering::Less,
            (Some(a), Some(b)) => a.cmp(b),
        }
    }
}

use std::cmp::Ordering;
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;

use crate::error::ParseRecordError;

static RECORD_REGEX: OnceLock<Regex> = OnceLock::new();

fn record_regex() -> &'static Regex {
    RECORD_REGEX.get_or_init(|| Regex::new(r"^(?P<num>[0-9]+)\.\s(?P<text>.*)$").unwrap())
}

/// Line terminators accepted when reading a file.
///
/// A `\r` is only part of the terminator when it directly precedes `\n`, otherwise it belongs to
/// the text. Run files are written with `\n` only and read back with [LineEnding::Lf], so a text
/// ending in `\r` survives the trip through a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LineEnding {
    Lf,
    LfOrCrLf,
}

impl LineEnding {
    /// Strip the line terminator as returned by `read_line`
    pub(crate) fn trim(self, line: &str) -> &str {
        let Some(stripped) = line.strip_suffix('\n') else {
            return line;
        };
        match self {
            LineEnding::Lf => stripped,
            LineEnding::LfOrCrLf => stripped.strip_suffix('\r').unwrap_or(stripped),
        }
    }
}

/// A single `<number>. <text>` line.
///
/// Records are ordered by text first, compared byte by byte, and by number when the texts are
/// equal. The same ordering is used to sort runs, to merge them and to check a file.
///
/// # Examples
/// ```
/// use record_file_sort::record::Record;
///
/// let apple: Record = "415. Apple".parse().unwrap();
/// let banana: Record = "2. Banana".parse().unwrap();
/// assert!(apple < banana);
/// assert_eq!(apple.to_string(), "415. Apple");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Record {
    number: u64,
    text: String,
}

impl Record {
    pub fn new(number: u64, text: String) -> Record {
        Record {
            number,
            text,
        }
    }

    /// Parse a line without its line terminator.
    pub fn parse(line: &str) -> Result<Record, ParseRecordError> {
        let captures = record_regex()
            .captures(line)
            .ok_or_else(|| ParseRecordError::Grammar { line: line.to_string() })?;
        let digits = &captures["num"];
        let number = digits
            .parse::<u64>()
            .map_err(|_| ParseRecordError::NumberOverflow { number: digits.to_string() })?;
        Ok(Record::new(number, captures["text"].to_string()))
    }

    pub fn number(&self) -> u64 {
        self.number
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

/// Compare two records by `(text, number)`
pub fn compare(a: &Record, b: &Record) -> Ordering {
    a.text
        .as_bytes()
        .cmp(b.text.as_bytes())
        .then_with(|| a.number.cmp(&b.number))
}

impl FromStr for Record {
    type Err = ParseRecordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Record::parse(s)
    }
}

impl Display for Record {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}. {}", self.number, self.text)
    }
}

impl PartialOrd<Self> for Record {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Record {
    fn cmp(&self, other: &Self) -> Ordering {
        compare(self, other)
    }
}

//! Error types for record sorting.

use std::fmt::Display;
use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for record sorting operations
pub type Result<T> = std::result::Result<T, SortError>;

/// A line that could not be decoded into a [Record](crate::record::Record)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseRecordError {
    /// The line does not match `<number>. <text>`
    #[error("line does not match '<number>. <text>': '{line}'")]
    Grammar {
        /// The offending line, without its line terminator
        line: String,
    },

    /// The numeric part does not fit in an unsigned 64 bit integer
    #[error("number '{number}' is out of range")]
    NumberOverflow {
        /// The digits as found in the line
        number: String,
    },
}

/// Error type for record sorting operations
#[derive(Error, Debug)]
pub enum SortError {
    /// The input file is missing
    #[error("File '{}' doesn't exist", .path.display())]
    InputNotFound {
        /// The requested input path
        path: PathBuf,
    },

    /// A line in the input or in a run file failed to parse
    #[error("Invalid record in '{}', line {line_number}, byte offset {byte_offset}: {source}", .path.display())]
    Format {
        /// File containing the line
        path: PathBuf,
        /// One based line number
        line_number: usize,
        /// Offset of the first byte of the line
        byte_offset: u64,
        /// What went wrong
        #[source]
        source: ParseRecordError,
    },

    /// Reading or writing a file failed
    #[error("I/O error, {context}: {source}")]
    Io {
        /// What was being done
        context: String,
        /// The underlying error
        #[source]
        source: std::io::Error,
    },

    /// Cooperative cancellation was observed
    #[error("Sort cancelled")]
    Cancelled,

    /// Invalid configuration value
    #[error("Invalid parameter '{parameter}': {reason}")]
    InvalidParameter {
        /// The parameter name
        parameter: String,
        /// Explanation of why it's invalid
        reason: String,
    },

    /// Failure in background machinery
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl SortError {
    pub(crate) fn io(context: impl Display, source: std::io::Error) -> SortError {
        SortError::Io {
            context: context.to_string(),
            source,
        }
    }

    pub(crate) fn invalid_parameter(parameter: &str, reason: impl Display) -> SortError {
        SortError::InvalidParameter {
            parameter: parameter.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Attach a description to I/O failures, the way `anyhow::Context` does
pub(crate) trait IoContext<T> {
    fn io_context<C, F>(self, f: F) -> Result<T>
    where
        C: Display,
        F: FnOnce() -> C;
}

impl<T> IoContext<T> for std::result::Result<T, std::io::Error> {
    fn io_context<C, F>(self, f: F) -> Result<T>
    where
        C: Display,
        F: FnOnce() -> C,
    {
        self.map_err(|e| SortError::io(f(), e))
    }
}

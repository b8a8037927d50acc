//! Error taxonomy for the pager engine.
//!
//! Only open-time errors (`NotFound`, `IsDirectory`) are fatal. Everything
//! else is either recovered internally (`OutOfRange` becomes the EOF row) or
//! surfaced as a one-line status message without stopping the event loop.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// The input file does not exist.
    #[error("not found")]
    NotFound,

    /// The input path is a directory.
    #[error("is a directory")]
    IsDirectory,

    /// Line index past the buffered end, or the chunk is not resident.
    #[error("out of range")]
    OutOfRange,

    /// Column navigation was requested but no delimiter produces columns.
    #[error("no delimiter")]
    NoDelimiter,

    /// The requested column does not exist on the sampled lines.
    #[error("no column")]
    NoColumn,

    /// The requested column cannot be brought on screen in one step.
    #[error("over screen")]
    OverScreen,

    /// Section search ran out of sections.
    #[error("no more section")]
    NoMoreSection,

    /// Search was cancelled, either by the user or by a timeout.
    #[error("cancel")]
    Cancel,

    /// Search exhausted the buffer after EOF without a hit.
    #[error("no match")]
    NoMatch,

    /// The document was closed; no further operations are served.
    #[error("document closed")]
    Closed,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// True for index errors that callers recover from by showing the EOF row.
    pub fn is_out_of_range(&self) -> bool {
        matches!(self, Error::OutOfRange)
    }
}

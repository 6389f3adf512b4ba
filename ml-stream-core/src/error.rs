//! Error types for streaming feature sources

use std::io;
use thiserror::Error;

/// Result type for streaming feature operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for streaming feature operations
#[derive(Error, Debug)]
pub enum Error {
    /// A precondition of the handoff protocol was violated by the caller
    #[error("Usage error: {0}")]
    Usage(#[from] UsageError),

    /// Capability not available for this stream or source
    #[error("Feature not implemented: {0}")]
    NotImplemented(String),

    /// A record in the byte source could not be decoded
    #[error("Parse error at record {record}: {message}")]
    Parse {
        /// 1-based record (line) number
        record: u64,
        /// What was wrong with it
        message: String,
    },

    /// The byte source failed for a reason other than malformed input
    #[error("Source error: {0}")]
    Source(String),

    /// IO error while reading the byte source
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    /// Invalid argument
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The background parser thread panicked
    #[error("Parser thread panicked")]
    ParserPanicked,
}

impl Error {
    /// Whether this error is a violation of the stream protocol by the caller
    pub fn is_usage(&self) -> bool {
        matches!(self, Error::Usage(_))
    }

    /// The violated precondition, if this is a usage error
    pub fn usage(&self) -> Option<&UsageError> {
        match self {
            Error::Usage(usage) => Some(usage),
            _ => None,
        }
    }
}

/// Programmer mistakes in driving a stream
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum UsageError {
    /// Reader functions were rebound after parsing started
    #[error("reader functions cannot be rebound once parsing has started")]
    ReadersFrozen,

    /// The reader required by the labeling mode was never bound
    #[error("no {} reader bound", reader_kind(.labeled))]
    ReaderNotBound {
        /// Whether the missing reader is the labeled one
        labeled: bool,
    },

    /// `start_parsing` was called on a stream that is already parsing
    #[error("parser already started")]
    AlreadyStarted,

    /// An example was requested from a stream that is not parsing
    #[error("parser is not running")]
    NotRunning,

    /// `fetch_next` was called while the previous example was still held
    #[error("current example must be released before fetching the next one")]
    AlreadyHolding,

    /// The current example was accessed or released while none was held
    #[error("no example is currently held")]
    NotHolding,

    /// A label was requested from an unlabeled stream
    #[error("stream is unlabeled")]
    Unlabeled,

    /// A reset was requested on a stream whose source cannot be replayed
    #[error("stream is not seekable")]
    NotSeekable,

    /// The labeling mode was changed once parsing had started
    #[error("labeling mode cannot change once parsing has started")]
    LabelModeLocked,
}

fn reader_kind(labeled: &bool) -> &'static str {
    if *labeled {
        "vector-and-label"
    } else {
        "vector"
    }
}

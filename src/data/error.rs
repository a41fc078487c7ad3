use std::io;

use thiserror::Error;

/// Everything that can go wrong while turning a signal file into a [`Trace`].
///
/// [`Trace`]: super::model::Trace
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("malformed signal header: {reason}")]
    MalformedHeader { reason: String },
    #[error("run stream truncated at offset {offset:#x} while reading {reading}")]
    TruncatedStream { offset: u64, reading: &'static str },
    #[error("signal file contains no samples")]
    EmptyTrace,
    #[error("cannot build a time axis for {count} samples")]
    InvalidSampleCount { count: usize },
    #[error("I/O error reading signal file")]
    Io(#[from] io::Error),
}

impl DecodeError {
    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        DecodeError::MalformedHeader {
            reason: reason.into(),
        }
    }

    /// Map an I/O failure inside the run stream. Only an early EOF counts as
    /// truncation; anything else is a genuine I/O error.
    pub(crate) fn from_stream_io(err: io::Error, offset: u64, reading: &'static str) -> Self {
        if err.kind() == io::ErrorKind::UnexpectedEof {
            DecodeError::TruncatedStream { offset, reading }
        } else {
            DecodeError::Io(err)
        }
    }

    /// Same as [`DecodeError::from_stream_io`] for the fixed header fields.
    pub(crate) fn from_header_io(err: io::Error, field: &str, offset: u64) -> Self {
        if err.kind() == io::ErrorKind::UnexpectedEof {
            DecodeError::malformed(format!("file ends before {field} at offset {offset:#x}"))
        } else {
            DecodeError::Io(err)
        }
    }
}

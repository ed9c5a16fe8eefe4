//! Error types for the ftd2xx crate.

use crate::types::Status;

/// The error type for D2XX operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The native driver reported a non-success status.
    #[error("device error: {0}")]
    Device(Status),

    /// The D2XX shared library could not be loaded.
    #[error("unable to load the D2XX library: {0}")]
    Library(String),

    /// A strict read could not collect the requested number of bytes in time.
    ///
    /// `data` holds whatever was drained from the device before giving up,
    /// so no received byte is lost.
    #[error("read timed out: {} of {requested} bytes available", data.len())]
    ReadTimeout {
        /// The number of bytes requested.
        requested: usize,
        /// The bytes drained from the device when the deadline passed.
        data: Vec<u8>,
    },

    /// A strict write was only partially accepted by the device.
    #[error("write timed out: {written} of {requested} bytes accepted")]
    WriteTimeout {
        /// The number of bytes submitted.
        requested: usize,
        /// The number of bytes the device accepted.
        written: usize,
    },

    /// The stream ended before the requested number of bytes arrived.
    #[error("stream ended after {} of {requested} bytes", data.len())]
    IncompleteRead {
        /// The number of bytes requested.
        requested: usize,
        /// The bytes received before end-of-stream.
        data: Vec<u8>,
    },

    /// A separator was not found before the stream buffer limit was reached.
    #[error("separator not found within {limit} buffered bytes")]
    LimitOverrun {
        /// The stream buffer limit.
        limit: usize,
    },

    /// Invalid argument(s) were provided.
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    /// Write-buffer watermarks violate `high >= low`.
    #[error("high water mark ({high}) must be >= low water mark ({low})")]
    InvalidWriteLimits {
        /// Requested high-water mark.
        high: usize,
        /// Requested low-water mark.
        low: usize,
    },

    /// The operation is not supported by this kind of connection.
    #[error("unsupported operation: {0}")]
    Unsupported(&'static str),

    /// An I/O error from a `std::io` adapter.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether this error is a read or write timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::ReadTimeout { .. } | Self::WriteTimeout { .. })
    }

    /// The native status carried by a [`Error::Device`], if any.
    pub fn status(&self) -> Option<Status> {
        match self {
            Self::Device(status) => Some(*status),
            _ => None,
        }
    }
}

impl From<Status> for Error {
    fn from(status: Status) -> Self {
        Self::Device(status)
    }
}

/// A specialized `Result` type for D2XX operations.
pub type Result<T> = std::result::Result<T, Error>;

use std::ffi::c_int;
use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::ffms::sys;

/// Main error type for the bindings
#[derive(Error, Debug)]
pub enum Error {
    /// The FFMS2 shared library could not be opened or is missing entry points
    #[error("FFMS2 library not found at {path:?}: {reason}")]
    LibraryNotFound { path: PathBuf, reason: String },

    /// The global library has not been initialized yet
    #[error("FFMS2 has not been initialized")]
    NotInitialized,

    /// A media file could not be opened or read
    #[error("Failed to load file: {0}")]
    FileLoad(NativeError),

    /// Reading or writing an index or timecode file failed
    #[error("I/O error: {0}")]
    Io(NativeError),

    /// A lookup found nothing matching
    #[error("Not found: {0}")]
    NotFound(NativeError),

    /// The codec, index version or operation is not supported
    #[error("Not supported: {0}")]
    NotSupported(NativeError),

    /// The media data is corrupt or could not be parsed
    #[error("Invalid data: {0}")]
    InvalidData(NativeError),

    /// Indexing was cancelled by the progress handler or a cancel token
    #[error("Indexing cancelled: {0}")]
    Cancelled(NativeError),

    /// An argument was rejected before reaching the native library
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The native library rejected an argument (bad track, bad format)
    #[error("Invalid argument: {0}")]
    ArgumentRejected(NativeError),

    /// An index was used with a file it was not built from
    #[error("Index does not match file: {0}")]
    FileMismatch(NativeError),

    /// A track, frame, sample or dimension argument is out of range
    #[error("{what} out of range: {value} (valid: {valid})")]
    OutOfRange {
        what: &'static str,
        value: String,
        valid: String,
    },

    /// The object is in a state that does not allow the operation
    #[error("Invalid state: {0}")]
    InvalidState(&'static str),

    /// A required argument was not supplied
    #[error("Missing argument: {0}")]
    MissingArgument(&'static str),

    /// Decoding a frame or a run of audio samples failed
    #[error("Decode error: {0}")]
    Decode(NativeError),

    /// A native error this binding does not classify for the operation
    #[error("Unclassified FFMS2 error: {0}")]
    Native(NativeError),

    /// Configuration could not be loaded or saved
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn out_of_range(
        what: &'static str,
        value: impl fmt::Display,
        valid: impl Into<String>,
    ) -> Self {
        Error::OutOfRange {
            what,
            value: value.to_string(),
            valid: valid.into(),
        }
    }

    /// The native error behind this error, if there is one.
    pub fn native(&self) -> Option<&NativeError> {
        match self {
            Error::FileLoad(e)
            | Error::Io(e)
            | Error::NotFound(e)
            | Error::NotSupported(e)
            | Error::InvalidData(e)
            | Error::Cancelled(e)
            | Error::ArgumentRejected(e)
            | Error::FileMismatch(e)
            | Error::Decode(e)
            | Error::Native(e) => Some(e),
            _ => None,
        }
    }
}

/// Where in the native library an error occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Success,
    Index,
    Indexing,
    Postprocessing,
    Scaling,
    Decoding,
    Seeking,
    Parser,
    Track,
    WaveWriter,
    Cancelled,
    Resampling,
    Other(i32),
}

impl ErrorCategory {
    pub fn from_raw(raw: c_int) -> Self {
        match raw {
            sys::FFMS_ERROR_SUCCESS => ErrorCategory::Success,
            sys::FFMS_ERROR_INDEX => ErrorCategory::Index,
            sys::FFMS_ERROR_INDEXING => ErrorCategory::Indexing,
            sys::FFMS_ERROR_POSTPROCESSING => ErrorCategory::Postprocessing,
            sys::FFMS_ERROR_SCALING => ErrorCategory::Scaling,
            sys::FFMS_ERROR_DECODING => ErrorCategory::Decoding,
            sys::FFMS_ERROR_SEEKING => ErrorCategory::Seeking,
            sys::FFMS_ERROR_PARSER => ErrorCategory::Parser,
            sys::FFMS_ERROR_TRACK => ErrorCategory::Track,
            sys::FFMS_ERROR_WAVE_WRITER => ErrorCategory::WaveWriter,
            sys::FFMS_ERROR_CANCELLED => ErrorCategory::Cancelled,
            sys::FFMS_ERROR_RESAMPLING => ErrorCategory::Resampling,
            other => ErrorCategory::Other(other),
        }
    }

    pub fn as_raw(self) -> c_int {
        match self {
            ErrorCategory::Success => sys::FFMS_ERROR_SUCCESS,
            ErrorCategory::Index => sys::FFMS_ERROR_INDEX,
            ErrorCategory::Indexing => sys::FFMS_ERROR_INDEXING,
            ErrorCategory::Postprocessing => sys::FFMS_ERROR_POSTPROCESSING,
            ErrorCategory::Scaling => sys::FFMS_ERROR_SCALING,
            ErrorCategory::Decoding => sys::FFMS_ERROR_DECODING,
            ErrorCategory::Seeking => sys::FFMS_ERROR_SEEKING,
            ErrorCategory::Parser => sys::FFMS_ERROR_PARSER,
            ErrorCategory::Track => sys::FFMS_ERROR_TRACK,
            ErrorCategory::WaveWriter => sys::FFMS_ERROR_WAVE_WRITER,
            ErrorCategory::Cancelled => sys::FFMS_ERROR_CANCELLED,
            ErrorCategory::Resampling => sys::FFMS_ERROR_RESAMPLING,
            ErrorCategory::Other(raw) => raw,
        }
    }
}

/// What caused a native error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSubtype {
    Unknown,
    Unsupported,
    FileRead,
    FileWrite,
    NoFile,
    Version,
    AllocationFailed,
    InvalidArgument,
    Codec,
    NotAvailable,
    FileMismatch,
    User,
    /// A code outside the subtype range. The native library reuses category
    /// codes as subtypes in a few places (e.g. `Decoding`, `Parser`).
    Other(i32),
}

impl ErrorSubtype {
    pub fn from_raw(raw: c_int) -> Self {
        match raw {
            sys::FFMS_ERROR_UNKNOWN => ErrorSubtype::Unknown,
            sys::FFMS_ERROR_UNSUPPORTED => ErrorSubtype::Unsupported,
            sys::FFMS_ERROR_FILE_READ => ErrorSubtype::FileRead,
            sys::FFMS_ERROR_FILE_WRITE => ErrorSubtype::FileWrite,
            sys::FFMS_ERROR_NO_FILE => ErrorSubtype::NoFile,
            sys::FFMS_ERROR_VERSION => ErrorSubtype::Version,
            sys::FFMS_ERROR_ALLOCATION_FAILED => ErrorSubtype::AllocationFailed,
            sys::FFMS_ERROR_INVALID_ARGUMENT => ErrorSubtype::InvalidArgument,
            sys::FFMS_ERROR_CODEC => ErrorSubtype::Codec,
            sys::FFMS_ERROR_NOT_AVAILABLE => ErrorSubtype::NotAvailable,
            sys::FFMS_ERROR_FILE_MISMATCH => ErrorSubtype::FileMismatch,
            sys::FFMS_ERROR_USER => ErrorSubtype::User,
            other => ErrorSubtype::Other(other),
        }
    }

    pub fn as_raw(self) -> c_int {
        match self {
            ErrorSubtype::Unknown => sys::FFMS_ERROR_UNKNOWN,
            ErrorSubtype::Unsupported => sys::FFMS_ERROR_UNSUPPORTED,
            ErrorSubtype::FileRead => sys::FFMS_ERROR_FILE_READ,
            ErrorSubtype::FileWrite => sys::FFMS_ERROR_FILE_WRITE,
            ErrorSubtype::NoFile => sys::FFMS_ERROR_NO_FILE,
            ErrorSubtype::Version => sys::FFMS_ERROR_VERSION,
            ErrorSubtype::AllocationFailed => sys::FFMS_ERROR_ALLOCATION_FAILED,
            ErrorSubtype::InvalidArgument => sys::FFMS_ERROR_INVALID_ARGUMENT,
            ErrorSubtype::Codec => sys::FFMS_ERROR_CODEC,
            ErrorSubtype::NotAvailable => sys::FFMS_ERROR_NOT_AVAILABLE,
            ErrorSubtype::FileMismatch => sys::FFMS_ERROR_FILE_MISMATCH,
            ErrorSubtype::User => sys::FFMS_ERROR_USER,
            ErrorSubtype::Other(raw) => raw,
        }
    }
}

/// Kind of a native error, decided by its subtype alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NativeErrorKind {
    Unknown,
    Unsupported,
    FileRead,
    FileWrite,
    NoFile,
    VersionMismatch,
    AllocationFailed,
    InvalidArgument,
    Codec,
    NotAvailable,
    FileMismatch,
    UserCancelled,
    /// Subtype outside the known set; inspect the raw codes.
    Unclassified,
}

/// An error reported by the native library: a (category, subtype) pair and
/// the message it wrote into the caller's buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeError {
    pub category: ErrorCategory,
    pub subtype: ErrorSubtype,
    pub message: String,
}

impl NativeError {
    pub fn new(category: ErrorCategory, subtype: ErrorSubtype, message: impl Into<String>) -> Self {
        Self {
            category,
            subtype,
            message: message.into(),
        }
    }

    pub fn kind(&self) -> NativeErrorKind {
        match self.subtype {
            ErrorSubtype::Unknown => NativeErrorKind::Unknown,
            ErrorSubtype::Unsupported => NativeErrorKind::Unsupported,
            ErrorSubtype::FileRead => NativeErrorKind::FileRead,
            ErrorSubtype::FileWrite => NativeErrorKind::FileWrite,
            ErrorSubtype::NoFile => NativeErrorKind::NoFile,
            ErrorSubtype::Version => NativeErrorKind::VersionMismatch,
            ErrorSubtype::AllocationFailed => NativeErrorKind::AllocationFailed,
            ErrorSubtype::InvalidArgument => NativeErrorKind::InvalidArgument,
            ErrorSubtype::Codec => NativeErrorKind::Codec,
            ErrorSubtype::NotAvailable => NativeErrorKind::NotAvailable,
            ErrorSubtype::FileMismatch => NativeErrorKind::FileMismatch,
            ErrorSubtype::User => NativeErrorKind::UserCancelled,
            ErrorSubtype::Other(_) => NativeErrorKind::Unclassified,
        }
    }

    /// True if this error is exactly the given (category, subtype) pair.
    pub fn is(&self, category: ErrorCategory, subtype: ErrorSubtype) -> bool {
        self.category == category && self.subtype == subtype
    }
}

impl fmt::Display for NativeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind() {
            NativeErrorKind::Unclassified => write!(
                f,
                "{} (category={}, subtype={})",
                self.message,
                self.category.as_raw(),
                self.subtype.as_raw()
            ),
            kind => write!(f, "{} ({:?})", self.message, kind),
        }
    }
}

/// Caller-owned error record handed to fallible native calls.
///
/// The message buffer is boxed and `info.buffer` is refreshed on every
/// `as_mut_ptr`, so the record may move between calls.
pub(crate) struct ErrorBuffer {
    info: sys::FFMS_ErrorInfo,
    buffer: Box<[u8; sys::ERROR_BUFFER_SIZE]>,
}

impl ErrorBuffer {
    pub(crate) fn new() -> Self {
        let info = sys::FFMS_ErrorInfo {
            error_type: sys::FFMS_ERROR_SUCCESS,
            sub_type: sys::FFMS_ERROR_SUCCESS,
            buffer_size: sys::ERROR_BUFFER_SIZE as c_int,
            buffer: std::ptr::null_mut(),
        };
        Self {
            info,
            buffer: Box::new([0u8; sys::ERROR_BUFFER_SIZE]),
        }
    }

    pub(crate) fn as_mut_ptr(&mut self) -> *mut sys::FFMS_ErrorInfo {
        self.info.buffer = self.buffer.as_mut_ptr().cast();
        &mut self.info
    }

    /// Read the record back after a failed call.
    pub(crate) fn take(&self) -> NativeError {
        let len = self
            .buffer
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(self.buffer.len());
        NativeError {
            category: ErrorCategory::from_raw(self.info.error_type),
            subtype: ErrorSubtype::from_raw(self.info.sub_type),
            message: String::from_utf8_lossy(&self.buffer[..len]).into_owned(),
        }
    }
}

/// Log and wrap a native error that the calling operation does not remap.
pub(crate) fn unclassified(operation: &str, err: NativeError) -> Error {
    tracing::warn!(
        "{} failed with unexpected FFMS2 error ({}, {}): {}",
        operation,
        err.category.as_raw(),
        err.subtype.as_raw(),
        err.message
    );
    Error::Native(err)
}

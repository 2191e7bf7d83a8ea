//! Decoding sources bound to one track of an indexed file.

pub mod audio;
pub mod video;

pub use audio::{AudioProperties, AudioSource};
pub use video::{InputFormat, VideoProperties, VideoSource};

use crate::config::FfmsConfig;
use crate::error::{unclassified, Error, ErrorCategory, ErrorSubtype, NativeError};
use crate::types::{AudioDelayMode, SeekMode};

/// Options for [`crate::Index::video_source`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VideoSourceOptions {
    /// Decoder threads; values below 1 let the library decide
    pub threads: i32,
    pub seek_mode: SeekMode,
}

impl Default for VideoSourceOptions {
    fn default() -> Self {
        Self {
            threads: 1,
            seek_mode: SeekMode::Normal,
        }
    }
}

impl VideoSourceOptions {
    pub fn from_config(config: &FfmsConfig) -> Self {
        Self {
            threads: config.video.threads,
            seek_mode: config.video.seek_mode,
        }
    }
}

/// Options for [`crate::Index::audio_source`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AudioSourceOptions {
    pub delay_mode: AudioDelayMode,
}

impl AudioSourceOptions {
    pub fn from_config(config: &FfmsConfig) -> Self {
        Self {
            delay_mode: config.audio.delay_mode,
        }
    }
}

/// Classify a failed source construction.
pub(crate) fn map_create_error(operation: &str, e: NativeError) -> Error {
    if e.is(ErrorCategory::Parser, ErrorSubtype::FileRead) {
        Error::FileLoad(e)
    } else if e.is(ErrorCategory::Index, ErrorSubtype::InvalidArgument) {
        Error::ArgumentRejected(e)
    } else if e.is(ErrorCategory::Index, ErrorSubtype::FileMismatch) {
        Error::FileMismatch(e)
    } else {
        unclassified(operation, e)
    }
}

/// Classify a failed format change on a video source.
pub(crate) fn map_format_error(operation: &str, e: NativeError) -> Error {
    let decoding_codec = e.is(ErrorCategory::Decoding, ErrorSubtype::Codec);
    if e.is(ErrorCategory::Scaling, ErrorSubtype::InvalidArgument) || decoding_codec {
        Error::ArgumentRejected(e)
    } else {
        unclassified(operation, e)
    }
}

//! Safe bindings to FFMS2, the FFmpeg-based media indexing and
//! frame-accurate decoding library.
//!
//! The shared library is loaded at runtime. A typical session:
//!
//! ```no_run
//! use ffms::{Demuxer, IndexOptions, TrackType, VideoSourceOptions};
//!
//! # fn main() -> ffms::Result<()> {
//! let library = ffms::init(None)?;
//! let mut indexer = library.indexer("movie.mkv", Demuxer::Default)?;
//! let index = indexer.index(&IndexOptions::default())?;
//! let track = index.first_track_of_type(TrackType::Video)?;
//! let video = index.video_source("movie.mkv", track, &VideoSourceOptions::default())?;
//! let frame = video.get_frame(0)?;
//! println!("{:?}", frame.encoded_resolution()?);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod ffms;
pub mod frame;
pub mod index;
pub mod indexer;
pub mod source;
pub mod track;
pub mod types;

#[cfg(test)]
pub(crate) mod tests;

pub use config::FfmsConfig;
pub use error::{Error, NativeError, NativeErrorKind, Result};
pub use ffms::{init, init_with_config, library, Bootstrap, FfmsApi, Library};
pub use frame::Frame;
pub use index::Index;
pub use indexer::{
    CancelToken, IndexOptions, Indexer, IndexerState, IndexingObserver, IndexingProgress,
};
pub use source::{
    AudioProperties, AudioSource, AudioSourceOptions, InputFormat, VideoProperties, VideoSource,
    VideoSourceOptions,
};
pub use track::{FrameInfo, Track};
pub use types::{
    AudioDelayMode, ChannelLayout, ColorRange, ColorSpace, Crop, Demuxer, IndexErrorHandling,
    LogLevel, Resizer, SampleFormat, SeekMode, TimeBase, TrackType, Version,
};

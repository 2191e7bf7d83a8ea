//! Per-track indexing data: frame timestamps, keyframe flags and timecode
//! export.

use std::any::Any;
use std::path::Path;
use std::ptr::NonNull;
use std::sync::{Arc, Weak};

use crate::error::{unclassified, Error, ErrorBuffer, ErrorCategory, ErrorSubtype, Result};
use crate::ffms::{path_to_cstring, sys, FfmsApi};
use crate::types::{TimeBase, TrackType};

/// Indexing data for one frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameInfo {
    /// Presentation timestamp in track time base units
    pub pts: i64,
    /// Extra fields this frame should be displayed for
    pub repeat_pict: i32,
    pub key_frame: bool,
}

/// A track of an [`crate::Index`], [`crate::VideoSource`] or [`crate::AudioSource`].
///
/// The track borrows native data from its owner. Once the owner is dropped,
/// every method that reads native data fails with [`Error::InvalidState`];
/// the cached time base and type stay readable.
#[derive(Clone)]
pub struct Track {
    api: Arc<dyn FfmsApi>,
    raw: NonNull<sys::FFMS_Track>,
    owner: Weak<dyn Any + Send + Sync>,
    time_base: TimeBase,
    track_type: TrackType,
}

// SAFETY: the native track is read-only and is only dereferenced while
// its owner is kept alive through `owner`.
unsafe impl Send for Track {}
unsafe impl Sync for Track {}

impl std::fmt::Debug for Track {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Track")
            .field("track_type", &self.track_type)
            .field("time_base", &self.time_base)
            .field("valid", &self.is_valid())
            .finish()
    }
}

impl Track {
    /// Wrap a track handle owned by `owner`, which must be alive.
    pub(crate) fn new(
        api: Arc<dyn FfmsApi>,
        raw: NonNull<sys::FFMS_Track>,
        owner: &Arc<dyn Any + Send + Sync>,
    ) -> Self {
        // SAFETY: `owner` is alive, so the track is too.
        let (time_base, track_type) = unsafe {
            let tb = api
                .get_time_base(raw.as_ptr())
                .as_ref()
                .copied()
                .unwrap_or_default();
            (
                TimeBase {
                    num: tb.num,
                    den: tb.den,
                },
                TrackType::from_raw(api.get_track_type(raw.as_ptr())),
            )
        };
        Self {
            api,
            raw,
            owner: Arc::downgrade(owner),
            time_base,
            track_type,
        }
    }

    pub fn time_base(&self) -> TimeBase {
        self.time_base
    }

    pub fn track_type(&self) -> TrackType {
        self.track_type
    }

    /// Whether the owning index or source is still alive.
    pub fn is_valid(&self) -> bool {
        self.owner.strong_count() > 0
    }

    /// Keep the owner alive for the duration of a native call.
    fn pin_owner(&self) -> Result<Arc<dyn Any + Send + Sync>> {
        self.owner
            .upgrade()
            .ok_or(Error::InvalidState("track owner has been dropped"))
    }

    /// Number of indexed frames; zero means the track was not indexed.
    pub fn frame_count(&self) -> Result<i32> {
        let _owner = self.pin_owner()?;
        // SAFETY: the owner is pinned.
        Ok(unsafe { self.api.get_num_frames(self.raw.as_ptr()) })
    }

    /// Indexing data for a frame of a video track.
    pub fn frame_info(&self, frame: i32) -> Result<FrameInfo> {
        if self.track_type != TrackType::Video {
            return Err(Error::InvalidState(
                "frame info is only available for video tracks",
            ));
        }
        let _owner = self.pin_owner()?;
        let count = self.frame_count()?;
        if frame < 0 || frame >= count {
            return Err(Error::out_of_range("frame", frame, format!("0..{}", count)));
        }

        // SAFETY: the owner is pinned and the frame is in range.
        let info = unsafe { self.api.get_frame_info(self.raw.as_ptr(), frame).as_ref() }
            .copied()
            .ok_or(Error::InvalidState("no frame info returned"))?;
        Ok(FrameInfo {
            pts: info.pts,
            repeat_pict: info.repeat_pict,
            key_frame: info.key_frame != 0,
        })
    }

    /// Timestamp of a video frame in milliseconds.
    pub fn frame_time_ms(&self, frame: i32) -> Result<f64> {
        let info = self.frame_info(frame)?;
        Ok(self.time_base.to_millis(info.pts))
    }

    /// Write Matroska v2 timecodes for the track. Only meaningful for video.
    pub fn write_timecodes(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let c_path = path_to_cstring(path)?;
        let _owner = self.pin_owner()?;
        let mut err = ErrorBuffer::new();

        // SAFETY: the owner is pinned; path and error record outlive the call.
        let ret = unsafe {
            self.api
                .write_timecodes(self.raw.as_ptr(), c_path.as_ptr(), err.as_mut_ptr())
        };
        if ret != 0 {
            let e = err.take();
            if e.is(ErrorCategory::Parser, ErrorSubtype::FileRead)
                || e.is(ErrorCategory::Track, ErrorSubtype::NoFile)
                || e.is(ErrorCategory::Track, ErrorSubtype::FileWrite)
            {
                return Err(Error::Io(e));
            }
            return Err(unclassified("write timecodes", e));
        }
        tracing::debug!("Wrote timecodes to {}", path.display());
        Ok(())
    }
}

use std::any::Any;
use std::ffi::c_int;
use std::ptr::NonNull;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use once_cell::sync::OnceCell;
use parking_lot::Mutex;

use super::map_format_error;
use crate::error::{Error, ErrorBuffer, Result};
use crate::ffms::{sys, FfmsApi};
use crate::frame::Frame;
use crate::track::Track;
use crate::types::{ColorRange, ColorSpace, Crop, Resizer};

/// Video stream properties, captured once when the source is opened
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VideoProperties {
    pub fps_numerator: i32,
    pub fps_denominator: i32,
    /// Repeat-first-field adjusted frame rate
    pub rff_numerator: i32,
    pub rff_denominator: i32,
    pub num_frames: i32,
    /// Sample aspect ratio; 0/0 when unknown
    pub sar_num: i32,
    pub sar_den: i32,
    pub crop: Crop,
    pub top_field_first: bool,
    pub color_space: ColorSpace,
    pub color_range: ColorRange,
    /// Timestamp of the first frame, in seconds
    pub first_time: f64,
    /// Timestamp of the last frame, in seconds
    pub last_time: f64,
}

impl VideoProperties {
    fn from_raw(p: &sys::FFMS_VideoProperties) -> Self {
        Self {
            fps_numerator: p.fps_numerator,
            fps_denominator: p.fps_denominator,
            rff_numerator: p.rff_numerator,
            rff_denominator: p.rff_denominator,
            num_frames: p.num_frames,
            sar_num: p.sar_num,
            sar_den: p.sar_den,
            crop: Crop {
                top: p.crop_top,
                bottom: p.crop_bottom,
                left: p.crop_left,
                right: p.crop_right,
            },
            top_field_first: p.top_field_first != 0,
            color_space: ColorSpace::from_raw(p.color_space),
            color_range: ColorRange::from_raw(p.color_range),
            first_time: p.first_time,
            last_time: p.last_time,
        }
    }

    pub fn fps(&self) -> f64 {
        if self.fps_denominator == 0 {
            return 0.0;
        }
        self.fps_numerator as f64 / self.fps_denominator as f64
    }
}

/// Assumed input format overrides for [`VideoSource::set_input_format`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputFormat {
    pub color_space: ColorSpace,
    pub color_range: ColorRange,
    /// Pixel format id, or -1 to keep the detected one
    pub pixel_format: i32,
}

impl Default for InputFormat {
    fn default() -> Self {
        Self {
            color_space: ColorSpace::Unspecified,
            color_range: ColorRange::Unspecified,
            pixel_format: sys::PIX_FMT_NONE,
        }
    }
}

/// Shared native state of a video source; frames and tracks point back here.
pub(crate) struct VideoInner {
    api: Arc<dyn FfmsApi>,
    raw: NonNull<sys::FFMS_VideoSource>,
    /// Serializes every call that touches the decoder or its frame buffer.
    lock: Mutex<()>,
    /// Bumped by every fetch and format change; frames stamped with an
    /// older value are stale.
    generation: AtomicU64,
}

// SAFETY: all decoder access goes through `lock`.
unsafe impl Send for VideoInner {}
unsafe impl Sync for VideoInner {}

impl VideoInner {
    pub(crate) fn lock(&self) -> parking_lot::MutexGuard<'_, ()> {
        self.lock.lock()
    }

    pub(crate) fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    fn bump(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }
}

impl Drop for VideoInner {
    fn drop(&mut self) {
        // SAFETY: last reference; no frame can be reading under the lock.
        unsafe { self.api.destroy_video_source(self.raw.as_ptr()) };
        tracing::debug!("Destroyed video source");
    }
}

/// Frame-accurate access to one video track
pub struct VideoSource {
    inner: Arc<VideoInner>,
    properties: VideoProperties,
    track: OnceCell<Track>,
}

impl std::fmt::Debug for VideoSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VideoSource")
            .field("properties", &self.properties)
            .finish()
    }
}

impl VideoSource {
    pub(crate) fn from_handle(
        api: Arc<dyn FfmsApi>,
        raw: NonNull<sys::FFMS_VideoSource>,
    ) -> Result<Self> {
        let inner = Arc::new(VideoInner {
            api,
            raw,
            lock: Mutex::new(()),
            generation: AtomicU64::new(0),
        });
        // SAFETY: the source is alive; the properties are copied immediately.
        let props = unsafe { inner.api.get_video_properties(raw.as_ptr()).as_ref() }
            .map(VideoProperties::from_raw)
            .ok_or(Error::InvalidState("video source has no properties"))?;

        tracing::debug!(
            "Opened video source: {} frames at {}/{} fps",
            props.num_frames,
            props.fps_numerator,
            props.fps_denominator
        );
        Ok(Self {
            inner,
            properties: props,
            track: OnceCell::new(),
        })
    }

    pub fn properties(&self) -> &VideoProperties {
        &self.properties
    }

    pub fn num_frames(&self) -> i32 {
        self.properties.num_frames
    }

    /// Decode frame `n`.
    ///
    /// The returned frame, and any frame fetched earlier from this source,
    /// is invalidated by the next fetch or format change.
    pub fn get_frame(&self, n: i32) -> Result<Frame> {
        let count = self.properties.num_frames;
        if n < 0 || n >= count {
            return Err(Error::out_of_range("frame", n, format!("0..{}", count)));
        }
        // SAFETY: `fetch` passes the live source and holds its lock.
        self.fetch(|api, raw, err| unsafe { api.get_frame(raw, n, err) })
    }

    /// Decode the frame whose start time is closest to `time` seconds.
    pub fn get_frame_by_time(&self, time: f64) -> Result<Frame> {
        let last = self.properties.last_time;
        if time.is_nan() || time < 0.0 || time > last {
            return Err(Error::out_of_range("time", time, format!("0..={}", last)));
        }
        // SAFETY: as for `get_frame`.
        self.fetch(|api, raw, err| unsafe { api.get_frame_by_time(raw, time, err) })
    }

    fn fetch<F>(&self, call: F) -> Result<Frame>
    where
        F: FnOnce(
            &dyn FfmsApi,
            *mut sys::FFMS_VideoSource,
            *mut sys::FFMS_ErrorInfo,
        ) -> *const sys::FFMS_Frame,
    {
        let _guard = self.inner.lock();
        let generation = self.inner.bump();
        let mut err = ErrorBuffer::new();

        let raw = call(
            self.inner.api.as_ref(),
            self.inner.raw.as_ptr(),
            err.as_mut_ptr(),
        );
        // SAFETY: a non-null frame stays valid until the next call on this
        // source, and the lock is held.
        match unsafe { raw.as_ref() } {
            Some(frame) => Ok(Frame::new(*frame, Arc::downgrade(&self.inner), generation)),
            None => Err(Error::Decode(err.take())),
        }
    }

    /// Convert output frames to one of `formats` at `width` x `height`.
    ///
    /// The library picks, per frame, the candidate with the least lossy
    /// conversion.
    pub fn set_output_format(
        &self,
        formats: &[i32],
        width: i32,
        height: i32,
        resizer: Resizer,
    ) -> Result<()> {
        if width <= 0 {
            return Err(Error::out_of_range("width", width, "1.."));
        }
        if height <= 0 {
            return Err(Error::out_of_range("height", height, "1.."));
        }
        if formats.is_empty() {
            return Err(Error::InvalidArgument(
                "at least one target pixel format is required".to_string(),
            ));
        }
        let mut targets: Vec<c_int> = formats.to_vec();
        targets.push(sys::PIX_FMT_NONE);

        let _guard = self.inner.lock();
        self.inner.bump();
        let mut err = ErrorBuffer::new();
        // SAFETY: the lock is held; the target list is terminated and
        // outlives the call.
        let ret = unsafe {
            self.inner.api.set_output_format_v2(
                self.inner.raw.as_ptr(),
                targets.as_ptr(),
                width,
                height,
                resizer.as_raw(),
                err.as_mut_ptr(),
            )
        };
        if ret != 0 {
            return Err(map_format_error("set output format", err.take()));
        }
        tracing::debug!(
            "Output format set to {:?} at {}x{} ({:?})",
            formats,
            width,
            height,
            resizer
        );
        Ok(())
    }

    /// Return to the decoder's native output format.
    pub fn reset_output_format(&self) {
        let _guard = self.inner.lock();
        self.inner.bump();
        // SAFETY: the lock is held.
        unsafe { self.inner.api.reset_output_format_v(self.inner.raw.as_ptr()) };
    }

    /// Override the colorspace, range and pixel format assumed for the
    /// decoded frames. Only affects conversion when an output format is set.
    pub fn set_input_format(&self, format: InputFormat) -> Result<()> {
        let _guard = self.inner.lock();
        self.inner.bump();
        let mut err = ErrorBuffer::new();
        // SAFETY: the lock is held; the error record outlives the call.
        let ret = unsafe {
            self.inner.api.set_input_format_v(
                self.inner.raw.as_ptr(),
                format.color_space.as_raw(),
                format.color_range.as_raw(),
                format.pixel_format,
                err.as_mut_ptr(),
            )
        };
        if ret != 0 {
            return Err(map_format_error("set input format", err.take()));
        }
        Ok(())
    }

    pub fn reset_input_format(&self) {
        let _guard = self.inner.lock();
        self.inner.bump();
        // SAFETY: the lock is held.
        unsafe { self.inner.api.reset_input_format_v(self.inner.raw.as_ptr()) };
    }

    /// The track this source decodes, derived on first use.
    pub fn track(&self) -> Result<&Track> {
        self.track.get_or_try_init(|| {
            // SAFETY: the source is alive for `&self`.
            let raw = unsafe { self.inner.api.get_track_from_video(self.inner.raw.as_ptr()) };
            let raw = NonNull::new(raw).ok_or(Error::InvalidState("video source has no track"))?;
            let owner: Arc<dyn Any + Send + Sync> = self.inner.clone();
            Ok(Track::new(Arc::clone(&self.inner.api), raw, &owner))
        })
    }
}

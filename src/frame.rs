//! Decoded video frames.
//!
//! A [`Frame`] aliases a buffer owned by the decoder. It is valid until the
//! next fetch or format change on its [`crate::VideoSource`], or until the
//! source is dropped. After that every accessor fails with
//! [`Error::InvalidState`].

use std::sync::Weak;

use bytes::Bytes;

use crate::error::{Error, Result};
use crate::ffms::sys;
use crate::source::video::VideoInner;
use crate::types::{ColorRange, ColorSpace};

/// Number of plane slots in a frame
pub const MAX_PLANES: usize = 4;

pub struct Frame {
    raw: sys::FFMS_Frame,
    source: Weak<VideoInner>,
    generation: u64,
}

// SAFETY: plane pointers are only dereferenced in `read_plane`, under the
// source's decoder lock and the caller's row contract.
unsafe impl Send for Frame {}
unsafe impl Sync for Frame {}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Frame")
            .field("generation", &self.generation)
            .field("valid", &self.is_valid())
            .finish()
    }
}

impl Frame {
    pub(crate) fn new(raw: sys::FFMS_Frame, source: Weak<VideoInner>, generation: u64) -> Self {
        Self {
            raw,
            source,
            generation,
        }
    }

    /// False once the frame has been superseded or its source dropped.
    pub fn is_valid(&self) -> bool {
        self.check().is_ok()
    }

    fn check(&self) -> Result<&sys::FFMS_Frame> {
        let source = self
            .source
            .upgrade()
            .ok_or(Error::InvalidState("video source has been dropped"))?;
        if source.generation() != self.generation {
            return Err(Error::InvalidState(
                "frame was invalidated by a later fetch or format change",
            ));
        }
        Ok(&self.raw)
    }

    fn check_plane(plane: usize) -> Result<()> {
        if plane >= MAX_PLANES {
            return Err(Error::out_of_range("plane", plane, format!("0..{}", MAX_PLANES)));
        }
        Ok(())
    }

    /// Start of a plane's pixel data; null for unused planes.
    pub fn plane_ptr(&self, plane: usize) -> Result<*const u8> {
        Self::check_plane(plane)?;
        Ok(self.check()?.data[plane])
    }

    /// Bytes per row of a plane.
    pub fn linesize(&self, plane: usize) -> Result<i32> {
        Self::check_plane(plane)?;
        Ok(self.check()?.linesize[plane])
    }

    /// Resolution before scaling.
    pub fn encoded_resolution(&self) -> Result<(i32, i32)> {
        let f = self.check()?;
        Ok((f.encoded_width, f.encoded_height))
    }

    pub fn encoded_pixel_format(&self) -> Result<i32> {
        Ok(self.check()?.encoded_pixel_format)
    }

    /// Resolution after scaling to the configured output format.
    pub fn resolution(&self) -> Result<(i32, i32)> {
        let f = self.check()?;
        Ok((f.scaled_width, f.scaled_height))
    }

    /// Output pixel format after conversion.
    pub fn pixel_format(&self) -> Result<i32> {
        Ok(self.check()?.converted_pixel_format)
    }

    pub fn key_frame(&self) -> Result<bool> {
        Ok(self.check()?.key_frame != 0)
    }

    pub fn repeat_pict(&self) -> Result<i32> {
        Ok(self.check()?.repeat_pict)
    }

    pub fn interlaced(&self) -> Result<bool> {
        Ok(self.check()?.interlaced_frame != 0)
    }

    pub fn top_field_first(&self) -> Result<bool> {
        Ok(self.check()?.top_field_first != 0)
    }

    /// Picture type as a letter: `I`, `P`, `B`, ...
    pub fn frame_type(&self) -> Result<char> {
        Ok(self.check()?.pict_type as u8 as char)
    }

    pub fn color_space(&self) -> Result<ColorSpace> {
        Ok(ColorSpace::from_raw(self.check()?.color_space))
    }

    pub fn color_range(&self) -> Result<ColorRange> {
        Ok(ColorRange::from_raw(self.check()?.color_range))
    }

    /// Copy `rows` rows of a plane, including row padding.
    ///
    /// Only `rows` against the frame height is checked here; the height of
    /// an individual plane depends on the pixel format's subsampling.
    ///
    /// # Safety
    ///
    /// `rows` must not exceed the number of rows stored in `plane`. For
    /// chroma planes of subsampled formats (e.g. yuv420p) that is less than
    /// the frame height.
    pub unsafe fn read_plane(&self, plane: usize, rows: usize) -> Result<Bytes> {
        Self::check_plane(plane)?;
        let source = self
            .source
            .upgrade()
            .ok_or(Error::InvalidState("video source has been dropped"))?;
        let _guard = source.lock();
        let f = self.check()?;

        let data = f.data[plane];
        if data.is_null() {
            return Err(Error::InvalidState("plane has no data"));
        }
        let height = if f.scaled_height > 0 {
            f.scaled_height
        } else {
            f.encoded_height
        };
        if rows > height.max(0) as usize {
            return Err(Error::out_of_range("rows", rows, format!("0..={}", height)));
        }
        let Ok(linesize) = usize::try_from(f.linesize[plane]) else {
            return Err(Error::InvalidState("plane is stored bottom-up"));
        };
        let len = linesize
            .checked_mul(rows)
            .ok_or_else(|| Error::out_of_range("rows", rows, "plane size overflows"))?;

        // SAFETY: the frame is current and the decoder lock is held; the
        // caller guarantees the plane holds `rows` rows of `linesize` bytes.
        let bytes = unsafe { std::slice::from_raw_parts(data, len) };
        Ok(Bytes::copy_from_slice(bytes))
    }
}

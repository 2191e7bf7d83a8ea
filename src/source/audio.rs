use std::any::Any;
use std::ptr::NonNull;
use std::sync::Arc;

use bytes::Bytes;
use once_cell::sync::OnceCell;
use parking_lot::Mutex;

use crate::error::{Error, ErrorBuffer, ErrorCategory, ErrorSubtype, Result};
use crate::ffms::{sys, FfmsApi};
use crate::track::Track;
use crate::types::{ChannelLayout, SampleFormat};

/// Audio stream properties, captured once when the source is opened
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AudioProperties {
    /// `None` if the library reports a format this crate does not know
    pub sample_format: Option<SampleFormat>,
    pub sample_rate: i32,
    pub bits_per_sample: i32,
    pub channels: i32,
    pub channel_layout: ChannelLayout,
    pub num_samples: i64,
    /// Timestamp of the first sample, in seconds
    pub first_time: f64,
    /// Timestamp of the last sample, in seconds
    pub last_time: f64,
}

impl AudioProperties {
    fn from_raw(p: &sys::FFMS_AudioProperties) -> Self {
        Self {
            sample_format: SampleFormat::from_raw(p.sample_format),
            sample_rate: p.sample_rate,
            bits_per_sample: p.bits_per_sample,
            channels: p.channels,
            channel_layout: ChannelLayout(p.channel_layout as u64),
            num_samples: p.num_samples,
            first_time: p.first_time,
            last_time: p.last_time,
        }
    }

    /// Size of one sample across all channels, in bytes
    pub fn frame_size(&self) -> usize {
        (self.bits_per_sample.max(0) as usize / 8) * self.channels.max(0) as usize
    }
}

pub(crate) struct AudioInner {
    api: Arc<dyn FfmsApi>,
    raw: NonNull<sys::FFMS_AudioSource>,
    lock: Mutex<()>,
}

// SAFETY: all decoder access goes through `lock`.
unsafe impl Send for AudioInner {}
unsafe impl Sync for AudioInner {}

impl Drop for AudioInner {
    fn drop(&mut self) {
        // SAFETY: last reference to the source.
        unsafe { self.api.destroy_audio_source(self.raw.as_ptr()) };
        tracing::debug!("Destroyed audio source");
    }
}

/// Sample-accurate access to one audio track
pub struct AudioSource {
    inner: Arc<AudioInner>,
    properties: AudioProperties,
    track: OnceCell<Track>,
}

impl std::fmt::Debug for AudioSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioSource")
            .field("properties", &self.properties)
            .finish()
    }
}

impl AudioSource {
    pub(crate) fn from_handle(
        api: Arc<dyn FfmsApi>,
        raw: NonNull<sys::FFMS_AudioSource>,
    ) -> Result<Self> {
        let inner = Arc::new(AudioInner {
            api,
            raw,
            lock: Mutex::new(()),
        });
        // SAFETY: the source is alive; the properties are copied immediately.
        let props = unsafe { inner.api.get_audio_properties(raw.as_ptr()).as_ref() }
            .map(AudioProperties::from_raw)
            .ok_or(Error::InvalidState("audio source has no properties"))?;

        tracing::debug!(
            "Opened audio source: {} samples, {} Hz, {} channels",
            props.num_samples,
            props.sample_rate,
            props.channels
        );
        Ok(Self {
            inner,
            properties: props,
            track: OnceCell::new(),
        })
    }

    pub fn properties(&self) -> &AudioProperties {
        &self.properties
    }

    pub fn num_samples(&self) -> i64 {
        self.properties.num_samples
    }

    /// Decode `count` samples starting at `start`, interleaved.
    ///
    /// Requires `start + count <= num_samples - 1`.
    pub fn get_audio(&self, start: i64, count: i64) -> Result<Bytes> {
        let last = self.properties.num_samples - 1;
        if start < 0 || start > last {
            return Err(Error::out_of_range("start", start, format!("0..={}", last)));
        }
        if count < 0 || start.checked_add(count).map_or(true, |end| end > last) {
            return Err(Error::out_of_range(
                "count",
                count,
                format!("0..={}", last - start),
            ));
        }
        let len = usize::try_from(count)
            .ok()
            .and_then(|n| n.checked_mul(self.properties.frame_size()))
            .ok_or_else(|| Error::out_of_range("count", count, "buffer size overflows"))?;
        let mut buf = vec![0u8; len];

        let _guard = self.inner.lock.lock();
        let mut err = ErrorBuffer::new();
        // SAFETY: the lock is held; `buf` holds `count` samples.
        let ret = unsafe {
            self.inner.api.get_audio(
                self.inner.raw.as_ptr(),
                buf.as_mut_ptr().cast(),
                start,
                count,
                err.as_mut_ptr(),
            )
        };
        if ret != 0 {
            let e = err.take();
            if e.is(ErrorCategory::Seeking, ErrorSubtype::Codec) {
                return Err(Error::NotSupported(e));
            }
            return Err(Error::Decode(e));
        }
        Ok(Bytes::from(buf))
    }

    /// The track this source decodes, derived on first use.
    pub fn track(&self) -> Result<&Track> {
        self.track.get_or_try_init(|| {
            // SAFETY: the source is alive for `&self`.
            let raw = unsafe { self.inner.api.get_track_from_audio(self.inner.raw.as_ptr()) };
            let raw = NonNull::new(raw).ok_or(Error::InvalidState("audio source has no track"))?;
            let owner: Arc<dyn Any + Send + Sync> = self.inner.clone();
            Ok(Track::new(Arc::clone(&self.inner.api), raw, &owner))
        })
    }
}

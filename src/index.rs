//! Completed or loaded indexes.

use std::any::Any;
use std::path::Path;
use std::ptr::NonNull;
use std::sync::Arc;

use crate::error::{unclassified, Error, ErrorBuffer, ErrorCategory, ErrorSubtype, Result};
use crate::ffms::{path_to_cstring, sys, FfmsApi, Library};
use crate::source::{map_create_error, AudioSource, AudioSourceOptions, VideoSource, VideoSourceOptions};
use crate::track::Track;
use crate::types::{Demuxer, IndexErrorHandling, TrackType};

/// Owns the native index; destroyed when the last reference goes away.
pub(crate) struct IndexHandle {
    api: Arc<dyn FfmsApi>,
    raw: NonNull<sys::FFMS_Index>,
}

// SAFETY: the native index is immutable once built; every call that reads
// it is thread-safe in the native library.
unsafe impl Send for IndexHandle {}
unsafe impl Sync for IndexHandle {}

impl Drop for IndexHandle {
    fn drop(&mut self) {
        // SAFETY: this is the only owner of the handle.
        unsafe { self.api.destroy_index(self.raw.as_ptr()) };
        tracing::debug!("Destroyed index");
    }
}

/// An index of a media file
pub struct Index {
    handle: Arc<IndexHandle>,
}

impl std::fmt::Debug for Index {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Index")
            .field("source_type", &self.source_type())
            .field("track_count", &self.track_count())
            .finish()
    }
}

impl Index {
    pub(crate) fn from_handle(api: Arc<dyn FfmsApi>, raw: NonNull<sys::FFMS_Index>) -> Self {
        Self {
            handle: Arc::new(IndexHandle { api, raw }),
        }
    }

    /// Load an index file written by [`Index::write`].
    pub fn read(library: &Library, index_file: &Path) -> Result<Self> {
        let api = Arc::clone(library.api());
        let c_path = path_to_cstring(index_file)?;
        let mut err = ErrorBuffer::new();

        // SAFETY: path and error record outlive the call.
        let raw = unsafe { api.read_index(c_path.as_ptr(), err.as_mut_ptr()) };
        let Some(raw) = NonNull::new(raw) else {
            let e = err.take();
            if e.is(ErrorCategory::Parser, ErrorSubtype::FileRead) {
                return Err(Error::Io(e));
            }
            if e.is(ErrorCategory::Index, ErrorSubtype::NotAvailable) {
                return Err(Error::NotSupported(e));
            }
            return Err(unclassified("read index", e));
        };

        tracing::debug!("Read index from {}", index_file.display());
        Ok(Self::from_handle(api, raw))
    }

    fn api(&self) -> &dyn FfmsApi {
        self.handle.api.as_ref()
    }

    fn raw(&self) -> *mut sys::FFMS_Index {
        self.handle.raw.as_ptr()
    }

    /// Source module used to build the index.
    pub fn source_type(&self) -> Demuxer {
        // SAFETY: the index is alive for `&self`.
        let raw = unsafe { self.api().get_source_type(self.raw()) };
        Demuxer::from_raw(raw).unwrap_or_default()
    }

    /// Error handling policy the index was built with.
    pub fn error_handling(&self) -> IndexErrorHandling {
        // SAFETY: the index is alive for `&self`.
        let raw = unsafe { self.api().get_error_handling(self.raw()) };
        IndexErrorHandling::from_raw(raw).unwrap_or_default()
    }

    pub fn track_count(&self) -> i32 {
        // SAFETY: the index is alive for `&self`.
        unsafe { self.api().get_num_tracks(self.raw()) }
    }

    /// Number of the first track of the given type.
    pub fn first_track_of_type(&self, track_type: TrackType) -> Result<i32> {
        let mut err = ErrorBuffer::new();
        // SAFETY: the index is alive; the error record outlives the call.
        let track = unsafe {
            self.api()
                .get_first_track_of_type(self.raw(), track_type.as_raw(), err.as_mut_ptr())
        };
        self.track_lookup(track, err)
    }

    /// Number of the first track of the given type that has indexed frames.
    pub fn first_indexed_track_of_type(&self, track_type: TrackType) -> Result<i32> {
        let mut err = ErrorBuffer::new();
        // SAFETY: as above.
        let track = unsafe {
            self.api().get_first_indexed_track_of_type(
                self.raw(),
                track_type.as_raw(),
                err.as_mut_ptr(),
            )
        };
        self.track_lookup(track, err)
    }

    fn track_lookup(&self, track: i32, err: ErrorBuffer) -> Result<i32> {
        if track >= 0 {
            return Ok(track);
        }
        let e = err.take();
        if e.is(ErrorCategory::Index, ErrorSubtype::NotAvailable) {
            return Err(Error::NotFound(e));
        }
        Err(unclassified("track lookup", e))
    }

    /// Write the index to disk, replacing any existing file.
    pub fn write(&self, index_file: impl AsRef<Path>) -> Result<()> {
        let index_file = index_file.as_ref();
        let c_path = path_to_cstring(index_file)?;
        let mut err = ErrorBuffer::new();

        // SAFETY: the index is alive; path and error record outlive the call.
        let ret = unsafe {
            self.api()
                .write_index(c_path.as_ptr(), self.raw(), err.as_mut_ptr())
        };
        if ret != 0 {
            let e = err.take();
            let io = e.is(ErrorCategory::Parser, ErrorSubtype::FileRead)
                || matches!(e.subtype, ErrorSubtype::FileWrite | ErrorSubtype::NoFile);
            if io {
                return Err(Error::Io(e));
            }
            return Err(unclassified("write index", e));
        }
        tracing::debug!("Wrote index to {}", index_file.display());
        Ok(())
    }

    /// Heuristic check that the index was built from `source_file`.
    pub fn belongs_to_file(&self, source_file: impl AsRef<Path>) -> Result<bool> {
        let c_path = path_to_cstring(source_file.as_ref())?;
        let mut err = ErrorBuffer::new();

        // SAFETY: the index is alive; path and error record outlive the call.
        let ret = unsafe {
            self.api()
                .index_belongs_to_file(self.raw(), c_path.as_ptr(), err.as_mut_ptr())
        };
        if ret == 0 {
            return Ok(true);
        }
        let e = err.take();
        if e.is(ErrorCategory::Index, ErrorSubtype::FileMismatch) {
            return Ok(false);
        }
        Err(unclassified("index belongs to file", e))
    }

    /// Open a video track for decoding.
    pub fn video_source(
        &self,
        source_file: impl AsRef<Path>,
        track: i32,
        options: &VideoSourceOptions,
    ) -> Result<VideoSource> {
        let source_file = source_file.as_ref();
        let c_path = path_to_cstring(source_file)?;
        let mut err = ErrorBuffer::new();

        // SAFETY: the index is alive; path and error record outlive the call.
        let raw = unsafe {
            self.api().create_video_source(
                c_path.as_ptr(),
                track,
                self.raw(),
                options.threads,
                options.seek_mode.as_raw(),
                err.as_mut_ptr(),
            )
        };
        match NonNull::new(raw) {
            Some(raw) => VideoSource::from_handle(Arc::clone(&self.handle.api), raw),
            None => Err(map_create_error("create video source", err.take())),
        }
    }

    /// Open an audio track for decoding.
    pub fn audio_source(
        &self,
        source_file: impl AsRef<Path>,
        track: i32,
        options: &AudioSourceOptions,
    ) -> Result<AudioSource> {
        let source_file = source_file.as_ref();
        let c_path = path_to_cstring(source_file)?;
        let mut err = ErrorBuffer::new();

        // SAFETY: as for `video_source`.
        let raw = unsafe {
            self.api().create_audio_source(
                c_path.as_ptr(),
                track,
                self.raw(),
                options.delay_mode.as_raw(),
                err.as_mut_ptr(),
            )
        };
        match NonNull::new(raw) {
            Some(raw) => AudioSource::from_handle(Arc::clone(&self.handle.api), raw),
            None => Err(map_create_error("create audio source", err.take())),
        }
    }

    /// Indexing data of a track. Valid while this index is alive.
    pub fn track(&self, track: i32) -> Result<Track> {
        let count = self.track_count();
        if track < 0 || track >= count {
            return Err(Error::out_of_range("track", track, format!("0..{}", count)));
        }
        // SAFETY: the index is alive and the track is in range.
        let raw = unsafe { self.api().get_track_from_index(self.raw(), track) };
        let raw = NonNull::new(raw).ok_or(Error::InvalidState("index returned no track"))?;
        let owner: Arc<dyn Any + Send + Sync> = self.handle.clone();
        Ok(Track::new(Arc::clone(&self.handle.api), raw, &owner))
    }
}

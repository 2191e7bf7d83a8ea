//! The native entry points this crate consumes, as a trait.
//!
//! Every method maps one-to-one onto an `FFMS_*` C function with the same
//! raw-pointer signature. [`super::dylib::DynamicLibrary`] implements it by
//! calling resolved function pointers; the test tree implements it in memory.
//!
//! # Safety
//!
//! Callers must pass handles obtained from the same implementation that have
//! not been destroyed, NUL-terminated strings, and error records whose buffer
//! is at least `buffer_size` bytes long.

use std::ffi::{c_char, c_int, c_void};

use super::sys::*;

#[allow(clippy::missing_safety_doc, clippy::too_many_arguments)]
pub trait FfmsApi: Send + Sync {
    // Library
    unsafe fn init(&self, unused: c_int, use_utf8_paths: c_int);
    fn get_log_level(&self) -> c_int;
    fn set_log_level(&self, level: c_int);
    unsafe fn get_pix_fmt(&self, name: *const c_char) -> c_int;
    fn get_present_sources(&self) -> c_int;
    fn get_enabled_sources(&self) -> c_int;
    fn get_version(&self) -> c_int;

    // Indexer
    unsafe fn create_indexer_with_demuxer(
        &self,
        source_file: *const c_char,
        demuxer: c_int,
        err: *mut FFMS_ErrorInfo,
    ) -> *mut FFMS_Indexer;
    unsafe fn cancel_indexing(&self, indexer: *mut FFMS_Indexer);
    unsafe fn get_source_type_i(&self, indexer: *mut FFMS_Indexer) -> c_int;
    unsafe fn get_num_tracks_i(&self, indexer: *mut FFMS_Indexer) -> c_int;
    unsafe fn get_track_type_i(&self, indexer: *mut FFMS_Indexer, track: c_int) -> c_int;
    unsafe fn get_codec_name_i(&self, indexer: *mut FFMS_Indexer, track: c_int) -> *const c_char;
    unsafe fn get_format_name_i(&self, indexer: *mut FFMS_Indexer) -> *const c_char;
    /// Destroys `indexer` whatever the outcome.
    unsafe fn do_indexing(
        &self,
        indexer: *mut FFMS_Indexer,
        index_mask: c_int,
        dump_mask: c_int,
        anc: TAudioNameCallback,
        anc_private: *mut c_void,
        error_handling: c_int,
        ic: TIndexCallback,
        ic_private: *mut c_void,
        err: *mut FFMS_ErrorInfo,
    ) -> *mut FFMS_Index;

    // Index
    unsafe fn read_index(&self, index_file: *const c_char, err: *mut FFMS_ErrorInfo)
        -> *mut FFMS_Index;
    unsafe fn destroy_index(&self, index: *mut FFMS_Index);
    unsafe fn get_source_type(&self, index: *mut FFMS_Index) -> c_int;
    unsafe fn get_error_handling(&self, index: *mut FFMS_Index) -> c_int;
    unsafe fn get_first_track_of_type(
        &self,
        index: *mut FFMS_Index,
        track_type: c_int,
        err: *mut FFMS_ErrorInfo,
    ) -> c_int;
    unsafe fn get_first_indexed_track_of_type(
        &self,
        index: *mut FFMS_Index,
        track_type: c_int,
        err: *mut FFMS_ErrorInfo,
    ) -> c_int;
    unsafe fn get_num_tracks(&self, index: *mut FFMS_Index) -> c_int;
    unsafe fn write_index(
        &self,
        index_file: *const c_char,
        index: *mut FFMS_Index,
        err: *mut FFMS_ErrorInfo,
    ) -> c_int;
    unsafe fn index_belongs_to_file(
        &self,
        index: *mut FFMS_Index,
        source_file: *const c_char,
        err: *mut FFMS_ErrorInfo,
    ) -> c_int;
    unsafe fn create_video_source(
        &self,
        source_file: *const c_char,
        track: c_int,
        index: *mut FFMS_Index,
        threads: c_int,
        seek_mode: c_int,
        err: *mut FFMS_ErrorInfo,
    ) -> *mut FFMS_VideoSource;
    unsafe fn create_audio_source(
        &self,
        source_file: *const c_char,
        track: c_int,
        index: *mut FFMS_Index,
        delay_mode: c_int,
        err: *mut FFMS_ErrorInfo,
    ) -> *mut FFMS_AudioSource;
    unsafe fn get_track_from_index(&self, index: *mut FFMS_Index, track: c_int) -> *mut FFMS_Track;

    // Video source
    unsafe fn get_video_properties(&self, v: *mut FFMS_VideoSource) -> *const FFMS_VideoProperties;
    unsafe fn destroy_video_source(&self, v: *mut FFMS_VideoSource);
    unsafe fn set_output_format_v2(
        &self,
        v: *mut FFMS_VideoSource,
        target_formats: *const c_int,
        width: c_int,
        height: c_int,
        resizer: c_int,
        err: *mut FFMS_ErrorInfo,
    ) -> c_int;
    unsafe fn reset_output_format_v(&self, v: *mut FFMS_VideoSource);
    unsafe fn set_input_format_v(
        &self,
        v: *mut FFMS_VideoSource,
        color_space: c_int,
        color_range: c_int,
        pixel_format: c_int,
        err: *mut FFMS_ErrorInfo,
    ) -> c_int;
    unsafe fn reset_input_format_v(&self, v: *mut FFMS_VideoSource);
    unsafe fn get_frame(
        &self,
        v: *mut FFMS_VideoSource,
        n: c_int,
        err: *mut FFMS_ErrorInfo,
    ) -> *const FFMS_Frame;
    unsafe fn get_frame_by_time(
        &self,
        v: *mut FFMS_VideoSource,
        time: f64,
        err: *mut FFMS_ErrorInfo,
    ) -> *const FFMS_Frame;
    unsafe fn get_track_from_video(&self, v: *mut FFMS_VideoSource) -> *mut FFMS_Track;

    // Audio source
    unsafe fn get_audio_properties(&self, a: *mut FFMS_AudioSource) -> *const FFMS_AudioProperties;
    unsafe fn destroy_audio_source(&self, a: *mut FFMS_AudioSource);
    unsafe fn get_audio(
        &self,
        a: *mut FFMS_AudioSource,
        buf: *mut c_void,
        start: i64,
        count: i64,
        err: *mut FFMS_ErrorInfo,
    ) -> c_int;
    unsafe fn get_track_from_audio(&self, a: *mut FFMS_AudioSource) -> *mut FFMS_Track;

    // Track
    unsafe fn get_time_base(&self, t: *mut FFMS_Track) -> *const FFMS_TrackTimeBase;
    unsafe fn get_track_type(&self, t: *mut FFMS_Track) -> c_int;
    unsafe fn get_num_frames(&self, t: *mut FFMS_Track) -> c_int;
    unsafe fn get_frame_info(&self, t: *mut FFMS_Track, frame: c_int) -> *const FFMS_FrameInfo;
    unsafe fn write_timecodes(
        &self,
        t: *mut FFMS_Track,
        timecode_file: *const c_char,
        err: *mut FFMS_ErrorInfo,
    ) -> c_int;
}

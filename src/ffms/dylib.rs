//! Runtime loading of the FFMS2 shared library.
//!
//! The library is opened with `libloading` and every entry point is resolved
//! up front, so a partially compatible build fails at load time rather than on
//! first use.

use std::ffi::{c_char, c_int, c_void};
use std::path::{Path, PathBuf};

use libloading::Library;

use super::api::FfmsApi;
use super::sys::*;
use crate::error::{Error, Result};

/// Base name of the native library; the platform prefix/suffix is added by
/// `libloading::library_filename`.
const LIBRARY_NAME: &str = "ffms2";

macro_rules! ffms_symbols {
    ($($field:ident = $symbol:literal : fn($($arg:ty),*) $(-> $ret:ty)?;)*) => {
        struct Symbols {
            $($field: unsafe extern "C" fn($($arg),*) $(-> $ret)?,)*
        }

        impl Symbols {
            /// Resolve every symbol from `lib`, reporting the first one missing.
            unsafe fn resolve(lib: &Library) -> std::result::Result<Self, (&'static str, libloading::Error)> {
                Ok(Self {
                    $($field: *lib
                        .get::<unsafe extern "C" fn($($arg),*) $(-> $ret)?>(concat!($symbol, "\0").as_bytes())
                        .map_err(|e| ($symbol, e))?,)*
                })
            }
        }
    };
}

ffms_symbols! {
    init = "FFMS_Init": fn(c_int, c_int);
    get_log_level = "FFMS_GetLogLevel": fn() -> c_int;
    set_log_level = "FFMS_SetLogLevel": fn(c_int);
    get_pix_fmt = "FFMS_GetPixFmt": fn(*const c_char) -> c_int;
    get_present_sources = "FFMS_GetPresentSources": fn() -> c_int;
    get_enabled_sources = "FFMS_GetEnabledSources": fn() -> c_int;
    get_version = "FFMS_GetVersion": fn() -> c_int;

    create_indexer_with_demuxer = "FFMS_CreateIndexerWithDemuxer":
        fn(*const c_char, c_int, *mut FFMS_ErrorInfo) -> *mut FFMS_Indexer;
    cancel_indexing = "FFMS_CancelIndexing": fn(*mut FFMS_Indexer);
    get_source_type_i = "FFMS_GetSourceTypeI": fn(*mut FFMS_Indexer) -> c_int;
    get_num_tracks_i = "FFMS_GetNumTracksI": fn(*mut FFMS_Indexer) -> c_int;
    get_track_type_i = "FFMS_GetTrackTypeI": fn(*mut FFMS_Indexer, c_int) -> c_int;
    get_codec_name_i = "FFMS_GetCodecNameI": fn(*mut FFMS_Indexer, c_int) -> *const c_char;
    get_format_name_i = "FFMS_GetFormatNameI": fn(*mut FFMS_Indexer) -> *const c_char;
    do_indexing = "FFMS_DoIndexing": fn(
        *mut FFMS_Indexer,
        c_int,
        c_int,
        TAudioNameCallback,
        *mut c_void,
        c_int,
        TIndexCallback,
        *mut c_void,
        *mut FFMS_ErrorInfo
    ) -> *mut FFMS_Index;

    read_index = "FFMS_ReadIndex": fn(*const c_char, *mut FFMS_ErrorInfo) -> *mut FFMS_Index;
    destroy_index = "FFMS_DestroyIndex": fn(*mut FFMS_Index);
    get_source_type = "FFMS_GetSourceType": fn(*mut FFMS_Index) -> c_int;
    get_error_handling = "FFMS_GetErrorHandling": fn(*mut FFMS_Index) -> c_int;
    get_first_track_of_type = "FFMS_GetFirstTrackOfType":
        fn(*mut FFMS_Index, c_int, *mut FFMS_ErrorInfo) -> c_int;
    get_first_indexed_track_of_type = "FFMS_GetFirstIndexedTrackOfType":
        fn(*mut FFMS_Index, c_int, *mut FFMS_ErrorInfo) -> c_int;
    get_num_tracks = "FFMS_GetNumTracks": fn(*mut FFMS_Index) -> c_int;
    write_index = "FFMS_WriteIndex": fn(*const c_char, *mut FFMS_Index, *mut FFMS_ErrorInfo) -> c_int;
    index_belongs_to_file = "FFMS_IndexBelongsToFile":
        fn(*mut FFMS_Index, *const c_char, *mut FFMS_ErrorInfo) -> c_int;
    create_video_source = "FFMS_CreateVideoSource": fn(
        *const c_char,
        c_int,
        *mut FFMS_Index,
        c_int,
        c_int,
        *mut FFMS_ErrorInfo
    ) -> *mut FFMS_VideoSource;
    create_audio_source = "FFMS_CreateAudioSource":
        fn(*const c_char, c_int, *mut FFMS_Index, c_int, *mut FFMS_ErrorInfo) -> *mut FFMS_AudioSource;
    get_track_from_index = "FFMS_GetTrackFromIndex": fn(*mut FFMS_Index, c_int) -> *mut FFMS_Track;

    get_video_properties = "FFMS_GetVideoProperties":
        fn(*mut FFMS_VideoSource) -> *const FFMS_VideoProperties;
    destroy_video_source = "FFMS_DestroyVideoSource": fn(*mut FFMS_VideoSource);
    set_output_format_v2 = "FFMS_SetOutputFormatV2": fn(
        *mut FFMS_VideoSource,
        *const c_int,
        c_int,
        c_int,
        c_int,
        *mut FFMS_ErrorInfo
    ) -> c_int;
    reset_output_format_v = "FFMS_ResetOutputFormatV": fn(*mut FFMS_VideoSource);
    set_input_format_v = "FFMS_SetInputFormatV":
        fn(*mut FFMS_VideoSource, c_int, c_int, c_int, *mut FFMS_ErrorInfo) -> c_int;
    reset_input_format_v = "FFMS_ResetInputFormatV": fn(*mut FFMS_VideoSource);
    get_frame = "FFMS_GetFrame": fn(*mut FFMS_VideoSource, c_int, *mut FFMS_ErrorInfo) -> *const FFMS_Frame;
    get_frame_by_time = "FFMS_GetFrameByTime":
        fn(*mut FFMS_VideoSource, f64, *mut FFMS_ErrorInfo) -> *const FFMS_Frame;
    get_track_from_video = "FFMS_GetTrackFromVideo": fn(*mut FFMS_VideoSource) -> *mut FFMS_Track;

    get_audio_properties = "FFMS_GetAudioProperties":
        fn(*mut FFMS_AudioSource) -> *const FFMS_AudioProperties;
    destroy_audio_source = "FFMS_DestroyAudioSource": fn(*mut FFMS_AudioSource);
    get_audio = "FFMS_GetAudio":
        fn(*mut FFMS_AudioSource, *mut c_void, i64, i64, *mut FFMS_ErrorInfo) -> c_int;
    get_track_from_audio = "FFMS_GetTrackFromAudio": fn(*mut FFMS_AudioSource) -> *mut FFMS_Track;

    get_time_base = "FFMS_GetTimeBase": fn(*mut FFMS_Track) -> *const FFMS_TrackTimeBase;
    get_track_type = "FFMS_GetTrackType": fn(*mut FFMS_Track) -> c_int;
    get_num_frames = "FFMS_GetNumFrames": fn(*mut FFMS_Track) -> c_int;
    get_frame_info = "FFMS_GetFrameInfo": fn(*mut FFMS_Track, c_int) -> *const FFMS_FrameInfo;
    write_timecodes = "FFMS_WriteTimecodes":
        fn(*mut FFMS_Track, *const c_char, *mut FFMS_ErrorInfo) -> c_int;
}

/// FFMS2 loaded from a shared library on disk.
pub struct DynamicLibrary {
    symbols: Symbols,
    path: PathBuf,
    // Must outlive `symbols`; fields drop in declaration order.
    _library: Library,
}

impl std::fmt::Debug for DynamicLibrary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DynamicLibrary").field("path", &self.path).finish()
    }
}

impl DynamicLibrary {
    /// Open FFMS2 and resolve all entry points.
    ///
    /// `search_path` may be a directory containing the platform library
    /// (`libffms2.so`, `ffms2.dll`, `libffms2.dylib`) or the library file
    /// itself. With `None` the OS loader's default search order applies.
    pub fn load(search_path: Option<&Path>) -> Result<Self> {
        let path = library_candidate(search_path);

        // SAFETY: loading FFMS2 runs its static initialisers, which have no
        // preconditions on the host process.
        let library = unsafe { Library::new(&path) }.map_err(|e| Error::LibraryNotFound {
            path: path.clone(),
            reason: e.to_string(),
        })?;

        // SAFETY: the signatures in `ffms_symbols!` match ffms.h.
        let symbols = unsafe { Symbols::resolve(&library) }.map_err(|(symbol, e)| {
            Error::LibraryNotFound {
                path: path.clone(),
                reason: format!("missing symbol {}: {}", symbol, e),
            }
        })?;

        tracing::debug!("Loaded FFMS2 from {:?}", path);

        Ok(Self {
            symbols,
            path,
            _library: library,
        })
    }

    /// Path the library was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Work out which file to hand to the OS loader.
pub(crate) fn library_candidate(search_path: Option<&Path>) -> PathBuf {
    let file_name = libloading::library_filename(LIBRARY_NAME);
    match search_path {
        Some(dir) if dir.is_dir() => dir.join(file_name),
        Some(file) => file.to_path_buf(),
        None => PathBuf::from(file_name),
    }
}

impl FfmsApi for DynamicLibrary {
    unsafe fn init(&self, unused: c_int, use_utf8_paths: c_int) {
        (self.symbols.init)(unused, use_utf8_paths)
    }

    fn get_log_level(&self) -> c_int {
        // SAFETY: reads global state, no arguments.
        unsafe { (self.symbols.get_log_level)() }
    }

    fn set_log_level(&self, level: c_int) {
        // SAFETY: any integer is accepted by av_log_set_level.
        unsafe { (self.symbols.set_log_level)(level) }
    }

    unsafe fn get_pix_fmt(&self, name: *const c_char) -> c_int {
        (self.symbols.get_pix_fmt)(name)
    }

    fn get_present_sources(&self) -> c_int {
        // SAFETY: no arguments.
        unsafe { (self.symbols.get_present_sources)() }
    }

    fn get_enabled_sources(&self) -> c_int {
        // SAFETY: no arguments.
        unsafe { (self.symbols.get_enabled_sources)() }
    }

    fn get_version(&self) -> c_int {
        // SAFETY: no arguments.
        unsafe { (self.symbols.get_version)() }
    }

    unsafe fn create_indexer_with_demuxer(
        &self,
        source_file: *const c_char,
        demuxer: c_int,
        err: *mut FFMS_ErrorInfo,
    ) -> *mut FFMS_Indexer {
        (self.symbols.create_indexer_with_demuxer)(source_file, demuxer, err)
    }

    unsafe fn cancel_indexing(&self, indexer: *mut FFMS_Indexer) {
        (self.symbols.cancel_indexing)(indexer)
    }

    unsafe fn get_source_type_i(&self, indexer: *mut FFMS_Indexer) -> c_int {
        (self.symbols.get_source_type_i)(indexer)
    }

    unsafe fn get_num_tracks_i(&self, indexer: *mut FFMS_Indexer) -> c_int {
        (self.symbols.get_num_tracks_i)(indexer)
    }

    unsafe fn get_track_type_i(&self, indexer: *mut FFMS_Indexer, track: c_int) -> c_int {
        (self.symbols.get_track_type_i)(indexer, track)
    }

    unsafe fn get_codec_name_i(&self, indexer: *mut FFMS_Indexer, track: c_int) -> *const c_char {
        (self.symbols.get_codec_name_i)(indexer, track)
    }

    unsafe fn get_format_name_i(&self, indexer: *mut FFMS_Indexer) -> *const c_char {
        (self.symbols.get_format_name_i)(indexer)
    }

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
    ) -> *mut FFMS_Index {
        (self.symbols.do_indexing)(
            indexer,
            index_mask,
            dump_mask,
            anc,
            anc_private,
            error_handling,
            ic,
            ic_private,
            err,
        )
    }

    unsafe fn read_index(
        &self,
        index_file: *const c_char,
        err: *mut FFMS_ErrorInfo,
    ) -> *mut FFMS_Index {
        (self.symbols.read_index)(index_file, err)
    }

    unsafe fn destroy_index(&self, index: *mut FFMS_Index) {
        (self.symbols.destroy_index)(index)
    }

    unsafe fn get_source_type(&self, index: *mut FFMS_Index) -> c_int {
        (self.symbols.get_source_type)(index)
    }

    unsafe fn get_error_handling(&self, index: *mut FFMS_Index) -> c_int {
        (self.symbols.get_error_handling)(index)
    }

    unsafe fn get_first_track_of_type(
        &self,
        index: *mut FFMS_Index,
        track_type: c_int,
        err: *mut FFMS_ErrorInfo,
    ) -> c_int {
        (self.symbols.get_first_track_of_type)(index, track_type, err)
    }

    unsafe fn get_first_indexed_track_of_type(
        &self,
        index: *mut FFMS_Index,
        track_type: c_int,
        err: *mut FFMS_ErrorInfo,
    ) -> c_int {
        (self.symbols.get_first_indexed_track_of_type)(index, track_type, err)
    }

    unsafe fn get_num_tracks(&self, index: *mut FFMS_Index) -> c_int {
        (self.symbols.get_num_tracks)(index)
    }

    unsafe fn write_index(
        &self,
        index_file: *const c_char,
        index: *mut FFMS_Index,
        err: *mut FFMS_ErrorInfo,
    ) -> c_int {
        (self.symbols.write_index)(index_file, index, err)
    }

    unsafe fn index_belongs_to_file(
        &self,
        index: *mut FFMS_Index,
        source_file: *const c_char,
        err: *mut FFMS_ErrorInfo,
    ) -> c_int {
        (self.symbols.index_belongs_to_file)(index, source_file, err)
    }

    unsafe fn create_video_source(
        &self,
        source_file: *const c_char,
        track: c_int,
        index: *mut FFMS_Index,
        threads: c_int,
        seek_mode: c_int,
        err: *mut FFMS_ErrorInfo,
    ) -> *mut FFMS_VideoSource {
        (self.symbols.create_video_source)(source_file, track, index, threads, seek_mode, err)
    }

    unsafe fn create_audio_source(
        &self,
        source_file: *const c_char,
        track: c_int,
        index: *mut FFMS_Index,
        delay_mode: c_int,
        err: *mut FFMS_ErrorInfo,
    ) -> *mut FFMS_AudioSource {
        (self.symbols.create_audio_source)(source_file, track, index, delay_mode, err)
    }

    unsafe fn get_track_from_index(&self, index: *mut FFMS_Index, track: c_int) -> *mut FFMS_Track {
        (self.symbols.get_track_from_index)(index, track)
    }

    unsafe fn get_video_properties(
        &self,
        v: *mut FFMS_VideoSource,
    ) -> *const FFMS_VideoProperties {
        (self.symbols.get_video_properties)(v)
    }

    unsafe fn destroy_video_source(&self, v: *mut FFMS_VideoSource) {
        (self.symbols.destroy_video_source)(v)
    }

    unsafe fn set_output_format_v2(
        &self,
        v: *mut FFMS_VideoSource,
        target_formats: *const c_int,
        width: c_int,
        height: c_int,
        resizer: c_int,
        err: *mut FFMS_ErrorInfo,
    ) -> c_int {
        (self.symbols.set_output_format_v2)(v, target_formats, width, height, resizer, err)
    }

    unsafe fn reset_output_format_v(&self, v: *mut FFMS_VideoSource) {
        (self.symbols.reset_output_format_v)(v)
    }

    unsafe fn set_input_format_v(
        &self,
        v: *mut FFMS_VideoSource,
        color_space: c_int,
        color_range: c_int,
        pixel_format: c_int,
        err: *mut FFMS_ErrorInfo,
    ) -> c_int {
        (self.symbols.set_input_format_v)(v, color_space, color_range, pixel_format, err)
    }

    unsafe fn reset_input_format_v(&self, v: *mut FFMS_VideoSource) {
        (self.symbols.reset_input_format_v)(v)
    }

    unsafe fn get_frame(
        &self,
        v: *mut FFMS_VideoSource,
        n: c_int,
        err: *mut FFMS_ErrorInfo,
    ) -> *const FFMS_Frame {
        (self.symbols.get_frame)(v, n, err)
    }

    unsafe fn get_frame_by_time(
        &self,
        v: *mut FFMS_VideoSource,
        time: f64,
        err: *mut FFMS_ErrorInfo,
    ) -> *const FFMS_Frame {
        (self.symbols.get_frame_by_time)(v, time, err)
    }

    unsafe fn get_track_from_video(&self, v: *mut FFMS_VideoSource) -> *mut FFMS_Track {
        (self.symbols.get_track_from_video)(v)
    }

    unsafe fn get_audio_properties(
        &self,
        a: *mut FFMS_AudioSource,
    ) -> *const FFMS_AudioProperties {
        (self.symbols.get_audio_properties)(a)
    }

    unsafe fn destroy_audio_source(&self, a: *mut FFMS_AudioSource) {
        (self.symbols.destroy_audio_source)(a)
    }

    unsafe fn get_audio(
        &self,
        a: *mut FFMS_AudioSource,
        buf: *mut c_void,
        start: i64,
        count: i64,
        err: *mut FFMS_ErrorInfo,
    ) -> c_int {
        (self.symbols.get_audio)(a, buf, start, count, err)
    }

    unsafe fn get_track_from_audio(&self, a: *mut FFMS_AudioSource) -> *mut FFMS_Track {
        (self.symbols.get_track_from_audio)(a)
    }

    unsafe fn get_time_base(&self, t: *mut FFMS_Track) -> *const FFMS_TrackTimeBase {
        (self.symbols.get_time_base)(t)
    }

    unsafe fn get_track_type(&self, t: *mut FFMS_Track) -> c_int {
        (self.symbols.get_track_type)(t)
    }

    unsafe fn get_num_frames(&self, t: *mut FFMS_Track) -> c_int {
        (self.symbols.get_num_frames)(t)
    }

    unsafe fn get_frame_info(&self, t: *mut FFMS_Track, frame: c_int) -> *const FFMS_FrameInfo {
        (self.symbols.get_frame_info)(t, frame)
    }

    unsafe fn write_timecodes(
        &self,
        t: *mut FFMS_Track,
        timecode_file: *const c_char,
        err: *mut FFMS_ErrorInfo,
    ) -> c_int {
        (self.symbols.write_timecodes)(t, timecode_file, err)
    }
}

//! Test fixtures
//!
//! An in-memory FFMS2 that implements [`FfmsApi`], so every adapter can be
//! exercised without the native library or real media files. Media files are
//! registered by path; index files are written to disk as JSON.

use std::collections::HashMap;
use std::ffi::{c_char, c_int, c_void, CStr, CString};
use std::ptr;
use std::sync::atomic::{AtomicI32, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::ffms::sys::*;
use crate::ffms::{FfmsApi, Library};
use crate::types::{Demuxer, TrackType};

pub const FAKE_VERSION: c_int = 2 << 24 | 19 << 16 | 1 << 8;
pub const INDEX_FORMAT_VERSION: u32 = 3;
pub const PROGRESS_TOTAL: i64 = 100;
pub const PROGRESS_STEP: i64 = 25;
pub const WIDTH: c_int = 64;
pub const HEIGHT: c_int = 48;
/// Chroma plane size of the fake's yuv420p frames
pub const CHROMA_WIDTH: c_int = WIDTH / 2;
pub const CHROMA_HEIGHT: c_int = HEIGHT / 2;
/// Value every chroma sample is decoded to
pub const CHROMA_VALUE: u8 = 128;

/// Pixel formats the fake knows by name.
pub const PIX_FMTS: &[(&str, c_int)] = &[("yuv420p", 0), ("rgb24", 2), ("bgra", 28)];

/// One track of a fake media file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FakeTrack {
    pub track_type: TrackType,
    pub codec: String,
    /// Video frames or audio packets
    pub frames: usize,
    #[serde(default)]
    pub num_samples: i64,
    /// Decoding this frame fails
    #[serde(default)]
    pub corrupt_frame: Option<i32>,
    /// Audio that can only be read from the start
    #[serde(default)]
    pub unseekable: bool,
}

impl FakeTrack {
    pub fn video(frames: usize) -> Self {
        Self {
            track_type: TrackType::Video,
            codec: "H.264 / AVC / MPEG-4 AVC / MPEG-4 part 10".into(),
            frames,
            num_samples: 0,
            corrupt_frame: None,
            unseekable: false,
        }
    }

    pub fn audio(packets: usize, num_samples: i64) -> Self {
        Self {
            track_type: TrackType::Audio,
            codec: "Vorbis".into(),
            frames: packets,
            num_samples,
            corrupt_frame: None,
            unseekable: false,
        }
    }

    pub fn other(track_type: TrackType, codec: &str) -> Self {
        Self {
            track_type,
            codec: codec.into(),
            frames: 0,
            num_samples: 0,
            corrupt_frame: None,
            unseekable: false,
        }
    }
}

/// A media file known to the fake library
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FakeMedia {
    /// Identifies the content; files with equal ids are the same media
    pub id: String,
    pub format_name: String,
    pub source_type: c_int,
    pub tracks: Vec<FakeTrack>,
}

impl FakeMedia {
    /// Matroska file with video, audio, two subtitle tracks and a font.
    pub fn five_tracks(id: &str) -> Self {
        Self {
            id: id.into(),
            format_name: "matroska,webm".into(),
            source_type: Demuxer::Matroska.as_raw(),
            tracks: vec![
                FakeTrack::video(120),
                FakeTrack::audio(240, 48_000 * 5),
                FakeTrack::other(TrackType::Subtitle, "SubStation Alpha"),
                FakeTrack::other(TrackType::Subtitle, "SubRip"),
                FakeTrack::other(TrackType::Attachment, "TrueType font"),
            ],
        }
    }

    /// Plain file with one video and two audio tracks.
    pub fn two_audio(id: &str) -> Self {
        Self {
            id: id.into(),
            format_name: "mov,mp4,m4a,3gp,3g2,mj2".into(),
            source_type: Demuxer::Lavf.as_raw(),
            tracks: vec![
                FakeTrack::video(48),
                FakeTrack::audio(100, 44_100 * 2),
                FakeTrack::audio(100, 44_100 * 2),
            ],
        }
    }
}

/// On-disk index format of the fake library
#[derive(Debug, Serialize, Deserialize)]
struct IndexFile {
    version: u32,
    media: FakeMedia,
    indexed: Vec<bool>,
    error_handling: c_int,
}

struct FakeTrackData {
    track_type: c_int,
    time_base: FFMS_TrackTimeBase,
    frames: Vec<FFMS_FrameInfo>,
}

impl FakeTrackData {
    fn new(track: &FakeTrack, indexed: bool) -> Self {
        let count = if indexed { track.frames } else { 0 };
        let frames = (0..count)
            .map(|i| FFMS_FrameInfo {
                pts: i as i64 * 42,
                repeat_pict: 0,
                key_frame: (i % 10 == 0) as c_int,
            })
            .collect();
        Self {
            track_type: track.track_type.as_raw(),
            time_base: FFMS_TrackTimeBase { num: 1, den: 1 },
            frames,
        }
    }
}

struct FakeIndexer {
    media: FakeMedia,
    codec_names: Vec<CString>,
    format_name: CString,
}

struct FakeIndex {
    media: FakeMedia,
    indexed: Vec<bool>,
    error_handling: c_int,
    tracks: Vec<Box<FakeTrackData>>,
}

impl FakeIndex {
    fn new(media: FakeMedia, indexed: Vec<bool>, error_handling: c_int) -> Self {
        let tracks = media
            .tracks
            .iter()
            .zip(&indexed)
            .map(|(t, &i)| Box::new(FakeTrackData::new(t, i)))
            .collect();
        Self {
            media,
            indexed,
            error_handling,
            tracks,
        }
    }
}

struct FakeVideo {
    props: FFMS_VideoProperties,
    frame: FFMS_Frame,
    /// Y, U and V planes
    planes: [Vec<u8>; 3],
    corrupt_frame: Option<i32>,
    track: Box<FakeTrackData>,
}

struct FakeAudio {
    props: FFMS_AudioProperties,
    unseekable: bool,
    track: Box<FakeTrackData>,
}

/// Handle and call counters
#[derive(Default)]
pub struct Counters {
    pub init: AtomicUsize,
    pub indexers_cancelled: AtomicUsize,
    pub indexing_runs: AtomicUsize,
    pub indexes_destroyed: AtomicUsize,
    pub videos_destroyed: AtomicUsize,
    pub audios_destroyed: AtomicUsize,
    pub frame_fetches: AtomicUsize,
}

impl Counters {
    pub fn get(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

#[derive(Default)]
struct FakeState {
    media: HashMap<String, FakeMedia>,
    fail_next_indexing: Option<(c_int, c_int, String)>,
    dumped: Vec<String>,
    pix_fmt_names: Vec<Vec<u8>>,
    audio_reads: Vec<(i64, i64)>,
}

/// In-memory FFMS2
pub struct FakeFfms {
    pub counters: Counters,
    log_level: AtomicI32,
    state: Mutex<FakeState>,
}

impl FakeFfms {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            counters: Counters::default(),
            log_level: AtomicI32::new(-8),
            state: Mutex::new(FakeState::default()),
        })
    }

    /// Make `path` openable with the given content.
    pub fn register(&self, path: &str, media: FakeMedia) {
        self.state.lock().media.insert(path.to_string(), media);
    }

    /// Fail the next indexing pass with the given error pair.
    pub fn fail_next_indexing(&self, category: c_int, subtype: c_int, message: &str) {
        self.state.lock().fail_next_indexing = Some((category, subtype, message.to_string()));
    }

    /// File names produced by the audio dump callback.
    pub fn dumped_files(&self) -> Vec<String> {
        self.state.lock().dumped.clone()
    }

    /// Raw bytes of every name passed to the pixel format lookup.
    pub fn pix_fmt_names(&self) -> Vec<Vec<u8>> {
        self.state.lock().pix_fmt_names.clone()
    }

    /// `(start, count)` of every successful audio read.
    pub fn audio_reads(&self) -> Vec<(i64, i64)> {
        self.state.lock().audio_reads.clone()
    }

    fn lookup(&self, path: *const c_char) -> (String, Option<FakeMedia>) {
        // SAFETY: callers pass NUL-terminated strings.
        let path = unsafe { CStr::from_ptr(path) }.to_string_lossy().into_owned();
        let media = self.state.lock().media.get(&path).cloned();
        (path, media)
    }
}

/// Route crate logs to the test harness; `RUST_LOG` overrides the filter.
pub fn init_logging() {
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ffms=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_test_writer())
        .try_init();
}

/// Library over a fake, initialized the same way as the real one.
pub fn fake_library(fake: &Arc<FakeFfms>) -> Library {
    init_logging();
    Library::from_api(fake.clone())
}

/// Library with the standard five-track file registered at `path`.
pub fn five_track_library(path: &str) -> (Arc<FakeFfms>, Library) {
    let fake = FakeFfms::new();
    fake.register(path, FakeMedia::five_tracks("suzumiya"));
    let library = fake_library(&fake);
    (fake, library)
}

unsafe fn set_error(err: *mut FFMS_ErrorInfo, category: c_int, subtype: c_int, message: &str) {
    let Some(err) = err.as_mut() else {
        return;
    };
    err.error_type = category;
    err.sub_type = subtype;
    if err.buffer.is_null() || err.buffer_size <= 0 {
        return;
    }
    let n = message.len().min(err.buffer_size as usize - 1);
    ptr::copy_nonoverlapping(message.as_ptr(), err.buffer.cast::<u8>(), n);
    *err.buffer.add(n) = 0;
}

fn pix_fmt_known(id: c_int) -> bool {
    PIX_FMTS.iter().any(|&(_, known)| known == id)
}

impl FfmsApi for FakeFfms {
    unsafe fn init(&self, _unused: c_int, use_utf8_paths: c_int) {
        assert_eq!(use_utf8_paths, 1, "paths must be passed as UTF-8");
        self.counters.init.fetch_add(1, Ordering::SeqCst);
    }

    fn get_log_level(&self) -> c_int {
        self.log_level.load(Ordering::SeqCst)
    }

    fn set_log_level(&self, level: c_int) {
        self.log_level.store(level, Ordering::SeqCst);
    }

    unsafe fn get_pix_fmt(&self, name: *const c_char) -> c_int {
        let bytes = CStr::from_ptr(name).to_bytes();
        self.state.lock().pix_fmt_names.push(bytes.to_vec());
        PIX_FMTS
            .iter()
            .find(|(n, _)| n.as_bytes() == bytes)
            .map_or(PIX_FMT_NONE, |&(_, id)| id)
    }

    fn get_present_sources(&self) -> c_int {
        Demuxer::Lavf.as_raw() | Demuxer::Matroska.as_raw()
    }

    fn get_enabled_sources(&self) -> c_int {
        Demuxer::Lavf.as_raw() | Demuxer::Matroska.as_raw()
    }

    fn get_version(&self) -> c_int {
        FAKE_VERSION
    }

    unsafe fn create_indexer_with_demuxer(
        &self,
        source_file: *const c_char,
        demuxer: c_int,
        err: *mut FFMS_ErrorInfo,
    ) -> *mut FFMS_Indexer {
        let (path, media) = self.lookup(source_file);
        let Some(mut media) = media else {
            set_error(err, FFMS_ERROR_PARSER, FFMS_ERROR_FILE_READ, &format!("Can't open '{}'", path));
            return ptr::null_mut();
        };
        if demuxer != 0 {
            media.source_type = demuxer;
        }
        let codec_names = media
            .tracks
            .iter()
            .map(|t| CString::new(t.codec.clone()).unwrap())
            .collect();
        let format_name = CString::new(media.format_name.clone()).unwrap();
        Box::into_raw(Box::new(FakeIndexer {
            media,
            codec_names,
            format_name,
        }))
        .cast()
    }

    unsafe fn cancel_indexing(&self, indexer: *mut FFMS_Indexer) {
        drop(Box::from_raw(indexer.cast::<FakeIndexer>()));
        self.counters.indexers_cancelled.fetch_add(1, Ordering::SeqCst);
    }

    unsafe fn get_source_type_i(&self, indexer: *mut FFMS_Indexer) -> c_int {
        (*indexer.cast::<FakeIndexer>()).media.source_type
    }

    unsafe fn get_num_tracks_i(&self, indexer: *mut FFMS_Indexer) -> c_int {
        (*indexer.cast::<FakeIndexer>()).media.tracks.len() as c_int
    }

    unsafe fn get_track_type_i(&self, indexer: *mut FFMS_Indexer, track: c_int) -> c_int {
        (&(*indexer.cast::<FakeIndexer>()).media.tracks)[track as usize]
            .track_type
            .as_raw()
    }

    unsafe fn get_codec_name_i(&self, indexer: *mut FFMS_Indexer, track: c_int) -> *const c_char {
        (&(*indexer.cast::<FakeIndexer>()).codec_names)[track as usize].as_ptr()
    }

    unsafe fn get_format_name_i(&self, indexer: *mut FFMS_Indexer) -> *const c_char {
        (*indexer.cast::<FakeIndexer>()).format_name.as_ptr()
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
        let indexer = Box::from_raw(indexer.cast::<FakeIndexer>());
        self.counters.indexing_runs.fetch_add(1, Ordering::SeqCst);

        if let Some((category, subtype, message)) = self.state.lock().fail_next_indexing.take() {
            set_error(err, category, subtype, &message);
            return ptr::null_mut();
        }

        if let Some(ic) = ic {
            let mut current = 0;
            while current <= PROGRESS_TOTAL {
                if ic(current, PROGRESS_TOTAL, ic_private) != 0 {
                    set_error(err, FFMS_ERROR_CANCELLED, FFMS_ERROR_USER, "Cancelled by user");
                    return ptr::null_mut();
                }
                current += PROGRESS_STEP;
            }
        }

        let media = indexer.media.clone();
        let selected = |mask: c_int, n: usize| n < 32 && (mask as u32 >> n) & 1 == 1;

        if let Some(anc) = anc {
            let source = CString::new(media.id.clone()).unwrap();
            for (n, track) in media.tracks.iter().enumerate() {
                if track.track_type != TrackType::Audio || !selected(dump_mask, n) {
                    continue;
                }
                let props = FFMS_AudioProperties {
                    sample_format: 1,
                    sample_rate: 48000,
                    bits_per_sample: 16,
                    channels: 2,
                    first_time: 0.0,
                    ..Default::default()
                };
                let size = anc(source.as_ptr(), n as c_int, &props, ptr::null_mut(), 0, anc_private);
                let mut buf = vec![0 as c_char; size as usize];
                anc(source.as_ptr(), n as c_int, &props, buf.as_mut_ptr(), size, anc_private);
                let name = CStr::from_ptr(buf.as_ptr()).to_string_lossy().into_owned();
                self.state.lock().dumped.push(name);
            }
        }

        let indexed = media
            .tracks
            .iter()
            .enumerate()
            .map(|(n, t)| match t.track_type {
                TrackType::Video => true,
                TrackType::Audio => selected(index_mask, n) || selected(dump_mask, n),
                _ => false,
            })
            .collect();
        Box::into_raw(Box::new(FakeIndex::new(media, indexed, error_handling))).cast()
    }

    unsafe fn read_index(&self, index_file: *const c_char, err: *mut FFMS_ErrorInfo) -> *mut FFMS_Index {
        let path = CStr::from_ptr(index_file).to_string_lossy().into_owned();
        let Ok(content) = std::fs::read_to_string(&path) else {
            set_error(err, FFMS_ERROR_PARSER, FFMS_ERROR_FILE_READ, &format!("Failed to open '{}'", path));
            return ptr::null_mut();
        };
        let Ok(file) = serde_json::from_str::<IndexFile>(&content) else {
            set_error(err, FFMS_ERROR_PARSER, FFMS_ERROR_FILE_READ, "Failed to read index");
            return ptr::null_mut();
        };
        if file.version != INDEX_FORMAT_VERSION {
            set_error(err, FFMS_ERROR_INDEX, FFMS_ERROR_NOT_AVAILABLE, "Index version mismatch");
            return ptr::null_mut();
        }
        Box::into_raw(Box::new(FakeIndex::new(file.media, file.indexed, file.error_handling))).cast()
    }

    unsafe fn destroy_index(&self, index: *mut FFMS_Index) {
        drop(Box::from_raw(index.cast::<FakeIndex>()));
        self.counters.indexes_destroyed.fetch_add(1, Ordering::SeqCst);
    }

    unsafe fn get_source_type(&self, index: *mut FFMS_Index) -> c_int {
        (*index.cast::<FakeIndex>()).media.source_type
    }

    unsafe fn get_error_handling(&self, index: *mut FFMS_Index) -> c_int {
        (*index.cast::<FakeIndex>()).error_handling
    }

    unsafe fn get_first_track_of_type(
        &self,
        index: *mut FFMS_Index,
        track_type: c_int,
        err: *mut FFMS_ErrorInfo,
    ) -> c_int {
        let index = &*index.cast::<FakeIndex>();
        match index
            .media
            .tracks
            .iter()
            .position(|t| t.track_type.as_raw() == track_type)
        {
            Some(n) => n as c_int,
            None => {
                set_error(err, FFMS_ERROR_INDEX, FFMS_ERROR_NOT_AVAILABLE, "No suitable, indexed track found");
                -1
            }
        }
    }

    unsafe fn get_first_indexed_track_of_type(
        &self,
        index: *mut FFMS_Index,
        track_type: c_int,
        err: *mut FFMS_ErrorInfo,
    ) -> c_int {
        let index = &*index.cast::<FakeIndex>();
        match index
            .tracks
            .iter()
            .position(|t| t.track_type == track_type && !t.frames.is_empty())
        {
            Some(n) => n as c_int,
            None => {
                set_error(err, FFMS_ERROR_INDEX, FFMS_ERROR_NOT_AVAILABLE, "No suitable, indexed track found");
                -1
            }
        }
    }

    unsafe fn get_num_tracks(&self, index: *mut FFMS_Index) -> c_int {
        (*index.cast::<FakeIndex>()).media.tracks.len() as c_int
    }

    unsafe fn write_index(
        &self,
        index_file: *const c_char,
        index: *mut FFMS_Index,
        err: *mut FFMS_ErrorInfo,
    ) -> c_int {
        let index = &*index.cast::<FakeIndex>();
        let path = CStr::from_ptr(index_file).to_string_lossy().into_owned();
        let file = IndexFile {
            version: INDEX_FORMAT_VERSION,
            media: index.media.clone(),
            indexed: index.indexed.clone(),
            error_handling: index.error_handling,
        };
        let content = serde_json::to_string(&file).unwrap();
        if std::fs::write(&path, content).is_err() {
            set_error(err, FFMS_ERROR_PARSER, FFMS_ERROR_FILE_READ, &format!("Failed to open '{}' for writing", path));
            return 1;
        }
        0
    }

    unsafe fn index_belongs_to_file(
        &self,
        index: *mut FFMS_Index,
        source_file: *const c_char,
        err: *mut FFMS_ErrorInfo,
    ) -> c_int {
        let index = &*index.cast::<FakeIndex>();
        let (path, media) = self.lookup(source_file);
        match media {
            None => {
                set_error(err, FFMS_ERROR_PARSER, FFMS_ERROR_FILE_READ, &format!("Can't open '{}'", path));
                1
            }
            Some(media) if media.id != index.media.id => {
                set_error(err, FFMS_ERROR_INDEX, FFMS_ERROR_FILE_MISMATCH, "Index and source file do not match");
                1
            }
            Some(_) => 0,
        }
    }

    unsafe fn create_video_source(
        &self,
        source_file: *const c_char,
        track: c_int,
        index: *mut FFMS_Index,
        _threads: c_int,
        _seek_mode: c_int,
        err: *mut FFMS_ErrorInfo,
    ) -> *mut FFMS_VideoSource {
        let index = &*index.cast::<FakeIndex>();
        let (path, media) = self.lookup(source_file);
        let Some(media) = media else {
            set_error(err, FFMS_ERROR_PARSER, FFMS_ERROR_FILE_READ, &format!("Can't open '{}'", path));
            return ptr::null_mut();
        };
        if media.id != index.media.id {
            set_error(err, FFMS_ERROR_INDEX, FFMS_ERROR_FILE_MISMATCH, "Index and source file do not match");
            return ptr::null_mut();
        }
        let Some(t) = media.tracks.get(track.max(0) as usize).filter(|_| track >= 0) else {
            set_error(err, FFMS_ERROR_INDEX, FFMS_ERROR_INVALID_ARGUMENT, "Out of bounds track index selected");
            return ptr::null_mut();
        };
        if t.track_type != TrackType::Video {
            set_error(err, FFMS_ERROR_INDEX, FFMS_ERROR_INVALID_ARGUMENT, "Not a video track");
            return ptr::null_mut();
        }

        let num_frames = t.frames as c_int;
        let props = FFMS_VideoProperties {
            fps_denominator: 1001,
            fps_numerator: 24000,
            rff_denominator: 1001,
            rff_numerator: 24000,
            num_frames,
            sar_num: 1,
            sar_den: 1,
            color_space: 1,
            color_range: 1,
            first_time: 0.0,
            last_time: (num_frames - 1).max(0) as f64 * 1001.0 / 24000.0,
            ..Default::default()
        };
        let chroma = vec![CHROMA_VALUE; (CHROMA_WIDTH * CHROMA_HEIGHT) as usize];
        let planes = [vec![0u8; (WIDTH * HEIGHT) as usize], chroma.clone(), chroma];
        let frame = FFMS_Frame {
            data: [ptr::null(); 4],
            linesize: [WIDTH, CHROMA_WIDTH, CHROMA_WIDTH, 0],
            encoded_width: WIDTH,
            encoded_height: HEIGHT,
            encoded_pixel_format: 0,
            scaled_width: -1,
            scaled_height: -1,
            converted_pixel_format: 0,
            key_frame: 0,
            repeat_pict: 0,
            interlaced_frame: 0,
            top_field_first: 0,
            pict_type: b'I' as c_char,
            color_space: 1,
            color_range: 1,
        };
        let mut video = Box::new(FakeVideo {
            props,
            frame,
            planes,
            corrupt_frame: t.corrupt_frame,
            track: Box::new(FakeTrackData::new(t, index.indexed[track as usize])),
        });
        for (slot, plane) in video.frame.data.iter_mut().zip(&video.planes) {
            *slot = plane.as_ptr();
        }
        Box::into_raw(video).cast()
    }

    unsafe fn create_audio_source(
        &self,
        source_file: *const c_char,
        track: c_int,
        index: *mut FFMS_Index,
        _delay_mode: c_int,
        err: *mut FFMS_ErrorInfo,
    ) -> *mut FFMS_AudioSource {
        let index = &*index.cast::<FakeIndex>();
        let (path, media) = self.lookup(source_file);
        let Some(media) = media else {
            set_error(err, FFMS_ERROR_PARSER, FFMS_ERROR_FILE_READ, &format!("Can't open '{}'", path));
            return ptr::null_mut();
        };
        if media.id != index.media.id {
            set_error(err, FFMS_ERROR_INDEX, FFMS_ERROR_FILE_MISMATCH, "Index and source file do not match");
            return ptr::null_mut();
        }
        let Some(t) = media.tracks.get(track.max(0) as usize).filter(|_| track >= 0) else {
            set_error(err, FFMS_ERROR_INDEX, FFMS_ERROR_INVALID_ARGUMENT, "Out of bounds track index selected");
            return ptr::null_mut();
        };
        if t.track_type != TrackType::Audio || !index.indexed[track as usize] {
            set_error(err, FFMS_ERROR_INDEX, FFMS_ERROR_INVALID_ARGUMENT, "Not an indexed audio track");
            return ptr::null_mut();
        }

        let props = FFMS_AudioProperties {
            sample_format: 1,
            sample_rate: 48000,
            bits_per_sample: 16,
            channels: 2,
            channel_layout: 0x3,
            num_samples: t.num_samples,
            first_time: 0.0,
            last_time: t.num_samples as f64 / 48000.0,
        };
        Box::into_raw(Box::new(FakeAudio {
            props,
            unseekable: t.unseekable,
            track: Box::new(FakeTrackData::new(t, true)),
        }))
        .cast()
    }

    unsafe fn get_track_from_index(&self, index: *mut FFMS_Index, track: c_int) -> *mut FFMS_Track {
        let index = &mut *index.cast::<FakeIndex>();
        (&mut *index.tracks[track as usize] as *mut FakeTrackData).cast()
    }

    unsafe fn get_video_properties(&self, v: *mut FFMS_VideoSource) -> *const FFMS_VideoProperties {
        &(*v.cast::<FakeVideo>()).props
    }

    unsafe fn destroy_video_source(&self, v: *mut FFMS_VideoSource) {
        drop(Box::from_raw(v.cast::<FakeVideo>()));
        self.counters.videos_destroyed.fetch_add(1, Ordering::SeqCst);
    }

    unsafe fn set_output_format_v2(
        &self,
        v: *mut FFMS_VideoSource,
        target_formats: *const c_int,
        width: c_int,
        height: c_int,
        _resizer: c_int,
        err: *mut FFMS_ErrorInfo,
    ) -> c_int {
        let video = &mut *v.cast::<FakeVideo>();
        let mut formats = Vec::new();
        let mut p = target_formats;
        while *p != PIX_FMT_NONE {
            formats.push(*p);
            p = p.add(1);
        }
        if formats.is_empty() || !formats.iter().all(|&f| pix_fmt_known(f)) {
            set_error(err, FFMS_ERROR_SCALING, FFMS_ERROR_INVALID_ARGUMENT, "No suitable output format found");
            return 1;
        }
        video.frame.converted_pixel_format = formats[0];
        video.frame.scaled_width = width;
        video.frame.scaled_height = height;
        0
    }

    unsafe fn reset_output_format_v(&self, v: *mut FFMS_VideoSource) {
        let video = &mut *v.cast::<FakeVideo>();
        video.frame.converted_pixel_format = video.frame.encoded_pixel_format;
        video.frame.scaled_width = -1;
        video.frame.scaled_height = -1;
    }

    unsafe fn set_input_format_v(
        &self,
        v: *mut FFMS_VideoSource,
        color_space: c_int,
        color_range: c_int,
        pixel_format: c_int,
        err: *mut FFMS_ErrorInfo,
    ) -> c_int {
        let video = &mut *v.cast::<FakeVideo>();
        if pixel_format != PIX_FMT_NONE && !pix_fmt_known(pixel_format) {
            set_error(err, FFMS_ERROR_DECODING, FFMS_ERROR_CODEC, "Invalid input pixel format");
            return 1;
        }
        video.frame.color_space = color_space;
        video.frame.color_range = color_range;
        0
    }

    unsafe fn reset_input_format_v(&self, v: *mut FFMS_VideoSource) {
        let video = &mut *v.cast::<FakeVideo>();
        video.frame.color_space = video.props.color_space;
        video.frame.color_range = video.props.color_range;
    }

    unsafe fn get_frame(&self, v: *mut FFMS_VideoSource, n: c_int, err: *mut FFMS_ErrorInfo) -> *const FFMS_Frame {
        let video = &mut *v.cast::<FakeVideo>();
        self.counters.frame_fetches.fetch_add(1, Ordering::SeqCst);
        if n < 0 || n >= video.props.num_frames {
            set_error(err, FFMS_ERROR_SEEKING, FFMS_ERROR_INVALID_ARGUMENT, "Frame out of range");
            return ptr::null();
        }
        if video.corrupt_frame == Some(n) {
            set_error(err, FFMS_ERROR_DECODING, FFMS_ERROR_CODEC, "Decoding error");
            return ptr::null();
        }
        video.planes[0].fill(n as u8);
        video.frame.key_frame = (n % 10 == 0) as c_int;
        let pict_type = if n % 10 == 0 { b'I' } else { b'P' };
        video.frame.pict_type = pict_type as c_char;
        &video.frame
    }

    unsafe fn get_frame_by_time(&self, v: *mut FFMS_VideoSource, time: f64, err: *mut FFMS_ErrorInfo) -> *const FFMS_Frame {
        let fps = {
            let video = &*v.cast::<FakeVideo>();
            video.props.fps_numerator as f64 / video.props.fps_denominator as f64
        };
        self.get_frame(v, (time * fps).round() as c_int, err)
    }

    unsafe fn get_track_from_video(&self, v: *mut FFMS_VideoSource) -> *mut FFMS_Track {
        let video = &mut *v.cast::<FakeVideo>();
        (&mut *video.track as *mut FakeTrackData).cast()
    }

    unsafe fn get_audio_properties(&self, a: *mut FFMS_AudioSource) -> *const FFMS_AudioProperties {
        &(*a.cast::<FakeAudio>()).props
    }

    unsafe fn destroy_audio_source(&self, a: *mut FFMS_AudioSource) {
        drop(Box::from_raw(a.cast::<FakeAudio>()));
        self.counters.audios_destroyed.fetch_add(1, Ordering::SeqCst);
    }

    unsafe fn get_audio(
        &self,
        a: *mut FFMS_AudioSource,
        buf: *mut c_void,
        start: i64,
        count: i64,
        err: *mut FFMS_ErrorInfo,
    ) -> c_int {
        let audio = &*a.cast::<FakeAudio>();
        if audio.unseekable && start != 0 {
            set_error(err, FFMS_ERROR_SEEKING, FFMS_ERROR_CODEC, "Audio stream is not seekable");
            return 1;
        }
        if start + count > audio.props.num_samples {
            set_error(err, FFMS_ERROR_DECODING, FFMS_ERROR_UNKNOWN, "Out of bounds audio samples requested");
            return 1;
        }
        let frame_size = (audio.props.bits_per_sample / 8 * audio.props.channels) as usize;
        let out = std::slice::from_raw_parts_mut(buf.cast::<u8>(), count as usize * frame_size);
        for (i, sample) in out.chunks_mut(frame_size).enumerate() {
            sample.fill(((start + i as i64) % 256) as u8);
        }
        self.state.lock().audio_reads.push((start, count));
        0
    }

    unsafe fn get_track_from_audio(&self, a: *mut FFMS_AudioSource) -> *mut FFMS_Track {
        let audio = &mut *a.cast::<FakeAudio>();
        (&mut *audio.track as *mut FakeTrackData).cast()
    }

    unsafe fn get_time_base(&self, t: *mut FFMS_Track) -> *const FFMS_TrackTimeBase {
        &(*t.cast::<FakeTrackData>()).time_base
    }

    unsafe fn get_track_type(&self, t: *mut FFMS_Track) -> c_int {
        (*t.cast::<FakeTrackData>()).track_type
    }

    unsafe fn get_num_frames(&self, t: *mut FFMS_Track) -> c_int {
        (*t.cast::<FakeTrackData>()).frames.len() as c_int
    }

    unsafe fn get_frame_info(&self, t: *mut FFMS_Track, frame: c_int) -> *const FFMS_FrameInfo {
        &(&(*t.cast::<FakeTrackData>()).frames)[frame as usize]
    }

    unsafe fn write_timecodes(
        &self,
        t: *mut FFMS_Track,
        timecode_file: *const c_char,
        err: *mut FFMS_ErrorInfo,
    ) -> c_int {
        let track = &*t.cast::<FakeTrackData>();
        let path = CStr::from_ptr(timecode_file).to_string_lossy().into_owned();
        let mut content = String::from("# timecode format v2\n");
        for info in &track.frames {
            content.push_str(&format!("{}\n", info.pts));
        }
        if std::fs::write(&path, content).is_err() {
            set_error(err, FFMS_ERROR_TRACK, FFMS_ERROR_FILE_WRITE, &format!("Failed to open '{}' for writing", path));
            return 1;
        }
        0
    }
}

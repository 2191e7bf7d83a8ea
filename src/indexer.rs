//! Indexer: opens a media file, reports its tracks, and runs the one-shot
//! indexing pass that produces an [`Index`].
//!
//! The native indexer handle is consumed by the pass whether it succeeds,
//! fails or is cancelled. Afterwards every accessor returns
//! [`Error::InvalidState`].

use std::any::Any;
use std::ffi::{c_char, c_int, c_void};
use std::ops::ControlFlow;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::ptr::{self, NonNull};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use once_cell::sync::OnceCell;
use regex::Regex;

use crate::config::FfmsConfig;
use crate::error::{unclassified, Error, ErrorBuffer, ErrorCategory, ErrorSubtype, Result};
use crate::ffms::{path_to_cstring, string_from_ptr, sys, FfmsApi, Library};
use crate::index::Index;
use crate::types::{Demuxer, IndexErrorHandling, TrackType};

/// Options for a single indexing pass
#[derive(Debug, Clone, Default)]
pub struct IndexOptions {
    /// Audio tracks to index; `None` indexes every audio track
    pub audio_tracks: Option<Vec<i32>>,

    /// Audio tracks to decode and dump to disk while indexing
    pub dump_tracks: Option<Vec<i32>>,

    /// Dump file name template, required when `dump_tracks` is set.
    ///
    /// Supports `%sourcefile%`, `%trackn%`, `%trackzn%`, `%samplerate%`,
    /// `%channels%`, `%bps%` and `%delay%`.
    pub dump_filename_template: Option<String>,

    /// Behavior on decoding errors
    pub error_handling: IndexErrorHandling,
}

impl IndexOptions {
    pub fn from_config(config: &FfmsConfig) -> Self {
        Self {
            error_handling: config.indexing.error_handling,
            ..Default::default()
        }
    }

    /// Bit mask of audio tracks to index.
    fn index_mask(&self) -> Result<c_int> {
        match &self.audio_tracks {
            Some(tracks) => track_mask(tracks),
            None => Ok(-1),
        }
    }

    /// Bit mask of audio tracks to dump.
    fn dump_mask(&self) -> Result<c_int> {
        match &self.dump_tracks {
            Some(_) if self.dump_filename_template.is_none() => {
                Err(Error::MissingArgument("dump_filename_template"))
            }
            Some(tracks) => track_mask(tracks),
            None => Ok(0),
        }
    }
}

fn track_mask(tracks: &[i32]) -> Result<c_int> {
    tracks.iter().try_fold(0 as c_int, |mask, &track| {
        if !(0..32).contains(&track) {
            return Err(Error::out_of_range("track", track, "0..32"));
        }
        Ok(mask | (1u32 << track) as c_int)
    })
}

/// Progress report from the native indexer, in opaque units of work
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexingProgress {
    pub current: i64,
    pub total: i64,
}

impl IndexingProgress {
    /// Completed fraction in `0.0..=1.0`
    pub fn fraction(&self) -> f64 {
        if self.total <= 0 {
            return 0.0;
        }
        (self.current as f64 / self.total as f64).clamp(0.0, 1.0)
    }
}

/// Receives progress while [`Indexer::index_with`] blocks.
///
/// Returning [`ControlFlow::Break`] from `on_progress` cancels the pass.
pub trait IndexingObserver {
    fn on_progress(&mut self, progress: IndexingProgress) -> ControlFlow<()>;

    /// Called once, when the reported progress reaches the total.
    fn on_completed(&mut self) {}
}

impl<F> IndexingObserver for F
where
    F: FnMut(IndexingProgress) -> ControlFlow<()>,
{
    fn on_progress(&mut self, progress: IndexingProgress) -> ControlFlow<()> {
        self(progress)
    }
}

struct NoObserver;

impl IndexingObserver for NoObserver {
    fn on_progress(&mut self, _: IndexingProgress) -> ControlFlow<()> {
        ControlFlow::Continue(())
    }
}

/// Cooperative cancellation flag, checked at every progress report
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexerState {
    Created,
    Indexing,
    Completed,
    Failed,
    Cancelled,
}

pub struct Indexer {
    api: Arc<dyn FfmsApi>,
    handle: Option<NonNull<sys::FFMS_Indexer>>,
    source_file: PathBuf,
    state: IndexerState,
    cancel: CancelToken,
}

// SAFETY: the indexer handle is only touched through `&mut self` or `&self`
// accessors that do not run concurrently with the indexing pass.
unsafe impl Send for Indexer {}

impl std::fmt::Debug for Indexer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Indexer")
            .field("source_file", &self.source_file)
            .field("state", &self.state)
            .finish()
    }
}

impl Indexer {
    /// Open `source_file`, optionally forcing a source module.
    pub fn new(library: &Library, source_file: &Path, demuxer: Demuxer) -> Result<Self> {
        let api = Arc::clone(library.api());
        let c_path = path_to_cstring(source_file)?;
        let mut err = ErrorBuffer::new();

        // SAFETY: the path and error record outlive the call.
        let raw = unsafe {
            api.create_indexer_with_demuxer(c_path.as_ptr(), demuxer.as_raw(), err.as_mut_ptr())
        };
        let Some(handle) = NonNull::new(raw) else {
            let e = err.take();
            if e.is(ErrorCategory::Parser, ErrorSubtype::FileRead) {
                return Err(Error::FileLoad(e));
            }
            return Err(unclassified("create indexer", e));
        };

        tracing::debug!("Opened indexer for {}", source_file.display());
        Ok(Self {
            api,
            handle: Some(handle),
            source_file: source_file.to_path_buf(),
            state: IndexerState::Created,
            cancel: CancelToken::default(),
        })
    }

    pub fn source_file(&self) -> &Path {
        &self.source_file
    }

    pub fn state(&self) -> IndexerState {
        self.state
    }

    /// Token that cancels the indexing pass in progress when triggered.
    ///
    /// The flag is cleared when a pass starts, so cancelling before
    /// `index` has no effect.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    fn handle(&self) -> Result<*mut sys::FFMS_Indexer> {
        self.handle
            .map(NonNull::as_ptr)
            .ok_or(Error::InvalidState("indexer has already been used"))
    }

    fn check_track(&self, track: i32) -> Result<*mut sys::FFMS_Indexer> {
        let handle = self.handle()?;
        let count = self.track_count()?;
        if track < 0 || track >= count {
            return Err(Error::out_of_range("track", track, format!("0..{}", count)));
        }
        Ok(handle)
    }

    pub fn track_count(&self) -> Result<i32> {
        let handle = self.handle()?;
        // SAFETY: handle is live until the indexing pass consumes it.
        Ok(unsafe { self.api.get_num_tracks_i(handle) })
    }

    pub fn track_type(&self, track: i32) -> Result<TrackType> {
        let handle = self.check_track(track)?;
        // SAFETY: handle is live and track is in range.
        Ok(TrackType::from_raw(unsafe {
            self.api.get_track_type_i(handle, track)
        }))
    }

    /// Long codec name of a track.
    pub fn codec_name(&self, track: i32) -> Result<String> {
        let handle = self.check_track(track)?;
        // SAFETY: handle is live and track is in range; the name is owned by
        // the indexer and copied immediately.
        Ok(unsafe { string_from_ptr(self.api.get_codec_name_i(handle, track)) })
    }

    /// Container format name.
    pub fn format_name(&self) -> Result<String> {
        let handle = self.handle()?;
        // SAFETY: as for `codec_name`.
        Ok(unsafe { string_from_ptr(self.api.get_format_name_i(handle)) })
    }

    /// Source module that opened the file.
    pub fn source_type(&self) -> Result<Demuxer> {
        let handle = self.handle()?;
        // SAFETY: handle is live.
        let raw = unsafe { self.api.get_source_type_i(handle) };
        Ok(Demuxer::from_raw(raw).unwrap_or_default())
    }

    /// Index the file without progress reporting.
    pub fn index(&mut self, options: &IndexOptions) -> Result<Index> {
        self.run(options, &mut NoObserver)
    }

    /// Index the file, reporting progress to `observer`.
    ///
    /// Blocks until the native pass finishes. A panic in the observer cancels
    /// the pass and is resumed here once the native call has returned.
    pub fn index_with<O: IndexingObserver>(
        &mut self,
        options: &IndexOptions,
        observer: &mut O,
    ) -> Result<Index> {
        self.run(options, observer)
    }

    fn run(&mut self, options: &IndexOptions, observer: &mut dyn IndexingObserver) -> Result<Index> {
        self.handle()?;
        let index_mask = options.index_mask()?;
        let dump_mask = options.dump_mask()?;
        let Some(handle) = self.handle.take() else {
            return Err(Error::InvalidState("indexer has already been used"));
        };

        self.state = IndexerState::Indexing;
        self.cancel.reset();

        let naming = DumpNaming {
            template: options.dump_filename_template.clone().unwrap_or_default(),
        };
        let (anc, anc_private): (sys::TAudioNameCallback, *mut c_void) = if dump_mask != 0 {
            (
                Some(audio_name_trampoline),
                &naming as *const DumpNaming as *mut c_void,
            )
        } else {
            (None, ptr::null_mut())
        };

        let mut ctx = ProgressContext {
            observer,
            cancel: self.cancel.clone(),
            completed: false,
            panic: None,
        };
        let mut err = ErrorBuffer::new();

        tracing::debug!(
            "Indexing {} (index mask {:#x}, dump mask {:#x})",
            self.source_file.display(),
            index_mask,
            dump_mask
        );

        // SAFETY: `ctx`, `naming` and `err` outlive the call; the native side
        // destroys `handle` whatever the outcome.
        let raw = unsafe {
            self.api.do_indexing(
                handle.as_ptr(),
                index_mask,
                dump_mask,
                anc,
                anc_private,
                options.error_handling.as_raw(),
                Some(progress_trampoline),
                &mut ctx as *mut ProgressContext as *mut c_void,
                err.as_mut_ptr(),
            )
        };
        let panic_payload = ctx.panic.take();
        let index = NonNull::new(raw).map(|h| Index::from_handle(Arc::clone(&self.api), h));

        if let Some(payload) = panic_payload {
            tracing::warn!("Indexing progress handler panicked; pass was cancelled");
            self.state = IndexerState::Failed;
            drop(index);
            panic::resume_unwind(payload);
        }

        if let Some(index) = index {
            self.state = IndexerState::Completed;
            tracing::info!(
                "Indexed {} ({} tracks)",
                self.source_file.display(),
                index.track_count()
            );
            return Ok(index);
        }

        let e = err.take();
        if self.cancel.is_cancelled() || e.is(ErrorCategory::Cancelled, ErrorSubtype::User) {
            self.state = IndexerState::Cancelled;
            tracing::info!("Indexing of {} cancelled", self.source_file.display());
            return Err(Error::Cancelled(e));
        }

        self.state = IndexerState::Failed;
        Err(map_indexing_error(e))
    }
}

fn map_indexing_error(e: crate::error::NativeError) -> Error {
    use ErrorCategory as C;
    use ErrorSubtype as S;

    // The native indexer mixes category and subtype codes in these pairs.
    let decoding = S::Other(sys::FFMS_ERROR_DECODING);
    let parser = S::Other(sys::FFMS_ERROR_PARSER);
    let unsupported_category = C::Other(sys::FFMS_ERROR_UNSUPPORTED);
    let codec_category = C::Other(sys::FFMS_ERROR_CODEC);

    if (e.category == codec_category && e.subtype == S::Unsupported)
        || (e.category == unsupported_category && e.subtype == decoding)
    {
        Error::NotSupported(e)
    } else if (e.category == codec_category && e.subtype == decoding)
        || (e.category == C::Indexing && e.subtype == parser)
    {
        Error::InvalidData(e)
    } else {
        unclassified("indexing", e)
    }
}

impl Drop for Indexer {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            // SAFETY: the handle was never passed to the indexing pass.
            unsafe { self.api.cancel_indexing(handle.as_ptr()) };
            tracing::debug!("Released unused indexer for {}", self.source_file.display());
        }
    }
}

struct ProgressContext<'a> {
    observer: &'a mut dyn IndexingObserver,
    cancel: CancelToken,
    completed: bool,
    panic: Option<Box<dyn Any + Send>>,
}

unsafe extern "C" fn progress_trampoline(current: i64, total: i64, private: *mut c_void) -> c_int {
    // SAFETY: `private` is the `ProgressContext` set up in `Indexer::run`,
    // alive for the whole native call.
    let ctx = unsafe { &mut *(private as *mut ProgressContext) };
    if ctx.panic.is_some() {
        return 1;
    }

    let ProgressContext {
        observer,
        cancel,
        completed,
        panic: panic_slot,
    } = ctx;
    let result = panic::catch_unwind(AssertUnwindSafe(|| {
        if observer
            .on_progress(IndexingProgress { current, total })
            .is_break()
        {
            cancel.cancel();
        }
        if current == total && !*completed {
            *completed = true;
            observer.on_completed();
        }
    }));

    if let Err(payload) = result {
        *panic_slot = Some(payload);
        cancel.cancel();
    }
    c_int::from(cancel.is_cancelled())
}

struct DumpNaming {
    template: String,
}

/// Expand a dump file name template for one audio track.
pub(crate) fn expand_dump_template(
    template: &str,
    source_file: &str,
    track: i32,
    props: &sys::FFMS_AudioProperties,
) -> String {
    static TOKEN: OnceCell<Regex> = OnceCell::new();
    let token = TOKEN.get_or_init(|| Regex::new(r"%([a-z]+)%").unwrap());

    token
        .replace_all(template, |caps: &regex::Captures| match &caps[1] {
            "sourcefile" => source_file.to_string(),
            "trackn" => track.to_string(),
            "trackzn" => format!("{:02}", track),
            "samplerate" => props.sample_rate.to_string(),
            "channels" => props.channels.to_string(),
            "bps" => props.bits_per_sample.to_string(),
            "delay" => ((props.first_time * 1000.0) as i64).to_string(),
            _ => caps[0].to_string(),
        })
        .into_owned()
}

unsafe extern "C" fn audio_name_trampoline(
    source_file: *const c_char,
    track: c_int,
    ap: *const sys::FFMS_AudioProperties,
    file_name: *mut c_char,
    fn_size: c_int,
    private: *mut c_void,
) -> c_int {
    let result = panic::catch_unwind(AssertUnwindSafe(|| {
        // SAFETY: `private` is the `DumpNaming` set up in `Indexer::run`;
        // the other pointers come from the native library.
        let naming = unsafe { &*(private as *const DumpNaming) };
        let source = unsafe { string_from_ptr(source_file) };
        let props = unsafe { ap.as_ref() }.copied().unwrap_or_default();
        let name = expand_dump_template(&naming.template, &source, track, &props);

        let needed = name.len() + 1;
        if !file_name.is_null() && fn_size > 0 {
            let n = name.len().min(fn_size as usize - 1);
            // SAFETY: the native side provides `fn_size` writable bytes.
            unsafe {
                ptr::copy_nonoverlapping(name.as_ptr(), file_name.cast::<u8>(), n);
                *file_name.add(n) = 0;
            }
        }
        needed as c_int
    }));
    result.unwrap_or(0)
}

//! Native library access: ABI declarations, the entry-point trait, the
//! runtime loader and the process-wide bootstrap.
//!
//! [`init`] must be called once before anything else; later calls return the
//! same [`Library`] without touching the native library again.

pub mod api;
pub mod dylib;
pub mod sys;

use std::ffi::{c_char, CStr, CString};
use std::path::Path;
use std::sync::Arc;

use once_cell::sync::OnceCell;

use crate::config::FfmsConfig;
use crate::error::{Error, Result};
use crate::index::Index;
use crate::indexer::Indexer;
use crate::types::{Demuxer, LogLevel, Version};

pub use api::FfmsApi;
pub use dylib::DynamicLibrary;

/// An initialized FFMS2 library and the source modules it reported.
pub struct Library {
    api: Arc<dyn FfmsApi>,
    present_sources: i32,
    enabled_sources: i32,
}

impl std::fmt::Debug for Library {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Library")
            .field("present_sources", &self.present_sources)
            .field("enabled_sources", &self.enabled_sources)
            .finish()
    }
}

impl Library {
    /// Load the shared library and initialize it.
    pub fn load(search_path: Option<&Path>) -> Result<Self> {
        let dylib = DynamicLibrary::load(search_path)?;
        Ok(Self::from_api(Arc::new(dylib)))
    }

    /// Initialize a library from any implementation of the entry points.
    ///
    /// Runs the native one-time setup with UTF-8 paths enabled and caches the
    /// source module masks.
    pub fn from_api(api: Arc<dyn FfmsApi>) -> Self {
        // SAFETY: FFMS_Init takes no pointers.
        unsafe { api.init(0, 1) };
        let present_sources = api.get_present_sources();
        let enabled_sources = api.get_enabled_sources();
        let library = Self {
            api,
            present_sources,
            enabled_sources,
        };
        tracing::info!(
            "FFMS2 {} initialized (sources present={:#x}, enabled={:#x})",
            library.version(),
            present_sources,
            enabled_sources
        );
        library
    }

    pub(crate) fn api(&self) -> &Arc<dyn FfmsApi> {
        &self.api
    }

    /// Whether the source module was compiled into the library.
    pub fn is_source_present(&self, demuxer: Demuxer) -> bool {
        self.present_sources & demuxer.as_raw() != 0
    }

    /// Whether the source module is enabled at runtime.
    pub fn is_source_enabled(&self, demuxer: Demuxer) -> bool {
        self.enabled_sources & demuxer.as_raw() != 0
    }

    pub fn present_sources(&self) -> i32 {
        self.present_sources
    }

    pub fn enabled_sources(&self) -> i32 {
        self.enabled_sources
    }

    pub fn version(&self) -> Version {
        Version(self.api.get_version())
    }

    /// Human-readable version, e.g. `2.19` or `2.19.1`.
    pub fn version_string(&self) -> String {
        self.version().to_string()
    }

    pub fn log_level(&self) -> LogLevel {
        LogLevel::from_raw(self.api.get_log_level())
    }

    pub fn set_log_level(&self, level: LogLevel) {
        self.api.set_log_level(level.as_raw());
    }

    /// Look up a pixel format id by name. Returns -1 for unknown names.
    pub fn pixel_format(&self, name: &str) -> i32 {
        let Ok(name) = CString::new(name) else {
            return sys::PIX_FMT_NONE;
        };
        // SAFETY: `name` is NUL-terminated and outlives the call.
        unsafe { self.api.get_pix_fmt(name.as_ptr()) }
    }

    /// Open a media file for indexing.
    pub fn indexer(&self, source_file: impl AsRef<Path>, demuxer: Demuxer) -> Result<Indexer> {
        Indexer::new(self, source_file.as_ref(), demuxer)
    }

    /// Load an index previously written with [`Index::write`].
    pub fn read_index(&self, index_file: impl AsRef<Path>) -> Result<Index> {
        Index::read(self, index_file.as_ref())
    }
}

/// Process-wide once-only library setup.
pub struct Bootstrap {
    cell: OnceCell<Library>,
}

impl Bootstrap {
    pub const fn new() -> Self {
        Self {
            cell: OnceCell::new(),
        }
    }

    /// Initialize with `make` on the first call; later calls return the
    /// existing library and never run `make`.
    pub fn get_or_try_init<F>(&self, make: F) -> Result<&Library>
    where
        F: FnOnce() -> Result<Library>,
    {
        if let Some(library) = self.cell.get() {
            tracing::debug!("FFMS2 already initialized");
            return Ok(library);
        }
        self.cell.get_or_try_init(make)
    }

    pub fn init(&self, search_path: Option<&Path>) -> Result<&Library> {
        self.get_or_try_init(|| Library::load(search_path))
    }

    pub fn get(&self) -> Result<&Library> {
        self.cell.get().ok_or(Error::NotInitialized)
    }

    pub fn is_initialized(&self) -> bool {
        self.cell.get().is_some()
    }
}

impl Default for Bootstrap {
    fn default() -> Self {
        Self::new()
    }
}

static GLOBAL: Bootstrap = Bootstrap::new();

/// Initialize the global FFMS2 library.
///
/// `search_path` may name the library file or a directory containing it; with
/// `None` the platform loader's search path is used. Only the first
/// successful call loads anything.
pub fn init(search_path: Option<&Path>) -> Result<&'static Library> {
    GLOBAL.init(search_path)
}

/// Initialize the global library from configuration and apply its log level.
pub fn init_with_config(config: &FfmsConfig) -> Result<&'static Library> {
    let library = init(config.library_path.as_deref())?;
    library.set_log_level(config.log_level);
    Ok(library)
}

/// The global library, once [`init`] has succeeded.
pub fn library() -> Result<&'static Library> {
    GLOBAL.get()
}

/// Encode a path for the native library, which was initialized for UTF-8.
pub(crate) fn path_to_cstring(path: &Path) -> Result<CString> {
    #[cfg(unix)]
    let bytes = {
        use std::os::unix::ffi::OsStrExt;
        path.as_os_str().as_bytes().to_vec()
    };
    #[cfg(not(unix))]
    let bytes = path
        .to_str()
        .ok_or_else(|| Error::InvalidArgument(format!("path is not UTF-8: {}", path.display())))?
        .as_bytes()
        .to_vec();

    CString::new(bytes)
        .map_err(|_| Error::InvalidArgument(format!("path contains a NUL byte: {}", path.display())))
}

/// Copy a string owned by the native library.
///
/// # Safety
///
/// `ptr` must be null or point to a NUL-terminated string.
pub(crate) unsafe fn string_from_ptr(ptr: *const c_char) -> String {
    if ptr.is_null() {
        return String::new();
    }
    CStr::from_ptr(ptr).to_string_lossy().into_owned()
}

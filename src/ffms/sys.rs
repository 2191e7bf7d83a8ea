//! Raw FFMS2 ABI: opaque handle types, `#[repr(C)]` records, callback types
//! and error code constants.
//!
//! These mirror `ffms.h` from the 2.19-era C API. Nothing here is safe to use
//! directly; the adapters in this crate wrap every pointer.

#![allow(non_camel_case_types)]

use std::ffi::{c_char, c_int, c_void};

macro_rules! opaque_handle {
    ($($name:ident),* $(,)?) => {
        $(
            #[repr(C)]
            pub struct $name {
                _private: [u8; 0],
            }
        )*
    };
}

opaque_handle!(
    FFMS_Indexer,
    FFMS_Index,
    FFMS_VideoSource,
    FFMS_AudioSource,
    FFMS_Track
);

/// Caller-allocated error record filled in by any fallible native call.
#[repr(C)]
#[derive(Debug)]
pub struct FFMS_ErrorInfo {
    pub error_type: c_int,
    pub sub_type: c_int,
    pub buffer_size: c_int,
    pub buffer: *mut c_char,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct FFMS_VideoProperties {
    pub fps_denominator: c_int,
    pub fps_numerator: c_int,
    pub rff_denominator: c_int,
    pub rff_numerator: c_int,
    pub num_frames: c_int,
    pub sar_num: c_int,
    pub sar_den: c_int,
    pub crop_top: c_int,
    pub crop_bottom: c_int,
    pub crop_left: c_int,
    pub crop_right: c_int,
    pub top_field_first: c_int,
    pub color_space: c_int,
    pub color_range: c_int,
    pub first_time: f64,
    pub last_time: f64,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct FFMS_AudioProperties {
    pub sample_format: c_int,
    pub sample_rate: c_int,
    pub bits_per_sample: c_int,
    pub channels: c_int,
    pub channel_layout: i64,
    pub num_samples: i64,
    pub first_time: f64,
    pub last_time: f64,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct FFMS_Frame {
    pub data: [*const u8; 4],
    pub linesize: [c_int; 4],
    pub encoded_width: c_int,
    pub encoded_height: c_int,
    pub encoded_pixel_format: c_int,
    pub scaled_width: c_int,
    pub scaled_height: c_int,
    pub converted_pixel_format: c_int,
    pub key_frame: c_int,
    pub repeat_pict: c_int,
    pub interlaced_frame: c_int,
    pub top_field_first: c_int,
    pub pict_type: c_char,
    pub color_space: c_int,
    pub color_range: c_int,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct FFMS_FrameInfo {
    pub pts: i64,
    pub repeat_pict: c_int,
    pub key_frame: c_int,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct FFMS_TrackTimeBase {
    pub num: i64,
    pub den: i64,
}

/// Progress callback; a non-zero return cancels indexing.
pub type TIndexCallback =
    Option<unsafe extern "C" fn(current: i64, total: i64, private: *mut c_void) -> c_int>;

/// Audio dump filename callback. Called once with a null `file_name` to
/// query the required size, then again with a buffer of `fn_size` bytes.
pub type TAudioNameCallback = Option<
    unsafe extern "C" fn(
        source_file: *const c_char,
        track: c_int,
        ap: *const FFMS_AudioProperties,
        file_name: *mut c_char,
        fn_size: c_int,
        private: *mut c_void,
    ) -> c_int,
>;

// Error categories: where the error occurred.
pub const FFMS_ERROR_SUCCESS: c_int = 0;
pub const FFMS_ERROR_INDEX: c_int = 1;
pub const FFMS_ERROR_INDEXING: c_int = 2;
pub const FFMS_ERROR_POSTPROCESSING: c_int = 3;
pub const FFMS_ERROR_SCALING: c_int = 4;
pub const FFMS_ERROR_DECODING: c_int = 5;
pub const FFMS_ERROR_SEEKING: c_int = 6;
pub const FFMS_ERROR_PARSER: c_int = 7;
pub const FFMS_ERROR_TRACK: c_int = 8;
pub const FFMS_ERROR_WAVE_WRITER: c_int = 9;
pub const FFMS_ERROR_CANCELLED: c_int = 10;
pub const FFMS_ERROR_RESAMPLING: c_int = 11;

// Error subtypes: what caused the error.
pub const FFMS_ERROR_UNKNOWN: c_int = 20;
pub const FFMS_ERROR_UNSUPPORTED: c_int = 21;
pub const FFMS_ERROR_FILE_READ: c_int = 22;
pub const FFMS_ERROR_FILE_WRITE: c_int = 23;
pub const FFMS_ERROR_NO_FILE: c_int = 24;
pub const FFMS_ERROR_VERSION: c_int = 25;
pub const FFMS_ERROR_ALLOCATION_FAILED: c_int = 26;
pub const FFMS_ERROR_INVALID_ARGUMENT: c_int = 27;
pub const FFMS_ERROR_CODEC: c_int = 28;
pub const FFMS_ERROR_NOT_AVAILABLE: c_int = 29;
pub const FFMS_ERROR_FILE_MISMATCH: c_int = 30;
pub const FFMS_ERROR_USER: c_int = 31;

/// Size of the message buffer handed to every fallible call.
pub const ERROR_BUFFER_SIZE: usize = 1024;

/// Terminator for the pixel format list passed to `FFMS_SetOutputFormatV2`.
pub const PIX_FMT_NONE: c_int = -1;

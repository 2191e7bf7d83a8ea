use std::ffi::c_int;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Source module (demuxer) used to open a file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Demuxer {
    /// Let the library pick the most suitable module
    #[default]
    Default,
    Lavf,
    Matroska,
    HaaliMpeg,
    HaaliOgg,
}

impl Demuxer {
    pub const ALL: [Demuxer; 5] = [
        Demuxer::Default,
        Demuxer::Lavf,
        Demuxer::Matroska,
        Demuxer::HaaliMpeg,
        Demuxer::HaaliOgg,
    ];

    pub fn as_raw(self) -> c_int {
        match self {
            Demuxer::Default => 0x00,
            Demuxer::Lavf => 0x01,
            Demuxer::Matroska => 0x02,
            Demuxer::HaaliMpeg => 0x04,
            Demuxer::HaaliOgg => 0x08,
        }
    }

    pub fn from_raw(raw: c_int) -> Option<Self> {
        Self::ALL.into_iter().find(|d| d.as_raw() == raw)
    }
}

/// Track type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackType {
    Unknown,
    Video,
    Audio,
    Data,
    Subtitle,
    Attachment,
}

impl TrackType {
    pub fn as_raw(self) -> c_int {
        match self {
            TrackType::Unknown => -1,
            TrackType::Video => 0,
            TrackType::Audio => 1,
            TrackType::Data => 2,
            TrackType::Subtitle => 3,
            TrackType::Attachment => 4,
        }
    }

    pub fn from_raw(raw: c_int) -> Self {
        match raw {
            0 => TrackType::Video,
            1 => TrackType::Audio,
            2 => TrackType::Data,
            3 => TrackType::Subtitle,
            4 => TrackType::Attachment,
            _ => TrackType::Unknown,
        }
    }
}

/// Seeking policy for video sources
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeekMode {
    /// Linear access without rewind; errors on any backwards seek
    LinearNoRewind,
    /// Linear access only
    Linear,
    /// Safe normal seeking; falls back to linear decoding when keyframes look broken
    #[default]
    Normal,
    /// Same as `Normal` without the fallback checks
    Unsafe,
    /// Seek to the requested frame without checking the result
    Aggressive,
}

impl SeekMode {
    pub fn as_raw(self) -> c_int {
        match self {
            SeekMode::LinearNoRewind => -1,
            SeekMode::Linear => 0,
            SeekMode::Normal => 1,
            SeekMode::Unsafe => 2,
            SeekMode::Aggressive => 3,
        }
    }
}

/// What the indexer does when it hits a decoding error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexErrorHandling {
    /// Fail the whole indexing pass
    #[default]
    Abort,
    /// Clear the offending track and continue
    ClearTrack,
    /// Keep what was indexed of the track so far and stop indexing it
    StopTrack,
    /// Ignore the error
    Ignore,
}

impl IndexErrorHandling {
    pub fn as_raw(self) -> c_int {
        match self {
            IndexErrorHandling::Abort => 0,
            IndexErrorHandling::ClearTrack => 1,
            IndexErrorHandling::StopTrack => 2,
            IndexErrorHandling::Ignore => 3,
        }
    }

    pub fn from_raw(raw: c_int) -> Option<Self> {
        match raw {
            0 => Some(IndexErrorHandling::Abort),
            1 => Some(IndexErrorHandling::ClearTrack),
            2 => Some(IndexErrorHandling::StopTrack),
            3 => Some(IndexErrorHandling::Ignore),
            _ => None,
        }
    }
}

/// How the first audio sample is aligned to time zero
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AudioDelayMode {
    /// No adjustment; first decoded sample is sample 0
    NoShift,
    /// Sample 0 is timestamp zero
    TimeZero,
    /// Align to the first video track
    #[default]
    FirstVideoTrack,
    /// Align to the given video track
    Track(i32),
}

impl AudioDelayMode {
    pub fn as_raw(self) -> c_int {
        match self {
            AudioDelayMode::NoShift => -3,
            AudioDelayMode::TimeZero => -2,
            AudioDelayMode::FirstVideoTrack => -1,
            AudioDelayMode::Track(n) => n,
        }
    }
}

/// Scaling algorithm for output format conversion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resizer {
    FastBilinear,
    Bilinear,
    #[default]
    Bicubic,
    Experimental,
    Point,
    Area,
    Bicublin,
    Gauss,
    Sinc,
    Lanczos,
    Spline,
}

impl Resizer {
    pub fn as_raw(self) -> c_int {
        match self {
            Resizer::FastBilinear => 0x01,
            Resizer::Bilinear => 0x02,
            Resizer::Bicubic => 0x04,
            Resizer::Experimental => 0x08,
            Resizer::Point => 0x10,
            Resizer::Area => 0x20,
            Resizer::Bicublin => 0x40,
            Resizer::Gauss => 0x80,
            Resizer::Sinc => 0x100,
            Resizer::Lanczos => 0x200,
            Resizer::Spline => 0x400,
        }
    }
}

/// YUV/RGB colorspace (matrix coefficients)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorSpace {
    Rgb,
    Bt709,
    #[default]
    Unspecified,
    Fcc,
    Bt470Bg,
    Smpte170M,
    Smpte240M,
    YCoCg,
    Bt2020Ncl,
    Bt2020Cl,
}

impl ColorSpace {
    pub fn as_raw(self) -> c_int {
        match self {
            ColorSpace::Rgb => 0,
            ColorSpace::Bt709 => 1,
            ColorSpace::Unspecified => 2,
            ColorSpace::Fcc => 4,
            ColorSpace::Bt470Bg => 5,
            ColorSpace::Smpte170M => 6,
            ColorSpace::Smpte240M => 7,
            ColorSpace::YCoCg => 8,
            ColorSpace::Bt2020Ncl => 9,
            ColorSpace::Bt2020Cl => 10,
        }
    }

    pub fn from_raw(raw: c_int) -> Self {
        match raw {
            0 => ColorSpace::Rgb,
            1 => ColorSpace::Bt709,
            4 => ColorSpace::Fcc,
            5 => ColorSpace::Bt470Bg,
            6 => ColorSpace::Smpte170M,
            7 => ColorSpace::Smpte240M,
            8 => ColorSpace::YCoCg,
            9 => ColorSpace::Bt2020Ncl,
            10 => ColorSpace::Bt2020Cl,
            _ => ColorSpace::Unspecified,
        }
    }
}

/// Valid range of YUV values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorRange {
    #[default]
    Unspecified,
    /// 219*2^(n-8), "TV range"
    Mpeg,
    /// 2^n-1, "PC range"
    Jpeg,
}

impl ColorRange {
    pub fn as_raw(self) -> c_int {
        match self {
            ColorRange::Unspecified => 0,
            ColorRange::Mpeg => 1,
            ColorRange::Jpeg => 2,
        }
    }

    pub fn from_raw(raw: c_int) -> Self {
        match raw {
            1 => ColorRange::Mpeg,
            2 => ColorRange::Jpeg,
            _ => ColorRange::Unspecified,
        }
    }
}

/// Audio sample format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SampleFormat {
    U8,
    I16,
    I32,
    F32,
    F64,
}

impl SampleFormat {
    pub fn from_raw(raw: c_int) -> Option<Self> {
        match raw {
            0 => Some(SampleFormat::U8),
            1 => Some(SampleFormat::I16),
            2 => Some(SampleFormat::I32),
            3 => Some(SampleFormat::F32),
            4 => Some(SampleFormat::F64),
            _ => None,
        }
    }

    pub fn as_raw(self) -> c_int {
        match self {
            SampleFormat::U8 => 0,
            SampleFormat::I16 => 1,
            SampleFormat::I32 => 2,
            SampleFormat::F32 => 3,
            SampleFormat::F64 => 4,
        }
    }
}

/// Native (FFmpeg) log verbosity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    /// Print no output
    #[default]
    Quiet,
    /// Something went really wrong and we will crash now
    Panic,
    /// Something went wrong and recovery is not possible
    Fatal,
    /// Something went wrong and cannot losslessly be recovered
    Error,
    /// Something somehow does not look correct
    Warning,
    Info,
    Verbose,
    /// Stuff which is only useful for libav* developers
    Debug,
}

impl LogLevel {
    const LEVELS: [LogLevel; 8] = [
        LogLevel::Quiet,
        LogLevel::Panic,
        LogLevel::Fatal,
        LogLevel::Error,
        LogLevel::Warning,
        LogLevel::Info,
        LogLevel::Verbose,
        LogLevel::Debug,
    ];

    pub fn as_raw(self) -> c_int {
        match self {
            LogLevel::Quiet => -8,
            LogLevel::Panic => 0,
            LogLevel::Fatal => 8,
            LogLevel::Error => 16,
            LogLevel::Warning => 24,
            LogLevel::Info => 32,
            LogLevel::Verbose => 40,
            LogLevel::Debug => 48,
        }
    }

    /// Map a raw level to the nearest named level at or below it.
    pub fn from_raw(raw: c_int) -> Self {
        Self::LEVELS
            .into_iter()
            .rev()
            .find(|l| l.as_raw() <= raw)
            .unwrap_or(LogLevel::Quiet)
    }
}

/// Speaker position bit mask
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ChannelLayout(pub u64);

impl ChannelLayout {
    pub const FRONT_LEFT: u64 = 0x0000_0001;
    pub const FRONT_RIGHT: u64 = 0x0000_0002;
    pub const FRONT_CENTER: u64 = 0x0000_0004;
    pub const LOW_FREQUENCY: u64 = 0x0000_0008;
    pub const BACK_LEFT: u64 = 0x0000_0010;
    pub const BACK_RIGHT: u64 = 0x0000_0020;
    pub const FRONT_LEFT_OF_CENTER: u64 = 0x0000_0040;
    pub const FRONT_RIGHT_OF_CENTER: u64 = 0x0000_0080;
    pub const BACK_CENTER: u64 = 0x0000_0100;
    pub const SIDE_LEFT: u64 = 0x0000_0200;
    pub const SIDE_RIGHT: u64 = 0x0000_0400;
    pub const TOP_CENTER: u64 = 0x0000_0800;
    pub const TOP_FRONT_LEFT: u64 = 0x0000_1000;
    pub const TOP_FRONT_CENTER: u64 = 0x0000_2000;
    pub const TOP_FRONT_RIGHT: u64 = 0x0000_4000;
    pub const TOP_BACK_LEFT: u64 = 0x0000_8000;
    pub const TOP_BACK_CENTER: u64 = 0x0001_0000;
    pub const TOP_BACK_RIGHT: u64 = 0x0002_0000;
    pub const STEREO_LEFT: u64 = 0x2000_0000;
    pub const STEREO_RIGHT: u64 = 0x4000_0000;

    pub fn contains(self, position: u64) -> bool {
        position != 0 && self.0 & position == position
    }

    /// Number of speaker positions set in the mask
    pub fn channel_count(self) -> u32 {
        self.0.count_ones()
    }
}

/// Pixels to crop at each edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Crop {
    pub top: i32,
    pub bottom: i32,
    pub left: i32,
    pub right: i32,
}

/// Rational time base of a track; `pts * num / den` gives milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeBase {
    pub num: i64,
    pub den: i64,
}

impl TimeBase {
    /// Convert a track timestamp to milliseconds
    pub fn to_millis(&self, pts: i64) -> f64 {
        if self.den == 0 {
            return 0.0;
        }
        pts as f64 * self.num as f64 / self.den as f64
    }
}

/// Packed library version: `major << 24 | minor << 16 | micro << 8 | bump`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version(pub i32);

impl Version {
    pub fn major(self) -> i32 {
        self.0 >> 24
    }

    pub fn minor(self) -> i32 {
        (self.0 >> 16) & 0xff
    }

    pub fn micro(self) -> i32 {
        (self.0 >> 8) & 0xff
    }

    pub fn bump(self) -> i32 {
        self.0 & 0xff
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let v = *self;
        if v.bump() != 0 {
            write!(f, "{}.{}.{}.{}", v.major(), v.minor(), v.micro(), v.bump())
        } else if v.micro() != 0 {
            write!(f, "{}.{}.{}", v.major(), v.minor(), v.micro())
        } else {
            write!(f, "{}.{}", v.major(), v.minor())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pack(major: i32, minor: i32, micro: i32, bump: i32) -> Version {
        Version(major << 24 | minor << 16 | micro << 8 | bump)
    }

    #[test]
    fn test_version_string() {
        assert_eq!(pack(2, 19, 0, 0).to_string(), "2.19");
        assert_eq!(pack(2, 19, 1, 0).to_string(), "2.19.1");
        assert_eq!(pack(2, 19, 0, 3).to_string(), "2.19.0.3");
        assert_eq!(pack(2, 0, 0, 0).to_string(), "2.0");
    }

    #[test]
    fn test_log_level_rounds_down() {
        assert_eq!(LogLevel::from_raw(48), LogLevel::Debug);
        assert_eq!(LogLevel::from_raw(56), LogLevel::Debug);
        assert_eq!(LogLevel::from_raw(30), LogLevel::Warning);
        assert_eq!(LogLevel::from_raw(-8), LogLevel::Quiet);
        assert_eq!(LogLevel::from_raw(-100), LogLevel::Quiet);
        for level in LogLevel::LEVELS {
            assert_eq!(LogLevel::from_raw(level.as_raw()), level);
        }
    }

    #[test]
    fn test_unknown_raw_values_fall_back() {
        assert_eq!(TrackType::from_raw(17), TrackType::Unknown);
        assert_eq!(ColorSpace::from_raw(3), ColorSpace::Unspecified);
        assert_eq!(ColorRange::from_raw(9), ColorRange::Unspecified);
        assert_eq!(Demuxer::from_raw(3), None);
        assert_eq!(Demuxer::from_raw(2), Some(Demuxer::Matroska));
    }

    #[test]
    fn test_channel_layout() {
        let surround = ChannelLayout(
            ChannelLayout::FRONT_LEFT
                | ChannelLayout::FRONT_RIGHT
                | ChannelLayout::FRONT_CENTER
                | ChannelLayout::LOW_FREQUENCY
                | ChannelLayout::BACK_LEFT
                | ChannelLayout::BACK_RIGHT,
        );
        assert_eq!(surround.channel_count(), 6);
        assert!(surround.contains(ChannelLayout::LOW_FREQUENCY));
        assert!(!surround.contains(ChannelLayout::SIDE_LEFT));
    }

    #[test]
    fn test_delay_mode_raw() {
        assert_eq!(AudioDelayMode::NoShift.as_raw(), -3);
        assert_eq!(AudioDelayMode::default().as_raw(), -1);
        assert_eq!(AudioDelayMode::Track(4).as_raw(), 4);
    }
}

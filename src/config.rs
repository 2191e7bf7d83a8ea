//! Binding configuration

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::{AudioDelayMode, IndexErrorHandling, LogLevel, SeekMode};

/// Video source defaults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoConfig {
    /// Decoder threads per video source
    pub threads: i32,

    /// Seeking policy
    pub seek_mode: SeekMode,
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            threads: 1,
            seek_mode: SeekMode::Normal,
        }
    }
}

/// Audio source defaults
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Alignment of the first sample
    pub delay_mode: AudioDelayMode,
}

/// Indexing defaults
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexingConfig {
    /// Behavior on decoding errors while indexing
    pub error_handling: IndexErrorHandling,
}

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FfmsConfig {
    /// Library file or directory containing it; the OS loader path when unset
    pub library_path: Option<PathBuf>,

    /// Native log verbosity applied at startup
    pub log_level: LogLevel,

    pub video: VideoConfig,

    pub audio: AudioConfig,

    pub indexing: IndexingConfig,
}

impl FfmsConfig {
    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(e.to_string()))
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&content)
    }

    /// Save configuration to a TOML file
    pub fn to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let content = toml::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))?;
        std::fs::write(path, content)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        Ok(())
    }
}

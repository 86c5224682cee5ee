//! Scanner configuration.
//!
//! Resolution order for the tail window size (highest wins):
//! 1. `SHORTLOG_CONSOLE_TAIL_KB` environment variable
//! 2. `[scan] tail_kb` in the config file
//! 3. [`DEFAULT_TAIL_KB`]
//!
//! The config file is an explicit path when one is given, otherwise
//! `<config_dir>/shortlog/config.toml`. A missing file means defaults.
//! Nothing here is consulted during a scan: callers resolve a [`ScanConfig`]
//! once and pass it in.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Tail window size used when nothing else is configured.
pub const DEFAULT_TAIL_KB: u32 = 150;

/// Read buffer size for the forward scan.
pub const DEFAULT_CHUNK_SIZE: usize = 16 * 1024;

/// Environment variable overriding [`ScanConfig::tail_kb`].
pub const TAIL_KB_ENV: &str = "SHORTLOG_CONSOLE_TAIL_KB";

/// Errors from loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The config file exists but could not be read.
    #[error("failed to read {}: {source}", path.display())]
    Read {
        /// Path of the config file.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The config file is not valid TOML for [`Config`].
    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        /// Path of the config file.
        path: PathBuf,
        /// Underlying TOML error.
        source: toml::de::Error,
    },

    /// A value is out of range.
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub scan: ScanConfig,
}

/// Parameters of one tail-window scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Size of the tail window, in KiB counted back from the end of the log.
    #[serde(default = "default_tail_kb")]
    pub tail_kb: u32,

    /// Bytes read per chunk.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// End-of-line byte sequence.
    #[serde(default = "default_line_terminator")]
    pub line_terminator: String,

    /// Match markers and terminators split across two reads.
    ///
    /// `false` reproduces the historical behaviour in which such splits are
    /// silently missed.
    #[serde(default = "default_true")]
    pub bridge_chunk_boundaries: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            tail_kb: default_tail_kb(),
            chunk_size: default_chunk_size(),
            line_terminator: default_line_terminator(),
            bridge_chunk_boundaries: default_true(),
        }
    }
}

impl ScanConfig {
    /// Tail window size in bytes.
    #[must_use]
    pub fn tail_bytes(&self) -> u64 {
        u64::from(self.tail_kb) * 1024
    }

    /// Check values the scanner cannot work with.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for a zero chunk size or an empty
    /// line terminator.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chunk_size == 0 {
            return Err(ConfigError::Invalid("chunk_size must be at least 1".into()));
        }
        if self.line_terminator.is_empty() {
            return Err(ConfigError::Invalid("line_terminator must not be empty".into()));
        }
        Ok(())
    }

    /// Apply `SHORTLOG_CONSOLE_TAIL_KB` from the process environment.
    pub fn apply_env(&mut self) {
        let value = std::env::var(TAIL_KB_ENV).ok();
        self.apply_tail_override(value.as_deref());
    }

    /// Apply a tail window override; unparseable values are logged and ignored.
    fn apply_tail_override(&mut self, value: Option<&str>) {
        let Some(raw) = value else {
            return;
        };
        match raw.trim().parse::<u32>() {
            Ok(kb) => self.tail_kb = kb,
            Err(err) => warn!(
                var = TAIL_KB_ENV,
                value = raw,
                error = %err,
                "ignoring invalid tail window override"
            ),
        }
    }
}

fn default_tail_kb() -> u32 {
    DEFAULT_TAIL_KB
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

fn default_line_terminator() -> String {
    if cfg!(windows) { "\r\n" } else { "\n" }.to_string()
}

const fn default_true() -> bool {
    true
}

/// Default config file location, if the platform has a config directory.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("shortlog/config.toml"))
}

/// Load configuration and apply environment overrides.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read, parsed, or
/// validated. An explicit path that does not exist is also an error.
pub fn load_config(explicit: Option<&Path>) -> Result<Config, ConfigError> {
    let mut config = match explicit {
        Some(path) => read_config(path)?,
        None => match default_config_path() {
            Some(path) if path.exists() => read_config(&path)?,
            _ => Config::default(),
        },
    };
    config.scan.apply_env();
    config.scan.validate()?;
    Ok(config)
}

fn read_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str::<Config>(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

use std::fmt;
use std::io::ErrorKind;

use crate::config::ConfigError;
use crate::note::NoteError;
use crate::scan::ScanError;

/// Machine-readable error codes for agent-friendly decision making.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    ConfigParseError,
    InvalidConfig,
    LogNotFound,
    LogReadFailed,
    InputReadFailed,
    MarkerEncodeFailed,
    MarkerDecodeFailed,
    MarkersFileInvalid,
    OutputFailed,
    InternalUnexpected,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::ConfigParseError => "E1001",
            Self::InvalidConfig => "E1002",
            Self::LogNotFound => "E2001",
            Self::LogReadFailed => "E2002",
            Self::InputReadFailed => "E2003",
            Self::MarkerEncodeFailed => "E3001",
            Self::MarkerDecodeFailed => "E3002",
            Self::MarkersFileInvalid => "E3003",
            Self::OutputFailed => "E5001",
            Self::InternalUnexpected => "E9001",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::ConfigParseError => "Config file parse error",
            Self::InvalidConfig => "Invalid configuration value",
            Self::LogNotFound => "Log file not found",
            Self::LogReadFailed => "Log file read failed",
            Self::InputReadFailed => "Input file could not be read",
            Self::MarkerEncodeFailed => "Marker could not be encoded",
            Self::MarkerDecodeFailed => "Marker could not be decoded",
            Self::MarkersFileInvalid => "Markers file is not valid JSON",
            Self::OutputFailed => "Output write failed",
            Self::InternalUnexpected => "Internal unexpected error",
        }
    }

    /// Optional remediation hint that can be surfaced to operators and agents.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::ConfigParseError => Some("Fix syntax in the shortlog config.toml and retry."),
            Self::InvalidConfig => {
                Some("Use a chunk_size of at least 1 and a non-empty line_terminator.")
            }
            Self::LogNotFound => Some("Check the log path; the log must be fully written."),
            Self::LogReadFailed | Self::InputReadFailed => {
                Some("Check the path and file permissions and retry.")
            }
            Self::MarkerEncodeFailed | Self::MarkerDecodeFailed => None,
            Self::MarkersFileInvalid => {
                Some("Provide a JSON array of {\"id\", \"color_map\", \"command\"} objects.")
            }
            Self::OutputFailed => Some("Check that stdout is writable."),
            Self::InternalUnexpected => Some("Retry once. If persistent, report a bug with logs."),
        }
    }

    /// Classify an error chain by the first typed error found in it.
    #[must_use]
    pub fn classify(err: &(dyn std::error::Error + 'static)) -> Self {
        let mut current = Some(err);
        while let Some(err) = current {
            if let Some(config) = err.downcast_ref::<ConfigError>() {
                return match config {
                    ConfigError::Read { .. } | ConfigError::Parse { .. } => Self::ConfigParseError,
                    ConfigError::Invalid(_) => Self::InvalidConfig,
                };
            }
            if let Some(scan) = err.downcast_ref::<ScanError>() {
                return match scan {
                    ScanError::Open { .. } => Self::LogNotFound,
                    ScanError::Read { .. } => Self::LogReadFailed,
                    ScanError::Config(_) => Self::InvalidConfig,
                };
            }
            if err.downcast_ref::<NoteError>().is_some() {
                return Self::MarkerDecodeFailed;
            }
            if err.downcast_ref::<serde_json::Error>().is_some() {
                return Self::MarkersFileInvalid;
            }
            if let Some(io) = err.downcast_ref::<std::io::Error>() {
                return match io.kind() {
                    ErrorKind::BrokenPipe | ErrorKind::WriteZero => Self::OutputFailed,
                    _ => Self::InputReadFailed,
                };
            }
            current = err.source();
        }
        Self::InternalUnexpected
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

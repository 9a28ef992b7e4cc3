use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Conditions that abort a pipeline run
#[derive(Error, Debug)]
pub enum Error {
    #[error("malformed MIDI header: {reason}")]
    MalformedHeader { reason: String },

    #[error("truncated file at byte {offset}: needed {needed} bytes, {available} available")]
    TruncatedFile {
        offset: usize,
        needed: usize,
        available: usize,
    },

    #[error("variable-length quantity at byte {offset} is longer than 4 bytes")]
    InvalidVarLen { offset: usize },

    #[error("failed to access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("velocity log line {line}: {message}")]
    VelocityLog { line: usize, message: String },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("failed to serialize output: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    pub fn malformed(reason: impl Into<String>) -> Self {
        Error::MalformedHeader { reason: reason.into() }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<Error> for String {
    fn from(e: Error) -> Self {
        e.to_string()
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Recoverable conditions reported next to a successful result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    /// A byte that could not start an event was skipped
    UnrecognizedEvent { track: usize, offset: usize, byte: u8 },
    /// Drum notes were timed with the fallback tempo
    MissingTempo { default_bpm: f64, first_note_tick: u64 },
    TempoChange { tick: u64, bpm: f64 },
    TimeSignature { tick: u64, numerator: u8, denominator: u8 },
}

impl Diagnostic {
    pub fn is_warning(&self) -> bool {
        matches!(self, Diagnostic::UnrecognizedEvent { .. } | Diagnostic::MissingTempo { .. })
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::UnrecognizedEvent { track, offset, byte } => {
                write!(f, "track {}: skipped unrecognized byte 0x{:02X} at offset {}", track, byte, offset)
            }
            Diagnostic::MissingTempo { default_bpm, first_note_tick } => write!(
                f,
                "no tempo before first drum note (tick {}), using {} BPM",
                first_note_tick, default_bpm
            ),
            Diagnostic::TempoChange { tick, bpm } => write!(f, "tempo {:.2} BPM at tick {}", bpm, tick),
            Diagnostic::TimeSignature { tick, numerator, denominator } => {
                write!(f, "time signature {}/{} at tick {}", numerator, denominator, tick)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = Error::TruncatedFile { offset: 14, needed: 100, available: 8 };
        assert_eq!(err.to_string(), "truncated file at byte 14: needed 100 bytes, 8 available");

        let err = Error::malformed("expected MThd");
        assert_eq!(err.to_string(), "malformed MIDI header: expected MThd");
    }

    #[test]
    fn test_json_failure_is_a_serialization_error() {
        let json_err = serde_json::from_str::<u8>("not json").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::Serialization(_)));
        assert!(err.to_string().starts_with("failed to serialize output"));
    }

    #[test]
    fn test_diagnostic_severity() {
        let skipped = Diagnostic::UnrecognizedEvent { track: 0, offset: 30, byte: 0xF4 };
        assert!(skipped.is_warning());
        assert_eq!(skipped.to_string(), "track 0: skipped unrecognized byte 0xF4 at offset 30");

        let sig = Diagnostic::TimeSignature { tick: 0, numerator: 4, denominator: 4 };
        assert!(!sig.is_warning());
    }

    #[test]
    fn test_diagnostic_json_is_tagged() {
        let diag = Diagnostic::MissingTempo { default_bpm: 100.0, first_note_tick: 0 };
        let json = serde_json::to_value(&diag).unwrap();
        assert_eq!(json["kind"], "missing_tempo");
        assert_eq!(json["default_bpm"], 100.0);
    }
}

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FramescribeError {
    #[error("Invalid parameter: {reason}")]
    InvalidParameter { reason: String },

    #[error("Probe failed for {path}: {reason}")]
    Probe { path: PathBuf, reason: String },

    #[error("Frame decoding failed at {timestamp:.3}s: {reason}")]
    Decode { timestamp: f64, reason: String },

    #[error("Captioning oracle unavailable at {timestamp:.3}s: {reason}")]
    OracleUnavailable { timestamp: f64, reason: String },

    #[error("Invalid observation #{index}: {reason}")]
    InvalidObservation { index: usize, reason: String },

    #[error("Audio transcription failed: {reason}")]
    Transcription { reason: String },

    #[error("Inconsistent analysis: {reason}")]
    InconsistentAnalysis { reason: String },

    #[error("Analysis cancelled")]
    Cancelled,

    #[error("Analysis task failed: {reason}")]
    Internal { reason: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl FramescribeError {
    /// Stable, machine-friendly name of the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            FramescribeError::InvalidParameter { .. } => "invalid_parameter",
            FramescribeError::Probe { .. } => "probe",
            FramescribeError::Decode { .. } => "decode",
            FramescribeError::OracleUnavailable { .. } => "oracle_unavailable",
            FramescribeError::InvalidObservation { .. } => "invalid_observation",
            FramescribeError::Transcription { .. } => "transcription",
            FramescribeError::InconsistentAnalysis { .. } => "inconsistent_analysis",
            FramescribeError::Cancelled => "cancelled",
            FramescribeError::Internal { .. } => "internal",
            FramescribeError::IoError(_) => "io",
            FramescribeError::JsonError(_) => "json",
        }
    }
}

pub type Result<T> = std::result::Result<T, FramescribeError>;

/// Failure reported by a [`crate::oracle::CaptionOracle`] implementation.
#[derive(Error, Debug)]
#[error("{reason}")]
pub struct OracleError {
    pub reason: String,
}

impl OracleError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Failure reported by a [`crate::oracle::FrameDecoder`] implementation.
#[derive(Error, Debug)]
#[error("{reason}")]
pub struct DecodeError {
    pub reason: String,
}

impl DecodeError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Failure reported by a [`crate::oracle::VideoProber`] implementation.
#[derive(Error, Debug)]
#[error("{reason}")]
pub struct ProbeError {
    pub reason: String,
}

impl ProbeError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Failure reported by a [`crate::oracle::AudioTranscriber`] implementation.
#[derive(Error, Debug)]
#[error("{reason}")]
pub struct TranscriptionError {
    pub reason: String,
}

impl TranscriptionError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

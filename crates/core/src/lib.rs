//! Framescribe Core Library
//!
//! Samples frames from a video, captions them through a vision oracle and
//! aggregates the captions into a structured, time-bound description,
//! optionally with a transcript of the audio track.

pub mod aggregate;
pub mod assemble;
pub mod batch;
pub mod classify;
pub mod config;
pub mod error;
pub mod format;
pub mod metadata;
pub mod oracle;
pub mod pipeline;
pub mod planner;
pub mod quality;
pub mod types;

// Re-export commonly used items at crate root
pub use aggregate::Aggregator;
pub use assemble::assemble;
pub use batch::{BatchReport, BatchRunner, VideoOutcome};
pub use classify::{Classification, ContentClassifier, KeywordClassifier};
pub use config::{AnalyzerConfig, FailurePolicy, OverviewConfig};
pub use error::{
    DecodeError, FramescribeError, OracleError, ProbeError, Result, TranscriptionError,
};
pub use format::{format_description_readable, format_timeline, format_timestamp};
pub use oracle::{AudioTranscriber, CaptionAdapter, CaptionOracle, FrameDecoder, VideoProber};
pub use pipeline::{Collaborators, OracleGate, Pipeline};
pub use planner::{MAX_SAMPLES, SamplingStrategy, plan, plan_periodic};
pub use quality::FrameQuality;
pub use types::{
    Caption, CaptionObservation, ContentAnalysis, DescriptionMetadata, FileMetadata, Frame,
    Resolution, SamplePoint, Segment, TechnicalProbe, TimeBoundDetail, VideoDescription,
};

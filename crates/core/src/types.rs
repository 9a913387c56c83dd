use serde::{Deserialize, Serialize};

use crate::quality::FrameQuality;

/// Half-open time interval `[start, end)` in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub start: f64,
    pub end: f64,
}

impl Segment {
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, timestamp: f64) -> bool {
        timestamp >= self.start && timestamp < self.end
    }

    pub fn width(&self) -> f64 {
        self.end - self.start
    }
}

/// One planned sample: where to grab a frame and which segment it stands for.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SamplePoint {
    pub index: usize,
    pub timestamp: f64,
    pub segment: Segment,
}

/// Encoded still image (JPEG or PNG) grabbed from a video.
#[derive(Debug, Clone)]
pub struct Frame {
    pub timestamp: f64,
    pub data: Vec<u8>,
}

impl Frame {
    pub fn new(timestamp: f64, data: Vec<u8>) -> Self {
        Self { timestamp, data }
    }

    /// MIME type sniffed from the image header, `image/jpeg` when unknown.
    pub fn mime_type(&self) -> &'static str {
        match image::guess_format(&self.data) {
            Ok(image::ImageFormat::Png) => "image/png",
            Ok(image::ImageFormat::WebP) => "image/webp",
            Ok(image::ImageFormat::Bmp) => "image/bmp",
            _ => "image/jpeg",
        }
    }
}

/// Raw answer of a captioning oracle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Caption {
    pub text: String,
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CaptionObservation {
    pub segment: Segment,
    pub text: String,
    pub confidence: f64,
    pub quality: Option<FrameQuality>,
}

impl CaptionObservation {
    pub fn new(segment: Segment, text: impl Into<String>, confidence: f64) -> Self {
        Self {
            segment,
            text: text.into(),
            confidence,
            quality: None,
        }
    }

    pub fn with_quality(mut self, quality: FrameQuality) -> Self {
        self.quality = Some(quality);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeBoundDetail {
    #[serde(rename = "detailStartTime")]
    pub start: f64,
    #[serde(rename = "detailEndTime")]
    pub end: f64,
    #[serde(rename = "detailDescription")]
    pub description: String,
    #[serde(rename = "detailConfidence")]
    pub confidence: f64,
    #[serde(
        rename = "technicalAnalysis",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub technical_analysis: Option<FrameQuality>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentAnalysis {
    pub content_overview: String,
    pub action_introduction: String,
    pub time_bound_details: Vec<TimeBoundDetail>,
    pub detected_objects: Vec<String>,
    pub detected_scenes: Vec<String>,
    pub estimated_mood: String,
    /// Speech in the audio track, when transcription ran and heard something.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_transcript: Option<String>,

    // feeds metadata.tags only, not part of the wire record
    #[serde(skip)]
    pub action_words: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

/// Container-level facts about a video, as reported by a prober.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TechnicalProbe {
    pub duration: f64,
    pub resolution: Resolution,
    pub frame_rate: f64,
    pub has_audio: bool,
    pub video_format: String,
}

/// Filesystem facts about a video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileMetadata {
    pub file_name: String,
    pub file_path: String,
    pub file_size: u64,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DescriptionMetadata {
    pub file_name: String,
    pub file_path: String,
    pub file_size: u64,
    pub created_at: String,
    pub description: String,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoDescription {
    #[serde(rename = "type")]
    pub kind: String,
    pub metadata: DescriptionMetadata,
    pub duration: f64,
    pub resolution: Resolution,
    pub frame_rate: f64,
    pub has_audio: bool,
    pub video_format: String,
    pub content_analysis: ContentAnalysis,
}

impl VideoDescription {
    pub const KIND: &'static str = "video";
}

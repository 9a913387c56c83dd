use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{
    error::{FramescribeError, Result},
    planner::{MAX_SAMPLES, SamplingStrategy},
};

/// How `contentOverview` is stitched together from captions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverviewConfig {
    /// Maximum number of distinct captions in the overview.
    pub caption_limit: usize,
    pub separator: String,
}

impl Default for OverviewConfig {
    fn default() -> Self {
        Self {
            caption_limit: 3,
            separator: ". ".to_string(),
        }
    }
}

/// What happens to the rest of a batch once one video fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Record the failure and keep analyzing the other videos.
    #[default]
    Continue,
    /// Stop launching videos and abort running ones.
    Abort,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    pub sampling: SamplingStrategy,
    pub overview: OverviewConfig,
    /// Oracle calls in flight for a single video.
    pub frame_concurrency: usize,
    /// Oracle calls in flight across every video sharing the oracle.
    pub oracle_concurrency: usize,
    /// Whole video pipelines running at once in a batch.
    pub video_concurrency: usize,
    pub frame_quality: bool,
    /// Transcribe the audio track of videos that have one.
    pub audio_transcription: bool,
    pub failure_policy: FailurePolicy,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            sampling: SamplingStrategy::default(),
            overview: OverviewConfig::default(),
            frame_concurrency: 4,
            oracle_concurrency: 2,
            video_concurrency: 2,
            frame_quality: false,
            audio_transcription: false,
            failure_policy: FailurePolicy::default(),
        }
    }
}

impl AnalyzerConfig {
    /// Load a JSON config file; missing keys fall back to defaults.
    pub async fn load(path: &Path) -> Result<Self> {
        let raw = tokio::fs::read_to_string(path).await?;
        let config: AnalyzerConfig = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let invalid = |reason: &str| {
            Err(FramescribeError::InvalidParameter {
                reason: reason.to_string(),
            })
        };

        match self.sampling {
            SamplingStrategy::FrameCount(0) => return invalid("frame count must be at least 1"),
            SamplingStrategy::FrameCount(n) if n > MAX_SAMPLES => {
                return Err(FramescribeError::InvalidParameter {
                    reason: format!("frame count {n} exceeds the maximum of {MAX_SAMPLES}"),
                });
            }
            SamplingStrategy::Periodic(p) if !p.is_finite() || p <= 0.0 => {
                return invalid("sampling period must be positive");
            }
            _ => {}
        }
        if self.overview.caption_limit == 0 {
            return invalid("overview caption limit must be at least 1");
        }
        if self.frame_concurrency == 0 {
            return invalid("frame concurrency must be at least 1");
        }
        if self.oracle_concurrency == 0 {
            return invalid("oracle concurrency must be at least 1");
        }
        if self.video_concurrency == 0 {
            return invalid("video concurrency must be at least 1");
        }
        Ok(())
    }
}
